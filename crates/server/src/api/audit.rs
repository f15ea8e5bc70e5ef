use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use degreeaudit_core::{AuditError, AuditRequest, AuditResponse};

use crate::state::AppState;

/// Error body for audit endpoints
#[derive(Debug, Serialize)]
pub struct AuditErrorResponse {
    pub error: String,
}

/// Programs the service can audit
#[derive(Debug, Serialize)]
pub struct ProgramsResponse {
    pub programs: Vec<String>,
}

type ApiError = (StatusCode, Json<AuditErrorResponse>);

fn api_error(status: StatusCode, error: impl ToString) -> ApiError {
    (
        status,
        Json(AuditErrorResponse {
            error: error.to_string(),
        }),
    )
}

/// Run an audit of the submitted transcript.
///
/// Invalid input is a 400. Any failure during the run is a 500; partial
/// reports are never returned.
pub async fn run_audit(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AuditRequest>,
) -> Result<Json<AuditResponse>, ApiError> {
    let transcript = request.into_transcript().map_err(|e| {
        warn!(error = %e, "Rejected audit request");
        api_error(StatusCode::BAD_REQUEST, e)
    })?;

    info!(
        programs = transcript.program_titles().len(),
        courses = transcript.courses().len(),
        "Audit requested"
    );

    match state.orchestrator().run(&transcript).await {
        Ok(response) => Ok(Json(response)),
        Err(AuditError::NoPrograms) => {
            Err(api_error(StatusCode::BAD_REQUEST, AuditError::NoPrograms))
        }
        Err(e) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e)),
    }
}

/// List the program titles the configured source can resolve.
pub async fn list_programs(State(state): State<Arc<AppState>>) -> Json<ProgramsResponse> {
    Json(ProgramsResponse {
        programs: state.orchestrator().known_titles(),
    })
}
