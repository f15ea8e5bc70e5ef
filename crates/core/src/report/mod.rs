//! Per-program fulfillment reports produced by the matching engine.

mod validate;

pub use validate::{validate_report, ReportValidationError};

use serde::{Deserialize, Serialize};

use crate::program::{BlockType, CourseRef};

/// Fulfillment status of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Fulfilled,
    Unfulfilled,
}

impl ReportStatus {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, ReportStatus::Fulfilled)
    }
}

/// Report for one requirement block; mirrors the block tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockReport {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_credit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_credit: Option<u32>,
    pub block_type: BlockType,
    #[serde(default, deserialize_with = "crate::program::null_as_default")]
    pub notes: Vec<String>,
    pub status: ReportStatus,
    #[serde(default, deserialize_with = "crate::program::null_as_default")]
    pub courses: Vec<CourseRef>,
    #[serde(
        default,
        alias = "children",
        deserialize_with = "crate::program::null_as_default"
    )]
    pub blocks: Vec<BlockReport>,
}

impl BlockReport {
    /// Depth-first, pre-order walk over this report and all nested reports.
    pub fn iter(&self) -> impl Iterator<Item = &BlockReport> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let report = stack.pop()?;
            stack.extend(report.blocks.iter().rev());
            Some(report)
        })
    }

    /// Every course listed anywhere in the report, with the block it was listed under.
    pub fn assigned_courses(&self) -> impl Iterator<Item = (&BlockReport, &CourseRef)> {
        self.iter()
            .flat_map(|block| block.courses.iter().map(move |course| (block, course)))
    }
}
