//! Checks an engine-produced report against the program and the offered courses.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::program::{BlockType, RequirementBlock};
use crate::transcript::{CandidateCourse, CourseKey};

use super::BlockReport;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportValidationError {
    #[error("report root must be a PROGRAM block, found {0}")]
    NotAProgram(BlockType),

    #[error("report is for '{found}', expected '{expected}'")]
    NameMismatch { expected: String, found: String },

    #[error("report block '{parent}' ({parent_type}) cannot contain {child_type} block '{child}'")]
    InvalidNesting {
        parent: String,
        parent_type: BlockType,
        child: String,
        child_type: BlockType,
    },

    #[error("report block '{parent}' has {block_type} block '{block}' with no counterpart in the program")]
    UnexpectedBlock {
        parent: String,
        block: String,
        block_type: BlockType,
    },

    #[error("report block '{parent}' is missing {block_type} block '{block}'")]
    MissingBlock {
        parent: String,
        block: String,
        block_type: BlockType,
    },

    #[error("course {course} in block '{block}' was not offered for this program")]
    CourseNotOffered { course: String, block: String },

    #[error("course {course} is listed in both '{first_block}' and '{second_block}'")]
    DuplicateCourse {
        course: String,
        first_block: String,
        second_block: String,
    },
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Pair every report child with exactly one program child of the same name and type.
fn check_mirrors(
    report: &BlockReport,
    block: &RequirementBlock,
) -> Result<(), ReportValidationError> {
    let expected = block.children();
    let mut matched = vec![false; expected.len()];

    for child in &report.blocks {
        let counterpart = (0..expected.len()).find(|&i| {
            !matched[i]
                && expected[i].block_type() == child.block_type
                && same_name(expected[i].name(), &child.name)
        });
        let Some(i) = counterpart else {
            return Err(ReportValidationError::UnexpectedBlock {
                parent: report.name.clone(),
                block: child.name.clone(),
                block_type: child.block_type,
            });
        };
        matched[i] = true;
        check_mirrors(child, &expected[i])?;
    }

    if let Some(i) = matched.iter().position(|m| !m) {
        return Err(ReportValidationError::MissingBlock {
            parent: report.name.clone(),
            block: expected[i].name().to_string(),
            block_type: expected[i].block_type(),
        });
    }

    Ok(())
}

/// Validate `report` as the answer for `program` given the offered `candidates`.
///
/// The report's blocks must mirror the program tree one-to-one by name and type.
/// Any course outside `candidates` (claimed earlier in the run, failed, or simply not
/// on the transcript) is rejected, as is a course listed twice within the report.
pub fn validate_report(
    report: &BlockReport,
    program: &RequirementBlock,
    candidates: &[CandidateCourse],
) -> Result<(), ReportValidationError> {
    if report.block_type != BlockType::Program {
        return Err(ReportValidationError::NotAProgram(report.block_type));
    }
    if !same_name(&report.name, program.name()) {
        return Err(ReportValidationError::NameMismatch {
            expected: program.name().to_string(),
            found: report.name.clone(),
        });
    }

    for block in report.iter() {
        if let Some(child) = block
            .blocks
            .iter()
            .find(|child| !block.block_type.allows_child(child.block_type))
        {
            return Err(ReportValidationError::InvalidNesting {
                parent: block.name.clone(),
                parent_type: block.block_type,
                child: child.name.clone(),
                child_type: child.block_type,
            });
        }
    }

    check_mirrors(report, program)?;

    let offered: HashSet<CourseKey> = candidates.iter().map(CandidateCourse::key).collect();
    let mut seen: HashMap<CourseKey, &str> = HashMap::new();

    for (block, course) in report.assigned_courses() {
        let key = course.key();
        if !offered.contains(&key) {
            return Err(ReportValidationError::CourseNotOffered {
                course: key.to_string(),
                block: block.name.clone(),
            });
        }
        if let Some(first_block) = seen.insert(key.clone(), &block.name) {
            return Err(ReportValidationError::DuplicateCourse {
                course: key.to_string(),
                first_block: first_block.to_string(),
                second_block: block.name.clone(),
            });
        }
    }

    Ok(())
}
