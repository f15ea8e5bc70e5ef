//! Deterministic offline matching.
//!
//! Every candidate goes to the first block whose course list names it, in this order:
//!
//! ```text
//! REQUIRED blocks -> CUSTOM groups -> COMPLEMENTARY blocks -> PROGRAM
//! ```
//!
//! Complementary groups and blocks stop taking courses once the credit-bearing
//! block has reached its minimum, so surplus courses stay free for later programs.
//! Lower-numbered courses are tried first.

use async_trait::async_trait;
use std::collections::HashSet;

use crate::program::{BlockType, RequirementBlock};
use crate::report::{BlockReport, ReportStatus};
use crate::transcript::{CandidateCourse, CourseKey};

use super::traits::{MatchRequest, MatchingEngine, MatchingError};

const PHASES: [BlockType; 4] = [
    BlockType::Required,
    BlockType::Custom,
    BlockType::Complementary,
    BlockType::Program,
];

/// Rule-based engine that needs no external service.
#[derive(Debug, Clone, Default)]
pub struct HeuristicMatchingEngine;

impl HeuristicMatchingEngine {
    pub fn new() -> Self {
        Self
    }

    /// Build the report for `program` from `candidates`, skipping anything in `exclude`.
    pub fn assign(
        &self,
        program: &RequirementBlock,
        candidates: &[CandidateCourse],
        exclude: &HashSet<CourseKey>,
    ) -> BlockReport {
        let mut slots = Vec::new();
        flatten(program, None, &mut slots);

        let mut remaining: Vec<&CandidateCourse> = candidates
            .iter()
            .filter(|c| !exclude.contains(&c.key()))
            .collect();
        remaining.sort_by(|a, b| {
            (a.course_code.len(), &a.course_code).cmp(&(b.course_code.len(), &b.course_code))
        });

        for phase in PHASES {
            for idx in 0..slots.len() {
                if slots[idx].block.block_type() != phase {
                    continue;
                }
                let mut i = 0;
                while i < remaining.len() {
                    let key = remaining[i].key();
                    if slots[idx].block.lists_course(&key) && has_room(&slots, idx) {
                        let course = remaining.remove(i);
                        slots[idx].assigned.push(course.clone());
                    } else {
                        i += 1;
                    }
                }
            }
        }

        build_report(&slots, 0)
    }
}

#[async_trait]
impl MatchingEngine for HeuristicMatchingEngine {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn invoke(&self, request: &MatchRequest) -> Result<BlockReport, MatchingError> {
        let exclude: HashSet<CourseKey> = request
            .reports
            .iter()
            .flat_map(|r| r.assigned_courses().map(|(_, course)| course.key()))
            .collect();
        Ok(self.assign(&request.program_details, &request.transcript, &exclude))
    }
}

struct Slot<'a> {
    block: &'a RequirementBlock,
    parent: Option<usize>,
    assigned: Vec<CandidateCourse>,
}

fn flatten<'a>(block: &'a RequirementBlock, parent: Option<usize>, slots: &mut Vec<Slot<'a>>) {
    let idx = slots.len();
    slots.push(Slot {
        block,
        parent,
        assigned: Vec::new(),
    });
    for child in block.children() {
        flatten(child, Some(idx), slots);
    }
}

fn is_within(slots: &[Slot<'_>], idx: usize, ancestor: usize) -> bool {
    let mut current = Some(idx);
    while let Some(i) = current {
        if i == ancestor {
            return true;
        }
        current = slots[i].parent;
    }
    false
}

/// Credits assigned to `idx` and everything below it.
fn credited(slots: &[Slot<'_>], idx: usize) -> u32 {
    (idx..slots.len())
        .filter(|&j| is_within(slots, j, idx))
        .flat_map(|j| slots[j].assigned.iter())
        .map(|c| c.credit)
        .sum()
}

fn has_room(slots: &[Slot<'_>], idx: usize) -> bool {
    let slot = &slots[idx];
    let bearer = match slot.block.block_type() {
        // Every listed required course counts.
        BlockType::Required => return true,
        BlockType::Custom => slot.parent.unwrap_or(idx),
        _ => idx,
    };
    match slots[bearer].block.minimum_credit() {
        Some(minimum) => credited(slots, bearer) < minimum,
        None => true,
    }
}

fn build_report(slots: &[Slot<'_>], idx: usize) -> BlockReport {
    let slot = &slots[idx];
    let block = slot.block;

    let blocks: Vec<BlockReport> = (idx + 1..slots.len())
        .filter(|&j| slots[j].parent == Some(idx))
        .map(|j| build_report(slots, j))
        .collect();

    let received = credited(slots, idx);
    let minimum = block.minimum_credit();
    let shortfall = minimum.map(|m| m.saturating_sub(received)).unwrap_or(0);
    let mut notes = Vec::new();

    let fulfilled = match block.block_type() {
        BlockType::Program => {
            if shortfall > 0 {
                notes.push(format!("overall need {shortfall} more credits"));
            }
            let open: Vec<&str> = blocks
                .iter()
                .filter(|b| !b.status.is_fulfilled())
                .map(|b| b.name.as_str())
                .collect();
            if shortfall == 0 && !open.is_empty() {
                notes.push(format!("unfulfilled: {}", open.join(", ")));
            }
            shortfall == 0 && open.is_empty()
        }
        BlockType::Required if minimum.is_none() => {
            let missing: Vec<String> = block
                .courses()
                .iter()
                .filter(|listed| !slot.assigned.iter().any(|c| c.key() == listed.key()))
                .map(ToString::to_string)
                .collect();
            if !missing.is_empty() {
                notes.push(format!("missing {}", missing.join(", ")));
            }
            missing.is_empty()
        }
        BlockType::Custom => {
            let taken = !slot.assigned.is_empty() || block.courses().is_empty();
            if !taken {
                notes.push("no course taken from this group".to_string());
            }
            taken
        }
        BlockType::Required | BlockType::Complementary => {
            if shortfall > 0 {
                notes.push(format!("need {shortfall} more credits"));
            }
            shortfall == 0
        }
    };

    BlockReport {
        name: block.name().to_string(),
        minimum_credit: minimum,
        received_credit: Some(received),
        block_type: block.block_type(),
        notes,
        status: if fulfilled {
            ReportStatus::Fulfilled
        } else {
            ReportStatus::Unfulfilled
        },
        courses: slot.assigned.iter().map(|c| c.to_course_ref()).collect(),
        blocks,
    }
}
