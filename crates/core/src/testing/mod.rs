//! Testing utilities and mock implementations.
//!
//! Mocks for the two external collaborators, the extraction task service and the
//! matching engine, so the whole audit can run without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use degreeaudit_core::testing::{fixtures, MockMatchingEngine, MockTaskService, TaskScript};
//!
//! let service = MockTaskService::new();
//! service.push_script(TaskScript::completing_after(1, answer)).await;
//!
//! let engine = MockMatchingEngine::always_failing();
//! let catalog = fixtures::catalog();
//! ```

mod mock_matching_engine;
mod mock_task_service;

pub use mock_matching_engine::MockMatchingEngine;
pub use mock_task_service::{MockTaskService, TaskScript};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::program::{BlockType, RequirementBlock, StaticCatalog};
    use crate::transcript::Course;

    /// "History Minor": 18 credits, HIST 200 and HIST 201 required.
    pub fn history_minor() -> RequirementBlock {
        program(
            "History Minor",
            18,
            &[("HIST", "200"), ("HIST", "201")],
            &[("HIST", "300"), ("HIST", "350")],
        )
    }

    /// "Mathematics Minor": lists MATH 223 as required.
    pub fn math_minor() -> RequirementBlock {
        program(
            "Mathematics Minor",
            18,
            &[("MATH", "223"), ("MATH", "240")],
            &[("MATH", "323"), ("MATH", "340")],
        )
    }

    /// "Statistics Minor": also lists MATH 223 as required.
    pub fn statistics_minor() -> RequirementBlock {
        program(
            "Statistics Minor",
            18,
            &[("MATH", "223"), ("MATH", "324")],
            &[("COMP", "202")],
        )
    }

    /// A PROGRAM with one REQUIRED block and one COMPLEMENTARY block holding a
    /// single CUSTOM group, all courses worth 3 credits.
    pub fn program(
        name: &str,
        minimum_credit: u32,
        required: &[(&str, &str)],
        group: &[(&str, &str)],
    ) -> RequirementBlock {
        let mut required_block = RequirementBlock::builder("Required Courses", BlockType::Required)
            .minimum_credit(3 * required.len() as u32);
        for (subject, code) in required {
            required_block = required_block.course(*subject, *code, "3");
        }

        let mut group_block = RequirementBlock::builder("Group A", BlockType::Custom)
            .detail("3 credits from the following");
        for (subject, code) in group {
            group_block = group_block.course(*subject, *code, "3");
        }

        let complementary = RequirementBlock::builder("Complementary Courses", BlockType::Complementary)
            .minimum_credit(minimum_credit.saturating_sub(3 * required.len() as u32))
            .child(group_block.build().expect("valid group"))
            .build()
            .expect("valid complementary block");

        RequirementBlock::builder(name, BlockType::Program)
            .minimum_credit(minimum_credit)
            .child(required_block.build().expect("valid required block"))
            .child(complementary)
            .build()
            .expect("valid program")
    }

    /// Catalog with the three fixture minors.
    pub fn catalog() -> StaticCatalog {
        StaticCatalog::new(vec![history_minor(), math_minor(), statistics_minor()])
            .expect("fixture catalog")
    }

    /// Five courses, one of them failed.
    pub fn transcript_courses() -> Vec<Course> {
        vec![
            Course::new("MATH", "223", 3, "A"),
            Course::new("MATH", "240", 3, "B+"),
            Course::new("MATH", "324", 3, "A-"),
            Course::new("HIST", "200", 3, "B"),
            Course::new("HIST", "201", 0, "F"),
        ]
    }
}
