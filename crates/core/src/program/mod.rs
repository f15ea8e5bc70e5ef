//! Program requirement trees.
//!
//! A program is a tree of requirement blocks:
//!
//! ```text
//! PROGRAM
//! ├── REQUIRED
//! └── COMPLEMENTARY
//!     ├── CUSTOM ("Group A")
//!     └── CUSTOM ("Group B")
//! ```
//!
//! Trees are validated when they are built (from a catalog document, an extraction
//! task answer, or the builder) and never change afterwards.

mod block;
mod catalog;
mod schema;

pub use block::{BlockType, CourseRef, RequirementBlock, RequirementBlockBuilder, SchemaError};
pub use catalog::{normalize_title, CatalogError, ProgramCatalog, StaticCatalog};

pub(crate) use block::null_as_default;
