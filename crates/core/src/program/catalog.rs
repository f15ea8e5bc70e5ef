//! Static catalog of program definitions, looked up by title.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;

use super::block::{RequirementBlock, SchemaError};

const BUILTIN_PROGRAMS: &str = include_str!("programs.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid catalog document: {0}")]
    Schema(#[from] SchemaError),
}

/// Lookup of requirement trees by program title.
pub trait ProgramCatalog: Send + Sync {
    /// Find a program by title. Titles compare case-insensitively, ignoring
    /// surrounding whitespace.
    fn lookup(&self, title: &str) -> Option<RequirementBlock>;

    /// All titles this catalog knows, in catalog order.
    fn titles(&self) -> Vec<String>;
}

/// In-memory catalog of parsed program trees.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    programs: Vec<RequirementBlock>,
    index: HashMap<String, usize>,
}

/// Key under which two program titles name the same program.
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

impl StaticCatalog {
    /// Catalog of the programs shipped with the crate.
    pub fn builtin() -> Self {
        // Covered by test_builtin_catalog_parses.
        Self::from_json_str(BUILTIN_PROGRAMS).expect("built-in program catalog is valid")
    }

    pub fn new(programs: Vec<RequirementBlock>) -> Result<Self, CatalogError> {
        let mut catalog = Self::default();
        for program in programs {
            catalog.insert(program)?;
        }
        Ok(catalog)
    }

    /// Parse a JSON array of program documents.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| SchemaError::Malformed(e.to_string()))?;
        let documents = match value {
            Value::Array(documents) => documents,
            other => vec![other],
        };

        let programs = documents
            .into_iter()
            .map(RequirementBlock::parse_program)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(programs)
    }

    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Add a program, replacing any existing program with the same title.
    pub fn insert(&mut self, program: RequirementBlock) -> Result<(), CatalogError> {
        if program.block_type() != super::BlockType::Program {
            return Err(SchemaError::NotAProgram(program.block_type()).into());
        }

        let key = normalize_title(program.name());
        match self.index.get(&key) {
            Some(&slot) => self.programs[slot] = program,
            None => {
                self.index.insert(key, self.programs.len());
                self.programs.push(program);
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

impl ProgramCatalog for StaticCatalog {
    fn lookup(&self, title: &str) -> Option<RequirementBlock> {
        self.index
            .get(&normalize_title(title))
            .map(|&slot| self.programs[slot].clone())
    }

    fn titles(&self) -> Vec<String> {
        self.programs.iter().map(|p| p.name().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::BlockType;
    use std::io::Write;

    #[test]
    fn test_builtin_catalog_parses() {
        let catalog = StaticCatalog::from_json_str(BUILTIN_PROGRAMS).unwrap();
        assert_eq!(
            catalog.titles(),
            vec![
                "Computer Science Major Concentration (B.A.)",
                "Economics Major Concentration (B.A.)",
                "Sociology - Major Concentration (B.A.)",
            ]
        );
    }

    #[test]
    fn test_lookup_ignores_case_and_whitespace() {
        let catalog = StaticCatalog::builtin();
        let program = catalog
            .lookup("  computer science major concentration (b.a.) ")
            .unwrap();
        assert_eq!(program.minimum_credit(), Some(36));

        let complementary = &program.children()[1];
        assert_eq!(complementary.block_type(), BlockType::Complementary);
        assert_eq!(complementary.children().len(), 4);
    }

    #[test]
    fn test_lookup_unknown_title() {
        assert!(StaticCatalog::builtin().lookup("Underwater Basket Weaving").is_none());
    }

    #[test]
    fn test_economics_complementary_has_no_groups() {
        let catalog = StaticCatalog::builtin();
        let econ = catalog.lookup("Economics Major Concentration (B.A.)").unwrap();
        let complementary = &econ.children()[1];
        assert!(complementary.courses().is_empty());
        assert!(complementary.children().is_empty());
        assert_eq!(complementary.details().len(), 3);
    }

    #[test]
    fn test_insert_replaces_same_title() {
        let mut catalog = StaticCatalog::builtin();
        let before = catalog.len();
        let replacement = RequirementBlock::builder(
            "Economics Major Concentration (B.A.)",
            BlockType::Program,
        )
        .minimum_credit(42)
        .build()
        .unwrap();

        catalog.insert(replacement).unwrap();

        assert_eq!(catalog.len(), before);
        let econ = catalog.lookup("Economics Major Concentration (B.A.)").unwrap();
        assert_eq!(econ.minimum_credit(), Some(42));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"name": "History Minor", "block_type": "PROGRAM", "minimum_credit": 18}}"#
        )
        .unwrap();

        let catalog = StaticCatalog::from_file(file.path()).unwrap();
        assert_eq!(catalog.titles(), vec!["History Minor"]);
    }

    #[test]
    fn test_rejects_non_program_documents() {
        let err = StaticCatalog::from_json_str(
            r#"[{"name": "Required Courses", "block_type": "REQUIRED"}]"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Schema(SchemaError::NotAProgram(BlockType::Required))
        ));
    }
}
