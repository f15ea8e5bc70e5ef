//! Requirement block tree and its document representation.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::transcript::CourseKey;

/// Errors raised while turning a requirement document into a tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("malformed requirement document: {0}")]
    Malformed(String),

    #[error("unknown block type '{0}'")]
    UnknownBlockType(String),

    #[error("block '{parent}' ({parent_type}) cannot contain {child_type} block '{child}'")]
    InvalidNesting {
        parent: String,
        parent_type: BlockType,
        child: String,
        child_type: BlockType,
    },

    #[error("expected a PROGRAM block at the root, found {0}")]
    NotAProgram(BlockType),

    #[error("block name must not be empty")]
    EmptyName,
}

/// Kind of a requirement block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockType {
    Program,
    Required,
    Complementary,
    Custom,
}

impl BlockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Program => "PROGRAM",
            BlockType::Required => "REQUIRED",
            BlockType::Complementary => "COMPLEMENTARY",
            BlockType::Custom => "CUSTOM",
        }
    }

    /// Whether a block of this type may directly contain a block of type `child`.
    ///
    /// PROGRAM holds REQUIRED and COMPLEMENTARY blocks, COMPLEMENTARY holds CUSTOM
    /// groups, and REQUIRED / CUSTOM blocks are leaves.
    pub fn allows_child(&self, child: BlockType) -> bool {
        matches!(
            (self, child),
            (BlockType::Program, BlockType::Required)
                | (BlockType::Program, BlockType::Complementary)
                | (BlockType::Complementary, BlockType::Custom)
        )
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PROGRAM" => Ok(BlockType::Program),
            "REQUIRED" => Ok(BlockType::Required),
            "COMPLEMENTARY" => Ok(BlockType::Complementary),
            "CUSTOM" => Ok(BlockType::Custom),
            _ => Err(SchemaError::UnknownBlockType(s.to_string())),
        }
    }
}

/// A `(subject_code, course_code, credit)` triple as it appears in program
/// documents and reports. Serialized as a three-element array.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CourseRef {
    pub subject_code: String,
    pub course_code: String,
    pub credit: String,
}

impl CourseRef {
    pub fn new(
        subject_code: impl Into<String>,
        course_code: impl Into<String>,
        credit: impl Into<String>,
    ) -> Self {
        Self {
            subject_code: subject_code.into().trim().to_string(),
            course_code: course_code.into().trim().to_string(),
            credit: credit.into().trim().to_string(),
        }
    }

    pub fn key(&self) -> CourseKey {
        CourseKey::new(&self.subject_code, &self.course_code)
    }
}

impl fmt::Display for CourseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.subject_code, self.course_code)
    }
}

impl Serialize for CourseRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.subject_code, &self.course_code, &self.credit).serialize(serializer)
    }
}

/// Documents carry credits and codes as strings or bare numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Number(n) => n.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CourseRefRepr {
    Triple(Vec<Scalar>),
    Object {
        subject_code: Scalar,
        course_code: Scalar,
        credit: Scalar,
    },
}

impl<'de> Deserialize<'de> for CourseRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match CourseRefRepr::deserialize(deserializer)? {
            CourseRefRepr::Triple(parts) => {
                let len = parts.len();
                let mut parts = parts.into_iter().map(Scalar::into_string);
                match (parts.next(), parts.next(), parts.next(), parts.next()) {
                    (Some(subject), Some(code), Some(credit), None) => {
                        Ok(CourseRef::new(subject, code, credit))
                    }
                    _ => Err(de::Error::invalid_length(
                        len,
                        &"a [subject_code, course_code, credit] triple",
                    )),
                }
            }
            CourseRefRepr::Object {
                subject_code,
                course_code,
                credit,
            } => Ok(CourseRef::new(
                subject_code.into_string(),
                course_code.into_string(),
                credit.into_string(),
            )),
        }
    }
}

/// Treats an explicit `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Loosely-typed shape of a requirement document, before validation.
#[derive(Debug, Deserialize)]
struct BlockDocument {
    name: String,
    #[serde(default)]
    minimum_credit: Option<u32>,
    block_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    details: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    courses: Vec<CourseRef>,
    #[serde(default, alias = "children", deserialize_with = "null_as_default")]
    blocks: Vec<BlockDocument>,
}

fn is_empty_slice<T>(items: &&[T]) -> bool {
    items.is_empty()
}

/// Compact outgoing shape: CUSTOM blocks drop `minimum_credit`, empty lists are omitted.
#[derive(Serialize)]
struct BlockDocumentRef<'a> {
    name: &'a str,
    block_type: BlockType,
    #[serde(skip_serializing_if = "Option::is_none")]
    minimum_credit: Option<u32>,
    #[serde(skip_serializing_if = "is_empty_slice")]
    details: &'a [String],
    #[serde(skip_serializing_if = "is_empty_slice")]
    courses: &'a [CourseRef],
    #[serde(skip_serializing_if = "is_empty_slice")]
    blocks: &'a [RequirementBlock],
}

/// One node of a program's requirement tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementBlock {
    name: String,
    minimum_credit: Option<u32>,
    block_type: BlockType,
    details: Vec<String>,
    courses: Vec<CourseRef>,
    children: Vec<RequirementBlock>,
}

impl RequirementBlock {
    pub fn builder(name: impl Into<String>, block_type: BlockType) -> RequirementBlockBuilder {
        RequirementBlockBuilder {
            name: name.into(),
            block_type,
            minimum_credit: None,
            details: Vec::new(),
            courses: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Parse any requirement document (root of any type).
    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        let document: BlockDocument =
            serde_json::from_value(value).map_err(|e| SchemaError::Malformed(e.to_string()))?;
        Self::from_document(document)
    }

    /// Parse a document that must describe a whole program.
    pub fn parse_program(value: Value) -> Result<Self, SchemaError> {
        let block = Self::from_value(value)?;
        if block.block_type != BlockType::Program {
            return Err(SchemaError::NotAProgram(block.block_type));
        }
        Ok(block)
    }

    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| SchemaError::Malformed(e.to_string()))?;
        Self::from_value(value)
    }

    /// The document form of this tree.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    fn from_document(document: BlockDocument) -> Result<Self, SchemaError> {
        let block_type: BlockType = document.block_type.parse()?;
        let children = document
            .blocks
            .into_iter()
            .map(Self::from_document)
            .collect::<Result<Vec<_>, _>>()?;

        Self::assemble(
            document.name,
            block_type,
            document.minimum_credit,
            document.details,
            document.courses,
            children,
        )
    }

    fn assemble(
        name: String,
        block_type: BlockType,
        minimum_credit: Option<u32>,
        details: Vec<String>,
        courses: Vec<CourseRef>,
        children: Vec<RequirementBlock>,
    ) -> Result<Self, SchemaError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(SchemaError::EmptyName);
        }

        if let Some(child) = children
            .iter()
            .find(|child| !block_type.allows_child(child.block_type))
        {
            return Err(SchemaError::InvalidNesting {
                parent: name,
                parent_type: block_type,
                child: child.name.clone(),
                child_type: child.block_type,
            });
        }

        // CUSTOM groups carry their credit rules in the parent's details.
        let minimum_credit = match block_type {
            BlockType::Custom => None,
            _ => minimum_credit,
        };

        Ok(Self {
            name,
            minimum_credit,
            block_type,
            details,
            courses,
            children,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn block_type(&self) -> BlockType {
        self.block_type
    }

    pub fn minimum_credit(&self) -> Option<u32> {
        self.minimum_credit
    }

    pub fn details(&self) -> &[String] {
        &self.details
    }

    pub fn courses(&self) -> &[CourseRef] {
        &self.courses
    }

    pub fn children(&self) -> &[RequirementBlock] {
        &self.children
    }

    /// Whether this block's own course list names the course.
    pub fn lists_course(&self, key: &CourseKey) -> bool {
        self.courses.iter().any(|c| &c.key() == key)
    }

    /// Depth-first, pre-order walk over this block and all descendants.
    pub fn iter(&self) -> impl Iterator<Item = &RequirementBlock> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let block = stack.pop()?;
            stack.extend(block.children.iter().rev());
            Some(block)
        })
    }
}

impl Serialize for RequirementBlock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        BlockDocumentRef {
            name: &self.name,
            block_type: self.block_type,
            minimum_credit: self.minimum_credit,
            details: &self.details,
            courses: &self.courses,
            blocks: &self.children,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RequirementBlock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let document = BlockDocument::deserialize(deserializer)?;
        Self::from_document(document).map_err(de::Error::custom)
    }
}

/// Builds a validated [`RequirementBlock`] in code.
#[derive(Debug, Clone)]
pub struct RequirementBlockBuilder {
    name: String,
    block_type: BlockType,
    minimum_credit: Option<u32>,
    details: Vec<String>,
    courses: Vec<CourseRef>,
    children: Vec<RequirementBlock>,
}

impl RequirementBlockBuilder {
    pub fn minimum_credit(mut self, credits: u32) -> Self {
        self.minimum_credit = Some(credits);
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.details.push(detail.into());
        self
    }

    pub fn course(
        mut self,
        subject_code: impl Into<String>,
        course_code: impl Into<String>,
        credit: impl Into<String>,
    ) -> Self {
        self.courses
            .push(CourseRef::new(subject_code, course_code, credit));
        self
    }

    pub fn child(mut self, child: RequirementBlock) -> Self {
        self.children.push(child);
        self
    }

    pub fn build(self) -> Result<RequirementBlock, SchemaError> {
        RequirementBlock::assemble(
            self.name,
            self.block_type,
            self.minimum_credit,
            self.details,
            self.courses,
            self.children,
        )
    }
}
