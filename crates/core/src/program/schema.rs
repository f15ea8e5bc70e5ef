use serde_json::{json, Value};

use super::block::RequirementBlock;

impl RequirementBlock {
    /// JSON schema of the requirement document, sent along with extraction tasks
    /// so the remote agent answers in the shape [`RequirementBlock::parse_program`]
    /// accepts.
    pub fn json_schema() -> Value {
        json!({
            "$defs": {
                "Block": {
                    "title": "Block",
                    "type": "object",
                    "properties": {
                        "name": {"title": "Name", "type": "string"},
                        "minimum_credit": {
                            "title": "Minimum Credit",
                            "anyOf": [{"type": "integer", "minimum": 0}, {"type": "null"}],
                            "description": "Omitted for CUSTOM blocks."
                        },
                        "block_type": {"$ref": "#/$defs/BlockType"},
                        "details": {
                            "title": "Details",
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "Rules stated for this block, verbatim."
                        },
                        "courses": {
                            "title": "Courses",
                            "type": "array",
                            "items": {
                                "type": "array",
                                "prefixItems": [
                                    {"type": "string", "description": "Subject code, e.g. COMP"},
                                    {"type": "string", "description": "Course code, e.g. 206"},
                                    {"type": "string", "description": "Credits, e.g. 3"}
                                ],
                                "minItems": 3,
                                "maxItems": 3
                            }
                        },
                        "blocks": {
                            "title": "Blocks",
                            "type": "array",
                            "items": {"$ref": "#/$defs/Block"}
                        }
                    },
                    "required": ["name", "block_type"]
                },
                "BlockType": {
                    "title": "BlockType",
                    "type": "string",
                    "enum": ["PROGRAM", "REQUIRED", "COMPLEMENTARY", "CUSTOM"],
                    "description": "PROGRAM contains REQUIRED and COMPLEMENTARY blocks; COMPLEMENTARY contains CUSTOM groups."
                }
            },
            "$ref": "#/$defs/Block"
        })
    }
}
