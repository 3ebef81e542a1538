//! Model declaration types (JSON or code) and their described, runtime form.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Conventional tag names. The engine only matches them; it assigns them no meaning.
pub mod tags {
    /// Field belongs to the create payload.
    pub const CREATE_INPUT: &str = "create-input";
    /// Field is part of read responses (include-mode output).
    pub const READ_OUTPUT: &str = "read-output";
    /// Field is hidden from read responses (exclude-mode output).
    pub const READ_OUTPUT_EXCLUDE: &str = "read-output-exclude";
    /// Field may be used as a list filter.
    pub const FILTERABLE: &str = "filterable";
    /// Field may be changed by update.
    pub const UPDATE_INPUT: &str = "update-input";
}

pub type TagName = String;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[serde(alias = "integer")]
    Int,
    #[serde(alias = "number")]
    Float,
    #[serde(alias = "str")]
    String,
    #[serde(alias = "boolean")]
    Bool,
    DateTime,
    Uuid,
    List,
    Object,
    Any,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::String => "string",
            FieldType::Bool => "bool",
            FieldType::DateTime => "datetime",
            FieldType::Uuid => "uuid",
            FieldType::List => "list",
            FieldType::Object => "object",
            FieldType::Any => "any",
        }
    }
}

/// Simple per-field constraints checked on inbound payloads.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

/// Which tags drive output derivation. Exclude-mode wins whenever any field carries `exclude_tag`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTags {
    #[serde(default = "default_include_tag")]
    pub include_tag: TagName,
    #[serde(default = "default_exclude_tag")]
    pub exclude_tag: TagName,
}

fn default_include_tag() -> TagName {
    tags::READ_OUTPUT.to_string()
}

fn default_exclude_tag() -> TagName {
    tags::READ_OUTPUT_EXCLUDE.to_string()
}

impl Default for OutputTags {
    fn default() -> Self {
        OutputTags {
            include_tag: default_include_tag(),
            exclude_tag: default_exclude_tag(),
        }
    }
}

/// One field as declared.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: FieldType,
    #[serde(default)]
    pub tags: Vec<TagName>,
    /// Defaults to true unless the field is nullable or declares a default.
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub rules: Option<FieldRule>,
}

impl FieldConfig {
    pub fn new(name: impl Into<String>, type_: FieldType) -> Self {
        FieldConfig {
            name: name.into(),
            type_,
            tags: Vec::new(),
            required: None,
            nullable: false,
            default: None,
            rules: None,
        }
    }

    pub fn tag(mut self, tag: impl Into<TagName>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TagName>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn rules(mut self, rules: FieldRule) -> Self {
        self.rules = Some(rules);
        self
    }
}

/// One base model as declared.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    #[serde(default)]
    pub output: Option<OutputTags>,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

impl ModelConfig {
    pub fn new(name: impl Into<String>) -> Self {
        ModelConfig {
            name: name.into(),
            output: None,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldConfig) -> Self {
        self.fields.push(field);
        self
    }

    pub fn output_tags(mut self, output: OutputTags) -> Self {
        self.output = Some(output);
        self
    }
}

/// A described field. Tags are fixed once the model is described.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub declared_type: FieldType,
    pub tags: BTreeSet<TagName>,
    pub is_required: bool,
    pub nullable: bool,
    pub default: Option<Value>,
    pub rules: Option<FieldRule>,
}

impl FieldDescriptor {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// A described base model: fields in declaration order.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelDescriptor {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
    pub output: OutputTags,
}

impl ModelDescriptor {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}
