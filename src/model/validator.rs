//! Model well-formedness: identifiers, unique fields, defaults that fit their declared type.

use crate::case::is_identifier;
use crate::error::GenerationError;
use crate::model::{FieldDescriptor, FieldRule, ModelConfig, ModelDescriptor};
use crate::value::matches_type;
use regex::Regex;
use std::collections::HashSet;

/// Validate a declaration before it is described.
pub fn validate(config: &ModelConfig) -> Result<(), GenerationError> {
    if config.name.trim().is_empty() {
        return Err(GenerationError::invalid("<unnamed>", "model name is empty"));
    }
    for f in &config.fields {
        if f.required == Some(true) && f.default.is_some() {
            return Err(GenerationError::invalid(
                &config.name,
                format!("field '{}' is required but declares a default", f.name),
            ));
        }
        if f.tags.iter().any(|t| t.trim().is_empty()) {
            return Err(GenerationError::invalid(
                &config.name,
                format!("field '{}' has an empty tag", f.name),
            ));
        }
    }
    check_fields(
        &config.name,
        config.fields.iter().map(|f| FieldDescriptorView {
            name: &f.name,
            type_ok: f
                .default
                .as_ref()
                .map(|d| (d.is_null() && f.nullable) || matches_type(d, f.type_))
                .unwrap_or(true),
            rules: f.rules.as_ref(),
        }),
    )
}

/// Re-check a descriptor that may have been assembled by hand.
pub fn check_descriptor(model: &ModelDescriptor) -> Result<(), GenerationError> {
    if model.name.trim().is_empty() {
        return Err(GenerationError::invalid("<unnamed>", "model name is empty"));
    }
    check_fields(&model.name, model.fields.iter().map(FieldDescriptorView::from))
}

struct FieldDescriptorView<'a> {
    name: &'a str,
    type_ok: bool,
    rules: Option<&'a FieldRule>,
}

impl<'a> From<&'a FieldDescriptor> for FieldDescriptorView<'a> {
    fn from(f: &'a FieldDescriptor) -> Self {
        FieldDescriptorView {
            name: &f.name,
            type_ok: f
                .default
                .as_ref()
                .map(|d| (d.is_null() && f.nullable) || matches_type(d, f.declared_type))
                .unwrap_or(true),
            rules: f.rules.as_ref(),
        }
    }
}

fn check_fields<'a>(
    model: &str,
    fields: impl Iterator<Item = FieldDescriptorView<'a>>,
) -> Result<(), GenerationError> {
    if !is_identifier(model) {
        return Err(GenerationError::invalid(model, "model name is not an identifier"));
    }
    let mut seen = HashSet::new();
    for f in fields {
        if !is_identifier(f.name) {
            return Err(GenerationError::invalid(
                model,
                format!("field name '{}' is not an identifier", f.name),
            ));
        }
        if !seen.insert(f.name) {
            return Err(GenerationError::invalid(model, format!("duplicate field '{}'", f.name)));
        }
        if !f.type_ok {
            return Err(GenerationError::invalid(
                model,
                format!("default of field '{}' does not match its type", f.name),
            ));
        }
        if let Some(pattern) = f.rules.and_then(|r| r.pattern.as_deref()) {
            Regex::new(pattern).map_err(|e| {
                GenerationError::invalid(model, format!("field '{}' pattern: {}", f.name, e))
            })?;
        }
    }
    Ok(())
}
