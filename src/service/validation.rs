//! Payload validation against a derived model's field list.

use crate::error::{AppError, ValidationErrors};
use crate::model::{DerivedModel, FieldDescriptor, FieldRule, FieldType};
use crate::value::{matches_type, value_eq};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// How absent fields are treated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidationMode {
    /// Absent fields take their default; absent required fields fail.
    Full,
    /// Only fields present in the payload are kept (update bodies).
    Partial,
}

pub struct PayloadValidator;

impl PayloadValidator {
    /// Validate `body` against `model`, returning the accepted fields in model order.
    /// Keys the model does not declare are dropped.
    pub fn validate(
        model: &DerivedModel,
        body: &Map<String, Value>,
        mode: ValidationMode,
    ) -> Result<Map<String, Value>, AppError> {
        let mut errors = ValidationErrors::default();
        let mut out = Map::new();
        for field in &model.fields {
            match body.get(&field.name) {
                Some(Value::Null) if field.nullable => {
                    out.insert(field.name.clone(), Value::Null);
                }
                None | Some(Value::Null) => {
                    if mode == ValidationMode::Partial {
                        continue;
                    }
                    if let Some(default) = &field.default {
                        out.insert(field.name.clone(), default.clone());
                    } else if field.is_required && !model.all_fields_optional {
                        errors.push(&field.name, "is required");
                    }
                }
                Some(v) => {
                    if !matches_type(v, field.declared_type) {
                        errors.push(&field.name, format!("must be of type {}", field.declared_type.as_str()));
                        continue;
                    }
                    if let Some(rule) = &field.rules {
                        check_rule(&field.name, v, rule, &mut errors);
                    }
                    out.insert(field.name.clone(), v.clone());
                }
            }
        }
        if errors.is_empty() {
            Ok(out)
        } else {
            Err(AppError::Validation(errors))
        }
    }

    /// Validate query-string parameters: text is coerced per field type, then only the supplied
    /// fields are checked. Defaults are never applied, so an absent parameter constrains nothing.
    /// Returns the filter map with null entries removed.
    pub fn validate_query(
        model: &DerivedModel,
        params: &HashMap<String, String>,
    ) -> Result<Map<String, Value>, AppError> {
        let mut errors = ValidationErrors::default();
        let mut body = Map::new();
        for field in &model.fields {
            let Some(raw) = params.get(&field.name) else { continue };
            match coerce_text(raw, field) {
                Some(v) => {
                    body.insert(field.name.clone(), v);
                }
                None => errors.push(&field.name, format!("must be of type {}", field.declared_type.as_str())),
            }
        }
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }
        let mut filter = Self::validate(model, &body, ValidationMode::Partial)?;
        filter.retain(|_, v| !v.is_null());
        Ok(filter)
    }
}

/// Coerce one query-string value to the field's JSON type.
fn coerce_text(s: &str, field: &FieldDescriptor) -> Option<Value> {
    if field.nullable && s.eq_ignore_ascii_case("null") {
        return Some(Value::Null);
    }
    match field.declared_type {
        FieldType::Int => s.trim().parse::<i64>().ok().map(|n| Value::Number(n.into())),
        FieldType::Float => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        FieldType::Bool => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(Value::Bool(true)),
            "false" | "0" | "no" | "off" => Some(Value::Bool(false)),
            _ => None,
        },
        FieldType::String | FieldType::DateTime | FieldType::Uuid => Some(Value::String(s.to_string())),
        FieldType::List | FieldType::Object => serde_json::from_str(s).ok(),
        FieldType::Any => Some(serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string()))),
    }
}

fn check_rule(col: &str, v: &Value, rule: &FieldRule, errors: &mut ValidationErrors) {
    if let Some(format) = &rule.format {
        check_format(col, v, format, errors);
    }
    if let (Some(max), Some(s)) = (rule.max_length, v.as_str()) {
        if s.chars().count() > max as usize {
            errors.push(col, format!("must be at most {} characters", max));
        }
    }
    if let (Some(min), Some(s)) = (rule.min_length, v.as_str()) {
        if s.chars().count() < min as usize {
            errors.push(col, format!("must be at least {} characters", min));
        }
    }
    if let (Some(pattern), Some(s)) = (rule.pattern.as_deref(), v.as_str()) {
        match Regex::new(pattern) {
            Ok(re) if !re.is_match(s) => errors.push(col, "does not match required pattern"),
            Ok(_) => {}
            Err(_) => errors.push(col, "has an invalid pattern"),
        }
    }
    if let Some(allowed) = &rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            errors.push(
                col,
                format!("must be one of: {:?}", allowed.iter().take(5).collect::<Vec<_>>()),
            );
        }
    }
    if let (Some(min), Some(n)) = (rule.minimum, v.as_f64()) {
        if n < min {
            errors.push(col, format!("must be at least {}", min));
        }
    }
    if let (Some(max), Some(n)) = (rule.maximum, v.as_f64()) {
        if n > max {
            errors.push(col, format!("must be at most {}", max));
        }
    }
}

fn check_format(col: &str, v: &Value, format: &str, errors: &mut ValidationErrors) {
    let Some(s) = v.as_str() else { return };
    match format.to_lowercase().as_str() {
        "email" => {
            if !s.contains('@') || s.len() < 3 {
                errors.push(col, "must be a valid email");
            }
        }
        "uuid" => {
            if uuid::Uuid::parse_str(s).is_err() {
                errors.push(col, "must be a valid UUID");
            }
        }
        _ => {}
    }
}
