//! Field tag registry: describes declared models and answers tag queries over their fields.

use crate::error::GenerationError;
use crate::model::{validate, FieldDescriptor, ModelConfig, ModelDescriptor};
use std::collections::HashMap;
use std::sync::Arc;

/// Describe a declared model. Field order is declaration order; tags are deduplicated.
pub fn describe(config: &ModelConfig) -> Result<ModelDescriptor, GenerationError> {
    validate(config)?;
    let fields = config
        .fields
        .iter()
        .map(|f| FieldDescriptor {
            name: f.name.clone(),
            declared_type: f.type_,
            tags: f.tags.iter().map(|t| t.trim().to_string()).collect(),
            is_required: f
                .required
                .unwrap_or(f.default.is_none() && !f.nullable),
            nullable: f.nullable,
            default: f.default.clone(),
            rules: f.rules.clone(),
        })
        .collect();
    Ok(ModelDescriptor {
        name: config.name.clone(),
        fields,
        output: config.output.clone().unwrap_or_default(),
    })
}

/// Names of fields carrying `tag`, in declaration order.
pub fn fields_with_tag(model: &ModelDescriptor, tag: &str) -> Vec<String> {
    model
        .fields
        .iter()
        .filter(|f| f.has_tag(tag))
        .map(|f| f.name.clone())
        .collect()
}

/// Names of fields not carrying `tag`, in declaration order.
pub fn fields_without_tag(model: &ModelDescriptor, tag: &str) -> Vec<String> {
    model
        .fields
        .iter()
        .filter(|f| !f.has_tag(tag))
        .map(|f| f.name.clone())
        .collect()
}

pub fn has_any_field_with_tag(model: &ModelDescriptor, tag: &str) -> bool {
    model.fields.iter().any(|f| f.has_tag(tag))
}

/// Described models for one generation pass, read-only once built.
#[derive(Clone, Debug, Default)]
pub struct ModelRegistry {
    by_name: HashMap<String, Arc<ModelDescriptor>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Describe and register a model. A second model with the same name is rejected.
    pub fn register(&mut self, config: &ModelConfig) -> Result<Arc<ModelDescriptor>, GenerationError> {
        let described = Arc::new(describe(config)?);
        if self.by_name.contains_key(&described.name) {
            return Err(GenerationError::invalid(&described.name, "model declared twice"));
        }
        self.by_name.insert(described.name.clone(), described.clone());
        Ok(described)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{tags, FieldConfig, FieldRule, FieldType};
    use serde_json::json;

    fn order() -> ModelConfig {
        ModelConfig::new("Order")
            .field(FieldConfig::new("id", FieldType::Int).tag(tags::READ_OUTPUT))
            .field(
                FieldConfig::new("customer", FieldType::String)
                    .tags([tags::CREATE_INPUT, tags::READ_OUTPUT, tags::FILTERABLE]),
            )
            .field(
                FieldConfig::new("status", FieldType::String)
                    .tags([tags::CREATE_INPUT, tags::READ_OUTPUT, tags::UPDATE_INPUT]),
            )
    }

    #[test]
    fn describe_keeps_declaration_order_and_tags() {
        let m = describe(&order()).unwrap();
        let names: Vec<&str> = m.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "customer", "status"]);
        assert!(m.fields[1].has_tag(tags::FILTERABLE));
        assert!(!m.fields[0].has_tag(tags::CREATE_INPUT));
        assert!(m.fields.iter().all(|f| f.is_required));
    }

    #[test]
    fn required_defaults_follow_default_and_nullable() {
        let m = describe(
            &ModelConfig::new("Note")
                .field(FieldConfig::new("title", FieldType::String))
                .field(FieldConfig::new("pinned", FieldType::Bool).default_value(json!(false)))
                .field(FieldConfig::new("body", FieldType::String).nullable())
                .field(FieldConfig::new("rank", FieldType::Int).required(false)),
        )
        .unwrap();
        let required: Vec<bool> = m.fields.iter().map(|f| f.is_required).collect();
        assert_eq!(required, vec![true, false, false, false]);
    }

    #[test]
    fn tag_accessors() {
        let m = describe(&order()).unwrap();
        assert_eq!(fields_with_tag(&m, tags::CREATE_INPUT), vec!["customer", "status"]);
        assert_eq!(fields_without_tag(&m, tags::CREATE_INPUT), vec!["id"]);
        assert!(has_any_field_with_tag(&m, tags::UPDATE_INPUT));
        assert!(!has_any_field_with_tag(&m, tags::READ_OUTPUT_EXCLUDE));
    }

    #[test]
    fn malformed_models_are_rejected() {
        let dup = ModelConfig::new("Order")
            .field(FieldConfig::new("id", FieldType::Int))
            .field(FieldConfig::new("id", FieldType::String));
        assert!(matches!(describe(&dup), Err(GenerationError::InvalidModel { .. })));

        let bad_name = ModelConfig::new("Order Item");
        assert!(describe(&bad_name).is_err());

        let bad_default = ModelConfig::new("Order")
            .field(FieldConfig::new("qty", FieldType::Int).default_value(json!("one")));
        assert!(describe(&bad_default).is_err());

        let required_with_default = ModelConfig::new("Order").field(
            FieldConfig::new("qty", FieldType::Int)
                .required(true)
                .default_value(json!(1)),
        );
        assert!(describe(&required_with_default).is_err());

        let bad_pattern = ModelConfig::new("Order").field(
            FieldConfig::new("code", FieldType::String).rules(FieldRule {
                pattern: Some("([a-z".into()),
                ..FieldRule::default()
            }),
        );
        assert!(describe(&bad_pattern).is_err());
    }

    #[test]
    fn registry_rejects_second_declaration() {
        let mut registry = ModelRegistry::new();
        registry.register(&order()).unwrap();
        assert!(registry.register(&order()).is_err());
        assert!(registry.register(&ModelConfig::new("Invoice").field(FieldConfig::new("id", FieldType::Int))).is_ok());
    }
}
