//! Derived models: tag-selected projections of a base model used as request and response shapes.

use crate::error::GenerationError;
use crate::model::{
    check_descriptor, fields_with_tag, fields_without_tag, has_any_field_with_tag, tags, FieldDescriptor,
    ModelDescriptor,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A named projection of a base model. Fields are copies; the base model is referenced by name only.
#[derive(Clone, Debug, PartialEq)]
pub struct DerivedModel {
    pub name: String,
    pub source_model: String,
    pub fields: Vec<FieldDescriptor>,
    pub all_fields_optional: bool,
}

impl DerivedModel {
    /// A model with no fields, for variants whose tag matched nothing.
    pub fn empty(name: impl Into<String>, source_model: &str, all_fields_optional: bool) -> Self {
        DerivedModel {
            name: name.into(),
            source_model: source_model.to_string(),
            fields: Vec::new(),
            all_fields_optional,
        }
    }

    /// Every field of the base model, unchanged.
    pub fn whole(name: impl Into<String>, base: &ModelDescriptor) -> Self {
        DerivedModel {
            name: name.into(),
            source_model: base.name.clone(),
            fields: base.fields.clone(),
            all_fields_optional: false,
        }
    }

    pub fn included_fields(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Keep only this model's fields of `record`, in model order.
    pub fn project(&self, record: &Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::new();
        for f in &self.fields {
            if let Some(v) = record.get(&f.name) {
                out.insert(f.name.clone(), v.clone());
            }
        }
        out
    }
}

#[derive(Clone, Debug, Default)]
pub struct DeriveOptions {
    pub reverse: bool,
    pub name_suffix: String,
    pub all_optional: bool,
}

impl DeriveOptions {
    pub fn suffix(suffix: &str) -> Self {
        DeriveOptions {
            name_suffix: suffix.to_string(),
            ..Self::default()
        }
    }

    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    pub fn all_optional(mut self) -> Self {
        self.all_optional = true;
        self
    }

}

/// Project `model` onto the fields that carry `tag` (or, reversed, that do not).
///
/// Returns `Ok(None)` when nothing matches: callers skip that aspect, it is not an error.
/// With `all_optional`, every copied field becomes optional; type and default are kept.
pub fn derive(
    model: &ModelDescriptor,
    tag: &str,
    opts: &DeriveOptions,
) -> Result<Option<DerivedModel>, GenerationError> {
    check_descriptor(model)?;
    let selected = if opts.reverse {
        fields_without_tag(model, tag)
    } else {
        fields_with_tag(model, tag)
    };
    if selected.is_empty() {
        return Ok(None);
    }
    let fields = model
        .fields
        .iter()
        .filter(|f| selected.contains(&f.name))
        .map(|f| {
            let mut copy = f.clone();
            if opts.all_optional {
                copy.is_required = false;
            }
            copy
        })
        .collect();
    Ok(Some(DerivedModel {
        name: format!("{}{}", model.name, opts.name_suffix),
        source_model: model.name.clone(),
        fields,
        all_fields_optional: opts.all_optional,
    }))
}

type CacheKey = (String, String, bool, bool);

/// Derived models built once per `(model, tag, reverse, all_optional)` and shared afterwards.
#[derive(Default)]
pub struct VariantCache {
    entries: Mutex<HashMap<CacheKey, Option<Arc<DerivedModel>>>>,
}

impl VariantCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_derive(
        &self,
        model: &ModelDescriptor,
        tag: &str,
        opts: &DeriveOptions,
    ) -> Result<Option<Arc<DerivedModel>>, GenerationError> {
        let key = (model.name.clone(), tag.to_string(), opts.reverse, opts.all_optional);
        if let Some(hit) = self.lookup(&key) {
            return Ok(hit);
        }
        let derived = derive(model, tag, opts)?.map(Arc::new);
        if let Ok(mut entries) = self.entries.lock() {
            entries.entry(key).or_insert_with(|| derived.clone());
        }
        Ok(derived)
    }

    fn lookup(&self, key: &CacheKey) -> Option<Option<Arc<DerivedModel>>> {
        self.entries.lock().ok().and_then(|entries| entries.get(key).cloned())
    }

}

/// The four variants every resource needs, with fallbacks already applied.
#[derive(Clone, Debug)]
pub struct ResourceModels {
    pub base: Arc<ModelDescriptor>,
    pub input: Arc<DerivedModel>,
    pub output: Arc<DerivedModel>,
    pub query: Arc<DerivedModel>,
    pub update: Arc<DerivedModel>,
}

impl ResourceModels {
    pub fn build(base: Arc<ModelDescriptor>, cache: &VariantCache) -> Result<Self, GenerationError> {
        let name = base.name.as_str();
        let input = cache
            .get_or_derive(&base, tags::CREATE_INPUT, &DeriveOptions::suffix("In"))?
            .unwrap_or_else(|| Arc::new(DerivedModel::empty(format!("{}In", name), name, false)));

        let exclude_tag = base.output.exclude_tag.as_str();
        let output = if has_any_field_with_tag(&base, exclude_tag) {
            cache.get_or_derive(&base, exclude_tag, &DeriveOptions::suffix("Out").reverse())?
        } else {
            cache.get_or_derive(&base, &base.output.include_tag, &DeriveOptions::suffix("Out"))?
        };
        let output =
            output.unwrap_or_else(|| Arc::new(DerivedModel::whole(format!("{}Out", name), &base)));

        let query = cache
            .get_or_derive(&base, tags::FILTERABLE, &DeriveOptions::suffix("Query").all_optional())?
            .unwrap_or_else(|| Arc::new(DerivedModel::empty(format!("{}Query", name), name, true)));
        let update = cache
            .get_or_derive(&base, tags::UPDATE_INPUT, &DeriveOptions::suffix("Update").all_optional())?
            .unwrap_or_else(|| Arc::new(DerivedModel::empty(format!("{}Update", name), name, true)));

        Ok(ResourceModels {
            base,
            input,
            output,
            query,
            update,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{describe, FieldConfig, FieldType, ModelConfig, OutputTags};
    use serde_json::json;

    fn user() -> ModelDescriptor {
        describe(
            &ModelConfig::new("User")
                .field(FieldConfig::new("id", FieldType::Int).tag(tags::READ_OUTPUT))
                .field(
                    FieldConfig::new("email", FieldType::String)
                        .tags([tags::CREATE_INPUT, tags::READ_OUTPUT, tags::FILTERABLE]),
                )
                .field(FieldConfig::new("password", FieldType::String).tag(tags::CREATE_INPUT))
                .field(
                    FieldConfig::new("role", FieldType::String)
                        .tags([tags::FILTERABLE, tags::UPDATE_INPUT, tags::READ_OUTPUT])
                        .default_value(json!("member")),
                ),
        )
        .unwrap()
    }

    #[test]
    fn derive_selects_tagged_fields_in_order() {
        let m = user();
        let d = derive(&m, tags::READ_OUTPUT, &DeriveOptions::suffix("Out")).unwrap().unwrap();
        assert_eq!(d.name, "UserOut");
        assert_eq!(d.source_model, "User");
        assert_eq!(d.included_fields(), vec!["id", "email", "role"]);
        assert!(!d.all_fields_optional);
    }

    #[test]
    fn reverse_yields_complement() {
        let m = user();
        let d = derive(&m, tags::FILTERABLE, &DeriveOptions::suffix("Rest").reverse())
            .unwrap()
            .unwrap();
        assert_eq!(d.included_fields(), vec!["id", "password"]);
    }

    #[test]
    fn empty_selection_is_none() {
        let m = user();
        assert!(derive(&m, "no-such-tag", &DeriveOptions::default()).unwrap().is_none());

        let everything = ModelConfig::new("Tiny")
            .field(FieldConfig::new("a", FieldType::Int).tag("x"))
            .field(FieldConfig::new("b", FieldType::Int).tag("x"));
        let tiny = describe(&everything).unwrap();
        assert!(derive(&tiny, "x", &DeriveOptions::default().reverse()).unwrap().is_none());
    }

    #[test]
    fn all_optional_relaxes_required_but_keeps_type_and_default() {
        let m = user();
        let d = derive(&m, tags::FILTERABLE, &DeriveOptions::suffix("Query").all_optional())
            .unwrap()
            .unwrap();
        assert!(d.all_fields_optional);
        assert!(d.fields.iter().all(|f| !f.is_required));
        let role = d.fields.iter().find(|f| f.name == "role").unwrap();
        assert_eq!(role.declared_type, FieldType::String);
        assert_eq!(role.default, Some(json!("member")));
        let email = d.fields.iter().find(|f| f.name == "email").unwrap();
        assert_eq!(email.declared_type, FieldType::String);
        assert_eq!(email.default, None);
        // the base model is untouched
        assert!(m.field("email").unwrap().is_required);
    }

    #[test]
    fn two_optional_variants_of_one_field_stay_independent() {
        let m = user();
        let query = derive(&m, tags::FILTERABLE, &DeriveOptions::suffix("Query").all_optional())
            .unwrap()
            .unwrap();
        let update = derive(&m, tags::UPDATE_INPUT, &DeriveOptions::suffix("Update").all_optional())
            .unwrap()
            .unwrap();
        let plain = derive(&m, tags::FILTERABLE, &DeriveOptions::suffix("Filter")).unwrap().unwrap();
        assert_eq!(query.fields[1].default, Some(json!("member")));
        assert_eq!(update.fields[0].default, Some(json!("member")));
        assert!(plain.fields[0].is_required);
    }

    #[test]
    fn derive_is_deterministic() {
        let m = user();
        let opts = DeriveOptions::suffix("In");
        assert_eq!(
            derive(&m, tags::CREATE_INPUT, &opts).unwrap(),
            derive(&m, tags::CREATE_INPUT, &opts).unwrap()
        );
    }

    #[test]
    fn derive_rejects_malformed_descriptor() {
        let mut m = user();
        m.fields.push(m.fields[0].clone());
        assert!(matches!(
            derive(&m, tags::READ_OUTPUT, &DeriveOptions::default()),
            Err(GenerationError::InvalidModel { .. })
        ));
    }

    #[test]
    fn cache_reuses_variants() {
        let m = user();
        let cache = VariantCache::new();
        let a = cache
            .get_or_derive(&m, tags::READ_OUTPUT, &DeriveOptions::suffix("Out"))
            .unwrap()
            .unwrap();
        let b = cache
            .get_or_derive(&m, tags::READ_OUTPUT, &DeriveOptions::suffix("Out"))
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        let missing = cache
            .get_or_derive(&m, "no-such-tag", &DeriveOptions::suffix("X"))
            .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn resource_models_use_exclude_mode_when_flagged() {
        let m = describe(
            &ModelConfig::new("Account")
                .field(FieldConfig::new("id", FieldType::Int))
                .field(FieldConfig::new("name", FieldType::String).tag(tags::CREATE_INPUT))
                .field(
                    FieldConfig::new("secret", FieldType::String)
                        .tags([tags::CREATE_INPUT, tags::READ_OUTPUT_EXCLUDE]),
                ),
        )
        .unwrap();
        let models = ResourceModels::build(Arc::new(m), &VariantCache::new()).unwrap();
        assert_eq!(models.output.included_fields(), vec!["id", "name"]);
        assert_eq!(models.input.included_fields(), vec!["name", "secret"]);
        assert!(models.query.is_empty());
        assert!(models.query.all_fields_optional);
        assert!(models.update.is_empty());
    }

    #[test]
    fn resource_models_honour_custom_output_tags() {
        let m = describe(
            &ModelConfig::new("Doc")
                .output_tags(OutputTags {
                    include_tag: "public".into(),
                    exclude_tag: "internal".into(),
                })
                .field(FieldConfig::new("id", FieldType::Int).tag("public"))
                .field(FieldConfig::new("body", FieldType::String)),
        )
        .unwrap();
        let models = ResourceModels::build(Arc::new(m), &VariantCache::new()).unwrap();
        assert_eq!(models.output.included_fields(), vec!["id"]);
    }

    #[test]
    fn untagged_output_falls_back_to_whole_model() {
        let m = describe(
            &ModelConfig::new("Raw")
                .field(FieldConfig::new("id", FieldType::Int))
                .field(FieldConfig::new("data", FieldType::Any)),
        )
        .unwrap();
        let models = ResourceModels::build(Arc::new(m), &VariantCache::new()).unwrap();
        assert_eq!(models.output.name, "RawOut");
        assert_eq!(models.output.included_fields(), vec!["id", "data"]);
        assert!(models.input.is_empty());
    }

    #[test]
    fn project_keeps_model_fields_only() {
        let m = user();
        let out = derive(&m, tags::READ_OUTPUT, &DeriveOptions::suffix("Out")).unwrap().unwrap();
        let record = json!({"id": 1, "email": "a@b.c", "password": "x", "role": "member"});
        let projected = out.project(record.as_object().unwrap());
        assert_eq!(Value::Object(projected), json!({"id": 1, "email": "a@b.c", "role": "member"}));
    }
}
