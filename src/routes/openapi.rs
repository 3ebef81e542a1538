//! OpenAPI 3.1 document for the generated endpoints.

use crate::model::{DerivedModel, FieldDescriptor, FieldType};
use crate::routes::resource::{Endpoint, GeneratedApi, Operation};
use axum::{http::Method, routing::get, Json, Router};
use std::collections::BTreeMap;
use std::sync::Arc;
use utoipa::openapi::{
    content::ContentBuilder,
    info::InfoBuilder,
    path::{HttpMethod, OperationBuilder, ParameterBuilder, ParameterIn, PathItemBuilder, PathsBuilder},
    request_body::RequestBodyBuilder,
    response::{ResponseBuilder, ResponsesBuilder},
    schema::{ArrayBuilder, ComponentsBuilder, KnownFormat, ObjectBuilder, Schema, SchemaFormat, SchemaType, Type},
    OpenApi, OpenApiBuilder, Ref, RefOr, Required,
};

const JSON: &str = "application/json";
const ERROR_SCHEMA: &str = "Error";

/// Build the document from the endpoint list; every derived model becomes a component schema.
pub fn build_openapi(api: &GeneratedApi, title: &str, version: &str) -> OpenApi {
    let mut items: BTreeMap<String, PathItemBuilder> = BTreeMap::new();
    let mut models: BTreeMap<String, Arc<DerivedModel>> = BTreeMap::new();

    for e in &api.endpoints {
        for m in [&e.request_model, &e.response_model].into_iter().flatten() {
            models.entry(m.name.clone()).or_insert_with(|| m.clone());
        }
        let item = items.remove(&e.path).unwrap_or_else(PathItemBuilder::new);
        items.insert(e.path.clone(), item.operation(http_method(&e.method), operation(e)));
    }

    let mut paths = PathsBuilder::new();
    for (path, item) in items {
        paths = paths.path(path, item.build());
    }

    let mut components = ComponentsBuilder::new().schema(ERROR_SCHEMA, error_schema());
    for (name, model) in &models {
        components = components.schema(name.clone(), model_schema(model));
    }

    tracing::debug!(endpoints = api.endpoints.len(), schemas = models.len(), "openapi built");
    OpenApiBuilder::new()
        .info(InfoBuilder::new().title(title).version(version).build())
        .paths(paths.build())
        .components(Some(components.build()))
        .build()
}

/// GET /openapi.json
pub fn openapi_routes(doc: OpenApi) -> Router {
    let doc = Arc::new(doc);
    Router::new().route(
        "/openapi.json",
        get(move || {
            let doc = doc.clone();
            async move { Json(doc.as_ref().clone()) }
        }),
    )
}

fn http_method(method: &Method) -> HttpMethod {
    match *method {
        Method::POST => HttpMethod::Post,
        Method::PUT => HttpMethod::Put,
        Method::DELETE => HttpMethod::Delete,
        Method::PATCH => HttpMethod::Patch,
        _ => HttpMethod::Get,
    }
}

fn schema_ref(name: &str) -> RefOr<Schema> {
    RefOr::Ref(Ref::from_schema_name(name))
}

fn json_response(description: &str, schema: impl Into<RefOr<Schema>>) -> utoipa::openapi::Response {
    ResponseBuilder::new()
        .description(description)
        .content(JSON, ContentBuilder::new().schema(Some(schema)).build())
        .build()
}

fn operation(e: &Endpoint) -> utoipa::openapi::path::Operation {
    let mut op = OperationBuilder::new()
        .operation_id(Some(format!("{}_{}", e.operation, e.resource)))
        .tag(e.resource.clone());

    if e.path.contains("{id}") {
        op = op.parameter(
            ParameterBuilder::new()
                .name("id")
                .parameter_in(ParameterIn::Path)
                .required(Required::True)
                .schema(Some(primitive(Type::Integer, Some(KnownFormat::Int64)))),
        );
    }
    if let Some(query) = &e.query_model {
        for f in &query.fields {
            op = op.parameter(
                ParameterBuilder::new()
                    .name(&f.name)
                    .parameter_in(ParameterIn::Query)
                    .required(Required::False)
                    .schema(Some(field_schema(f))),
            );
        }
    }
    if let Some(req) = &e.request_model {
        op = op.request_body(Some(
            RequestBodyBuilder::new()
                .content(JSON, ContentBuilder::new().schema(Some(schema_ref(&req.name))).build())
                .required(Some(Required::True))
                .build(),
        ));
    }

    let out = e.response_model.as_ref().map(|m| m.name.as_str());
    let error = || json_response("error", schema_ref(ERROR_SCHEMA));
    let mut responses = ResponsesBuilder::new();
    responses = match (e.operation, out) {
        (Operation::ReadOne, Some(out)) => responses
            .response("200", json_response("record", schema_ref(out)))
            .response("404", error()),
        (Operation::ReadMany, Some(out)) => responses
            .response(
                "200",
                json_response("matching records", Schema::Array(ArrayBuilder::new().items(schema_ref(out)).build())),
            )
            .response("422", error()),
        (Operation::Create, Some(out)) => responses
            .response("201", json_response("created record", schema_ref(out)))
            .response("422", error())
            .response("503", error()),
        (Operation::Update, _) => responses
            .response("200", json_response("updated", Schema::Object(ObjectBuilder::new().build())))
            .response("404", error())
            .response("422", error()),
        (Operation::Delete, _) => responses
            .response(
                "200",
                json_response(
                    "deleted id",
                    Schema::Object(
                        ObjectBuilder::new()
                            .property("id", primitive(Type::Integer, Some(KnownFormat::Int64)))
                            .required("id")
                            .build(),
                    ),
                ),
            )
            .response("404", error()),
        _ => responses,
    };
    op.responses(responses.build()).build()
}

fn primitive(t: Type, format: Option<KnownFormat>) -> Schema {
    Schema::Object(
        ObjectBuilder::new()
            .schema_type(SchemaType::Type(t))
            .format(format.map(SchemaFormat::KnownFormat))
            .build(),
    )
}

fn field_schema(f: &FieldDescriptor) -> Schema {
    let (t, format) = match f.declared_type {
        FieldType::Int => (Some(Type::Integer), Some(KnownFormat::Int64)),
        FieldType::Float => (Some(Type::Number), Some(KnownFormat::Double)),
        FieldType::String => (Some(Type::String), None),
        FieldType::Bool => (Some(Type::Boolean), None),
        FieldType::DateTime => (Some(Type::String), Some(KnownFormat::DateTime)),
        FieldType::Uuid => (Some(Type::String), Some(KnownFormat::Uuid)),
        FieldType::Object => (Some(Type::Object), None),
        FieldType::List => {
            let any = Schema::Object(ObjectBuilder::new().schema_type(SchemaType::AnyValue).build());
            return Schema::Array(ArrayBuilder::new().items(RefOr::T(any)).build());
        }
        FieldType::Any => (None, None),
    };
    let schema_type = match t {
        None => SchemaType::AnyValue,
        Some(t) if f.nullable => SchemaType::Array(vec![t, Type::Null]),
        Some(t) => SchemaType::Type(t),
    };
    let known_format = format.is_some();
    let mut obj = ObjectBuilder::new()
        .schema_type(schema_type)
        .format(format.map(SchemaFormat::KnownFormat))
        .default(f.default.clone());
    if let Some(rule) = &f.rules {
        if let (Some(custom), false) = (&rule.format, known_format) {
            obj = obj.format(Some(SchemaFormat::Custom(custom.clone())));
        }
        obj = obj
            .max_length(rule.max_length.map(|n| n as usize))
            .min_length(rule.min_length.map(|n| n as usize))
            .pattern(rule.pattern.clone())
            .enum_values(rule.allowed.clone())
            .minimum(rule.minimum)
            .maximum(rule.maximum);
    }
    Schema::Object(obj.build())
}

fn model_schema(model: &DerivedModel) -> Schema {
    let mut obj = ObjectBuilder::new()
        .schema_type(SchemaType::Type(Type::Object))
        .title(Some(model.name.clone()));
    for f in &model.fields {
        obj = obj.property(&f.name, field_schema(f));
        if f.is_required && f.default.is_none() && !model.all_fields_optional {
            obj = obj.required(&f.name);
        }
    }
    Schema::Object(obj.build())
}

fn error_schema() -> Schema {
    let detail = ObjectBuilder::new()
        .schema_type(SchemaType::Type(Type::Object))
        .property("code", primitive(Type::String, None))
        .property("message", primitive(Type::String, None))
        .property("details", Schema::Array(ArrayBuilder::new().items(RefOr::T(primitive(Type::Object, None))).build()))
        .required("code")
        .required("message")
        .build();
    Schema::Object(
        ObjectBuilder::new()
            .schema_type(SchemaType::Type(Type::Object))
            .property("error", Schema::Object(detail))
            .required("error")
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{tags, FieldConfig, ModelConfig};
    use crate::routes::ApiGenerator;
    use crate::store::MemoryStore;
    use serde_json::{json, Value};

    fn document() -> Value {
        let api = ApiGenerator::new(Arc::new(MemoryStore::new())).generate([ModelConfig::new("Order")
            .field(FieldConfig::new("id", FieldType::Int).tag(tags::READ_OUTPUT))
            .field(
                FieldConfig::new("customer", FieldType::String)
                    .tags([tags::CREATE_INPUT, tags::READ_OUTPUT, tags::FILTERABLE]),
            )
            .field(FieldConfig::new("note", FieldType::String).nullable().tag(tags::UPDATE_INPUT))]);
        serde_json::to_value(build_openapi(&api, "orders", "1.0.0")).unwrap()
    }

    #[test]
    fn every_endpoint_is_documented() {
        let doc = document();
        let paths = doc["paths"].as_object().unwrap();
        let mut keys: Vec<&str> = paths.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["/order", "/order/{id}", "/orders"]);
        let item = &paths["/order/{id}"];
        assert!(item["get"].is_object());
        assert!(item["put"].is_object());
        assert!(item["delete"].is_object());
        assert_eq!(paths["/order"]["post"]["operationId"], json!("create_order"));
    }

    #[test]
    fn derived_models_become_components() {
        let doc = document();
        let schemas = &doc["components"]["schemas"];
        assert_eq!(schemas["OrderIn"]["required"], json!(["customer"]));
        assert!(schemas["OrderOut"]["properties"]["id"].is_object());
        assert!(schemas["OrderUpdate"]["required"].is_null());
        assert_eq!(schemas["OrderUpdate"]["properties"]["note"]["type"], json!(["string", "null"]));
        assert!(schemas["Error"].is_object());
    }

    #[test]
    fn list_fields_and_error_details_are_arrays() {
        let list = serde_json::to_value(field_schema(&list_descriptor())).unwrap();
        assert_eq!(list["type"], json!("array"));
        assert!(list["items"].is_object());

        let error = serde_json::to_value(error_schema()).unwrap();
        let details = &error["properties"]["error"]["properties"]["details"];
        assert_eq!(details["type"], json!("array"));
        assert_eq!(details["items"]["type"], json!("object"));
    }

    fn list_descriptor() -> FieldDescriptor {
        let model = crate::model::describe(
            &ModelConfig::new("Tagged").field(FieldConfig::new("tags", FieldType::List).tag(tags::READ_OUTPUT)),
        )
        .unwrap();
        model.fields[0].clone()
    }

    #[test]
    fn list_filters_are_query_parameters() {
        let doc = document();
        let params = doc["paths"]["/orders"]["get"]["parameters"].as_array().unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0]["name"], json!("customer"));
        assert_eq!(params[0]["in"], json!("query"));
    }
}
