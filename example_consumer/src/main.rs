//! Example consumer: serves CRUD routes generated from the JSON model files in `MODELS_DIR`.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Or from this directory: `cargo run`

use axum::Router;
use schema_crud::{
    build_openapi, common_routes, load_models_from_dir, object_routes, openapi_routes, reserved_route_keys,
    ApiGenerator, AppState, MemoryStore, ObjectStorage, PersistenceAdapter, PgDocumentStore, S3ObjectStorage,
    Settings,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("schema_crud=info,example_consumer=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let store: Arc<dyn PersistenceAdapter> = match &settings.database_url {
        Some(url) => Arc::new(PgDocumentStore::connect(url, settings.schema.clone()).await?),
        None => {
            tracing::warn!("DATABASE_URL not set, records are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };
    let storage: Option<Arc<dyn ObjectStorage>> = match &settings.s3 {
        Some(s3) => Some(Arc::new(S3ObjectStorage::connect(s3.clone()).await?)),
        None => None,
    };

    let models = load_models_from_dir(&settings.models_dir).await?;
    let api = ApiGenerator::from_settings(store.clone(), &settings)
        .reserve_all(reserved_route_keys(storage.is_some()))
        .generate(models);
    if !api.is_complete() {
        for failure in &api.failures {
            tracing::error!(error = %failure, "model rejected");
        }
        return Err(format!("{} model(s) could not be generated", api.failures.len()).into());
    }
    api.prepare_collections().await?;

    let doc = build_openapi(&api, env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    let mut app: Router = api
        .router()
        .merge(common_routes(AppState { store }))
        .merge(openapi_routes(doc));
    if let Some(storage) = storage {
        app = app.merge(object_routes(storage, settings.body_limit));
    }

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("Example consumer listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
