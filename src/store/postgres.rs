//! PostgreSQL document store: one JSONB table per collection plus a shared counter table.

use super::{effective_query, Document, PersistenceAdapter};
use crate::error::StoreError;
use crate::sql::{self, BindValue, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{ConnectOptions, PgPool, Postgres, Row};
use std::str::FromStr;

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
    schema: String,
}

impl PgDocumentStore {
    /// Create the schema and the counter table if missing.
    pub async fn init(pool: PgPool, schema: impl Into<String>) -> Result<Self, StoreError> {
        let store = PgDocumentStore {
            pool,
            schema: schema.into(),
        };
        store.execute(&sql::create_schema(&store.schema)).await?;
        store.execute(&sql::create_counters(&store.schema)).await?;
        Ok(store)
    }

    /// Create the database if needed, open a pool and initialise `schema`.
    pub async fn connect(database_url: &str, schema: impl Into<String>) -> Result<Self, StoreError> {
        ensure_database_exists(database_url).await?;
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Self::init(pool, schema).await
    }

    fn prepare(q: &QueryBuf) -> Query<'_, Postgres, PgArguments> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = match p {
                BindValue::Text(s) => query.bind(s.clone()),
                BindValue::Json(v) => query.bind(v.clone()),
            };
        }
        query
    }

    async fn execute(&self, q: &QueryBuf) -> Result<u64, StoreError> {
        let result = Self::prepare(q).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<PgRow>, StoreError> {
        Ok(Self::prepare(q).fetch_optional(&self.pool).await?)
    }
}

fn payload(row: &PgRow) -> Result<Document, StoreError> {
    match row.try_get::<Value, _>("payload")? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject),
    }
}

#[async_trait]
impl PersistenceAdapter for PgDocumentStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn ensure_collection(&self, resource: &str) -> Result<(), StoreError> {
        for q in sql::create_collection(&self.schema, resource) {
            self.execute(&q).await?;
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }

    async fn get_one(&self, resource: &str, query: &Document) -> Result<Option<Document>, StoreError> {
        let q = sql::select_one(&self.schema, resource, &Value::Object(effective_query(query)));
        self.fetch_optional(&q).await?.as_ref().map(payload).transpose()
    }

    async fn get_many(&self, resource: &str, query: &Document) -> Result<Vec<Document>, StoreError> {
        let q = sql::select_many(&self.schema, resource, &Value::Object(effective_query(query)));
        let rows = Self::prepare(&q).fetch_all(&self.pool).await?;
        rows.iter().map(payload).collect()
    }

    async fn create(&self, resource: &str, record: Document) -> Result<Document, StoreError> {
        let q = sql::insert(&self.schema, resource, &Value::Object(record));
        let row = self
            .fetch_optional(&q)
            .await?
            .ok_or_else(|| StoreError::Backend("insert returned no row".into()))?;
        payload(&row)
    }

    async fn update_one(&self, resource: &str, query: &Document, partial: &Document) -> Result<u64, StoreError> {
        let q = sql::update_one(
            &self.schema,
            resource,
            &Value::Object(effective_query(query)),
            &Value::Object(partial.clone()),
        );
        self.execute(&q).await
    }

    async fn delete_one(&self, resource: &str, query: &Document) -> Result<u64, StoreError> {
        let q = sql::delete_one(&self.schema, resource, &Value::Object(effective_query(query)));
        self.execute(&q).await
    }

    async fn increment_and_fetch(&self, counter: &str) -> Result<i64, StoreError> {
        let q = sql::counter_next(&self.schema, counter);
        let row = self
            .fetch_optional(&q)
            .await?
            .ok_or_else(|| StoreError::Backend(format!("counter {} returned no row", counter)))?;
        Ok(row.try_get::<i64, _>("value")?)
    }

    async fn current_counter(&self, counter: &str) -> Result<Option<i64>, StoreError> {
        let q = sql::counter_current(&self.schema, counter);
        match self.fetch_optional(&q).await? {
            Some(row) => Ok(Some(row.try_get::<i64, _>("value")?)),
            None => Ok(None),
        }
    }
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), StoreError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| StoreError::Backend(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", sql::quoted(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), StoreError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| StoreError::Backend("DATABASE_URL: no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = format!("{}postgres", base);
    Ok((admin_url, db_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_name_is_split_from_url() {
        let (admin, name) = parse_db_name_from_url("postgres://u:p@localhost:5432/shop?sslmode=disable").unwrap();
        assert_eq!(admin, "postgres://u:p@localhost:5432/postgres");
        assert_eq!(name, "shop");
        assert!(parse_db_name_from_url("no-path").is_err());
    }
}
