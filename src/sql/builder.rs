//! Builds parameterized statements for the JSONB document store. Identifiers are always quoted.

use serde_json::Value;

/// Counter table shared by every collection in a schema.
pub const COUNTERS_TABLE: &str = "_sys_counters";

/// A value bound to one placeholder.
#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
    Text(String),
    Json(Value),
}

/// Quote identifier for PostgreSQL.
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
pub fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<BindValue>,
}

impl QueryBuf {
    fn new(sql: String) -> Self {
        QueryBuf { sql, params: Vec::new() }
    }

    fn with(mut self, v: BindValue) -> Self {
        self.params.push(v);
        self
    }
}

pub fn create_schema(schema: &str) -> QueryBuf {
    QueryBuf::new(format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(schema)))
}

/// One table per collection: surrogate key for ordering, the document as JSONB.
pub fn create_collection(schema: &str, collection: &str) -> Vec<QueryBuf> {
    let table = qualified_table(schema, collection);
    vec![
        QueryBuf::new(format!(
            r#"CREATE TABLE IF NOT EXISTS {} (
                doc_key BIGSERIAL PRIMARY KEY,
                payload JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
            table
        )),
        QueryBuf::new(format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} USING GIN (payload jsonb_path_ops)",
            quoted(&format!("{}_payload_idx", collection)),
            table
        )),
    ]
}

pub fn create_counters(schema: &str) -> QueryBuf {
    QueryBuf::new(format!(
        r#"CREATE TABLE IF NOT EXISTS {} (
            collection TEXT PRIMARY KEY,
            value BIGINT NOT NULL
        )"#,
        qualified_table(schema, COUNTERS_TABLE)
    ))
}

/// `WHERE` condition requiring each query key to equal its value exactly: containment narrows
/// through the GIN index, per-key jsonb equality rejects lists and objects that merely contain
/// the filter value. Parameters are appended to `q`.
fn filter_condition(q: &mut QueryBuf, query: &Value) -> String {
    let map = match query.as_object() {
        Some(map) if !map.is_empty() => map,
        _ => return "TRUE".to_string(),
    };
    q.params.push(BindValue::Json(query.clone()));
    let mut parts = vec![format!("payload @> ${}", q.params.len())];
    for (key, value) in map {
        q.params.push(BindValue::Text(key.clone()));
        q.params.push(BindValue::Json(value.clone()));
        let n = q.params.len();
        parts.push(format!("payload -> ${} = ${}", n - 1, n));
    }
    parts.join(" AND ")
}

/// First document matching `query`, oldest first.
pub fn select_one(schema: &str, collection: &str, query: &Value) -> QueryBuf {
    let mut q = QueryBuf::new(String::new());
    let cond = filter_condition(&mut q, query);
    q.sql = format!(
        "SELECT payload FROM {} WHERE {} ORDER BY doc_key LIMIT 1",
        qualified_table(schema, collection),
        cond
    );
    q
}

pub fn select_many(schema: &str, collection: &str, query: &Value) -> QueryBuf {
    let mut q = QueryBuf::new(String::new());
    let cond = filter_condition(&mut q, query);
    q.sql = format!(
        "SELECT payload FROM {} WHERE {} ORDER BY doc_key",
        qualified_table(schema, collection),
        cond
    );
    q
}

pub fn insert(schema: &str, collection: &str, record: &Value) -> QueryBuf {
    QueryBuf::new(format!(
        "INSERT INTO {} (payload) VALUES ($1) RETURNING payload",
        qualified_table(schema, collection)
    ))
    .with(BindValue::Json(record.clone()))
}

/// Shallow-merge `partial` into the first matching document.
pub fn update_one(schema: &str, collection: &str, query: &Value, partial: &Value) -> QueryBuf {
    let table = qualified_table(schema, collection);
    let mut q = QueryBuf::new(String::new()).with(BindValue::Json(partial.clone()));
    let cond = filter_condition(&mut q, query);
    q.sql = format!(
        "UPDATE {t} SET payload = payload || $1 WHERE doc_key = (SELECT doc_key FROM {t} WHERE {c} ORDER BY doc_key LIMIT 1)",
        t = table,
        c = cond
    );
    q
}

pub fn delete_one(schema: &str, collection: &str, query: &Value) -> QueryBuf {
    let table = qualified_table(schema, collection);
    let mut q = QueryBuf::new(String::new());
    let cond = filter_condition(&mut q, query);
    q.sql = format!(
        "DELETE FROM {t} WHERE doc_key = (SELECT doc_key FROM {t} WHERE {c} ORDER BY doc_key LIMIT 1)",
        t = table,
        c = cond
    );
    q
}

/// Single-statement increment-and-fetch; the row is created at 1 on first use.
pub fn counter_next(schema: &str, counter: &str) -> QueryBuf {
    QueryBuf::new(format!(
        "INSERT INTO {} AS c (collection, value) VALUES ($1, 1) \
         ON CONFLICT (collection) DO UPDATE SET value = c.value + 1 RETURNING value",
        qualified_table(schema, COUNTERS_TABLE)
    ))
    .with(BindValue::Text(counter.to_string()))
}

pub fn counter_current(schema: &str, counter: &str) -> QueryBuf {
    QueryBuf::new(format!(
        "SELECT value FROM {} WHERE collection = $1",
        qualified_table(schema, COUNTERS_TABLE)
    ))
    .with(BindValue::Text(counter.to_string()))
}
