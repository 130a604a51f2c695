//! `tokio-postgres` backed query executor.
//!
//! Statements are prepared first so column OIDs come from the server's RowDescription even
//! when the query returns no rows. JSON bound values are converted to the parameter types
//! the server inferred for the prepared statement.

use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value as JsonValue;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, Column, Config, NoTls, Row};
use tracing::{debug, warn};

use crate::query::{QueryExecutor, QueryResult, SqlQuery};
use crate::shape::FieldMeta;

pub struct PgExecutor {
    client: Client,
}

impl PgExecutor {
    pub fn new(client: Client) -> Self { Self { client } }

    /// Connect without TLS and drive the connection in the background.
    pub async fn connect(url: &str) -> Result<Self> {
        let cfg: Config = url.parse().context("invalid postgres url")?;
        let (client, conn) = cfg.connect(NoTls).await.context("connect to postgres")?;
        tokio::spawn(async move {
            if let Err(e) = conn.await { warn!(target: "pgtypegen::pg", "connection closed with error: {}", e); }
        });
        Ok(Self { client })
    }

    pub fn client(&self) -> &Client { &self.client }
}

impl QueryExecutor for PgExecutor {
    async fn execute(&self, query: &SqlQuery) -> Result<QueryResult> {
        let stmt = self.client.prepare(&query.sql).await?;
        if stmt.params().len() != query.values.len() {
            bail!("query expects {} parameter(s) but {} value(s) were bound", stmt.params().len(), query.values.len());
        }
        let params: Vec<PgParam> = query
            .values
            .iter()
            .zip(stmt.params())
            .enumerate()
            .map(|(i, (v, ty))| to_param(v, ty).with_context(|| format!("parameter ${}", i + 1)))
            .collect::<Result<_>>()?;
        let refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p.as_tosql()).collect();
        let rows = self.client.query(&stmt, &refs).await?;
        debug!(target: "pgtypegen::pg", "executed ({} rows): {}", rows.len(), query.sql);

        let fields = stmt.columns().iter().map(|c| FieldMeta::new(c.name(), c.type_().oid())).collect();
        let rows = rows.iter().map(|r| row_values(r, stmt.columns())).collect();
        Ok(QueryResult { fields, rows })
    }
}

#[derive(Debug, PartialEq)]
enum PgParam {
    Bool(Option<bool>),
    Int2(Option<i16>),
    Int4(Option<i32>),
    Int8(Option<i64>),
    Float4(Option<f32>),
    Float8(Option<f64>),
    Text(Option<String>),
    Json(Option<JsonValue>),
}

impl PgParam {
    fn as_tosql(&self) -> &(dyn ToSql + Sync) {
        match self {
            PgParam::Bool(v) => v,
            PgParam::Int2(v) => v,
            PgParam::Int4(v) => v,
            PgParam::Int8(v) => v,
            PgParam::Float4(v) => v,
            PgParam::Float8(v) => v,
            PgParam::Text(v) => v,
            PgParam::Json(v) => v,
        }
    }
}

fn int_value(v: &JsonValue) -> Result<i64> { v.as_i64().ok_or_else(|| anyhow!("expected integer, got {}", v)) }

fn to_param(v: &JsonValue, ty: &Type) -> Result<PgParam> {
    let null = v.is_null();
    let p = match *ty {
        Type::BOOL => PgParam::Bool(if null { None } else { Some(v.as_bool().ok_or_else(|| anyhow!("expected boolean, got {}", v))?) }),
        Type::INT2 => PgParam::Int2(if null { None } else { Some(i16::try_from(int_value(v)?)?) }),
        Type::INT4 => PgParam::Int4(if null { None } else { Some(i32::try_from(int_value(v)?)?) }),
        Type::INT8 => PgParam::Int8(if null { None } else { Some(int_value(v)?) }),
        Type::FLOAT4 => PgParam::Float4(if null { None } else { Some(v.as_f64().ok_or_else(|| anyhow!("expected number, got {}", v))? as f32) }),
        Type::FLOAT8 => PgParam::Float8(if null { None } else { Some(v.as_f64().ok_or_else(|| anyhow!("expected number, got {}", v))?) }),
        Type::JSON | Type::JSONB => PgParam::Json(if null { None } else { Some(v.clone()) }),
        _ => PgParam::Text(match v {
            JsonValue::Null => None,
            JsonValue::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }),
    };
    Ok(p)
}

fn row_values(row: &Row, columns: &[Column]) -> Vec<JsonValue> {
    columns
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            let value = match *col.type_() {
                Type::BOOL => row.try_get::<_, Option<bool>>(idx).map(|o| o.map(JsonValue::from)),
                Type::INT2 => row.try_get::<_, Option<i16>>(idx).map(|o| o.map(JsonValue::from)),
                Type::INT4 => row.try_get::<_, Option<i32>>(idx).map(|o| o.map(JsonValue::from)),
                Type::INT8 => row.try_get::<_, Option<i64>>(idx).map(|o| o.map(JsonValue::from)),
                Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx).map(|o| o.map(|f| JsonValue::from(f as f64))),
                Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx).map(|o| o.map(JsonValue::from)),
                Type::JSON | Type::JSONB => row.try_get::<_, Option<JsonValue>>(idx),
                Type::TEXT_ARRAY | Type::VARCHAR_ARRAY => row.try_get::<_, Option<Vec<String>>>(idx).map(|o| o.map(JsonValue::from)),
                // text-like columns decode as String; anything else is left null
                _ => row.try_get::<_, Option<String>>(idx).map(|o| o.map(JsonValue::from)),
            };
            value.ok().flatten().unwrap_or(JsonValue::Null)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_to_declared_parameter_types() {
        assert_eq!(to_param(&json!(7), &Type::INT4).unwrap(), PgParam::Int4(Some(7)));
        assert_eq!(to_param(&json!(7), &Type::INT8).unwrap(), PgParam::Int8(Some(7)));
        assert_eq!(to_param(&json!(true), &Type::BOOL).unwrap(), PgParam::Bool(Some(true)));
        assert_eq!(to_param(&json!(1.5), &Type::FLOAT8).unwrap(), PgParam::Float8(Some(1.5)));
        assert_eq!(to_param(&json!("ada"), &Type::TEXT).unwrap(), PgParam::Text(Some("ada".into())));
        assert_eq!(to_param(&json!(42), &Type::VARCHAR).unwrap(), PgParam::Text(Some("42".into())));
        assert_eq!(to_param(&json!({"a": 1}), &Type::JSONB).unwrap(), PgParam::Json(Some(json!({"a": 1}))));
    }

    #[test]
    fn nulls_stay_typed() {
        assert_eq!(to_param(&JsonValue::Null, &Type::INT4).unwrap(), PgParam::Int4(None));
        assert_eq!(to_param(&JsonValue::Null, &Type::TEXT).unwrap(), PgParam::Text(None));
    }

    #[test]
    fn rejects_mismatched_values() {
        assert!(to_param(&json!("x"), &Type::INT4).is_err());
        assert!(to_param(&json!(70_000), &Type::INT2).is_err());
        assert!(to_param(&json!(1), &Type::BOOL).is_err());
    }
}
