//! Result-shape extraction: raw column metadata → ordered field descriptors.

use serde::{Deserialize, Serialize};

use crate::registry::{Oid, TypeMapper, TypeRegistry};

/// Column metadata as reported by the database for one result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMeta {
    pub name: String,
    pub type_oid: Oid,
}

impl FieldMeta {
    pub fn new<S: Into<String>>(name: S, type_oid: Oid) -> Self { Self { name: name.into(), type_oid } }
}

/// One field of an observed shape. `value` is the type expression; `description` records
/// the catalog name and OID it was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Build field descriptors for `fields` in their original order.
pub fn extract(fields: &[FieldMeta], mapper: Option<&TypeMapper>) -> Vec<FieldDescriptor> {
    let reg = TypeRegistry::global();
    fields
        .iter()
        .map(|f| FieldDescriptor {
            name: f.name.clone(),
            value: reg.resolve_type(f.type_oid, mapper),
            description: Some(format!("{} (oid: {})", reg.oid_to_name(f.type_oid), f.type_oid)),
        })
        .collect()
}

/// Dedup/display key for a query: leading newlines and trailing whitespace removed.
/// Leading spaces and tabs are kept, so `"  select 1"` and `"select 1"` are distinct keys.
pub fn canonical_query_text(sql: &str) -> String {
    sql.trim_start_matches('\n').trim_end().to_string()
}
