//!
//! pgtypegen type registry
//! -----------------------
//! Static catalog of Postgres built-in types (`pg_type.typname` ↔ `pg_type.oid`) and the
//! default mapping from a result column's type OID to a portable type expression.
//! The catalog is built once per process and never mutated; OIDs outside it resolve to
//! the `unknown` sentinel rather than raising.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

/// Postgres type object identifier as reported in RowDescription.
pub type Oid = u32;

/// Sentinel type name and type expression for OIDs outside the catalog.
pub const UNKNOWN: &str = "unknown";

/// Caller-supplied override consulted before the built-in mapping. Returning `None` (or an
/// empty string) falls through to the default.
pub type TypeMapper = Arc<dyn Fn(Oid, &TypeRegistry) -> Option<String> + Send + Sync>;

/// Frequently referenced OIDs.
pub mod oid {
    use super::Oid;
    pub const BOOL: Oid = 16;
    pub const BYTEA: Oid = 17;
    pub const INT8: Oid = 20;
    pub const INT2: Oid = 21;
    pub const INT4: Oid = 23;
    pub const TEXT: Oid = 25;
    pub const JSON: Oid = 114;
    pub const FLOAT4: Oid = 700;
    pub const FLOAT8: Oid = 701;
    pub const TEXT_ARRAY: Oid = 1009;
    pub const BPCHAR: Oid = 1042;
    pub const VARCHAR: Oid = 1043;
    pub const DATE: Oid = 1082;
    pub const TIMESTAMP: Oid = 1114;
    pub const TIMESTAMPTZ: Oid = 1184;
    pub const NUMERIC: Oid = 1700;
    pub const UUID: Oid = 2950;
    pub const JSONB: Oid = 3802;
}

// typname, oid (pg_catalog built-ins; array types carry the leading underscore)
const CATALOG: &[(&str, Oid)] = &[
    ("bool", 16), ("bytea", 17), ("char", 18), ("name", 19), ("int8", 20), ("int2", 21),
    ("int2vector", 22), ("int4", 23), ("regproc", 24), ("text", 25), ("oid", 26), ("tid", 27),
    ("xid", 28), ("cid", 29), ("oidvector", 30), ("json", 114), ("xml", 142), ("_xml", 143),
    ("_json", 199), ("point", 600), ("lseg", 601), ("path", 602), ("box", 603), ("polygon", 604),
    ("line", 628), ("cidr", 650), ("_cidr", 651), ("float4", 700), ("float8", 701),
    ("circle", 718), ("_circle", 719), ("macaddr8", 774), ("money", 790), ("_money", 791),
    ("macaddr", 829), ("inet", 869), ("_bool", 1000), ("_bytea", 1001), ("_char", 1002),
    ("_name", 1003), ("_int2", 1005), ("_int4", 1007), ("_text", 1009), ("_bpchar", 1014),
    ("_varchar", 1015), ("_int8", 1016), ("_float4", 1021), ("_float8", 1022), ("_oid", 1028),
    ("aclitem", 1033), ("_macaddr", 1040), ("_inet", 1041), ("bpchar", 1042), ("varchar", 1043),
    ("date", 1082), ("time", 1083), ("timestamp", 1114), ("_timestamp", 1115), ("_date", 1182),
    ("_time", 1183), ("timestamptz", 1184), ("_timestamptz", 1185), ("interval", 1186),
    ("_interval", 1187), ("_numeric", 1231), ("timetz", 1266), ("_timetz", 1270), ("bit", 1560),
    ("_bit", 1561), ("varbit", 1562), ("_varbit", 1563), ("numeric", 1700), ("refcursor", 1790),
    ("regprocedure", 2202), ("regoper", 2203), ("regoperator", 2204), ("regclass", 2205),
    ("regtype", 2206), ("record", 2249), ("cstring", 2275), ("any", 2276), ("anyarray", 2277),
    ("void", 2278), ("trigger", 2279), ("_record", 2287), ("uuid", 2950), ("_uuid", 2951),
    ("txid_snapshot", 2970), ("pg_lsn", 3220), ("tsvector", 3614), ("tsquery", 3615),
    ("regconfig", 3734), ("regdictionary", 3769), ("jsonb", 3802), ("_jsonb", 3807),
    ("int4range", 3904), ("numrange", 3906), ("tsrange", 3908), ("tstzrange", 3910),
    ("daterange", 3912), ("int8range", 3926), ("jsonpath", 4072), ("regnamespace", 4089),
    ("regrole", 4096),
];

static REGISTRY: Lazy<TypeRegistry> = Lazy::new(TypeRegistry::build);

/// Bidirectional name/OID lookup over the built-in catalog.
#[derive(Debug)]
pub struct TypeRegistry {
    by_name: HashMap<&'static str, Oid>,
    by_oid: HashMap<Oid, &'static str>,
}

impl TypeRegistry {
    /// Process-wide registry instance.
    pub fn global() -> &'static TypeRegistry { &REGISTRY }

    fn build() -> Self {
        let by_name: HashMap<&'static str, Oid> = CATALOG.iter().copied().collect();
        let by_oid: HashMap<Oid, &'static str> = by_name.iter().map(|(n, o)| (*o, *n)).collect();
        debug_assert_eq!(by_name.len(), by_oid.len(), "type catalog must be bijective");
        Self { by_name, by_oid }
    }

    pub fn name_to_oid(&self, name: &str) -> Option<Oid> { self.by_name.get(name).copied() }

    /// Catalog name for `oid`, or `unknown` when it is not a built-in.
    pub fn oid_to_name(&self, oid: Oid) -> &'static str {
        self.by_oid.get(&oid).copied().unwrap_or(UNKNOWN)
    }

    pub fn contains(&self, oid: Oid) -> bool { self.by_oid.contains_key(&oid) }

    /// All catalog names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut v: Vec<&'static str> = self.by_name.keys().copied().collect();
        v.sort_unstable();
        v
    }

    pub fn len(&self) -> usize { self.by_name.len() }

    pub fn is_empty(&self) -> bool { self.by_name.is_empty() }

    /// Resolve the type expression for a column OID. The override mapper wins when it
    /// yields a non-empty expression; otherwise the built-in table applies.
    pub fn resolve_type(&self, oid: Oid, mapper: Option<&TypeMapper>) -> String {
        if let Some(m) = mapper {
            if let Some(expr) = m(oid, self) {
                if !expr.is_empty() { return expr; }
            }
        }
        default_type_expression(oid).to_string()
    }
}

/// Built-in OID → type expression table.
pub fn default_type_expression(type_oid: Oid) -> &'static str {
    match type_oid {
        oid::TIMESTAMPTZ => "number",
        oid::TEXT | oid::VARCHAR => "string",
        oid::INT2 | oid::INT4 | oid::INT8 => "number",
        oid::BOOL => "boolean",
        oid::TEXT_ARRAY => "string[]",
        _ => UNKNOWN,
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod registry_tests;
