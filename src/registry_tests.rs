use super::*;

#[test]
fn catalog_round_trips_for_every_name() {
    let reg = TypeRegistry::global();
    assert!(!reg.is_empty());
    for name in reg.names() {
        let o = reg.name_to_oid(name).expect("name present");
        assert_eq!(reg.oid_to_name(o), name);
    }
    assert_eq!(reg.names().len(), reg.len());
}

#[test]
fn well_known_oids_match_postgres() {
    let reg = TypeRegistry::global();
    assert_eq!(reg.name_to_oid("int2"), Some(oid::INT2));
    assert_eq!(reg.name_to_oid("int4"), Some(oid::INT4));
    assert_eq!(reg.name_to_oid("int8"), Some(oid::INT8));
    assert_eq!(reg.name_to_oid("text"), Some(oid::TEXT));
    assert_eq!(reg.name_to_oid("_text"), Some(oid::TEXT_ARRAY));
    assert_eq!(reg.name_to_oid("timestamptz"), Some(oid::TIMESTAMPTZ));
    assert_eq!(reg.name_to_oid("no_such_type"), None);
}

#[test]
fn unmapped_oid_resolves_to_unknown() {
    let reg = TypeRegistry::global();
    // typical OID range for a user-defined enum
    assert_eq!(reg.oid_to_name(16_414), UNKNOWN);
    assert!(!reg.contains(16_414));
    assert_eq!(reg.resolve_type(16_414, None), "unknown");
}

#[test]
fn default_table() {
    let reg = TypeRegistry::global();
    assert_eq!(reg.resolve_type(oid::TIMESTAMPTZ, None), "number");
    assert_eq!(reg.resolve_type(oid::TEXT, None), "string");
    assert_eq!(reg.resolve_type(oid::VARCHAR, None), "string");
    assert_eq!(reg.resolve_type(oid::INT2, None), "number");
    assert_eq!(reg.resolve_type(oid::INT4, None), "number");
    assert_eq!(reg.resolve_type(oid::INT8, None), "number");
    assert_eq!(reg.resolve_type(oid::BOOL, None), "boolean");
    assert_eq!(reg.resolve_type(oid::TEXT_ARRAY, None), "string[]");
    // catalogued but not in the default table
    assert_eq!(reg.resolve_type(oid::JSON, None), "unknown");
    assert_eq!(reg.resolve_type(oid::FLOAT8, None), "unknown");
}

#[test]
fn mapper_overrides_and_falls_through() {
    let reg = TypeRegistry::global();
    let mapper: TypeMapper = Arc::new(|o: Oid, types: &TypeRegistry| {
        if Some(o) == types.name_to_oid("int8") { return Some("bigint".to_string()); }
        if o == oid::JSON { return Some(String::new()); }
        None
    });
    assert_eq!(reg.resolve_type(oid::INT8, Some(&mapper)), "bigint");
    // empty result falls back to the default table
    assert_eq!(reg.resolve_type(oid::JSON, Some(&mapper)), "unknown");
    assert_eq!(reg.resolve_type(oid::TEXT, Some(&mapper)), "string");
}
