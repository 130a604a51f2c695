use super::*;

fn field(name: &str, value: &str, description: Option<&str>) -> FieldDescriptor {
    FieldDescriptor { name: name.into(), value: value.into(), description: description.map(|s| s.to_string()) }
}

fn get_user_entry() -> ShapeEntry {
    ShapeEntry {
        properties: vec![
            field("id", "number", Some("int4 (oid: 23)")),
            field("name", "string", Some("text (oid: 25)")),
        ],
        description: "select id::int4, name::text from users".into(),
    }
}

#[test]
fn renders_identifier_module() {
    let out = render_identifier_module("get_user", &[get_user_entry()]).unwrap();
    let expected = [
        "/* eslint-disable */",
        "// tslint:disable",
        "// this file is generated by a tool; don't change it manually.",
        "",
        "export interface get_user_QueryTypeMap {",
        "  [\"select id::int4, name::text from users\"]: {",
        "    /** int4 (oid: 23) */",
        "    id: number",
        "    /** text (oid: 25) */",
        "    name: string",
        "  }",
        "}",
        "",
        "export type get_user_UnionType = get_user_QueryTypeMap[keyof get_user_QueryTypeMap]",
        "",
        "export type get_user = {",
        "  id: number",
        "  name: string",
        "}",
        "",
        "export const get_user_meta_v0 = [{\"properties\":[{\"name\":\"id\",\"value\":\"number\",\"description\":\"int4 (oid: 23)\"},{\"name\":\"name\",\"value\":\"string\",\"description\":\"text (oid: 25)\"}],\"description\":\"select id::int4, name::text from users\"}]",
        "",
    ]
    .join("\n");
    assert_eq!(out, expected);
}

fn merged(name: &str, values: &[&str], optional: bool) -> MergedField {
    MergedField { name: name.into(), values: values.iter().map(|v| v.to_string()).collect(), optional }
}

#[test]
fn merged_type_covers_fields_from_every_shape() {
    let a = ShapeEntry { properties: vec![field("id", "number", None), field("name", "string", None)], description: "a".into() };
    let b = ShapeEntry { properties: vec![field("id", "string", None), field("email", "string", None)], description: "b".into() };
    assert_eq!(
        merged_fields(&[a.clone(), b.clone()]),
        vec![
            merged("id", &["number", "string"], false),
            merged("name", &["string"], true),
            merged("email", &["string"], true),
        ]
    );
    let out = render_identifier_module("q", &[a, b]).unwrap();
    assert!(out.contains("export type q = {\n  id: number | string\n  name?: string\n  email?: string\n}"));
}

#[test]
fn fields_missing_from_some_shapes_are_optional() {
    let narrow = ShapeEntry { properties: vec![field("a", "number", None)], description: "select a".into() };
    let wide = ShapeEntry {
        properties: vec![field("a", "number", None), field("b", "string", None)],
        description: "select a, b".into(),
    };
    let out = render_identifier_module("q", &[narrow, wide]).unwrap();
    assert!(out.contains("export type q = {\n  a: number\n  b?: string\n}"));
    assert!(!out.contains("a?:"));
    // the per-query map stays exact
    assert!(out.contains("  [\"select a, b\"]: {\n    a: number\n    b: string\n  }"));
}

#[test]
fn repeated_column_in_one_shape_does_not_count_twice() {
    let dup = ShapeEntry {
        properties: vec![field("?column?", "number", None), field("?column?", "number", None)],
        description: "select 1, 2".into(),
    };
    let other = ShapeEntry { properties: vec![field("a", "number", None)], description: "select a".into() };
    let fields = merged_fields(&[dup, other]);
    assert_eq!(fields[0], merged("?column?", &["number"], true));
}

#[test]
fn non_identifier_names_are_quoted() {
    let e = ShapeEntry {
        properties: vec![
            field("?column?", "unknown", None),
            field("user id", "number", None),
            field("$ok_1", "string", None),
        ],
        description: "select 1, 2 as \"user id\", 3 as \"$ok_1\"".into(),
    };
    let out = render_identifier_module("q", &[e]).unwrap();
    assert!(out.contains("    \"?column?\": unknown\n    \"user id\": number\n    $ok_1: string"));
    assert!(out.contains("export type q = {\n  \"?column?\": unknown\n  \"user id\": number\n  $ok_1: string\n}"));
    assert_eq!(property_key("b", true), "b?");
    assert_eq!(property_key("user id", true), "\"user id\"?");
    assert!(is_ts_identifier("get_user"));
    assert!(!is_ts_identifier("1abc"));
}

#[test]
fn block_comment_strips_terminators() {
    let body = write_interface_body(&[field("x", "number", Some("evil */ comment"))], Some("doc"));
    assert_eq!(body, "/** doc */\n{\n  /** evil  comment */\n  x: number\n}");
}

#[test]
fn parse_round_trips_metadata() {
    let entries = vec![get_user_entry()];
    let out = render_identifier_module("get_user", &entries).unwrap();
    let parsed = parse_identifier_module("get_user", &out).unwrap();
    assert_eq!(parsed, Some(entries));
}

#[test]
fn parse_without_metadata_is_none_and_garbage_is_error() {
    assert_eq!(parse_identifier_module("q", "export type q = {}\n").unwrap(), None);
    assert!(parse_identifier_module("q", "export const q_meta_v0 = [{not json").is_err());
}

#[test]
fn renders_index() {
    let out = render_index(&["get_user".to_string(), "list_posts".to_string()]);
    let expected = [
        "/* eslint-disable */",
        "// tslint:disable",
        "// this file is generated by a tool; don't change it manually.",
        "import {get_user} from './get_user'",
        "import {list_posts} from './list_posts'",
        "",
        "export {get_user}",
        "export {list_posts}",
        "",
        "export interface KnownTypes {",
        "  get_user: get_user",
        "  list_posts: list_posts",
        "}",
        "",
        "/** runtime-accessible object with phantom type information of query results. */",
        "export const knownTypes: KnownTypes = {",
        "  get_user: {} as get_user,",
        "  list_posts: {} as list_posts,",
        "}",
        "",
    ]
    .join("\n");
    assert_eq!(out, expected);
}
