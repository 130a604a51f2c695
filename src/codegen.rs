//!
//! pgtypegen artifact rendering
//! ----------------------------
//! Renders the TypeScript modules written by the codegen store:
//!
//! - `<identifier>.ts`: a `<identifier>_QueryTypeMap` interface keyed by canonical query
//!   text, the `<identifier>_UnionType` over all observed shapes, the merged-keys
//!   `<identifier>` type, and a single-line JSON metadata declaration that the store
//!   parses back on the next write.
//! - `index.ts`: imports/re-exports every known identifier plus a `KnownTypes` interface
//!   and a `knownTypes` object carrying phantom type information.
//!
//! Rendering is a pure function of its input so that repeated runs are byte-identical.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::shape::FieldDescriptor;

pub const INDEX_MODULE: &str = "index";

pub const IDENTIFIER_PATTERN: &str = r"^[A-Za-z_$][A-Za-z0-9_$]*$";

static IDENTIFIER_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(IDENTIFIER_PATTERN).ok());

/// Written by directory bootstrap before any identifier exists.
pub const EMPTY_INDEX: &str = "export const knownTypes = {}\n";

const HEADER: &[&str] = &[
    "/* eslint-disable */",
    "// tslint:disable",
    "// this file is generated by a tool; don't change it manually.",
];

/// One observed shape for an identifier, keyed by its canonical query text (`description`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeEntry {
    pub properties: Vec<FieldDescriptor>,
    pub description: String,
}

/// Prefix of the metadata line inside `<identifier>.ts`.
pub fn meta_declaration(identifier: &str) -> String { format!("export const {}_meta_v0 = ", identifier) }

fn block_comment(s: Option<&str>) -> Option<String> {
    match s {
        Some(s) if !s.is_empty() => Some(format!("/** {} */", s.replace("*/", ""))),
        _ => None,
    }
}

/// True when `name` can be written as a bare TypeScript identifier.
pub fn is_ts_identifier(name: &str) -> bool { IDENTIFIER_RE.as_ref().is_some_and(|re| re.is_match(name)) }

/// Property key as written inside an object type: bare when it is an identifier, a string
/// literal otherwise (`?column?`, `user id`), with a `?` suffix for optional members.
pub fn property_key(name: &str, optional: bool) -> String {
    let key = if is_ts_identifier(name) { name.to_string() } else { JsonValue::String(name.to_string()).to_string() };
    if optional { format!("{}?", key) } else { key }
}

fn render_body<'a, I>(rows: I, description: Option<&str>) -> String
where
    I: IntoIterator<Item = (String, &'a str, Option<&'a str>)>,
{
    let mut parts: Vec<String> = Vec::new();
    if let Some(c) = block_comment(description) { parts.push(c); }
    parts.push("{".to_string());
    for (key, value, doc) in rows {
        let mut lines: Vec<String> = Vec::with_capacity(2);
        if let Some(c) = block_comment(doc) { lines.push(format!("  {}", c)); }
        lines.push(format!("  {}: {}", key, value));
        parts.push(lines.join("\n"));
    }
    parts.push("}".to_string());
    parts.join("\n")
}

/// `{ ... }` body with one `name: value` line per property, each optionally preceded by
/// its description as a doc comment.
pub fn write_interface_body(properties: &[FieldDescriptor], description: Option<&str>) -> String {
    render_body(
        properties.iter().map(|p| (property_key(&p.name, false), p.value.as_str(), p.description.as_deref())),
        description,
    )
}

pub fn write_interface(name: &str, exported: bool, properties: &[FieldDescriptor], description: Option<&str>) -> String {
    let prefix = if exported { "export" } else { "" };
    format!("{} interface {} {}", prefix, name, write_interface_body(properties, description))
}

/// A field of the merged `<identifier>` type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedField {
    pub name: String,
    /// Distinct type expressions across entries, first-appearance order.
    pub values: Vec<String>,
    /// Missing from at least one entry.
    pub optional: bool,
}

/// Every field name seen in any entry, in first-appearance order.
pub fn merged_fields(entries: &[ShapeEntry]) -> Vec<MergedField> {
    let mut out: Vec<MergedField> = Vec::new();
    let mut present: Vec<usize> = Vec::new();
    for e in entries {
        let mut seen_here: Vec<usize> = Vec::new();
        for p in &e.properties {
            let idx = match out.iter().position(|f| f.name == p.name) {
                Some(i) => i,
                None => {
                    out.push(MergedField { name: p.name.clone(), values: Vec::new(), optional: false });
                    present.push(0);
                    out.len() - 1
                }
            };
            if !out[idx].values.contains(&p.value) { out[idx].values.push(p.value.clone()); }
            if !seen_here.contains(&idx) {
                seen_here.push(idx);
                present[idx] += 1;
            }
        }
    }
    for (f, n) in out.iter_mut().zip(&present) { f.optional = *n < entries.len(); }
    out
}

/// Full content of `<identifier>.ts` for already sorted and deduplicated entries.
pub fn render_identifier_module(identifier: &str, entries: &[ShapeEntry]) -> Result<String, serde_json::Error> {
    let mut keyed: Vec<String> = Vec::with_capacity(entries.len());
    for e in entries {
        keyed.push(format!("[{}]: {}", serde_json::to_string(&e.description)?, write_interface_body(&e.properties, None)));
    }
    let map_body = format!("  {}", keyed.join("\n").replace('\n', "\n  "));

    let merged: Vec<(String, String)> = merged_fields(entries)
        .into_iter()
        .map(|f| (property_key(&f.name, f.optional), f.values.join(" | ")))
        .collect();

    let mut lines: Vec<String> = HEADER.iter().map(|s| s.to_string()).collect();
    lines.push(String::new());
    lines.push(format!("export interface {}_QueryTypeMap {{", identifier));
    lines.push(map_body);
    lines.push("}".to_string());
    lines.push(String::new());
    lines.push(format!("export type {0}_UnionType = {0}_QueryTypeMap[keyof {0}_QueryTypeMap]", identifier));
    lines.push(String::new());
    lines.push(format!("export type {} = {}", identifier, render_body(merged.iter().map(|(k, v)| (k.clone(), v.as_str(), None)), None)));
    lines.push(String::new());
    lines.push(format!("{}{}", meta_declaration(identifier), serde_json::to_string(entries)?));
    lines.push(String::new());
    Ok(lines.join("\n"))
}

/// Content of `index.ts` for the given identifiers (rendered in the order given).
pub fn render_index(known: &[String]) -> String {
    let mut lines: Vec<String> = HEADER.iter().map(|s| s.to_string()).collect();
    lines.extend(known.iter().map(|n| format!("import {{{0}}} from './{0}'", n)));
    lines.push(String::new());
    lines.extend(known.iter().map(|n| format!("export {{{}}}", n)));
    lines.push(String::new());
    let props: Vec<FieldDescriptor> = known
        .iter()
        .map(|n| FieldDescriptor { name: n.clone(), value: n.clone(), description: None })
        .collect();
    lines.push(write_interface("KnownTypes", true, &props, None));
    lines.push(String::new());
    lines.push("/** runtime-accessible object with phantom type information of query results. */".to_string());
    lines.push("export const knownTypes: KnownTypes = {".to_string());
    lines.extend(known.iter().map(|n| format!("  {0}: {{}} as {0},", n)));
    lines.push("}".to_string());
    lines.push(String::new());
    lines.join("\n")
}

/// Recover the entries from a previously rendered identifier module. `Ok(None)` when the
/// module carries no metadata line.
pub fn parse_identifier_module(identifier: &str, content: &str) -> Result<Option<Vec<ShapeEntry>>, serde_json::Error> {
    let decl = meta_declaration(identifier);
    let Some(line) = content.lines().map(str::trim).find(|l| l.starts_with(decl.as_str())) else { return Ok(None) };
    let entries: Vec<ShapeEntry> = serde_json::from_str(&line[decl.len()..])?;
    Ok(Some(entries))
}

#[cfg(test)]
#[path = "codegen_tests.rs"]
mod codegen_tests;
