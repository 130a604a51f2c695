//!
//! pgtypegen CLI
//! -------------
//! Runs a list of queries against a live Postgres database through the observer so that
//! each tagged query's result shape is merged into the generated modules.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use pgtypegen::pg::PgExecutor;
use pgtypegen::store::DuplicatePolicy;
use pgtypegen::{setup_typegen, AppError, SqlQuery, TypegenSettings};

#[derive(Debug, Deserialize)]
struct QuerySpec {
    /// Logical identifier; untagged when absent.
    #[serde(default)]
    identifier: Option<String>,
    sql: String,
    #[serde(default)]
    values: Vec<JsonValue>,
}

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} --queries <file.json> [--database-url <url>] [--out <dir>] [--settings <typegen.json>] [--reset] [--keep-latest]\n\nFlags:\n  --queries <file>         JSON array of {{\"identifier\", \"sql\", \"values\"}} to execute\n  --database-url <url>     Postgres connection URL (default: $DATABASE_URL)\n  --out <dir>              Directory for generated modules (overrides settings/env)\n  --settings <file>        Settings file (known_types, write_types, reset, duplicate_policy, type_overrides)\n  --reset                  Wipe the output directory before generating\n  --keep-latest            Replace stored shapes whose query text was observed again\n  -h, --help               Show this help\n\nEnvironment:\n  PGTYPEGEN_WRITE_TYPES, PGTYPEGEN_RESET, PGTYPEGEN_DUPLICATE_POLICY, RUST_LOG"
    );
}

fn take_value(args: &[String], i: usize, flag: &str, program: &str) -> String {
    match args.get(i + 1) {
        Some(v) => v.clone(),
        None => { eprintln!("{} requires a value", flag); print_usage(program); std::process::exit(2); }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let mut args: Vec<String> = env::args().collect();
    let program = args.remove(0);

    let mut queries_path: Option<PathBuf> = None;
    let mut database_url: Option<String> = env::var("DATABASE_URL").ok();
    let mut out_dir: Option<PathBuf> = None;
    let mut settings_path: Option<PathBuf> = None;
    let mut reset = false;
    let mut keep_latest = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--queries" => { queries_path = Some(PathBuf::from(take_value(&args, i, "--queries", &program))); i += 2; }
            "--database-url" => { database_url = Some(take_value(&args, i, "--database-url", &program)); i += 2; }
            "--out" => { out_dir = Some(PathBuf::from(take_value(&args, i, "--out", &program))); i += 2; }
            "--settings" => { settings_path = Some(PathBuf::from(take_value(&args, i, "--settings", &program))); i += 2; }
            "--reset" => { reset = true; i += 1; }
            "--keep-latest" => { keep_latest = true; i += 1; }
            "-h" | "--help" => { print_usage(&program); return Ok(()); }
            other => { eprintln!("unknown argument: {}", other); print_usage(&program); std::process::exit(2); }
        }
    }

    let Some(queries_path) = queries_path else { print_usage(&program); std::process::exit(2) };
    let Some(database_url) = database_url else {
        eprintln!("--database-url (or DATABASE_URL) is required");
        std::process::exit(2)
    };

    let mut settings = match &settings_path {
        Some(p) => TypegenSettings::load(p)?,
        None => TypegenSettings::default(),
    };
    settings.apply_env()?;
    if let Some(dir) = out_dir { settings.write_types = Some(dir); }
    if reset { settings.reset = true; }
    if keep_latest { settings.duplicate_policy = DuplicatePolicy::KeepLatest; }
    if settings.write_types.is_none() {
        eprintln!("no output directory: pass --out, set write_types in settings or PGTYPEGEN_WRITE_TYPES");
        std::process::exit(2);
    }

    let raw = std::fs::read(&queries_path).with_context(|| format!("read {}", queries_path.display()))?;
    let specs: Vec<QuerySpec> = serde_json::from_slice(&raw).with_context(|| format!("parse {}", queries_path.display()))?;

    let typegen = setup_typegen(settings.into_config()?)?;
    let client = typegen.client(PgExecutor::connect(&database_url).await?);
    info!(target: "pgtypegen", "running {} queries from '{}'", specs.len(), queries_path.display());

    let mut query_errors: Vec<AppError> = Vec::new();
    for spec in specs {
        let q = match &spec.identifier {
            Some(id) => typegen.sql(id).query(spec.sql, spec.values),
            None => SqlQuery::new(spec.sql, spec.values),
        };
        match client.query(&q).await {
            Ok(r) => info!(target: "pgtypegen", "{} row(s), {} field(s) [{}]", r.rows.len(), r.fields.len(), spec.identifier.as_deref().unwrap_or("untagged")),
            Err(e) => {
                let err = AppError::from(e);
                error!(target: "pgtypegen", "query failed: {}", err);
                query_errors.push(err);
            }
        }
    }

    if let Err(e) = typegen.finish() {
        error!(target: "pgtypegen", "{}", e);
        std::process::exit(e.exit_code());
    }
    if let Some(first) = query_errors.first() {
        let n = query_errors.len();
        error!(target: "pgtypegen", "{} quer{} failed", n, if n == 1 { "y" } else { "ies" });
        std::process::exit(first.exit_code());
    }
    Ok(())
}
