pub mod error;
pub mod registry;
pub mod shape;
pub mod codegen;
pub mod store;
pub mod query;
pub mod observer;
pub mod config;
pub mod typegen;
pub mod pg;

pub use config::{TypegenConfig, TypegenSettings, WriteTypes};
pub use error::{AppError, AppResult};
pub use observer::{QueryObserver, SqlTags, TaggedSql};
pub use query::{ObservedClient, QueryExecutor, QueryResult, SqlQuery};
pub use typegen::{setup_typegen, setup_typegen_with_store, Typegen};
