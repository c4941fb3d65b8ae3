//! Dynamic schema management over live relational catalogs.
//!
//! Builds generic admin tooling for tables that are not known at compile
//! time: a whitelist of manageable tables, TTL-cached schema metadata with
//! heuristic fallbacks, an injection-safe list-query builder with FK-validated
//! joins, runtime-bound record CRUD, form/validation inference, and a schema
//! change planner with idempotent DDL application.

pub use async_trait::async_trait;
pub use dynschema_conn as conn;
pub use dynschema_error as error;
pub use dynschema_query as query;

mod binding;
mod cache;
mod form;
mod generic_query;
mod ident;
mod meta;
mod meta_store;
mod planner;
mod record;
mod types;
mod whitelist;

pub use binding::{KeyKind, TableBinding};
pub use cache::{CacheKey, CachedValue, Facet, MetaCache};
pub use form::{
    FieldDescriptor, FormBuilder, RelationTarget, WidgetKind, DEFAULT_SEARCH_LIMIT,
};
pub use generic_query::{DynamicQueryBuilder, SelectedKey, EMPTY_QUERY};
pub use ident::{pluralize, sanitize_identifier, singularize};
pub use meta::{SchemaMetadata, COMMON_LABEL_COLUMNS};
pub use meta_store::{DisplayTemplate, MetaStore, TableMetaOverride, META_TABLE};
pub use planner::{
    ApplyReport, ChangeAnalysis, FieldAddition, FieldType, Impact, RelationAddition, RelationType,
    SchemaChangeItem, SchemaPlanner,
};
pub use record::{DynamicRecord, DynamicRepository, ListOptions};
pub use types::{parse_native_type, parse_quoted_options, ColumnKind, ColumnMeta, ForeignKeyMeta};
pub use whitelist::{TableWhitelist, EXCLUDED_TABLES};
