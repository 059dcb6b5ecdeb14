//! Declarative schema synchronization for MySQL-family databases.
//!
//! `schemasync-core` is the pure half of the synchronizer: it knows nothing
//! about connections or runtimes. It turns a schema file into a model, diffs
//! two models, and renders the delta as ordered DDL.
//!
//! # Architecture
//!
//! - **Schema** - the shared model both the parser and the introspector
//!   produce, with the normalization rules that keep them comparable
//! - **Parser** - a tolerant `CREATE TABLE` parser for dump-style input
//! - **Differ** - computes a structural [`diff::Delta`] between two schemas
//! - **DDL** - renders tables and changes as MySQL statements
//! - **Planner** - orders the statements so drops precede adds and creates
//!   precede alters
//!
//! # Example
//!
//! ```
//! use schemasync_core::prelude::*;
//!
//! let desired = parse_schema(
//!     "CREATE TABLE `users` (
//!        `id` int(11) NOT NULL AUTO_INCREMENT,
//!        `email` varchar(255) NOT NULL DEFAULT '',
//!        PRIMARY KEY (`id`)
//!      ) ENGINE=InnoDB;",
//! )
//! .unwrap();
//!
//! let current = Schema::new();
//! let plan = synchronize(&current, &desired, &DiffOptions::new());
//! assert_eq!(plan.len(), 1);
//! assert!(plan.statements[0].starts_with("CREATE TABLE `users`"));
//! ```

pub mod ddl;
pub mod diff;
pub mod error;
pub mod parser;
pub mod plan;
pub mod schema;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::ddl::{quote_identifier, render_create_table};
    pub use crate::diff::{ColumnChange, Delta, DiffOptions, Differ, TableDelta};
    pub use crate::error::{Error, Result};
    pub use crate::parser::parse_schema;
    pub use crate::plan::{Plan, build_plan, normalize_script, render_schema, synchronize};
    pub use crate::schema::{
        Column, ForeignKey, Index, PRIMARY_KEY_NAME, ReferentialAction, Schema, Table,
        TableOptions, normalize_default, normalize_type,
    };
}
