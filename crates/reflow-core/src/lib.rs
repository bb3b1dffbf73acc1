//! The reflow engine: a recurring-event autoplanner's constraint-satisfaction
//! core, plus the ambient persistence, config, and timezone layers a
//! complete crate needs around it.
//!
//! The core (time/pattern/instance/domain/chain/propagate/search/fallback/
//! conflict/reflow) is synchronous and total: every call returns a value,
//! and internal impossibilities become [`conflict::Conflict`]s rather than
//! errors. [`error::CoreError`] is raised only by the adapter layer and by
//! validation ahead of the core.
//!
//! ```no_run
//! # async fn run() -> Result<(), reflow_core::error::CoreError> {
//! use reflow_core::db;
//! use reflow_core::repository::{Repository, SnapshotRepository, SqliteRepository};
//!
//! let pool = db::establish_connection("reflow.db").await?;
//! db::run_migrations(&pool).await?;
//! let repo = SqliteRepository::new(pool);
//! let _ = &repo as &dyn Repository;
//! # Ok(())
//! # }
//! ```

pub mod chain;
pub mod config;
pub mod conflict;
pub mod db;
pub mod domain;
pub mod error;
pub mod facade;
pub mod fallback;
pub mod instance;
pub mod models;
pub mod pattern;
pub mod propagate;
pub mod reflow;
pub mod reminders;
pub mod repository;
pub mod search;
pub mod time;
pub mod timezone;
