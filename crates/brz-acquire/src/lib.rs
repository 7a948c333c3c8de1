//! BRZ Acquisition Engine
//!
//! Bronze-layer acquisition: pulls data from heterogeneous sources
//! (relational databases, REST APIs, object-storage files) and loads it,
//! record by record, into per-target bronze tables as flat, all-string
//! schemas, ready for later typed modeling.
//!
//! # Architecture
//!
//! - **source**: uniform chunked read interface over database/API/object
//!   sources
//! - **chunk**: chunk and load-batch sizing policy
//! - **normalize**: value stringification and character-encoding repair
//! - **provision**: bronze table DDL (recreate / truncate-or-create)
//! - **load**: batched loading with a native-then-textual insert strategy
//! - **scheduler**: bounded parallel fan-out, one task per target, with
//!   per-task failure isolation
//! - **aggregate**: per-task outcomes folded into one job result
//!
//! The engine consumes [`task::ExtractionTarget`]s (source descriptor +
//! bronze table) and returns an [`aggregate::JobResult`] enumerating every
//! task's outcome. Source credentials, source CRUD, and the HTTP surface
//! live outside this crate.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use brz_acquire::config::AcquireConfig;
//! use brz_acquire::destination::PostgresStore;
//! use brz_acquire::scheduler::FanoutScheduler;
//!
//! async fn run(targets: Vec<brz_acquire::task::ExtractionTarget>) -> anyhow::Result<()> {
//!     let config = AcquireConfig::from_env()?;
//!     let pool = sqlx::PgPool::connect(&config.destination.url).await?;
//!     let scheduler = FanoutScheduler::new(Arc::new(PostgresStore::new(pool)), config);
//!     let result = scheduler.run_job(targets).await?;
//!     println!("{}", result.summary());
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod chunk;
pub mod config;
pub mod destination;
pub mod error;
pub mod load;
pub mod normalize;
pub mod pipeline;
pub mod provision;
pub mod scheduler;
pub mod source;
pub mod task;

// Re-export commonly used types
pub use aggregate::{JobResult, JobStatus};
pub use config::AcquireConfig;
pub use error::{AcquireError, AcquireResult};
pub use scheduler::FanoutScheduler;
pub use source::SourceDescriptor;
pub use task::{ExtractionTarget, LoadMode, TaskResult, TaskStatus};
