//! Core domain types and analytics for benchtrack: performance records,
//! benchmark datasets, summaries, version comparisons and percentile projection.

pub mod columns;
pub mod commits;
pub mod compare;
pub mod config;
pub mod dataset;
pub mod error;
pub mod percentile;
pub mod record;
mod stats;
pub mod summary;

pub use columns::{display_name, DisplayTable, LATENCY_METRICS, THROUGHPUT_METRICS, TRACKED_METRICS};
pub use commits::{commit_descriptors, engine_versions, CommitDescriptor};
pub use compare::{compare_table, relative_delta, Comparison, UNDEFINED_DELTA};
pub use config::{AnalyticsConfig, BenchtrackConfig, DatasourceConfig, StoreConfig};
pub use dataset::{BenchmarkRow, BenchmarkTable};
pub use error::{CoreError, CoreResult};
pub use percentile::{PercentileFamilies, PercentileSelection, AVERAGE_TOKEN};
pub use record::{Meta, MetaValue, PerformanceRecord, RecordKind, RESERVED_DOCUMENT_KEYS};
pub use summary::summary_table;
