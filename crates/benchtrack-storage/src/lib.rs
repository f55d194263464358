//! Persistence side of benchtrack: metrics stores, dataset loading and publishing.

pub mod datasource;
pub mod error;
pub mod metrics_store;
pub mod publisher;

pub use datasource::{load_bench_results, load_ci_results, DatasourceUri};
pub use error::{Error, Result};
pub use metrics_store::{
    AmbientCredentialChain, AutoMetricsStore, AwsEndpoint, CredentialChain, MemoryMetricsStore,
    MetricsStore, MetricsStoreBuilder, OpenSearchStore, StaticCredentialChain, StoreScheme,
    StoreUri,
};
pub use publisher::{publish_records, PublishReport, PushOutcome};
