pub mod cache;
pub mod config;
pub mod handlers;
pub mod ingest;
pub mod lookup;
pub mod metrics;
pub mod middleware;
pub mod observability;
pub mod server;

pub use cache::{BoundedCache, CacheStats, OrderCache};
pub use config::{AppConfig, CacheConfig, PostgresStorageConfig, ServerConfig, StorageBackend};
pub use ingest::{IngestError, IngestPipeline, MessageOutcome};
pub use lookup::{LookupResult, LookupService};
pub use observability::init_tracing;
pub use server::{AppState, OrderflowServer, ServerBuilder, build_app, warmup_cache};
