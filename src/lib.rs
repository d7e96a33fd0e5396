// Organization registry library
// Exposes the workflow core, storage and HTTP surface for the binary and tests

pub mod api;
pub mod config;
pub mod database;
pub mod documents;
pub mod error;
pub mod models;
pub mod observability;
pub mod registry;
pub mod shutdown;
pub mod store;
pub mod telemetry;
pub mod workflow;

// Re-export key types for easy access
pub use config::{config, RegistryConfig};
pub use database::DatabaseManager;
pub use documents::{BlobStore, DocumentGenerator, DocumentPipeline};
pub use error::{ErrorKind, RegistryError, Result};
pub use observability::{OperationTimer, WorkflowMetrics};
pub use registry::{Committed, PendingTransition, Registry};
pub use telemetry::{create_workflow_span, generate_correlation_id, init_telemetry, shutdown_telemetry};
pub use workflow::{Actor, ReviewStatus, Role, StatusAction, StatusTransition};
