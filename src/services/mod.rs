pub mod scheduler;
pub mod schema_sync;
pub mod source_reader;
pub mod stream_load;
pub mod sync_service;

pub use scheduler::{next_occurrence, SchedulerHandle, SyncScheduler};
pub use schema_sync::SchemaReconciler;
pub use source_reader::SourceReader;
pub use stream_load::StreamLoader;
pub use sync_service::SyncService;
