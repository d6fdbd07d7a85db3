pub mod event_processor;
pub mod metadata_transformer;
pub mod sync_client;
pub mod token_manager;

pub use event_processor::{EventProcessor, EventProcessorTrait};
pub use metadata_transformer::MetadataTransformer;
pub use sync_client::SyncClient;
pub use token_manager::TokenManager;
