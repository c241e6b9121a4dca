// Application layer - Use cases and ports
pub mod ingestor;
pub mod key_service;
pub mod projection;
pub mod sampler;
pub mod session;
pub mod snapshot_cache;
pub mod snapshot_codec;
pub mod snapshot_store;
pub mod source_resolver;
pub mod view_spec;
