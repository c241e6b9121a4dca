// Infrastructure layer - External dependencies and adapters
pub mod chunked_stream;
pub mod config;
pub mod csv_codec;
pub mod file_store;
pub mod http_response;
pub mod memory_store;
pub mod open_weather;
pub mod yahoo_finance;
