//! Storage engine: vault, service, credential, codec, and backends.

pub mod codec;
pub mod credential;
pub mod error;
pub mod pool;
pub mod service;
pub mod ssm;
pub mod store;
pub mod vault;
