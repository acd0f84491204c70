//! Personal credential manager backed by AWS SSM Parameter Store.
//!
//! Stores username/password pairs grouped by service under a configured
//! parameter path. Service and user names are reversibly obfuscated before
//! they become backend keys, so plaintext names never appear in the backend.
//!
//! ## Modules
//! - `cli` — Command-line handlers
//! - `core` — Storage engine (vault, service, credential, codec, backend)
//! - `models` — Config and credentials-file data structures
//! - `util` — Password generation

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod util;
