//! Centralized constants for paths, limits, and generator defaults.

/// Directory under $HOME holding the config file.
pub const CONFIG_DIR: &str = ".credvault";

/// Config file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

/// Permission mode for files containing secrets (backups, config).
pub const SECRET_FILE_MODE: u32 = 0o600;

/// Default worker bound for bulk adds and service discovery.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 3;

/// Upper bound in milliseconds for the random delay before each bulk-add
/// write, spreading load to reduce backend throttling.
pub const ADD_JITTER_MS: u64 = 100;

/// Number of dictionary words concatenated into a generated password.
pub const NUM_WORDS_IN_PASS: usize = 4;

/// Maximum random character substitutions attempted in one candidate.
pub const MAX_CHAR_SWAPS: usize = 5;

/// Inner budget for finding a substitutable character in a candidate.
pub const MAX_SUB_ATTEMPTS: usize = 1000;

/// Whole-candidate retry budget before the generator settles for the
/// last candidate it built.
pub const MAX_GENERATE_ATTEMPTS: usize = 100;

/// Default minimum length for generated passwords.
pub const DEFAULT_MIN_PASS_LEN: usize = 16;

/// Default maximum length for generated passwords.
pub const DEFAULT_MAX_PASS_LEN: usize = 40;
