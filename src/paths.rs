//! Path and environment defaults for cplnform
//!
//! # Environment Variables
//!
//! - `CPLN_ORG` - Org to manage
//! - `CPLN_ENDPOINT` - Management API endpoint
//! - `CPLN_TOKEN` - Token sent in the `Authorization` header
//!
//! Paths given on the command line may use `~` and `$VARS`.

use std::path::PathBuf;

/// Environment variable for the org
pub const ENV_ORG: &str = "CPLN_ORG";

/// Environment variable for the API endpoint
pub const ENV_ENDPOINT: &str = "CPLN_ENDPOINT";

/// Environment variable for the API token
pub const ENV_TOKEN: &str = "CPLN_TOKEN";

/// Declared configuration, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "cpln.toml";

/// Local state, relative to the working directory
pub const DEFAULT_STATE_FILE: &str = ".cplnform/state.json";

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
