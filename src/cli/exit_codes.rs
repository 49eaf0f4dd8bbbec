//! Exit codes for the CLI
//!
//! Standard exit codes used by VersionLens for CI/CD integration.
//!
//! # Exit Code Reference
//!
//! | Code | Constant | Meaning | Example |
//! |------|----------|---------|---------|
//! | 0 | `SUCCESS` | Success | No unresolved errors, warnings only |
//! | 1 | `UNRESOLVED_ERRORS` | Unresolved errors | Missing `v1`, fix failed or unfixable |
//! | 3 | `ERROR` | Runtime error | Network error, unreadable snapshot |
//! | 4 | `INVALID_ARGS` | Invalid arguments | Unknown check level, bad glob |
//!
//! # Usage
//!
//! ```rust,ignore
//! use versionlens::cli::exit_codes;
//!
//! std::process::exit(exit_codes::UNRESOLVED_ERRORS);
//! ```

/// Success - no `error` issue remains unresolved.
pub const SUCCESS: i32 = 0;

/// At least one `error` issue is still unresolved after the run.
///
/// Used when:
/// - An audit reports errors and no fix was attempted
/// - A fix failed, was unfixable, or needs manual intervention
pub const UNRESOLVED_ERRORS: i32 = 1;

/// Runtime error (network error, unreadable file, etc.).
///
/// Used when:
/// - The GitHub API could not be reached or kept failing
/// - A snapshot could not be read, parsed or written
/// - The action descriptor is not valid YAML
pub const ERROR: i32 = 3;

/// Invalid arguments or configuration.
///
/// Used when:
/// - A configuration value is outside its allowed set
/// - An ignore pattern is not a valid glob
/// - An unknown category is passed to `--only` or `--skip`
/// - No repository was given
pub const INVALID_ARGS: i32 = 4;
