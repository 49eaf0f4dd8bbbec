//! # CLI Module
//!
//! This module defines the command-line interface for VersionLens using `clap`.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `check` | Audit the repository, optionally fixing what can be fixed |
//! | `plan` | Audit and list the fixes that would be applied |
//! | `fix` | Interactively apply the planned fixes |
//! | `snapshot` | Save the repository state as JSON |
//!
//! ## Global Options
//!
//! - `-v, --verbose` - Increase verbosity level (use multiple times: -v, -vv, -vvv)
//! - `-c, --config <FILE>` - Path to configuration file
//! - `-C, --directory <DIR>` - Checkout used for marketplace checks
//! - `--repository`, `--token`, `--api-url` - Target repository
//!
//! Every configuration key is also a flag, falling back to the GitHub Actions
//! `INPUT_<KEY>` environment variable, so the binary runs unchanged as an
//! action step:
//!
//! ```bash
//! # Audit a repository
//! versionlens --repository octo/action check
//!
//! # Fix everything that can be fixed, using branches for floating versions
//! versionlens --repository octo/action --floating-versions-use branches check --auto-fix
//!
//! # Work offline against a recorded state
//! versionlens snapshot -o state.json
//! versionlens plan --snapshot state.json --format json
//! ```

pub mod commands;
pub mod exit_codes;
pub mod output;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::loader::{
    KEY_CHECK_MARKETPLACE, KEY_CHECK_MINOR_VERSION, KEY_CHECK_RELEASES,
    KEY_CHECK_RELEASE_IMMUTABILITY, KEY_FLOATING_VERSIONS_USE, KEY_IGNORE_PREVIEW_RELEASES,
    KEY_IGNORE_VERSIONS,
};
use crate::config::ConfigInputs;
use commands::{CheckArgs, FixArgs, PlanArgs, SnapshotArgs};

/// VersionLens - Audit and repair the version refs and releases of a GitHub Action
#[derive(Parser, Debug)]
#[command(name = "versionlens")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Checkout used for marketplace checks (defaults to current directory)
    #[arg(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    #[command(flatten)]
    pub repo: RepoArgs,

    #[command(flatten)]
    pub settings: SettingsArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Audit the repository and report issues
    Check(CheckArgs),

    /// Audit the repository and show the fixes that would be applied
    Plan(PlanArgs),

    /// Apply fixes after confirmation
    Fix(FixArgs),

    /// Save the repository state as a JSON snapshot
    Snapshot(SnapshotArgs),
}

/// Target repository and credentials
#[derive(Args, Debug, Clone, Default)]
pub struct RepoArgs {
    /// Repository as owner/name
    #[arg(long, global = true, env = "GITHUB_REPOSITORY", value_name = "OWNER/NAME")]
    pub repository: Option<String>,

    /// GitHub token (falls back to GITHUB_TOKEN)
    #[arg(long, global = true, env = "INPUT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// GitHub API base URL
    #[arg(long, global = true, env = "GITHUB_API_URL", value_name = "URL")]
    pub api_url: Option<String>,
}

/// Configuration keys as flags; these override the configuration file
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// Ref kind for floating versions (tags, branches)
    #[arg(long, global = true, env = "INPUT_FLOATING-VERSIONS-USE", value_name = "KIND")]
    pub floating_versions_use: Option<String>,

    /// Skip prerelease-backed patches when resolving aliases (true, false)
    #[arg(long, global = true, env = "INPUT_IGNORE-PREVIEW-RELEASES", value_name = "BOOL")]
    pub ignore_preview_releases: Option<String>,

    /// Require and track vX.Y aliases (true, false)
    #[arg(long, global = true, env = "INPUT_CHECK-MINOR-VERSION", value_name = "BOOL")]
    pub check_minor_version: Option<String>,

    /// Release checks level (error, warning, none)
    #[arg(long, global = true, env = "INPUT_CHECK-RELEASES", value_name = "LEVEL")]
    pub check_releases: Option<String>,

    /// Release immutability level (error, warning, none)
    #[arg(long, global = true, env = "INPUT_CHECK-RELEASE-IMMUTABILITY", value_name = "LEVEL")]
    pub check_release_immutability: Option<String>,

    /// Marketplace metadata level (error, warning, none)
    #[arg(long, global = true, env = "INPUT_CHECK-MARKETPLACE", value_name = "LEVEL")]
    pub check_marketplace: Option<String>,

    /// Versions to ignore: comma or newline separated globs, or a JSON array
    #[arg(long, global = true, env = "INPUT_IGNORE-VERSIONS", value_name = "PATTERNS")]
    pub ignore_versions: Option<String>,
}

impl SettingsArgs {
    /// Flags that were given, as configuration inputs
    pub fn to_inputs(&self) -> ConfigInputs {
        let mut inputs = ConfigInputs::new();
        inputs.set_opt(KEY_FLOATING_VERSIONS_USE, self.floating_versions_use.clone());
        inputs.set_opt(
            KEY_IGNORE_PREVIEW_RELEASES,
            self.ignore_preview_releases.clone(),
        );
        inputs.set_opt(KEY_CHECK_MINOR_VERSION, self.check_minor_version.clone());
        inputs.set_opt(KEY_CHECK_RELEASES, self.check_releases.clone());
        inputs.set_opt(
            KEY_CHECK_RELEASE_IMMUTABILITY,
            self.check_release_immutability.clone(),
        );
        inputs.set_opt(KEY_CHECK_MARKETPLACE, self.check_marketplace.clone());
        inputs.set_opt(KEY_IGNORE_VERSIONS, self.ignore_versions.clone());
        inputs
    }
}
