//! CLI commands module

pub mod check;
pub mod fix;
pub mod plan;
pub mod snapshot;

use clap::Args;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{RepoArgs, SettingsArgs};
use crate::config::{Config, ConfigInputs};
use crate::error::{ConfigError, VersionLensError};
use crate::providers::github::GitHubClient;
use crate::providers::memory::MemoryGitHub;
use crate::providers::GitHubApi;
use crate::rules::engine::{is_valid_category, RulesEngine, CATEGORIES};
use crate::scanner::Scanner;
use crate::state::snapshot::Snapshot;
use crate::state::{RepoContext, RepositoryState};

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Apply fixes after the audit
    #[arg(long, env = "INPUT_AUTO-FIX")]
    pub auto_fix: bool,

    /// Output format
    #[arg(short, long, default_value = "terminal")]
    pub format: OutputFormat,

    /// Audit a JSON snapshot instead of the live repository
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,

    /// Only check specific rule categories
    #[arg(long, value_delimiter = ',')]
    pub only: Option<Vec<String>>,

    /// Skip specific rule categories
    #[arg(long, value_delimiter = ',')]
    pub skip: Option<Vec<String>>,

    /// Write the resulting state back to the snapshot file after fixing
    #[arg(long, requires = "snapshot")]
    pub write_snapshot: bool,
}

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Output format
    #[arg(short, long, default_value = "terminal")]
    pub format: OutputFormat,

    /// Audit a JSON snapshot instead of the live repository
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,

    /// Only check specific rule categories
    #[arg(long, value_delimiter = ',')]
    pub only: Option<Vec<String>>,

    /// Skip specific rule categories
    #[arg(long, value_delimiter = ',')]
    pub skip: Option<Vec<String>>,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Arguments for the fix command
#[derive(Args, Debug)]
pub struct FixArgs {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Show what would be done without making changes
    #[arg(long)]
    pub dry_run: bool,

    /// Fix a JSON snapshot instead of the live repository
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,
}

/// Arguments for the snapshot command
#[derive(Args, Debug)]
pub struct SnapshotArgs {
    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Output format for check and plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Terminal,
    Json,
    /// GitHub workflow annotations
    Github,
}

/// Options shared by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub directory: Option<PathBuf>,
    pub repo: RepoArgs,
    pub settings: SettingsArgs,
}

impl GlobalArgs {
    fn directory(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Configuration file, then flags and `INPUT_*` variables
    pub fn load_config(&self) -> Result<Config, ConfigError> {
        let mut inputs = ConfigInputs::load_or_default(self.config.as_deref(), &self.directory())?;
        inputs.merge(self.settings.to_inputs());
        Config::from_inputs(&inputs)
    }

    /// Repository coordinates from flags and the environment
    pub fn repo_context(&self) -> Result<RepoContext, ConfigError> {
        let full_name = self
            .repo
            .repository
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .ok_or(ConfigError::MissingRepository)?;
        let token = self
            .repo
            .token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok());

        RepoContext::parse(full_name, token, self.repo.api_url.as_deref())
    }
}

/// Everything a command needs to audit and fix one repository
pub struct Session {
    pub config: Config,
    pub state: RepositoryState,
    pub api: Box<dyn GitHubApi>,
}

impl Session {
    /// Load the live repository, or a snapshot when one is given
    pub async fn open(
        global: &GlobalArgs,
        snapshot: Option<&Path>,
    ) -> Result<Self, VersionLensError> {
        let config = global.load_config()?;

        let (mut state, api): (RepositoryState, Box<dyn GitHubApi>) = match snapshot {
            Some(path) => {
                info!(path = %path.display(), "Loading snapshot");
                let snapshot = Snapshot::load(path)?;
                let api = MemoryGitHub::from_snapshot(&snapshot);
                (snapshot.into_state(&config), Box::new(api))
            }
            None => {
                let context = global.repo_context()?;
                let client = GitHubClient::new(context.clone())?;
                let state = RepositoryState::fetch(&client, context, &config).await?;
                (state, Box::new(client))
            }
        };

        if config.check_marketplace.is_enabled() && state.marketplace.is_none() {
            let scanner = Scanner::new(global.directory());
            debug!(root = %scanner.root().display(), "Scanning marketplace metadata");
            state.marketplace = Some(scanner.marketplace_metadata()?);
        }

        Ok(Self { config, state, api })
    }
}

/// Validate `--only`/`--skip` category names
pub fn validate_categories(key: &str, categories: &[String]) -> Result<(), ConfigError> {
    match categories.iter().find(|c| !is_valid_category(c)) {
        Some(unknown) => Err(ConfigError::InvalidCategory {
            key: key.to_string(),
            value: unknown.clone(),
            valid: CATEGORIES.join(", "),
        }),
        None => Ok(()),
    }
}

/// Build a rules engine honouring category filters
pub fn build_engine(
    config: Config,
    only: Option<&Vec<String>>,
    skip: Option<&Vec<String>>,
) -> Result<RulesEngine, ConfigError> {
    let mut engine = RulesEngine::new(config);
    if let Some(only) = only {
        validate_categories("only", only)?;
        engine.set_only_categories(only.clone());
    }
    if let Some(skip) = skip {
        validate_categories("skip", skip)?;
        engine.set_skip_categories(skip.clone());
    }
    Ok(engine)
}

/// Re-read the repository through `api` and store its refs and releases
/// in the snapshot at `path`, keeping the snapshot's other fields.
pub async fn update_snapshot(
    api: &dyn GitHubApi,
    state: &RepositoryState,
    config: &Config,
    path: &Path,
) -> Result<(), VersionLensError> {
    let fetched = RepositoryState::fetch(api, state.context.clone(), config).await?;
    let fresh = Snapshot::from_state(&fetched);

    let mut snapshot = Snapshot::load(path)?;
    snapshot.tags = fresh.tags;
    snapshot.branches = fresh.branches;
    snapshot.releases = fresh.releases;
    snapshot.save(path)?;

    info!(path = %path.display(), "Snapshot updated");
    Ok(())
}

/// Write rendered output to a file or stdout
pub fn write_output(rendered: &str, path: Option<&Path>) -> Result<(), VersionLensError> {
    match path {
        Some(path) => {
            std::fs::write(path, rendered)?;
            eprintln!("Output written to: {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}
