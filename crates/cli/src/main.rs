use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use resultsync_core::model::TestCompletion;
use resultsync_core::{FileConfig, SyncConfig};
use resultsync_engine::memory::{RecordingIssueTracker, RecordingTestManagement};
use resultsync_engine::{IssueTracker, Reporter, Services, TestManagement};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "resultsync", version, about = "Sync test results to Zephyr Scale and Jira")]
struct Cli {
    /// TOML config file. Environment variables override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON-lines file with one test completion per line.
    #[arg(long)]
    results: PathBuf,

    /// Log filter, e.g. info or resultsync_engine=debug
    #[arg(long, default_value = "info")]
    log: String,

    /// Record requests in memory instead of calling the services.
    #[arg(long)]
    dry_run: bool,
}

struct DryRun {
    tm: Arc<RecordingTestManagement>,
    tracker: Arc<RecordingIssueTracker>,
}

impl DryRun {
    fn new() -> Self {
        Self {
            tm: Arc::new(RecordingTestManagement::new()),
            tracker: Arc::new(RecordingIssueTracker::new()),
        }
    }

    fn services(&self, config: &SyncConfig) -> Services {
        Services {
            test_management: config
                .zephyr
                .as_ref()
                .map(|_| self.tm.clone() as Arc<dyn TestManagement>),
            issue_tracker: config
                .jira
                .as_ref()
                .map(|_| self.tracker.clone() as Arc<dyn IssueTracker>),
        }
    }

    fn summarize(&self) {
        for upsert in self.tm.upserts() {
            info!(
                test_case = %upsert.test_case_key,
                cycle = %upsert.test_cycle_key,
                status = %upsert.status_name,
                "dry run: would upsert execution"
            );
        }
        info!(
            creates = self.tracker.create_calls(),
            transitions = self.tracker.transition_calls().len(),
            "dry run: issue tracker requests"
        );
    }
}

fn read_completions(path: &Path, contents: &str) -> Result<Vec<TestCompletion>> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("{}:{}: invalid test completion", path.display(), n + 1))
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::try_new(&cli.log).context("parse --log filter")?)
        .init();

    let file = match &cli.config {
        Some(path) => FileConfig::load_from(path).context("load config")?,
        None => FileConfig::default(),
    };
    let config = SyncConfig::from_env(file).context("resolve config")?;

    let contents = tokio::fs::read_to_string(&cli.results)
        .await
        .with_context(|| format!("read {}", cli.results.display()))?;
    let completions = read_completions(&cli.results, &contents)?;

    let dry_run = cli.dry_run.then(DryRun::new);
    let services = match &dry_run {
        Some(d) => d.services(&config),
        None => Services::http(&config),
    };

    let mut reporter = Reporter::new(&config, services);
    reporter.on_begin(completions.len());
    for completion in completions {
        reporter.on_test_end(completion);
    }
    let report = reporter.on_end().await;

    info!("{report}");
    if let Some(d) = &dry_run {
        d.summarize();
    }
    for (key, err) in &report.failed {
        eprintln!("{key}: {err}");
    }
    Ok(())
}
