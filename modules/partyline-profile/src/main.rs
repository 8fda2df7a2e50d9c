use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use partyline_common::{ActivityLog, AggregateOutcome, Config, ProfileDirectory, Snapshot, SurveyAnswer};
use partyline_profile::{
    build_baseline, merge, parse_baseline, parse_delta, project, AggregateService, Cooldown,
    MemoryStore, RefreshOutcome,
};

#[derive(Parser)]
#[command(name = "partyline", about = "Political profile snapshots and party aggregates")]
#[command(version)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fold an oracle delta into a snapshot
    Merge {
        /// Prior snapshot JSON. Omit for a first analysis.
        #[arg(long)]
        prior: Option<PathBuf>,

        /// Raw oracle delta response
        delta: PathBuf,
    },

    /// Build a first snapshot from a questionnaire analysis
    Baseline {
        /// Raw oracle baseline response
        analysis: PathBuf,

        /// Questionnaire answers JSON
        #[arg(long)]
        answers: Option<PathBuf>,
    },

    /// Project a snapshot onto the compass
    Compass {
        snapshot: PathBuf,
    },

    /// Rebuild the party aggregate
    Aggregate {
        /// JSON array of {"user_id", "snapshot"} records
        snapshots: PathBuf,

        /// Active profiles JSON object (user id to display name)
        #[arg(long)]
        profiles: Option<PathBuf>,

        /// Activity log JSON ({"messages", "updates"})
        #[arg(long)]
        activity: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct MemberRecord {
    user_id: Uuid,
    snapshot: Snapshot,
}

#[derive(Serialize)]
struct MergeOutput<'a> {
    snapshot: &'a Snapshot,
    repairs: Vec<String>,
    confidence: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::from_default_env().add_directive("partyline=info".parse()?);
    if cli.json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let config = Config::from_env()?;
    config.log();

    match cli.command {
        Commands::Merge { prior, delta } => run_merge(prior.as_deref(), &delta),
        Commands::Baseline { analysis, answers } => run_baseline(&analysis, answers.as_deref()),
        Commands::Compass { snapshot } => {
            let snapshot: Snapshot = read_json(&snapshot)?;
            print_json(&project(&snapshot))
        }
        Commands::Aggregate {
            snapshots,
            profiles,
            activity,
        } => run_aggregate(&config, &snapshots, profiles.as_deref(), activity.as_deref()).await,
    }
}

fn run_merge(prior: Option<&Path>, delta: &Path) -> Result<()> {
    let prior: Option<Snapshot> = prior.map(read_json).transpose()?;
    let parsed = parse_delta(&read_text(delta)?);
    let next = merge(prior.as_ref(), &parsed.delta);

    info!(
        created = prior.is_none(),
        repairs = parsed.repairs.len(),
        issues = next.issues.len(),
        "Merge complete"
    );
    print_json(&MergeOutput {
        snapshot: &next,
        repairs: parsed.repairs.iter().map(ToString::to_string).collect(),
        confidence: parsed.confidence,
    })
}

fn run_baseline(analysis: &Path, answers: Option<&Path>) -> Result<()> {
    let answers: Vec<SurveyAnswer> = match answers {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };
    let parsed = parse_baseline(&read_text(analysis)?);
    let snapshot = build_baseline(&answers, &parsed.analysis);
    print_json(&snapshot)
}

async fn run_aggregate(
    config: &Config,
    snapshots: &Path,
    profiles: Option<&Path>,
    activity: Option<&Path>,
) -> Result<()> {
    let members: Vec<MemberRecord> = read_json(snapshots)?;
    let activity: ActivityLog = match activity {
        Some(path) => read_json(path)?,
        None => ActivityLog::default(),
    };

    let mut store = MemoryStore::new()
        .with_snapshots(members.into_iter().map(|m| (m.user_id, m.snapshot)))
        .with_messages(activity.messages)
        .with_updates(activity.updates);
    if let Some(path) = profiles {
        store = store.with_profiles(read_json::<ProfileDirectory>(path)?);
    }

    let service = AggregateService::builder()
        .store(Arc::new(store))
        .gate(Arc::new(Cooldown::from_secs(config.aggregate_cooldown_secs)))
        .window_days(config.activity_window_days)
        .build();

    match service.refresh(chrono::Utc::now()).await? {
        RefreshOutcome::Refreshed(aggregate) => print_json(&AggregateOutcome::Built(aggregate)),
        RefreshOutcome::NoData => print_json(&AggregateOutcome::NoData),
        RefreshOutcome::CoolingDown { retry_after } => {
            bail!("aggregate cooling down, retry in {}s", retry_after.num_seconds())
        }
    }
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = read_text(path)?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
