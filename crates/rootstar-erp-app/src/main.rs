//! Rootstar ERP Application
//!
//! Command-line front end for ERP biometrics. Recorded sessions (CSV with a
//! marker column) are replayed through the authentication engine, so
//! enrollment and verification can be run offline against a template
//! database file.
//!
//! # Usage
//!
//! ```bash
//! # Enroll alice from a recorded session
//! rootstar-erp --db templates.json enroll alice session1.csv
//!
//! # Verify a second session against alice's templates
//! rootstar-erp --db templates.json authenticate alice session2.csv --threshold 0.8
//!
//! # Find the best matching identity
//! rootstar-erp --db templates.json identify session3.csv
//!
//! # Equal error rate of genuine/impostor score sets
//! rootstar-erp evaluate genuine.json impostor.json
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use rootstar_erp_core::metrics::{calc_eer, confusion_matrix, roc, DEFAULT_RESOLUTION};
use rootstar_erp_core::similarity::{bounded_cosine_similarity, cosine_similarity, euclidean_similarity};
use rootstar_erp_core::{SignalContainer, StimulusEvent};
use rootstar_erp_native::{
    load_recording, AuthOptions, AuthenticationEngine, DatabaseError, EngineConfig, FlattenExtractor,
    PreprocessingPipeline, ReplayDevice, ScriptedTask, SimilarityMode, SpectralAnalyzer, TaskDescription,
    TemplateDatabase, TemplateMode,
};

/// How long the replay task keeps presenting after start
const REPLAY_TASK_DURATION: Duration = Duration::from_millis(50);

/// Rootstar ERP Application
#[derive(Parser, Debug)]
#[command(name = "rootstar-erp")]
#[command(author, version, about = "ERP-based biometric enrollment and authentication", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Engine configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Template database file (`.json` is appended when missing)
    #[arg(long, default_value = "templates.json")]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Enroll an identity from a recorded session
    Enroll {
        /// Identity to enroll
        identity: String,

        #[command(flatten)]
        session: SessionArgs,

        /// Template construction
        #[arg(long, value_enum)]
        template_mode: Option<TemplateModeArg>,
    },

    /// Verify a recorded session against one identity
    Authenticate {
        /// Claimed identity
        identity: String,

        #[command(flatten)]
        session: SessionArgs,

        #[command(flatten)]
        scoring: ScoringArgs,
    },

    /// Find the enrolled identity best matching a recorded session
    Identify {
        #[command(flatten)]
        session: SessionArgs,

        #[command(flatten)]
        scoring: ScoringArgs,
    },

    /// List enrolled identities
    Identities,

    /// Remove an identity and its templates
    Remove {
        /// Identity to remove
        identity: String,
    },

    /// Compute EER and AUC from genuine and impostor similarity scores
    Evaluate {
        /// JSON array of genuine similarity scores
        genuine: PathBuf,

        /// JSON array of impostor similarity scores
        impostor: PathBuf,

        /// Number of thresholds sampled in [0, 1]
        #[arg(short, long, default_value_t = DEFAULT_RESOLUTION)]
        resolution: usize,
    },

    /// Print the dominant frequency of each channel of a recording
    Spectrum {
        #[command(flatten)]
        session: SessionArgs,
    },
}

/// A recorded session to replay
#[derive(Args, Debug)]
struct SessionArgs {
    /// CSV recording: timestamps, channels..., Marker
    recording: PathBuf,

    /// Channels to read, by position (defaults to the CSV header)
    #[arg(long, value_delimiter = ',')]
    channels: Vec<String>,

    /// Sample rate of the recording in Hz
    #[arg(long, default_value_t = 256)]
    sample_rate: u32,

    /// Similarity metric
    #[arg(long, value_enum, default_value_t = MetricArg::BoundedCosine)]
    metric: MetricArg,
}

/// Overrides of the configured decision parameters
#[derive(Args, Debug)]
struct ScoringArgs {
    /// Acceptance threshold
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Template construction
    #[arg(long, value_enum)]
    template_mode: Option<TemplateModeArg>,

    /// Take the best pairwise similarity instead of the mean
    #[arg(long)]
    best: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum MetricArg {
    Cosine,
    BoundedCosine,
    Euclidean,
}

impl MetricArg {
    fn function(self) -> fn(&[f64], &[f64]) -> f64 {
        match self {
            Self::Cosine => cosine_similarity,
            Self::BoundedCosine => bounded_cosine_similarity,
            Self::Euclidean => euclidean_similarity,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum TemplateModeArg {
    Average,
    Single,
    Both,
}

impl From<TemplateModeArg> for TemplateMode {
    fn from(arg: TemplateModeArg) -> Self {
        match arg {
            TemplateModeArg::Average => Self::AverageTemplate,
            TemplateModeArg::Single => Self::SingleTemplates,
            TemplateModeArg::Both => Self::AverageAndSingleTemplates,
        }
    }
}

impl ScoringArgs {
    fn options(&self) -> AuthOptions {
        AuthOptions {
            threshold: self.threshold,
            template_mode: self.template_mode.map(TemplateMode::from),
            similarity_mode: self.best.then_some(SimilarityMode::BestSimilarity),
            ..AuthOptions::default()
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Rootstar ERP v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path).with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Enroll {
            identity,
            session,
            template_mode,
        } => run_enroll(&cli.db, config, &identity, &session, template_mode.map(TemplateMode::from)),
        Commands::Authenticate {
            identity,
            session,
            scoring,
        } => run_authenticate(&cli.db, config, &identity, &session, &scoring.options()),
        Commands::Identify { session, scoring } => run_identify(&cli.db, config, &session, &scoring.options()),
        Commands::Identities => {
            for identity in open_database(&cli.db)?.list_identities() {
                println!("{identity}");
            }
            Ok(())
        }
        Commands::Remove { identity } => run_remove(&cli.db, &identity),
        Commands::Evaluate {
            genuine,
            impostor,
            resolution,
        } => run_evaluate(&genuine, &impostor, resolution, config.threshold),
        Commands::Spectrum { session } => run_spectrum(&session),
    }
}

/// Load the database, starting empty when the file does not exist yet
fn open_database(path: &Path) -> anyhow::Result<TemplateDatabase> {
    match TemplateDatabase::load(path) {
        Ok(db) => Ok(db),
        Err(DatabaseError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("No database at {}, starting empty", path.display());
            Ok(TemplateDatabase::new())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to load database {}", path.display())),
    }
}

fn load_session(session: &SessionArgs) -> anyhow::Result<SignalContainer> {
    let channels = (!session.channels.is_empty()).then_some(session.channels.as_slice());
    load_recording(&session.recording, channels, session.sample_rate)
        .with_context(|| format!("Failed to load recording {}", session.recording.display()))
}

/// Engine replaying one recorded session, with every marked event as a
/// target stimulus
fn replay_engine(
    database: TemplateDatabase,
    config: EngineConfig,
    session: &SessionArgs,
) -> anyhow::Result<AuthenticationEngine> {
    let container = load_session(session)?;
    if container.events().is_empty() {
        warn!("Recording {} has no marked events", session.recording.display());
    }

    let device = ReplayDevice::from_container(&container);
    let stimuli = container.events().iter().map(|&t| StimulusEvent::target(t)).collect();
    let description = TaskDescription::new(session.recording.display().to_string());
    let task = ScriptedTask::new(description, REPLAY_TASK_DURATION).with_session(stimuli);

    Ok(AuthenticationEngine::new(
        device,
        task,
        PreprocessingPipeline::new(),
        FlattenExtractor::new(),
        session.metric.function(),
        database,
        config,
    ))
}

fn run_enroll(
    db_path: &Path,
    config: EngineConfig,
    identity: &str,
    session: &SessionArgs,
    mode: Option<TemplateMode>,
) -> anyhow::Result<()> {
    let mut engine = replay_engine(open_database(db_path)?, config, session)?;

    let count = engine.try_enroll(identity, None, mode)?;
    let written = engine.database().save(db_path)?;
    println!("Enrolled '{identity}' with {count} templates ({})", written.display());
    Ok(())
}

fn run_authenticate(
    db_path: &Path,
    config: EngineConfig,
    identity: &str,
    session: &SessionArgs,
    options: &AuthOptions,
) -> anyhow::Result<()> {
    let mut engine = replay_engine(open_database(db_path)?, config, session)?;

    if engine.authenticate(identity, options) {
        println!("ACCEPT {identity}");
    } else {
        let reason = engine.last_failure().map(ToString::to_string).unwrap_or_default();
        println!("REJECT {identity}: {reason}");
    }
    Ok(())
}

fn run_identify(
    db_path: &Path,
    config: EngineConfig,
    session: &SessionArgs,
    options: &AuthOptions,
) -> anyhow::Result<()> {
    let mut engine = replay_engine(open_database(db_path)?, config, session)?;

    match engine.try_identify(options) {
        Ok(found) => println!("ACCEPT {} (similarity {:.4})", found.identity, found.similarity),
        Err(e) => println!("REJECT: {e}"),
    }
    Ok(())
}

fn run_remove(db_path: &Path, identity: &str) -> anyhow::Result<()> {
    let mut db = open_database(db_path)?;
    if !db.contains(identity) {
        warn!("Identity '{}' is not enrolled", identity);
        return Ok(());
    }
    db.remove_identity(identity);
    db.save(db_path)?;
    println!("Removed '{identity}'");
    Ok(())
}

fn read_scores(path: &Path) -> anyhow::Result<Vec<f64>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse scores in {}", path.display()))
}

fn run_evaluate(genuine: &Path, impostor: &Path, resolution: usize, threshold: f64) -> anyhow::Result<()> {
    let p = read_scores(genuine)?;
    let n = read_scores(impostor)?;
    anyhow::ensure!(!p.is_empty() && !n.is_empty(), "Both score sets must be non-empty");

    let (eer, eer_threshold) = calc_eer(&p, &n, resolution);
    let curve = roc(&p, &n, resolution);
    let counts = confusion_matrix(&p, &n, threshold);

    println!("Genuine scores:   {}", p.len());
    println!("Impostor scores:  {}", n.len());
    println!("EER:              {eer:.4} at threshold {eer_threshold:.4}");
    println!("AUC:              {:.4}", curve.auc());
    println!(
        "At threshold {threshold:.3}: TP {} FP {} FN {} TN {}",
        counts.true_positives, counts.false_positives, counts.false_negatives, counts.true_negatives
    );
    Ok(())
}

fn run_spectrum(session: &SessionArgs) -> anyhow::Result<()> {
    let container = load_session(session)?;
    let spectrum = SpectralAnalyzer::new().power_spectrum(&container);

    for name in &spectrum.channel_names {
        match spectrum.peak_frequency(name) {
            Some(hz) => println!("{name}: {hz:.2} Hz"),
            None => println!("{name}: no data"),
        }
    }
    Ok(())
}
