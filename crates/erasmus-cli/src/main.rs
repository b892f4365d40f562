use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use erasmus_core::config_file::{ConfigFile, load_config};
use erasmus_core::{
    Advisor, AdvisorConfig, DocumentKind, GeminiClient, Period, SqliteStore,
    extract_document_text,
};
use erasmus_pdf_mupdf::MupdfExtractor;

mod output;

use output::ColorMode;

/// Erasmus advising assistant - from call summary to course matching
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the SQLite document registry
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Gemini API key (falls back to GOOGLE_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Completion model name
    #[arg(long, global = true)]
    model: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize the home university's Erasmus call (step 1)
    Summary {
        /// Home university name
        #[arg(long)]
        university: String,
    },

    /// List the universities with a registered call document
    Universities,

    /// List the departments in the home university's destinations document
    Departments {
        /// Home university name
        #[arg(long)]
        university: String,
    },

    /// Analyze partner destinations for a department and period (step 2)
    Destinations {
        /// Home university name
        #[arg(long)]
        university: String,

        /// Department name as it appears in the destinations document
        #[arg(long)]
        department: String,

        /// Mobility period: fall or spring
        #[arg(long)]
        period: Period,
    },

    /// Match a study plan against a destination's course catalog (step 3)
    Exams {
        /// Home university name
        #[arg(long)]
        university: String,

        /// Destination university name
        #[arg(long)]
        destination: String,

        /// Path to the student's study plan PDF
        #[arg(long)]
        study_plan: PathBuf,

        /// Run the destinations step first for this department
        #[arg(long, requires = "period")]
        department: Option<String>,

        /// Mobility period: fall or spring
        #[arg(long)]
        period: Option<Period>,
    },

    /// Register an institution document in the registry
    Register {
        /// Institution name
        #[arg(long)]
        university: String,

        /// Document kind: call, destinations or courses
        #[arg(long)]
        kind: DocumentKind,

        /// Path to the PDF file
        #[arg(long)]
        file: PathBuf,

        /// Academic year, e.g. 2025/2026
        #[arg(long)]
        academic_year: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config();
    let color = ColorMode(!cli.no_color);
    let mut stdout = std::io::stdout();

    // Ctrl-C aborts the in-flight step without committing session state.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    match &cli.command {
        Command::Register {
            university,
            kind,
            file,
            academic_year,
        } => {
            let store = open_store(&cli, &config)?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| file.display().to_string());
            store.add_document(
                university,
                *kind,
                &filename,
                &filename,
                file,
                academic_year.as_deref(),
            )?;
            writeln!(stdout, "Registered {kind} document '{filename}' for {university}")?;
        }

        Command::Universities => {
            let store = open_store(&cli, &config)?;
            for name in store.list_institutions()? {
                writeln!(stdout, "{name}")?;
            }
        }

        Command::Summary { university } => {
            let advisor = build_advisor(&cli, &config)?;
            let program = advisor.identify_program(university, &cancel).await?;
            output::print_program(&mut stdout, &program, color)?;
        }

        Command::Departments { university } => {
            let advisor = build_advisor(&cli, &config)?;
            let session_id = start_session(&advisor, university, &cancel).await?;
            let departments = advisor.list_departments(&session_id).await?;
            output::print_departments(&mut stdout, &departments, color)?;
        }

        Command::Destinations {
            university,
            department,
            period,
        } => {
            let advisor = build_advisor(&cli, &config)?;
            let session_id = start_session(&advisor, university, &cancel).await?;
            let destinations = advisor
                .analyze_destinations(&session_id, department, *period, &cancel)
                .await?;
            output::print_destinations(&mut stdout, &destinations, color)?;
        }

        Command::Exams {
            university,
            destination,
            study_plan,
            department,
            period,
        } => {
            let advisor = build_advisor(&cli, &config)?;
            let session_id = start_session(&advisor, university, &cancel).await?;

            // Optional step 2 first, so the analysis is period-aware.
            if let (Some(department), Some(period)) = (department, period) {
                advisor
                    .analyze_destinations(&session_id, department, *period, &cancel)
                    .await?;
            }

            let backend = MupdfExtractor::new();
            let study_plan_text = extract_document_text(&backend, study_plan)?;

            let analysis = advisor
                .analyze_exams(&session_id, destination, &study_plan_text, &cancel)
                .await?;
            output::print_analysis(&mut stdout, &analysis, color)?;
        }
    }

    Ok(())
}

/// Run step 1 and fail when the university has no registered call.
async fn start_session(
    advisor: &Advisor,
    university: &str,
    cancel: &CancellationToken,
) -> anyhow::Result<String> {
    let program = advisor.identify_program(university, cancel).await?;
    program.session_id.ok_or_else(|| {
        anyhow::anyhow!(
            "no call document registered for '{university}' (register one with `erasmus-cli register`)"
        )
    })
}

fn resolve_db_path(cli: &Cli, config: &ConfigFile) -> PathBuf {
    cli.db
        .clone()
        .or_else(|| {
            config
                .storage
                .as_ref()
                .and_then(|s| s.database_path.clone())
                .map(PathBuf::from)
        })
        .unwrap_or_else(|| PathBuf::from("data/advisor.db"))
}

fn open_store(cli: &Cli, config: &ConfigFile) -> anyhow::Result<SqliteStore> {
    let path = resolve_db_path(cli, config);
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(SqliteStore::open(&path)?)
}

fn build_advisor(cli: &Cli, config: &ConfigFile) -> anyhow::Result<Advisor> {
    let store = open_store(cli, config)?;

    // Resolve model configuration: CLI flags > env vars > config file.
    let api_key = cli
        .api_key
        .clone()
        .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
        .or_else(|| config.model.as_ref().and_then(|m| m.api_key.clone()))
        .ok_or_else(|| {
            anyhow::anyhow!("no API key: pass --api-key, set GOOGLE_API_KEY or configure [model]")
        })?;

    let mut model = GeminiClient::new(api_key);
    if let Some(name) = cli
        .model
        .clone()
        .or_else(|| config.model.as_ref().and_then(|m| m.model_name.clone()))
    {
        model = model.with_model(name);
    }
    if let Some(secs) = config.model.as_ref().and_then(|m| m.timeout_secs) {
        model = model.with_timeout(Duration::from_secs(secs));
    }

    let mut advisor_config = AdvisorConfig::default();
    if let Some(secs) = config.sessions.as_ref().and_then(|s| s.ttl_secs) {
        advisor_config.session_ttl = Duration::from_secs(secs);
    }

    Ok(Advisor::with_config(
        Arc::new(store),
        Arc::new(model),
        Arc::new(MupdfExtractor::new()),
        advisor_config,
    ))
}
