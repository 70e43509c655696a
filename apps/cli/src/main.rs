mod api_client;
mod config;
mod errors;
mod models;
mod state;
mod storage;
mod workflow;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::api_client::{ApiClient, ProgressFn};
use crate::config::Config;
use crate::errors::AppError;
use crate::models::analysis::{GapReport, Priority};
use crate::state::AppState;
use crate::storage::LocalStore;
use crate::workflow::{Phase, Workflow};

#[derive(Parser)]
#[command(name = "careergap", version, about = "Resume vs job-description gap analysis")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a resume, submit a job description, and print the gap report
    Analyze {
        /// Resume file (PDF, DOCX, or TXT). Optional if the current session
        /// already holds one
        #[arg(long)]
        resume: Option<PathBuf>,
        /// File containing the job description text
        #[arg(long)]
        jd: PathBuf,
        /// Target role label forwarded to the analyzer
        #[arg(long)]
        target_role: Option<String>,
        /// Access key for this run (also stored for later runs)
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Show backend reachability and current session state
    Status,
    /// Store the access key used to authorize analysis calls
    SetKey { key: String },
    /// Remove the stored access key
    ClearKey,
    /// Clear the session, access key, and all local state
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let state = AppState::new(LocalStore::new(config.data_dir.clone()));

    if let Command::Reset = cli.command {
        let mut state = state;
        state.reset_all();
        println!("Local state cleared.");
        return Ok(());
    }

    let api = Arc::new(ApiClient::new(config.api_base.clone()));
    let mut wf = Workflow::new(api, state);

    match cli.command {
        Command::Analyze {
            resume,
            jd,
            target_role,
            api_key,
        } => run_analyze(&mut wf, resume, jd, target_role, api_key).await?,
        Command::Status => run_status(&mut wf).await,
        Command::SetKey { key } => {
            wf.set_api_key(Some(key));
            println!(
                "Access key stored ({}).",
                wf.state().masked_api_key().unwrap_or_default()
            );
        }
        Command::ClearKey => {
            wf.set_api_key(None);
            println!("Access key removed.");
        }
        Command::Reset => unreachable!("handled above"),
    }

    Ok(())
}

async fn run_analyze(
    wf: &mut Workflow,
    resume: Option<PathBuf>,
    jd: PathBuf,
    target_role: Option<String>,
    api_key: Option<String>,
) -> Result<()> {
    wf.initialize().await;
    if wf.phase() == Phase::Offline {
        // One manual retry, mirroring the UI's retry-connection action.
        eprintln!("Backend unreachable, retrying...");
        wf.retry_connection().await;
    }
    if wf.phase() == Phase::Offline {
        return Err(AppError::BackendUnreachable)
            .context("start the backend server (or set CAREERGAP_API_BASE) and retry");
    }

    if let Some(key) = api_key {
        wf.set_api_key(Some(key));
    }

    if let Some(path) = resume {
        let bytes = std::fs::read(&path)?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("resume")
            .to_string();
        let progress: ProgressFn = Box::new(|pct| eprint!("\rUploading... {pct}%"));
        wf.upload_resume(&file_name, bytes, Some(progress)).await?;
        eprintln!();
        if let Some(info) = wf.state().resume() {
            println!("Uploaded {} ({} chars extracted).", info.file_name, info.text_chars);
        }
    }

    let jd_text = std::fs::read_to_string(&jd)?;
    wf.set_job_description(jd_text, target_role.unwrap_or_default());
    wf.submit().await?;

    if let Some(report) = wf.state().result() {
        print_report(report);
    }
    Ok(())
}

async fn run_status(wf: &mut Workflow) {
    wf.initialize().await;
    let state = wf.state();

    println!(
        "Backend:  {}",
        if state.backend_online() == Some(true) {
            "online"
        } else {
            "offline"
        }
    );
    println!("Session:  {}", state.session_id().unwrap_or("(none)"));
    println!(
        "Key:      {}",
        state.masked_api_key().unwrap_or_else(|| "(none)".to_string())
    );
    match state.resume() {
        Some(info) => println!("Resume:   {} ({} chars)", info.file_name, info.text_chars),
        None => println!("Resume:   (none)"),
    }
    if wf.phase() == Phase::Ready {
        println!(
            "Gates:    resume {}, submission {}",
            if wf.has_resume() { "ready" } else { "pending" },
            if wf.can_submit() { "ready" } else { "pending" }
        );
    }
    if let Some(err) = wf.state().error() {
        println!("Error:    {}", err.message);
    }
}

fn print_report(report: &GapReport) {
    println!("Match score: {}/100", report.match_score);
    println!("\n{}", report.summary);

    if !report.strengths.is_empty() {
        println!("\nStrengths:");
        for s in &report.strengths {
            println!("  + {} ({})", s.point, s.evidence);
        }
    }

    if !report.gaps.is_empty() {
        println!("\nGaps:");
        for gap in &report.gaps {
            println!("  - [{}] {}", priority_label(gap.priority), gap.point);
            println!("    suggestion: {}", gap.suggestion);
        }
    }

    if !report.keywords.is_empty() {
        println!("\nKeywords:");
        for kw in &report.keywords {
            match &kw.evidence {
                Some(evidence) => {
                    println!("  * {} (covered: {}) -> {}", kw.jd_keyword, evidence, kw.recommended_phrase)
                }
                None => println!("  * {} (missing) -> {}", kw.jd_keyword, kw.recommended_phrase),
            }
        }
    }

    if !report.craft_questions.is_empty() {
        println!("\nQuestions to prepare for:");
        for (i, q) in report.craft_questions.iter().enumerate() {
            println!("  {}. {q}", i + 1);
        }
    }
}

fn priority_label(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "high",
        Priority::Medium => "medium",
        Priority::Low => "low",
    }
}
