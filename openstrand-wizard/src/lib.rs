// OpenStrand dataset catalog submission wizard
// Main library entry point

pub mod api;
pub mod cli;
pub mod error;
pub mod models;
pub mod notify;
pub mod settings;
pub mod smoke;
pub mod utils;
pub mod wizard;

use log::{error, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::api::HttpCatalogApi;
use crate::cli::SubmitArgs;
use crate::models::state::DatasetFile;
use crate::notify::{ConsoleNotifier, LogNavigator};
use crate::settings::WizardConfig;
use crate::wizard::{WizardController, WizardStep};

/// Initialize logging system with dual format (JSON + human-readable).
/// Returns the folder the log files were written to.
pub fn init_logging(with_stdout: bool, log_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    let log_dir = utils::path_resolver::resolve_log_folder(log_dir)?;
    std::fs::create_dir_all(&log_dir)?;

    let timestamp = chrono::Utc::now().format("%Y-%m-%d-%H%M%S");

    // JSON log file for structured parsing
    let json_log_file = log_dir.join(format!("wizard-{}.log", timestamp));

    // Human-readable log file (.txt)
    let txt_log_file = log_dir.join(format!("wizard-{}.txt", timestamp));

    let mut dispatch = fern::Dispatch::new().level(log::LevelFilter::Debug);

    if with_stdout {
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .level(log::LevelFilter::Info)
                .format(move |out, message, record| {
                    let timestamp_local = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let txt_line = utils::logging::format_human_readable_log(
                        &timestamp_local.to_string(),
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}", txt_line));
                })
                .chain(std::io::stdout()),
        );
    }

    dispatch = dispatch
        .chain(
            fern::Dispatch::new()
                .format(move |out, message, record| {
                    let timestamp_utc = chrono::Utc::now().to_rfc3339();
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let json_line = utils::logging::format_json_log(
                        &timestamp_utc,
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}\n", json_line));
                })
                .chain(fern::log_file(json_log_file)?),
        )
        .chain(
            fern::Dispatch::new()
                .format(move |out, message, record| {
                    let timestamp_local = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let txt_line = utils::logging::format_human_readable_log(
                        &timestamp_local.to_string(),
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}\n", txt_line));
                })
                .chain(fern::log_file(txt_log_file)?),
        );

    dispatch.apply()?;

    info!(
        "[PHASE: initialization] Logging initialized, log directory: {:?}",
        log_dir
    );
    Ok(log_dir)
}

fn load_config(config_path: Option<&Path>) -> WizardConfig {
    match WizardConfig::load(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Wizard error: {}", e);
            std::process::exit(2);
        }
    }
}

fn build_runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create async runtime: {}", e))
}

/// Non-interactive walkthrough against the in-memory catalog (for automated checks).
/// Writes the transcript under the log folder and exits 0/1.
pub fn run_smoke(config_path: Option<&Path>) {
    let cfg = load_config(config_path);
    let log_dir = match init_logging(false, cfg.log_dir.as_deref()) {
        Ok(dir) => Some(dir),
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    info!(
        "[PHASE: initialization] Wizard smoke starting at {}",
        chrono::Utc::now()
    );

    let result = build_runtime().and_then(|rt| rt.block_on(smoke::run_walkthrough()));
    match result {
        Ok(transcript) => {
            for line in &transcript {
                println!("{}", line);
            }
            if let Some(dir) = log_dir {
                let path = dir.join(smoke::TRANSCRIPT_FILE);
                if let Err(e) = std::fs::write(&path, transcript.join("\n") + "\n") {
                    error!(
                        "[PHASE: smoke] [STEP: transcript] Failed to write {:?}: {}",
                        path, e
                    );
                }
            }
        }
        Err(e) => {
            error!("[PHASE: smoke] [STEP: fatal] Smoke failed: {:?}", e);
            eprintln!("Smoke failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Headless submission against the configured API.
pub fn run_submit(config_path: Option<&Path>, args: SubmitArgs) {
    let cfg = load_config(config_path);
    if let Err(e) = init_logging(false, cfg.log_dir.as_deref()) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!(
        "[PHASE: initialization] Wizard starting at {} ({:?})",
        chrono::Utc::now(),
        cfg
    );

    let result = build_runtime().and_then(|rt| rt.block_on(submit(&cfg, args)));
    if let Err(e) = result {
        error!("[PHASE: wizard] [STEP: fatal] Submission stopped: {:?}", e);
        eprintln!("Wizard error: {}", e);
        std::process::exit(1);
    }
}

async fn submit(cfg: &WizardConfig, args: SubmitArgs) -> anyhow::Result<()> {
    let api = HttpCatalogApi::new(cfg)?;
    let wizard = WizardController::new(
        Arc::new(api),
        Arc::new(ConsoleNotifier),
        Arc::new(LogNavigator),
    )
    .with_post_publish_route(cfg.post_publish_route.clone());

    wizard.select_file(DatasetFile::from_path(&args.file).await?)?;
    wizard.advance().await?;
    wizard.summary_settled().await;

    if let Some(summary) = &wizard.state().summary {
        println!(
            "Summary: {} rows, {} columns",
            summary.row_count, summary.column_count
        );
        for column in &summary.columns {
            println!("  {:<24} {}", column.name, column.column_type);
        }
    }

    if let Some(name) = args.name {
        wizard.set_name(name)?;
    }
    if let Some(description) = args.description {
        wizard.set_description(description)?;
    }
    for tag in &args.tags {
        wizard.add_tag(tag)?;
    }
    if let Some(visibility) = args.visibility {
        wizard.set_visibility(visibility)?;
    }
    if let Some(plan) = args.plan {
        wizard.set_plan_required(plan)?;
    }
    if let Some(license) = args.license {
        wizard.set_license(license)?;
    }
    wizard.set_allow_strand_usage(args.allow_strand_usage)?;

    // Metadata -> verification, then run the check.
    wizard.advance().await?;
    wizard.advance().await?;

    if let Some(v) = &wizard.state().verification {
        println!("Verification: {}", v.status);
        for m in &v.duplicates {
            println!("  similar: {} ({}) {:.0}%", m.name, m.id, m.similarity * 100.0);
        }
        for w in &v.warnings {
            println!("  warning: {}", w);
        }
    }

    wizard.set_acknowledged(args.acknowledge)?;
    wizard.set_force_clone(args.force_clone)?;
    let step = wizard.advance().await?;
    anyhow::ensure!(step == WizardStep::Publish, "wizard stopped on the {} step", step);

    let ack = wizard.publish().await?;
    println!(
        "Published dataset {}",
        ack.id.as_deref().unwrap_or("(id pending)")
    );
    Ok(())
}
