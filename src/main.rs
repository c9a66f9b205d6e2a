use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use genoreport::config::PipelineSettings;
use genoreport::db::repository;
use genoreport::db::sqlite::open_database;
use genoreport::models::enums::{ReportType, ResultCategory};
use genoreport::pipeline::import::upload_report_file;
use genoreport::pipeline::processor::PipelineOrchestrator;

/// Genetic test report ingestion pipeline
#[derive(Parser, Debug)]
#[command(
    name = "genoreport",
    version,
    about = "Turn lab-issued genetic test PDFs into consolidated trait results",
    long_about = "genoreport extracts text from a lab report PDF, recognises trait results, \
                  consolidates them into one record per trait and kit, and maintains the \
                  kit's comprehensive report."
)]
struct CliArgs {
    #[command(subcommand)]
    command: Commands,

    #[arg(
        long,
        global = true,
        value_name = "DIR",
        help = "Data directory (defaults to GENOREPORT_DATA_DIR or ~/Genoreport)"
    )]
    data_dir: Option<PathBuf>,

    #[arg(long, global = true, help = "Print results as JSON")]
    json: bool,

    #[arg(short = 'v', long, global = true, help = "Debug logging for genoreport")]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Upload a lab report PDF for a kit")]
    Ingest {
        #[arg(long, value_name = "KIT_ID")]
        kit: Uuid,
        #[arg(value_name = "PDF")]
        path: PathBuf,
        #[arg(long, help = "Run the pipeline right after upload")]
        process: bool,
    },

    #[command(about = "Run the pipeline over an uploaded artifact")]
    Process {
        #[arg(value_name = "UPLOAD_ID")]
        upload_id: Uuid,
    },

    #[command(about = "List canonical results of a kit")]
    Results {
        #[arg(long, value_name = "KIT_ID")]
        kit: Uuid,
        #[arg(long, value_name = "CATEGORY", help = "e.g. HEALTH_RISK, CARRIER_STATUS")]
        category: Option<ResultCategory>,
    },

    #[command(about = "Show the comprehensive report of a kit")]
    Report {
        #[arg(long, value_name = "KIT_ID")]
        kit: Uuid,
    },

    #[command(about = "Check staged/canonical link and lifecycle consistency")]
    Check {
        #[arg(long, help = "Fail artifacts left in processing by an interrupted run")]
        repair: bool,
    },
}

fn main() {
    let args = CliArgs::parse();
    genoreport::init_tracing(args.verbose);

    let mut settings = PipelineSettings::from_env();
    if let Some(dir) = &args.data_dir {
        let env_overrides = settings.clone();
        settings = PipelineSettings {
            ollama_url: env_overrides.ollama_url,
            ocr_model: env_overrides.ocr_model,
            pdfium_library_dir: env_overrides.pdfium_library_dir,
            ..PipelineSettings::rooted_at(dir.clone())
        };
    }

    let exit_code = match run(&args, &settings) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("error: {e}");
            1
        }
    };
    process::exit(exit_code);
}

fn run(args: &CliArgs, settings: &PipelineSettings) -> Result<i32, Box<dyn std::error::Error>> {
    if let Some(parent) = settings.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = open_database(&settings.database_path)?;
    tracing::debug!(database = %settings.database_path.display(), "Database open");

    match &args.command {
        Commands::Ingest { kit, path, process } => {
            let receipt = upload_report_file(&conn, &settings.upload_dir, kit, path)?;
            print_output(args.json, &receipt, || {
                let mut line = format!("uploaded {} ({} bytes)", receipt.upload_id, receipt.file_size_bytes);
                if let Some(existing) = receipt.duplicate_of {
                    line.push_str(&format!(", identical to earlier upload {existing}"));
                }
                line
            })?;
            if *process {
                return process_upload(&conn, settings, &receipt.upload_id, args.json);
            }
            Ok(0)
        }
        Commands::Process { upload_id } => process_upload(&conn, settings, upload_id, args.json),
        Commands::Results { kit, category } => {
            let results = match category {
                Some(category) => repository::list_results_for_kit_category(&conn, kit, *category)?,
                None => repository::list_results_for_kit(&conn, kit)?,
            };
            print_output(args.json, &results, || {
                results
                    .iter()
                    .map(|r| {
                        let risk = r
                            .risk_score
                            .map(|s| format!(" (risk {s:.1})"))
                            .unwrap_or_default();
                        format!(
                            "{:<16} {:<32} {}{} [{}]",
                            r.category.as_str(),
                            r.trait_name,
                            r.result_value,
                            risk,
                            r.confidence_level
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
            Ok(0)
        }
        Commands::Report { kit } => {
            let Some(report) = repository::find_report(&conn, kit, ReportType::Comprehensive)? else {
                eprintln!("no report for kit {kit}");
                return Ok(1);
            };
            print_output(args.json, &report, || {
                format!(
                    "{} v{} ({})\n\n{}\n\nRecommendations:\n{}",
                    report.report_type, report.version, report.status, report.summary, report.recommendations
                )
            })?;
            Ok(0)
        }
        Commands::Check { repair } => {
            if *repair {
                let fixed = repository::repair_consistency(&conn)?;
                tracing::info!(fixed, "Consistency repair done");
            }
            let report = repository::check_consistency(&conn)?;
            print_output(args.json, &report, || {
                let mut lines = vec![format!(
                    "checked {} uploads, {} results: {} issue(s)",
                    report.uploads_checked,
                    report.results_checked,
                    report.issues.len()
                )];
                lines.extend(
                    report
                        .issues
                        .iter()
                        .map(|i| format!("[{}] {}: {}", i.severity, i.category, i.description)),
                );
                lines.join("\n")
            })?;
            Ok(if report.is_clean() { 0 } else { 2 })
        }
    }
}

fn process_upload(
    conn: &Connection,
    settings: &PipelineSettings,
    upload_id: &Uuid,
    json: bool,
) -> Result<i32, Box<dyn std::error::Error>> {
    let pipeline = PipelineOrchestrator::from_settings(settings)?;
    let outcome = pipeline.process_upload(conn, upload_id)?;
    print_output(json, &outcome, || {
        format!(
            "{}: {} results ({} new, {} updated) via {}, confidence {:.1}",
            outcome.status,
            outcome.result_count,
            outcome.results_created,
            outcome.results_updated,
            outcome.extraction_strategy,
            outcome.confidence_score
        )
    })?;
    Ok(0)
}

fn print_output<T: Serialize>(
    json: bool,
    value: &T,
    human: impl FnOnce() -> String,
) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", human());
    }
    Ok(())
}
