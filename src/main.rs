use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use student_risk_engine::effectiveness::AssessmentLog;
use student_risk_engine::engine::RiskEngine;
use student_risk_engine::models::{AssessmentRequest, StudentSummary};
use student_risk_engine::policy::RiskPolicy;
use student_risk_engine::{config, db, logging, report};

#[derive(Parser)]
#[command(name = "student-risk")]
#[command(about = "Student risk assessment and intervention planning", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the active scoring policy table
    Policy,
    #[command(flatten)]
    Store(StoreCommand),
}

/// Commands that need a database connection.
#[derive(Subcommand)]
enum StoreCommand {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import submission history from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Assess one student and print the result as JSON
    Assess {
        #[arg(long)]
        student: Uuid,
        /// Skip intervention planning
        #[arg(long)]
        no_interventions: bool,
        /// Keep this assessment as the baseline for effectiveness tracking
        #[arg(long)]
        log: bool,
        /// Also write a markdown report
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Compare a fresh assessment against the last logged one
    Track {
        #[arg(long)]
        student: Uuid,
        #[arg(long)]
        intervention: String,
    },
    /// Assess every student and list the highest risk first
    Scan {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Policy => {
            println!("{}", serde_json::to_string_pretty(&RiskPolicy::default())?);
        }
        Commands::Store(command) => run(command).await?,
    }
    Ok(())
}

async fn run(command: StoreCommand) -> anyhow::Result<()> {
    let config = config::Config::from_env()?;
    logging::init_tracing(&config.log_level);

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    let store = Arc::new(db::PgStore::new(pool.clone()));
    let engine = Arc::new(RiskEngine::new(store.clone(), config.collection_timeout));

    match command {
        StoreCommand::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        StoreCommand::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        StoreCommand::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} submissions from {}.", csv.display());
        }
        StoreCommand::Assess {
            student,
            no_interventions,
            log,
            report,
        } => {
            let response = engine
                .handle(AssessmentRequest {
                    student_id: student,
                    include_interventions: Some(!no_interventions),
                })
                .await;
            println!("{}", serde_json::to_string_pretty(&response)?);

            let Some(assessment) = response.risk_assessment.as_ref() else {
                anyhow::bail!(
                    "assessment failed: {}",
                    response.error.as_deref().unwrap_or("unknown error")
                );
            };

            if log {
                store.record_assessment(assessment).await?;
                eprintln!("Assessment logged as baseline.");
            }

            if let Some(out) = report {
                let markdown = report::build_report(
                    &student.to_string(),
                    assessment,
                    response.urgent_actions.as_deref(),
                );
                std::fs::write(&out, markdown)
                    .with_context(|| format!("failed to write {}", out.display()))?;
                eprintln!("Report written to {}.", out.display());
            }
        }
        StoreCommand::Track {
            student,
            intervention,
        } => {
            let record = engine
                .track_intervention_effectiveness(&*store, student, &intervention)
                .await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        StoreCommand::Scan { limit } => {
            let mut students: HashMap<Uuid, StudentSummary> = db::list_students(&pool)
                .await?
                .into_iter()
                .map(|student| (student.id, student))
                .collect();
            let ids: Vec<Uuid> = students.keys().copied().collect();
            let results = engine
                .assess_many(ids, false, config.max_connections as usize)
                .await;

            let mut assessed = Vec::new();
            let mut failures = 0usize;
            for (student_id, result) in results {
                let Some(student) = students.remove(&student_id) else {
                    continue;
                };
                match result {
                    Ok(scored) => assessed.push((student, scored)),
                    Err(err) => {
                        failures += 1;
                        tracing::warn!(
                            student_id = %student.id,
                            error = %err,
                            "scan skipped student"
                        );
                    }
                }
            }

            if assessed.is_empty() {
                println!("No students could be assessed.");
                return Ok(());
            }

            assessed.sort_by(|a, b| {
                b.1.score
                    .net_risk
                    .partial_cmp(&a.1.score.net_risk)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            println!("Students by net risk:");
            for (student, scored) in assessed.iter().take(limit) {
                println!(
                    "- {} ({}) {} net risk {:.1} across {} factors, confidence {:.0}%",
                    student.full_name,
                    student.email,
                    scored.assessment.overall_risk_level.as_str(),
                    scored.score.net_risk,
                    scored.assessment.risk_factors.len(),
                    scored.assessment.confidence
                );
            }
            if failures > 0 {
                println!("{failures} students could not be assessed; see logs.");
            }
        }
    }

    Ok(())
}
