use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use angebot_core::{IntakeRecord, OfferAction, OfferSource, SyncState};
use angebot_pipeline::{OfferPipeline, SyncReport, TemplateRenderer};
use angebot_sync::{NotionStore, SupabaseStore, SyncConfig};
use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "angebot", about = "Training-offer lifecycle pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an offer from a JSON intake record
    Intake {
        /// Path to the intake record (JSON)
        file: PathBuf,
    },
    /// Apply a lifecycle action (send, remind, accept, decline, expire)
    Action { id: Uuid, action: OfferAction },
    /// Evaluate reminders and expiry across all tracked offers
    Tick,
    /// Print one offer as JSON
    Show { id: Uuid },
    /// Render the contract document for an accepted offer
    Contract {
        id: Uuid,
        /// Plain-text template with {{kunde}}, {{leistung}}, ... placeholders
        #[arg(long)]
        template: PathBuf,
        /// Where to write the rendered document
        #[arg(long)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "angebot_cli=info,angebot_pipeline=info,angebot_sync=info".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = SyncConfig::load().context("failed to load config")?;

    let supabase = Arc::new(SupabaseStore::new(&config)?);
    let notion = Arc::new(NotionStore::new(&config)?);
    // Relational store first: authoritative for resumed reads
    let mut pipeline = OfferPipeline::new(vec![supabase, notion]);
    let now = Utc::now();

    match cli.command {
        Command::Intake { file } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("cannot read {}", file.display()))?;
            let record: IntakeRecord =
                serde_json::from_str(&raw).context("intake record is not valid JSON")?;

            let outcome = pipeline.intake(record, OfferSource::Manual, now).await?;
            println!(
                "created offer {} in state {}",
                outcome.offer.id, outcome.offer.state
            );
            if !outcome.missing_fields.is_empty() {
                println!(
                    "  missing optional fields: {}",
                    outcome.missing_fields.join(", ")
                );
            }
            print_sync(&outcome.sync);
        }
        Command::Action { id, action } => {
            pipeline.refresh().await?;
            let outcome = pipeline.apply_action(id, action, now).await?;
            println!("offer {} is now {}", id, outcome.offer.state);
            print_sync(&outcome.sync);
        }
        Command::Tick => {
            pipeline.refresh().await?;
            let report = pipeline.tick(now).await;
            println!(
                "tick: {} reminded, {} expired, {} failed",
                report.reminded.len(),
                report.expired.len(),
                report.failed.len()
            );
            for id in &report.reminded {
                println!("  reminded {id}");
            }
            for id in &report.expired {
                println!("  expired {id}");
            }
        }
        Command::Show { id } => match pipeline.load(id).await? {
            Some(offer) => println!("{}", serde_json::to_string_pretty(&offer)?),
            None => println!("offer {id} not found"),
        },
        Command::Contract { id, template, out } => {
            pipeline.refresh().await?;
            let renderer = TemplateRenderer::from_file(&template)?;
            let bytes = pipeline.contract(id, &renderer)?;
            fs::write(&out, bytes).with_context(|| format!("cannot write {}", out.display()))?;
            println!("contract written to {}", out.display());
        }
    }

    Ok(())
}

/// A failed sync is a retryable indicator, never a blocker
fn print_sync(sync: &SyncReport) {
    for (system, state) in &sync.systems {
        match state {
            SyncState::Synced => println!("  synced to {system}"),
            SyncState::Pending => println!("  {system}: pending"),
            SyncState::Failed { reason } => println!("  not yet synced to {system}: {reason}"),
        }
    }
}
