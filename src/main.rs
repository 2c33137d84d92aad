use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

mod batch;
mod collection;
mod db;
mod drawing;
mod levels;
mod models;
mod recalc;
mod report;
mod totals;

#[derive(Parser)]
#[command(name = "card-collection")]
#[command(about = "PBIS card collection and leveling engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import cards from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Run a collection event: team and personal levels, prize drawing,
    /// school-wide goal, card close-out
    Collect {
        /// Seed for the drawing shuffle; entropy when omitted
        #[arg(long)]
        seed: Option<u64>,
        /// Print the instruction batches as JSON instead of applying them
        #[arg(long)]
        dry_run: bool,
        #[arg(long, default_value_t = batch::DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
        #[arg(long, default_value_t = drawing::WEEKLY_WINNER_COUNT)]
        winner_count: usize,
        /// Select each student at most once per draw
        #[arg(long)]
        no_repeat_winners: bool,
    },
    /// Recompute personal levels for specific students
    Recalculate {
        #[arg(long, required = true, num_args = 1..)]
        student: Vec<Uuid>,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} cards from {}.", csv.display());
        }
        Commands::Collect {
            seed,
            dry_run,
            chunk_size,
            winner_count,
            no_repeat_winners,
        } => {
            let snapshot = db::fetch_snapshot(&pool).await?;
            let cards = db::fetch_uncounted_cards(&pool).await?;
            let excluded = db::fetch_recent_winner_ids(
                &pool,
                drawing::COLLECTIONS_WITHOUT_REPEAT_WINNERS,
            )
            .await?;

            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let config = collection::CollectionConfig {
                drawing: drawing::DrawingConfig {
                    winner_count,
                    allow_repeat_winner_within_draw: !no_repeat_winners,
                },
                chunk_size,
            };

            let outcome =
                collection::run_collection(&snapshot, &cards, &excluded, &config, &mut rng)?;

            if dry_run {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
                return Ok(());
            }

            let collected_on = Utc::now().date_naive();
            db::apply_collection(&pool, &outcome, collected_on).await?;

            let promoted = outcome
                .team_summaries
                .iter()
                .filter(|summary| summary.is_new_level)
                .count();
            println!("Collection applied for {collected_on}.");
            println!(
                "{} teams processed, {} reached a new level.",
                outcome.team_summaries.len(),
                promoted
            );
            println!("{} students leveled up.", outcome.level_ups.len());
            println!("School-wide goal: level {}.", outcome.team_goal);

            if outcome.winners.is_empty() {
                println!("No drawing winners (empty ticket pool).");
            } else {
                println!("Drawing winners:");
                for winner in &outcome.winners {
                    println!(
                        "- {} ({})",
                        winner.student.name, winner.student.ta_teacher.name
                    );
                }
            }
        }
        Commands::Recalculate { student } => {
            let mut queue = recalc::RecalcQueue::new();
            for id in student {
                if !queue.enqueue(id) {
                    println!("Skipping duplicate request for {id}.");
                }
            }
            while let Some(id) = queue.pop() {
                match db::recalculate_student(&pool, id).await? {
                    Some((name, level)) => println!("{name} is now level {level}."),
                    None => println!("No student with id {id}."),
                }
            }
        }
        Commands::Report { out } => {
            let snapshot = db::fetch_snapshot(&pool).await?;
            let cards = db::fetch_uncounted_cards(&pool).await?;
            let latest = db::fetch_latest_collection(&pool).await?;
            let report = report::build_report(
                Utc::now().date_naive(),
                &snapshot,
                &cards,
                latest.as_ref(),
            );
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
