use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

mod config;
mod db;
mod error;
mod meal_window;
mod models;
mod query;
mod report;
mod roll;
mod stats;

use config::Config;
use error::AttendanceError;
use models::{FoodPreference, MarkedAttendance, MealType};
use query::{DailyQuery, WeeklyQuery};

#[derive(Parser)]
#[command(name = "mess-attendance")]
#[command(about = "Meal attendance tracker for the student mess", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a sample roster and today's meals
    Seed,
    /// Import or update students from a CSV file with roll_number,name columns
    ImportRoster {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Check whether a roll number is registered
    Verify { roll_number: String },
    /// Record a meal for a student
    Mark {
        roll_number: String,
        /// Defaults to the meal currently being served
        #[arg(long, value_enum)]
        meal: Option<MealType>,
        #[arg(long, value_enum)]
        preference: FoodPreference,
    },
    /// Print attendance statistics for one day as JSON
    Stats {
        /// Date as YYYY-MM-DD
        #[arg(long)]
        date: Option<String>,
        #[arg(long, value_enum)]
        meal: Option<MealType>,
    },
    /// Print per-day meal counts for a date range as JSON
    #[command(group(
        ArgGroup::new("range")
            .args(["start", "current_week"])
            .multiple(false)
    ))]
    Weekly {
        #[arg(long)]
        start: Option<String>,
        #[arg(long, conflicts_with = "current_week")]
        end: Option<String>,
        /// Use Monday through Sunday of the current week
        #[arg(long)]
        current_week: bool,
    },
    /// Write the daily CSV report
    Report {
        #[arg(long)]
        date: Option<String>,
        /// Defaults to attendance-<date>.csv
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Reject incomplete requests before opening a connection.
    let daily_query = match &cli.command {
        Commands::Stats { date, meal } => Some(DailyQuery::from_params(date.as_deref(), *meal)?),
        Commands::Report { date, .. } => Some(DailyQuery::from_params(date.as_deref(), None)?),
        _ => None,
    };
    let weekly_query = match &cli.command {
        Commands::Weekly {
            current_week: true, ..
        } => Some(WeeklyQuery::current_week()),
        Commands::Weekly { start, end, .. } => {
            Some(WeeklyQuery::from_params(start.as_deref(), end.as_deref())?)
        }
        _ => None,
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
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
        Commands::ImportRoster { csv } => {
            let imported = db::import_roster(&pool, &csv).await?;
            println!("Imported {imported} students from {}.", csv.display());
        }
        Commands::Verify { roll_number } => {
            let exists = db::find_student_by_roll(&pool, &roll_number).await?.is_some();
            if exists {
                println!("{roll_number} is registered.");
            } else {
                println!("{roll_number} is not registered.");
            }
        }
        Commands::Mark {
            roll_number,
            meal,
            preference,
        } => {
            let marked = mark(&pool, &config, &roll_number, meal, preference).await?;
            println!(
                "Marked {} for {} ({}, year {}) at {}.",
                marked.meal_type,
                marked.name,
                marked.roll_number,
                marked
                    .year
                    .map_or_else(|| "unknown".to_string(), |year| year.to_string()),
                marked.timestamp.to_rfc3339()
            );
        }
        Commands::Stats { .. } => {
            let query = daily_query.context("stats query not prepared")?;
            let roster = db::fetch_roster(&pool).await?;
            let events = db::fetch_events_on(&pool, query.date, query.meal).await?;
            info!(date = %query.date, students = roster.len(), events = events.len(), "aggregating daily stats");

            let daily = stats::aggregate_daily(&roster, &events, config.reference_year());
            println!("{}", serde_json::to_string_pretty(&daily)?);
        }
        Commands::Weekly { .. } => {
            let query = weekly_query.context("weekly query not prepared")?;
            let events = db::fetch_events_between(&pool, query.start, query.end).await?;
            info!(start = %query.start, end = %query.end, events = events.len(), "aggregating weekly stats");

            let weekly = stats::aggregate_weekly(&events, query.start, query.end);
            println!("{}", serde_json::to_string_pretty(&weekly)?);
        }
        Commands::Report { out, .. } => {
            let query = daily_query.context("report query not prepared")?;
            let reference_year = config.reference_year();
            let roster = db::fetch_roster(&pool).await?;
            let events = db::fetch_events_on(&pool, query.date, None).await?;

            let daily = stats::aggregate_daily(&roster, &events, reference_year);
            let grouped = stats::present_rolls_by_year(&roster, &events, reference_year);
            let rows = report::build_rows(query.date, &daily, &grouped);

            let out = out.unwrap_or_else(|| PathBuf::from(report::default_report_path(query.date)));
            report::write_csv(&rows, &out)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

async fn mark(
    pool: &PgPool,
    config: &Config,
    roll_number: &str,
    meal: Option<MealType>,
    preference: FoodPreference,
) -> anyhow::Result<MarkedAttendance> {
    let meal = meal
        .or_else(meal_window::current_meal)
        .ok_or(AttendanceError::MissingRequiredParameter("meal"))?;

    let student = db::find_student_by_roll(pool, roll_number)
        .await?
        .ok_or_else(|| AttendanceError::StudentNotFound(roll_number.to_string()))?;

    let timestamp = Utc::now();
    let attendance_id = db::insert_attendance(pool, student.id, meal, preference, timestamp).await?;

    let marked = MarkedAttendance {
        roll_number: student.roll_number,
        name: student.name,
        year: roll::resolve_year(roll_number, config.reference_year()).ok(),
        meal_type: meal.as_str(),
        food_preference: preference.as_str(),
        timestamp,
    };
    info!(%attendance_id, roll_number = %marked.roll_number, meal = marked.meal_type, "attendance marked");

    if let Err(err) = db::notify_attendance(pool, &marked).await {
        warn!("failed to publish attendance notification: {err:#}");
    }

    Ok(marked)
}
