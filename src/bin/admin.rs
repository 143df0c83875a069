//! CLI administration tool for link-router.
//!
//! Writes link records straight to the record store and runs database
//! diagnostics without going through the HTTP service.
//!
//! # Usage
//!
//! ```bash
//! # Create or replace a link
//! cargo run --bin admin -- link set abc123 --account acc_1 \
//!     --default https://example.com --dest FR=https://example.fr
//!
//! # Show a link
//! cargo run --bin admin -- link show abc123
//!
//! # View statistics
//! cargo run --bin admin -- stats
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! Cached copies of a changed link are not invalidated; the service keeps
//! serving them until their TTL runs out.
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` (or the `DB_*` parts): PostgreSQL connection

use link_router::config::{Config, mask_connection_string};
use link_router::domain::entities::{DEFAULT_DESTINATION_KEY, LinkRecord};
use link_router::domain::repositories::LinkRepository;
use link_router::infrastructure::persistence::PgLinkRepository;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::Arc;

/// CLI tool for managing link-router.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Manage link records
    Link {
        #[command(subcommand)]
        action: LinkAction,
    },

    /// Show statistics
    Stats,

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// Link management subcommands.
#[derive(Subcommand)]
enum LinkAction {
    /// Create a link or replace its destinations
    Set {
        /// Short link id
        id: String,

        /// Owning account id
        #[arg(short, long)]
        account: String,

        /// Destination used when no country matches
        #[arg(short, long = "default")]
        default_url: String,

        /// Country-specific destination, e.g. `FR=https://example.fr` (repeatable)
        #[arg(long = "dest", value_parser = parse_destination)]
        destinations: Vec<(String, String)>,
    },

    /// Show a link and its destinations
    Show {
        /// Short link id
        id: String,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let database_url = Config::load_database_url()?;

    let pool = PgPool::connect(&database_url)
        .await
        .with_context(|| {
            format!(
                "Failed to connect to database at {}",
                mask_connection_string(&database_url)
            )
        })?;

    match cli.command {
        Commands::Link { action } => handle_link_action(action, &pool).await?,
        Commands::Stats => handle_stats(&pool).await?,
        Commands::Db { action } => handle_db_action(action, &pool).await?,
    }

    Ok(())
}

/// Parses a `CC=url` pair.
fn parse_destination(raw: &str) -> Result<(String, String), String> {
    let (country, url) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected COUNTRY=URL, got '{}'", raw))?;

    let country = country.trim();
    if country.is_empty() {
        return Err(format!("missing country in '{}'", raw));
    }
    if country == DEFAULT_DESTINATION_KEY {
        return Err("use --default for the default destination".to_string());
    }

    Ok((country.to_string(), url.trim().to_string()))
}

/// Dispatches link management commands.
async fn handle_link_action(action: LinkAction, pool: &PgPool) -> Result<()> {
    let repo = PgLinkRepository::new(Arc::new(pool.clone()));

    match action {
        LinkAction::Set {
            id,
            account,
            default_url,
            destinations,
        } => set_link(&repo, id, account, default_url, destinations).await,
        LinkAction::Show { id } => show_link(&repo, &id).await,
    }
}

async fn set_link(
    repo: &PgLinkRepository,
    id: String,
    account: String,
    default_url: String,
    destinations: Vec<(String, String)>,
) -> Result<()> {
    println!("{}", "🔗 Set Link".bright_blue().bold());
    println!();

    let mut map: BTreeMap<String, String> = destinations.into_iter().collect();
    map.insert(DEFAULT_DESTINATION_KEY.to_string(), default_url);

    let record = LinkRecord::new(id, account, map);

    let saved = repo
        .upsert(&record)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to save link: {}", e))?;

    print_record(&saved);
    println!("{}", "✅ Link saved".green().bold());
    println!(
        "{}",
        "   Cached copies refresh when their TTL expires.".bright_black()
    );
    println!();

    Ok(())
}

async fn show_link(repo: &PgLinkRepository, id: &str) -> Result<()> {
    let record = repo
        .find_by_id(id)
        .await
        .map_err(|e| anyhow::anyhow!("Database error: {}", e))?
        .with_context(|| format!("Link '{}' not found", id))?;

    print_record(&record);

    Ok(())
}

/// Prints a record with the default destination first.
///
/// ```text
///   ID:      abc123
///   Account: acc_1
///
///   default  https://example.com
///   FR       https://example.fr
/// ```
fn print_record(record: &LinkRecord) {
    println!("  ID:      {}", record.id.cyan());
    println!("  Account: {}", record.account_id.cyan());
    println!();

    if let Some(default_url) = record.default_destination() {
        println!(
            "  {:<8} {}",
            DEFAULT_DESTINATION_KEY.bright_white().bold(),
            default_url.bright_yellow()
        );
    }

    for (country, url) in record
        .destinations
        .iter()
        .filter(|(k, _)| k.as_str() != DEFAULT_DESTINATION_KEY)
    {
        println!("  {:<8} {}", country.bright_white(), url);
    }
    println!();
}

/// Displays link statistics.
async fn handle_stats(pool: &PgPool) -> Result<()> {
    println!("{}", "📊 Statistics".bright_blue().bold());
    println!();

    let links_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM links")
        .fetch_one(pool)
        .await?;

    let accounts_count: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT account_id) FROM links")
        .fetch_one(pool)
        .await?;

    let geo_links_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM links WHERE (SELECT COUNT(*) FROM jsonb_object_keys(destinations)) > 1",
    )
    .fetch_one(pool)
    .await?;

    println!(
        "  Links:             {}",
        links_count.to_string().bright_green().bold()
    );
    println!(
        "  Accounts:          {}",
        accounts_count.to_string().bright_green().bold()
    );
    println!(
        "  Geo-routed links:  {}",
        geo_links_count.to_string().bright_green().bold()
    );
    println!();

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            println!("{}", "✅ Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "ℹ️  Database Information".bright_blue().bold());
            println!();

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;

            println!("  PostgreSQL: {}", version.bright_white());
            println!();
        }
    }

    Ok(())
}
