//! schemasync CLI
//!
//! Synchronizes a live MySQL database with a declarative schema file: parses
//! the target `CREATE TABLE` document, introspects the database, and
//! previews or applies the DDL that converges the two.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::MySqlPool;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use schemasync_core::diff::DiffOptions;
use schemasync_core::parser::parse_schema;
use schemasync_core::plan::{Plan, render_schema, synchronize};
use schemasync_core::schema::Schema;
use schemasync_mysql::config::{ConnectionConfig, connect_url};
use schemasync_mysql::executor::PlanExecutor;
use schemasync_mysql::introspect::introspect_schema;

/// Declarative schema synchronization for MySQL-family databases.
#[derive(Parser)]
#[command(name = "schemasync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Pre-composed connection URL; overrides the individual options.
    #[arg(long, env = "DATABASE_URL")]
    url: Option<String>,

    /// Database server host.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Database server port.
    #[arg(long, default_value_t = 3306)]
    port: u16,

    /// Database (schema) name.
    #[arg(short, long, default_value = "")]
    database: String,

    /// User name.
    #[arg(short, long, default_value = "root")]
    user: String,

    /// Password.
    #[arg(short, long)]
    password: Option<String>,

    /// Connection character set.
    #[arg(long, default_value = "utf8mb4")]
    charset: String,

    /// Table to leave untouched; may be given multiple times.
    #[arg(long = "ignore-table", value_name = "TABLE")]
    ignore_tables: Vec<String>,

    /// Column to leave untouched, as `table.column` or a bare `column`
    /// matching every table; may be given multiple times.
    #[arg(long = "ignore-column", value_name = "COLUMN")]
    ignore_columns: Vec<String>,

    /// Emit DROP COLUMN statements for columns absent from the target.
    #[arg(long)]
    drop_columns: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the DDL plan without executing anything.
    Diff {
        /// Path to the target schema file.
        schema: PathBuf,

        /// Emit the plan as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Apply the DDL plan to the database.
    Apply {
        /// Path to the target schema file.
        schema: PathBuf,

        /// Skip the interactive confirmation.
        #[arg(short, long)]
        yes: bool,

        /// Print the plan without executing (dry run).
        #[arg(long)]
        dry_run: bool,
    },

    /// Dump the live database's schema as CREATE TABLE statements.
    Export,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let pool = connect(&cli).await?;
    let options = diff_options(&cli);

    match &cli.command {
        Commands::Diff { schema, json } => {
            let plan = build_plan(&pool, schema, &options).await?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else if plan.is_empty() {
                info!("schema is up to date, no changes");
            } else {
                print_plan(&plan);
            }
        }

        Commands::Apply { schema, yes, dry_run } => {
            let plan = build_plan(&pool, schema, &options).await?;
            if plan.is_empty() {
                info!("schema is up to date, no changes");
                return Ok(());
            }

            print_plan(&plan);

            if *dry_run {
                info!("dry run, nothing applied");
                return Ok(());
            }
            if !*yes && !confirm(&format!("Apply {} statement(s)?", plan.len()))? {
                info!("aborted, nothing applied");
                return Ok(());
            }

            let applied = PlanExecutor::new(pool).apply(&plan).await?;
            info!(applied, "schema synchronized");
        }

        Commands::Export => {
            let current = introspect_schema(&pool).await?;
            print!("{}", render_schema(&current));
        }
    }

    Ok(())
}

/// Connects using the URL when given, the individual options otherwise.
async fn connect(cli: &Cli) -> anyhow::Result<MySqlPool> {
    let url = match &cli.url {
        Some(url) => url.clone(),
        None => ConnectionConfig {
            host: cli.host.clone(),
            port: cli.port,
            database: cli.database.clone(),
            user: cli.user.clone(),
            password: cli.password.clone(),
            charset: cli.charset.clone(),
        }
        .url()?,
    };
    Ok(connect_url(&url).await.context("connecting to database")?)
}

fn diff_options(cli: &Cli) -> DiffOptions {
    let mut options = DiffOptions::new();
    options.ignore_tables.extend(cli.ignore_tables.iter().cloned());
    options.ignore_columns.extend(cli.ignore_columns.iter().cloned());
    options.drop_columns = cli.drop_columns;
    options
}

/// Reads and parses the target schema, introspects the database, and
/// computes the plan.
async fn build_plan(
    pool: &MySqlPool,
    schema_path: &Path,
    options: &DiffOptions,
) -> anyhow::Result<Plan> {
    let desired = load_target_schema(schema_path)?;
    let current = introspect_schema(pool)
        .await
        .context("introspecting database")?;
    Ok(synchronize(&current, &desired, options))
}

fn load_target_schema(path: &Path) -> anyhow::Result<Schema> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading schema file {}", path.display()))?;
    parse_schema(&text).with_context(|| format!("parsing {}", path.display()))
}

fn print_plan(plan: &Plan) {
    for statement in plan.iter() {
        println!("{statement}");
    }
}

/// Asks the user for confirmation on stdin.
fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{prompt} [y/N] ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes" | "YES"))
}
