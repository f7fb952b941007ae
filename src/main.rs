//! catalogi-migrate: apply the catalog schema history to a database.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use catalogi::catalog;
use catalogi::config::{BackendKind, Config};
use catalogi::migration::MigrationRegistry;
use catalogi::migrator::Migrator;
use catalogi::store::{Ledger, SchemaStore};

#[derive(Parser)]
#[command(name = "catalogi-migrate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file path
    #[arg(short, long, env = "CATALOGI_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply every pending migration
    Up,

    /// Reverse applied migrations newer than the target
    Down {
        /// Keep this migration and everything before it; reverse all when omitted
        #[arg(long)]
        target: Option<String>,
    },

    /// List migrations and when they were applied
    Status,

    /// Print the SQL a run would execute without touching the database
    Sql {
        /// Print the reverse plan instead of the forward one
        #[arg(long)]
        reverse: bool,

        #[arg(long, requires = "reverse")]
        target: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;

    let level = match cli.verbose {
        0 => config.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let registry = catalog::registry().context("building migration registry")?;
    info!(
        backend = ?config.database.backend,
        migrations = registry.len(),
        "catalogi-migrate starting"
    );

    match config.database.backend {
        BackendKind::Sqlite => run_sqlite(&cli.command, &config, &registry),
        BackendKind::Postgres => run_postgres(&cli.command, &config, &registry),
        BackendKind::Mysql => run_mysql(&cli.command, &config, &registry),
    }
}

#[cfg(feature = "sqlite")]
fn run_sqlite(command: &Command, config: &Config, registry: &MigrationRegistry) -> Result<()> {
    let conn = rusqlite::Connection::open(&config.database.url)
        .with_context(|| format!("opening {}", config.database.url))?;
    let store = catalogi::store::SqliteStore::with_table(&conn, &config.database.ledger_table)?;
    run(command, config, registry, store)
}

#[cfg(not(feature = "sqlite"))]
fn run_sqlite(_: &Command, _: &Config, _: &MigrationRegistry) -> Result<()> {
    anyhow::bail!("catalogi-migrate was built without the `sqlite` feature")
}

#[cfg(feature = "postgres")]
fn run_postgres(command: &Command, config: &Config, registry: &MigrationRegistry) -> Result<()> {
    let mut client = postgres::Client::connect(&config.database.url, postgres::NoTls)
        .context("connecting to postgres")?;
    let store =
        catalogi::store::PostgresStore::with_table(&mut client, &config.database.ledger_table)?;
    run(command, config, registry, store)
}

#[cfg(not(feature = "postgres"))]
fn run_postgres(_: &Command, _: &Config, _: &MigrationRegistry) -> Result<()> {
    anyhow::bail!("catalogi-migrate was built without the `postgres` feature")
}

#[cfg(feature = "mysql")]
fn run_mysql(command: &Command, config: &Config, registry: &MigrationRegistry) -> Result<()> {
    let opts = mysql::Opts::from_url(&config.database.url).context("parsing mysql url")?;
    let pool = mysql::Pool::new(opts).context("connecting to mysql")?;
    let mut conn = pool.get_conn()?;
    let store = catalogi::store::MySqlStore::with_table(&mut conn, &config.database.ledger_table)?;
    run(command, config, registry, store)
}

#[cfg(not(feature = "mysql"))]
fn run_mysql(_: &Command, _: &Config, _: &MigrationRegistry) -> Result<()> {
    anyhow::bail!("catalogi-migrate was built without the `mysql` feature")
}

fn run<S: SchemaStore + Ledger>(
    command: &Command,
    config: &Config,
    registry: &MigrationRegistry,
    store: S,
) -> Result<()> {
    let mut migrator = Migrator::new(registry, config.database.backend.backend(), store)
        .allow_unordered(config.database.allow_unordered);

    match command {
        Command::Up => {
            let applied = migrator.apply_forward()?;
            println!("applied {} migration(s)", applied.len());
        }
        Command::Down { target } => {
            let reversed = migrator.apply_reverse(target.as_deref())?;
            println!("reversed {} migration(s)", reversed.len());
        }
        Command::Status => {
            for status in migrator.status()? {
                match status.applied_at {
                    Some(applied_at) => {
                        println!("[x] {}  {}", status.identifier, applied_at.to_rfc3339())
                    }
                    None => println!("[ ] {}", status.identifier),
                }
            }
        }
        Command::Sql { reverse, target } => {
            let plan = if *reverse {
                migrator.generate_reverse_sql(target.as_deref())?
            } else {
                migrator.generate_forward_sql()?
            };
            for (identifier, statements) in plan {
                println!("-- {}", identifier);
                for sql in statements {
                    println!("{};", sql);
                }
            }
        }
    }

    Ok(())
}
