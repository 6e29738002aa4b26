//! dbtweak Command-Line Client
//!
//! Runs one schema action (clone, rename, resize, reorder, delete, ...) on
//! one collection of a remote databases API.

mod commands;
mod executor;
mod formatter;

use clap::Parser;
use commands::Action;
use dbtweak_client::{Client, ClientConfig};
use dbtweak_core::{MigrationConfig, MigrationPlanner};
use executor::ExecuteError;
use formatter::OutputFormat;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// dbtweak Command-Line Client
#[derive(Parser, Debug)]
#[command(name = "dbtweak")]
#[command(version, about = "Schema migrations for document-store collections")]
pub struct Args {
    /// API endpoint
    #[arg(long, env = "APPWRITE_API_ENDPOINT", default_value = dbtweak_client::config::DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// API key
    #[arg(long, env = "APPWRITE_API_KEY", hide_env_values = true)]
    pub key: String,

    /// Project identifier
    #[arg(long, env = "APPWRITE_PROJECT_ID")]
    pub project: String,

    /// Database identifier
    #[arg(long, env = "APPWRITE_DATABASE_ID")]
    pub database: String,

    /// Collection to work on
    #[arg(short = 'c', long)]
    pub collection: String,

    /// Documents fetched per page when copying values
    #[arg(long, default_value_t = dbtweak_core::config::DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Name of the temporary attribute used by rename and resize
    #[arg(long, default_value = dbtweak_core::config::DEFAULT_TEMP_ATTRIBUTE)]
    pub tmp_attr: String,

    /// Delay between two status polls, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Give up waiting for an attribute or index after this many seconds
    #[arg(long)]
    pub wait_timeout_secs: Option<u64>,

    /// Integer bounds larger than this are dropped when an attribute is copied
    #[arg(long, default_value_t = dbtweak_core::config::DEFAULT_INTEGER_BOUND_LIMIT)]
    pub integer_bound_limit: i64,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Accept self-signed TLS certificates
    #[arg(long)]
    pub self_signed: bool,

    /// Print the plan without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Output format
    #[arg(long, default_value = "table", value_enum)]
    pub format: OutputFormat,

    /// Log every request and poll
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub action: Action,
}

impl Args {
    fn client_config(&self) -> ClientConfig {
        ClientConfig::new(&self.project, &self.key, &self.database)
            .with_endpoint(&self.endpoint)
            .with_timeout(Duration::from_secs(self.timeout))
            .with_self_signed(self.self_signed)
    }

    fn migration_config(&self) -> MigrationConfig {
        let config = MigrationConfig::default()
            .with_temp_attribute(&self.tmp_attr)
            .with_chunk_size(self.chunk_size)
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_integer_bound_limit(self.integer_bound_limit)
            .with_dry_run(self.dry_run);

        match self.wait_timeout_secs {
            Some(secs) => config.with_wait_deadline(Duration::from_secs(secs)),
            None => config,
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // RUST_LOG wins over --verbose.
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "dbtweak={level},dbtweak_core={level},dbtweak_client={level}"
        ))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), ExecuteError> {
    let client = Client::new(args.client_config())?;
    let planner = MigrationPlanner::new(&client, &args.collection, args.migration_config())?;
    let formatter = formatter::create_formatter(args.format);

    if args.dry_run && !args.action.is_read_only() {
        info!(collection = %args.collection, "dry run, nothing will be changed");
    }

    let output = executor::execute(&planner, &args.action, &*formatter).await?;
    println!("{}", output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec![
            "dbtweak",
            "--project",
            "proj",
            "--key",
            "secret",
            "--database",
            "main",
            "--collection",
            "users",
        ];
        argv.extend_from_slice(extra);
        argv.push("list");
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = args(&["--endpoint", "http://localhost/v1"]);
        let config = args.migration_config();
        assert_eq!(config, MigrationConfig::default());
        assert_eq!(args.format, OutputFormat::Table);

        let client = args.client_config();
        assert_eq!(client.endpoint, "http://localhost/v1");
        assert_eq!(client.timeout, Duration::from_secs(30));
        assert!(!client.self_signed);
    }

    #[test]
    fn test_overrides() {
        let args = args(&[
            "--endpoint",
            "https://db.example.com/v1/",
            "--chunk-size",
            "25",
            "--tmp-attr",
            "scratch",
            "--poll-interval-ms",
            "50",
            "--wait-timeout-secs",
            "120",
            "--integer-bound-limit",
            "1000000",
            "--dry-run",
            "--self-signed",
            "--format",
            "json",
        ]);

        let config = args.migration_config();
        assert_eq!(config.chunk_size, 25);
        assert_eq!(config.temp_attribute, "scratch");
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.wait_deadline, Some(Duration::from_secs(120)));
        assert_eq!(config.integer_bound_limit, 1_000_000);
        assert!(config.dry_run);

        let client = args.client_config();
        assert_eq!(client.endpoint, "https://db.example.com/v1");
        assert!(client.self_signed);
        assert_eq!(args.format, OutputFormat::Json);
    }
}
