use anyhow::{Context, Result};
use awsq::aws::http::format_aws_error;
use awsq::aws::AwsClient;
use awsq::config::Config;
use awsq::table::{QueryEngine, QueryRequest, Qualifier, Qualifiers, Row, TableRegistry};
use clap::{Parser, Subcommand, ValueEnum};
use futures::StreamExt;
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Query AWS resources as tables
#[derive(Parser, Debug)]
#[command(name = "awsq", version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// AWS region to report on rows
    #[arg(short, long, global = true)]
    region: Option<String>,

    /// Send every request to this URL (e.g. a SigV4 signing proxy)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    /// Log to stderr instead of the log file
    #[arg(long, global = true)]
    log_stderr: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List available tables
    Tables,
    /// Show the columns of a table
    Columns { table: String },
    /// Query a table
    Query {
        table: String,

        /// Columns to return, comma separated (default: all)
        #[arg(short, long, value_delimiter = ',')]
        columns: Vec<String>,

        /// Qualifier such as `granularity=MONTHLY`; repeatable
        #[arg(short = 'w', long = "where")]
        qualifiers: Vec<String>,

        /// Stop after this many rows
        #[arg(long)]
        limit: Option<usize>,

        #[arg(short, long, value_enum, default_value = "json")]
        output: OutputFormat,
    },
    /// Print the effective configuration
    Config,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// One JSON object per line
    Json,
    /// One YAML document per row
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(
    level: LogLevel,
    to_stderr: bool,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    // RUST_LOG wins over --log-level
    let filter = match (EnvFilter::try_from_default_env(), level.to_tracing_level()) {
        (Ok(filter), _) => filter,
        (Err(_), Some(level)) => EnvFilter::default().add_directive(LevelFilter::from_level(level).into()),
        (Err(_), None) => return Ok(None),
    };

    if to_stderr {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .init();
        return Ok(None);
    }

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("awsq {} started with log level: {:?}", awsq::VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("awsq").join("awsq.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".awsq").join("awsq.log");
    }
    PathBuf::from("awsq.log")
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _log_guard = match setup_logging(args.log_level, args.log_stderr) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Warning: {err:#}");
            None
        }
    };

    if let Err(err) = run(args).await {
        eprintln!("Error: {}", describe_error(&err));
        std::process::exit(1);
    }
}

/// Provider failures get a status hint; everything else prints its chain
fn describe_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<awsq::Error>() {
        Some(awsq::Error::Transport(te)) => {
            tracing::error!("{}", te);
            format!("{} {}", format_aws_error(te), te.message)
        }
        _ => format!("{err:#}"),
    }
}

async fn run(args: Args) -> Result<()> {
    let config = Config::load();
    let registry = Arc::new(TableRegistry::aws()?);

    match args.command {
        Command::Tables => {
            let mut out = std::io::stdout().lock();
            for name in registry.table_names() {
                let table = registry.get(name)?;
                writeln!(out, "{:<34} {}", table.name, table.description)?;
            }
        }
        Command::Columns { table } => {
            let table = registry.get(&table)?;
            let mut out = std::io::stdout().lock();
            for column in &table.columns {
                writeln!(
                    out,
                    "{:<36} {:<10} {}",
                    column.name,
                    column.column_type.to_string(),
                    column.description
                )?;
            }
        }
        Command::Config => {
            let region = config.effective_region(args.region.as_deref());
            let settings = config.settings(&region)?;
            let effective = json!({
                "config_path": Config::config_path(),
                "region": settings.region,
                "partition": settings.partition,
                "endpoint": config.endpoint_url(args.endpoint.as_deref())?.map(|u| u.to_string()),
                "request_timeout_secs": config.request_timeout().as_secs(),
                "hydrate_concurrency": settings.hydrate_concurrency,
                "transform_errors": settings.transform_errors,
                "lookback": settings.lookback,
                "forecast": settings.forecast,
            });
            println!("{}", serde_json::to_string_pretty(&effective)?);
        }
        Command::Query {
            table,
            columns,
            qualifiers,
            limit,
            output,
        } => {
            let region = config.effective_region(args.region.as_deref());
            let settings = config.settings(&region)?;
            let endpoint = config.endpoint_url(args.endpoint.as_deref())?;
            let client = AwsClient::new(&settings.partition, endpoint, config.request_timeout())?;

            let qualifiers = qualifiers
                .iter()
                .map(|q| q.parse::<Qualifier>())
                .collect::<awsq::Result<Vec<_>>>()?
                .into_iter()
                .fold(Qualifiers::new(), Qualifiers::with);

            let engine = QueryEngine::new(Arc::clone(&registry), Arc::new(client), settings);
            let request = QueryRequest::new(&table).columns(columns).qualifiers(qualifiers);
            stream_rows(&engine, request, limit, output).await?;
        }
    }

    Ok(())
}

async fn stream_rows(
    engine: &QueryEngine,
    request: QueryRequest,
    limit: Option<usize>,
    output: OutputFormat,
) -> Result<()> {
    let mut rows = engine.execute(request)?;
    let mut out = std::io::stdout().lock();
    let mut written = 0usize;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    while limit.map_or(true, |l| written < l) {
        let next = tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted after {} rows", written);
                break;
            }
            next = rows.next() => next,
        };
        let Some(row) = next else {
            break;
        };
        write_row(&mut out, &row?, output)?;
        written += 1;
    }

    tracing::info!("Wrote {} rows", written);
    Ok(())
}

fn write_row(out: &mut impl Write, row: &Row, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(row)?)?,
        OutputFormat::Yaml => write!(out, "---\n{}", serde_yaml::to_string(row)?)?,
    }
    Ok(())
}
