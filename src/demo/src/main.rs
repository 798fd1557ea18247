//! Command line front end for the dashboards
//!
//! Each invocation is one session: datasets are generated on first use from
//! the configured seed and every subcommand renders one dashboard page.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dashboard_data::analytics::ChartKind;
use dashboard_data::config::LogFormat;
use dashboard_data::export::export_to_dir;
use dashboard_data::generators::SeriesParams;
use dashboard_data::query::TimeBucket;
use dashboard_data::types::{
    ActivityLevel, Priority, Product, Region, SeriesColumn, Subscription, TicketStatus,
};
use dashboard_data::{
    Config, Dashboard, DashboardError, DatasetKind, DateRangePreset, Session, ViewRequest,
};

mod render;

/// Output format for rendered views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Command line arguments for the dashboard CLI
#[derive(Parser, Debug)]
#[command(name = "dashboard")]
#[command(about = "Admin dashboard and data explorer over synthetic datasets")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Configuration file path
    #[arg(short, long, global = true, env = "DASHBOARD_CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Random seed for dataset generation
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Log level
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
enum Commands {
    /// Revenue, users and tickets at a glance
    Overview {
        /// Date range (7d, 30d, 90d or all)
        #[arg(short, long)]
        range: Option<DateRangePreset>,
    },
    /// Revenue over time by product and region
    Sales {
        #[arg(short, long)]
        range: Option<DateRangePreset>,
        /// Restrict to products, e.g. "Product A"
        #[arg(long = "product")]
        products: Vec<Product>,
        #[arg(long = "region")]
        regions: Vec<Region>,
        /// Time bucket for the revenue trend (day, week or month)
        #[arg(long, default_value = "day")]
        bucket: TimeBucket,
    },
    /// User KPIs, growth and breakdowns
    UserInsights,
    /// Searchable, paginated user directory
    Users {
        /// Substring matched against name, email and user id
        #[arg(short, long, default_value = "")]
        search: String,
        #[arg(long = "subscription")]
        subscriptions: Vec<Subscription>,
        #[arg(long = "activity")]
        activity_levels: Vec<ActivityLevel>,
        #[arg(short, long)]
        page: Option<usize>,
    },
    /// Ticket KPIs and resolution times
    TicketInsights,
    /// Searchable, paginated ticket queue
    Tickets {
        /// Substring matched against ticket id, title and user id
        #[arg(short, long, default_value = "")]
        search: String,
        #[arg(long = "status")]
        statuses: Vec<TicketStatus>,
        #[arg(long = "priority")]
        priorities: Vec<Priority>,
        #[arg(short, long)]
        page: Option<usize>,
    },
    /// Show one ticket
    Ticket {
        /// Ticket id, e.g. TCK-1000
        id: String,
    },
    /// Noisy signal explorer with summary statistics and charts
    Series {
        /// Number of samples
        #[arg(long)]
        size: Option<usize>,
        /// Standard deviation of the added noise
        #[arg(long)]
        noise: Option<f64>,
        /// Chart kind (line, bar, scatter or histogram)
        #[arg(long, default_value = "line")]
        chart: ChartKind,
        /// Columns to chart, e.g. "cos(x)"
        #[arg(long = "column")]
        columns: Vec<SeriesColumn>,
    },
    /// Write a dataset to <dataset>_data.csv
    Export {
        /// sales, users, tickets or series
        dataset: DatasetKind,
        /// Output directory
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = load_config(&args)?;
    override_config_from_args(&mut config, &args);

    init_tracing(&config.logging.level, config.logging.format)?;
    info!("Starting dashboard v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = config.validate() {
        warn!(category = e.category(), "Configuration validation failed: {}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }

    let dashboard = Dashboard::new(config);
    let mut session = dashboard.session();

    match run(&dashboard, &mut session, &args) {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            match e.downcast_ref::<DashboardError>() {
                Some(err) if err.is_caller_error() => {
                    warn!(category = err.category(), "Request rejected: {}", err)
                }
                _ => error!("Command failed: {:#}", e),
            }
            eprintln!("error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Initialize tracing/logging system
fn init_tracing(log_level: &str, format: LogFormat) -> anyhow::Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => {
            eprintln!("Invalid log level: {}. Using 'info'", log_level);
            tracing::Level::INFO
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("dashboard_data={},dashboard={}", level, level).into()
    });
    let registry = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr)
                    .json(),
            )
            .try_init(),
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    result.context("Failed to initialize tracing")
}

/// Load configuration from file or environment
fn load_config(args: &Args) -> anyhow::Result<Config> {
    let config = match &args.config {
        Some(path) => Config::load(Some(path.as_path()))
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::load(None).context("Failed to load configuration from environment")?,
    };
    Ok(config)
}

/// Override configuration with command line arguments
fn override_config_from_args(config: &mut Config, args: &Args) {
    if let Some(seed) = args.seed {
        config.generation.seed = Some(seed);
    }

    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }

    if args.json_logs {
        config.logging.format = LogFormat::Json;
    }

    if let Commands::Series { size, noise, .. } = &args.command {
        if let Some(size) = size {
            config.series.size = *size;
        }
        if let Some(noise) = noise {
            config.series.noise = *noise;
        }
    }
}

/// Turn a subcommand into a view request; `None` for commands that are not views
fn view_request(command: &Commands, params: SeriesParams) -> Option<ViewRequest> {
    let request = match command.clone() {
        Commands::Overview { range } => ViewRequest::Overview { range },
        Commands::Sales {
            range,
            products,
            regions,
            bucket,
        } => ViewRequest::SalesAnalytics {
            range,
            products,
            regions,
            bucket,
        },
        Commands::UserInsights => ViewRequest::UserInsights,
        Commands::Users {
            search,
            subscriptions,
            activity_levels,
            page,
        } => ViewRequest::UserDirectory {
            search,
            subscriptions,
            activity_levels,
            page,
        },
        Commands::TicketInsights => ViewRequest::TicketInsights,
        Commands::Tickets {
            search,
            statuses,
            priorities,
            page,
        } => ViewRequest::TicketQueue {
            search,
            statuses,
            priorities,
            page,
        },
        Commands::Ticket { id } => ViewRequest::TicketDetail { ticket_id: id },
        Commands::Series { chart, columns, .. } => ViewRequest::SeriesExplorer {
            params: Some(params),
            chart,
            columns,
        },
        Commands::Export { .. } => return None,
    };
    Some(request)
}

fn run(dashboard: &Dashboard, session: &mut Session, args: &Args) -> anyhow::Result<String> {
    if let Commands::Export { dataset, dir } = &args.command {
        let directory = dir
            .clone()
            .unwrap_or_else(|| dashboard.config().export.directory.clone());
        let path = export(dashboard, session, *dataset, &directory)?;
        return Ok(format!("Wrote {}", path.display()));
    }

    let params = dashboard.config().series.params();
    let Some(request) = view_request(&args.command, params) else {
        return Ok(String::new());
    };
    debug!(view = request.name(), "Rendering request");

    let response = dashboard.render(session, request)?;
    let output = match args.output {
        OutputFormat::Table => render::render_table(&response),
        OutputFormat::Json => serde_json::to_string_pretty(&response)?,
    };
    Ok(output)
}

/// Export one session dataset using the configured generation parameters
fn export(
    dashboard: &Dashboard,
    session: &mut Session,
    kind: DatasetKind,
    directory: &Path,
) -> dashboard_data::Result<PathBuf> {
    let generation = &dashboard.config().generation;
    match kind {
        DatasetKind::Sales => export_to_dir(
            &session.sales(generation.sales_window_days)?,
            kind,
            directory,
        ),
        DatasetKind::Users => export_to_dir(&session.users(generation.user_count)?, kind, directory),
        DatasetKind::Tickets => {
            export_to_dir(&session.tickets(generation.ticket_count)?, kind, directory)
        }
        DatasetKind::Series => export_to_dir(
            &session.series(dashboard.config().series.params())?,
            kind,
            directory,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_args_parsing() {
        let args = Args::try_parse_from([
            "dashboard",
            "--seed",
            "42",
            "--log-level",
            "debug",
            "tickets",
            "--status",
            "Open",
            "--status",
            "in progress",
            "--priority",
            "critical",
            "--page",
            "2",
        ])
        .unwrap();

        assert_eq!(args.seed, Some(42));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert_eq!(args.output, OutputFormat::Table);
        assert_eq!(
            args.command,
            Commands::Tickets {
                search: String::new(),
                statuses: vec![TicketStatus::Open, TicketStatus::InProgress],
                priorities: vec![Priority::Critical],
                page: Some(2),
            }
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Args::try_parse_from(["dashboard", "overview", "--range", "fortnight"]).is_err());
        assert!(Args::try_parse_from(["dashboard", "export", "orders"]).is_err());
        assert!(Args::try_parse_from(["dashboard", "series", "--chart", "pie"]).is_err());
    }

    #[test]
    fn test_config_override() {
        let mut config = Config::default();
        let args = Args::parse_from([
            "dashboard",
            "--seed",
            "7",
            "--json-logs",
            "series",
            "--size",
            "500",
            "--noise",
            "1.5",
        ]);

        override_config_from_args(&mut config, &args);

        assert_eq!(config.generation.seed, Some(7));
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.series.size, 500);
        assert_eq!(config.series.noise, 1.5);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_view_request_mapping() {
        let args = Args::parse_from(["dashboard", "sales", "--range", "30d", "--bucket", "week"]);
        let request = view_request(&args.command, SeriesParams::default()).unwrap();
        assert_eq!(
            request,
            ViewRequest::SalesAnalytics {
                range: Some(DateRangePreset::Last30Days),
                products: vec![],
                regions: vec![],
                bucket: TimeBucket::Week,
            }
        );

        let args = Args::parse_from(["dashboard", "export", "users"]);
        assert_eq!(view_request(&args.command, SeriesParams::default()), None);
    }

    #[test]
    fn test_series_request_uses_params() {
        let params = SeriesParams::new(250, 0.1);
        let args = Args::parse_from(["dashboard", "series", "--column", "cos(x)"]);
        assert_eq!(
            view_request(&args.command, params),
            Some(ViewRequest::SeriesExplorer {
                params: Some(params),
                chart: ChartKind::Line,
                columns: vec![SeriesColumn::Cos],
            })
        );
    }

    #[test]
    fn test_export_writes_csv() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.generation.ticket_count = 5;
        let dashboard = Dashboard::new(config);
        let mut session = Session::new(Some(1));

        let path = export(&dashboard, &mut session, DatasetKind::Tickets, dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "tickets_data.csv");
        let csv = std::fs::read_to_string(&path).unwrap();
        assert_eq!(csv.lines().count(), 6);
    }
}
