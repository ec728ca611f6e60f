use clap::Parser;
use tracing_subscriber::EnvFilter;
use vigil::{
    config::{RuntimeConfig, RuntimeOverrides},
    supervisor::Supervisor,
};

#[derive(Parser)]
#[command(name = "vigil", version, about = "Config-driven observability collector")]
struct Cli {
    /// Path to the instance configuration file.
    #[arg(short, long)]
    config: String,

    /// API key for authentication (overrides VIGIL_API_KEY).
    #[arg(long)]
    api_key: Option<String>,

    /// API server port (overrides VIGIL_API_PORT, default: 8080).
    #[arg(long)]
    port: Option<u16>,

    /// Database file path (overrides VIGIL_DB_PATH, default: observations.db).
    #[arg(long)]
    db_path: Option<String>,

    /// Log level: DEBUG, INFO, WARN, ERROR (overrides VIGIL_LOG_LEVEL).
    #[arg(long)]
    log_level: Option<String>,

    /// Log format: text or json (overrides VIGIL_LOG_FORMAT).
    #[arg(long)]
    log_format: Option<String>,

    /// Log output: stdout, stderr, or a file path (overrides VIGIL_LOG_OUTPUT).
    #[arg(long)]
    log_output: Option<String>,

    /// Enable development mode (overrides VIGIL_DEV_MODE).
    #[arg(long)]
    dev_mode: bool,

    /// Path to a .env file loaded before flag resolution.
    #[arg(long, default_value = ".env")]
    env_file: String,
}

fn init_tracing(config: &RuntimeConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Dev mode widens the default filter, but an explicit level wins.
    let level = if config.dev_mode && config.log_level.eq_ignore_ascii_case("info") {
        "debug".to_string()
    } else {
        config.log_level.to_lowercase()
    };
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));

    let json = config.log_format.eq_ignore_ascii_case("json");
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match config.log_output.as_str() {
        "stdout" => {
            if json {
                builder.json().init();
            } else {
                builder.init();
            }
        }
        "stderr" => {
            if json {
                builder.with_writer(std::io::stderr).json().init();
            } else {
                builder.with_writer(std::io::stderr).init();
            }
        }
        path => {
            let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
            let writer = std::sync::Mutex::new(file);
            if json {
                builder.with_writer(writer).json().init();
            } else {
                builder.with_writer(writer).init();
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load the .env file before resolving env-var fallbacks.
    let _ = dotenvy::from_path(&cli.env_file);

    let config = RuntimeConfig::resolve(RuntimeOverrides {
        config_path: cli.config,
        api_key: cli.api_key,
        port: cli.port,
        db_path: cli.db_path,
        log_level: cli.log_level,
        log_format: cli.log_format,
        log_output: cli.log_output,
        dev_mode: cli.dev_mode,
    });

    if let Err(e) = init_tracing(&config) {
        eprintln!("failed to initialize logging: {e}");
        std::process::exit(1);
    }

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "configuration error");
        std::process::exit(1);
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting vigil");

    if let Err(e) = Supervisor::new(config).run().await {
        tracing::error!(error = %e, "application error");
        std::process::exit(1);
    }
}
