use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use kiss_httpd::config::{Config, ConfigSource};
use kiss_httpd::server::listener::DEFAULT_PORT;
use kiss_httpd::server::signals;
use kiss_httpd::{Server, ServerError};

/// Keep It Simple, Stupid HTTP daemon.
#[derive(Debug, Parser)]
#[command(name = "kiss-httpd", version)]
struct Args {
    /// Read configuration from the file
    #[arg(short = 'c', long = "conf-file", value_name = "FILE")]
    conf_file: Option<PathBuf>,

    /// Test configuration file and exit
    #[arg(short = 't', long = "test-conf", value_name = "FILE")]
    test_conf: Option<PathBuf>,

    /// Write logs to the file
    #[arg(short = 'l', long = "log-file", value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// HTML file served for `/`
    #[arg(short = 'f', long = "file-html", value_name = "FILE")]
    file_html: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(path) = &args.test_conf {
        return match Config::from_file(path) {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{e}");
                ExitCode::FAILURE
            }
        };
    }

    init_logging(args.log_file.as_ref());

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(phase = failure_phase(&e), "{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Whether a fatal error stopped the server before or after it started serving.
fn failure_phase(e: &anyhow::Error) -> &'static str {
    match e.downcast_ref::<ServerError>() {
        Some(err) if err.is_startup() => "startup",
        Some(_) => "runtime",
        // Signal handler installation.
        None => "startup",
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Started kiss-httpd");

    let source = ConfigSource {
        path: args.conf_file,
        html_file: args.file_html,
    };
    let config = match source.load() {
        Ok(config) => {
            if let Some(path) = &source.path {
                tracing::info!(path = %path.display(), "Configuration read from file");
            }
            config
        }
        Err(e) => {
            tracing::error!(error = %e, "Using default configuration");
            source.fallback()
        }
    };

    let mut server = Server::bind(DEFAULT_PORT, config)
        .context("listener setup failed")?
        .with_config_source(source);

    signals::spawn(server.handle()).context("can not install signal handlers")?;

    let result = server.run();
    drop(server);
    tracing::info!("Stopped kiss-httpd");

    result.context("server loop terminated")
}

fn init_logging(log_file: Option<&PathBuf>) {
    let file = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("Can not open log file {}: {}", path.display(), e);
                None
            }
        }
    });

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let to_file = file.is_some();
    let writer = match file {
        Some(file) => BoxMakeWriter::new(Mutex::new(file)),
        None => BoxMakeWriter::new(std::io::stdout),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(!to_file)
        .with_target(false)
        .with_level(true)
        .init();
}
