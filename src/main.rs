//! Command-line fetcher.
//!
//! Fetches each URL through the protocol and prints the status code,
//! headers and rendered content.
//!
//! ```text
//! webdriver-fetch --config fetcher.toml --debug https://example.com/
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use webdriver_fetch::{FetcherConfig, WebDriverProtocol, WebPage};

// ============================================================================
// Args
// ============================================================================

/// Fetch pages through geckodriver and a plain header request.
#[derive(Debug, Parser)]
#[command(name = "webdriver-fetch", version, about)]
struct Args {
    /// Configuration file (TOML, YAML or JSON).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,

    /// Stored modification time in ms, sent as If-Modified-Since.
    #[arg(long, default_value_t = 0)]
    last_modified: i64,

    /// Driver service port, overriding the configuration.
    #[arg(long)]
    service_port: Option<u16>,

    /// Print the rendered content.
    #[arg(long)]
    body: bool,

    /// URLs to fetch.
    #[arg(required = true)]
    urls: Vec<String>,
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let mut config = FetcherConfig::load(args.config.as_deref()).context("Loading configuration")?;
    if let Some(port) = args.service_port {
        config = config.with_service_port(port);
    }

    let protocol = WebDriverProtocol::new(config).context("Creating protocol")?;
    info!(urls = args.urls.len(), "Fetching");

    let mut failures = 0usize;
    for url in &args.urls {
        let mut page = WebPage::modified_at(args.last_modified);

        match protocol.fetch(url, &mut page).await {
            Ok(response) => {
                println!("{} {}", response.code(), response.url());
                for (name, value) in response.headers().sorted() {
                    println!("{name}: {value}");
                }
                println!("[{} bytes]", response.content().len());
                if args.body {
                    println!("{}", String::from_utf8_lossy(response.content()));
                }
                println!();
            }
            Err(e) => {
                failures += 1;
                error!(url = %url, error = %e, retryable = e.is_retryable(), "Fetch failed");
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} fetches failed", args.urls.len());
    }
    Ok(())
}

// ============================================================================
// Logging
// ============================================================================

fn init_logging(debug: bool) {
    let default_filter = if debug {
        "webdriver_fetch=debug"
    } else {
        "webdriver_fetch=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
