//! `fetch`: command-line front end for the request engine.
//!
//! ```text
//! fetch [OPTIONS] <URL>
//!     → config file (optional) → ClientConfig
//!     → flags → RequestOptions
//!     → Client::fetch (redirects, proxy tunnel, decoding)
//!     → body on stdout, redirect chain in the debug log
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use request_engine::config::{load_config, ClientConfig};
use request_engine::http::{parse_method, Payload, RequestOptions};
use request_engine::observability::logging;
use request_engine::Client;
use url::Url;

#[derive(Parser)]
#[command(name = "fetch")]
#[command(about = "Fetch a URL, following redirects and decoding compressed bodies", long_about = None)]
struct Cli {
    /// Absolute http(s) URL to fetch
    url: String,

    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Request header as "Name: value" (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Request body, sent verbatim
    #[arg(short, long, conflicts_with = "json")]
    data: Option<String>,

    /// Request body parsed as JSON and sent as application/json
    #[arg(long)]
    json: Option<String>,

    /// Forward proxy URL
    #[arg(long)]
    proxy: Option<String>,

    /// Send HTTPS requests to the proxy without a CONNECT tunnel
    #[arg(long)]
    no_tunnel: bool,

    /// Attempt timeout in milliseconds (0 disables)
    #[arg(long)]
    timeout: Option<u64>,

    #[arg(long)]
    max_redirects: Option<u32>,

    /// Do not advertise or expect compressed responses
    #[arg(long)]
    no_compression: bool,

    /// Print status line and response headers before the body
    #[arg(short, long)]
    include: bool,

    /// TOML file with client defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    tracing::debug!(
        timeout_ms = config.timeout_ms,
        max_redirects = config.max_redirects,
        proxy = ?config.proxy,
        "Configuration loaded"
    );

    let client = Client::new(config)?;
    let options = build_options(&cli)?;
    let response = client.fetch(options).await?;

    for (hop, url) in response.redirections().iter().enumerate() {
        tracing::debug!(hop = hop + 1, url = %url, "Redirected");
    }

    if cli.include {
        println!("{:?} {}", response.version(), response.status());
        for (name, value) in response.headers() {
            println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
        }
        println!();
    }
    print!("{}", response.body());

    Ok(())
}

fn build_options(cli: &Cli) -> Result<RequestOptions, Box<dyn std::error::Error>> {
    let mut options = RequestOptions::new(&cli.url)?.method(parse_method(&cli.method)?);

    for header in &cli.headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| format!("header must be 'Name: value', got '{}'", header))?;
        options = options.header(name, value);
    }

    if let Some(data) = &cli.data {
        options = options.payload(data.as_str());
    }
    if let Some(json) = &cli.json {
        let value: serde_json::Value = serde_json::from_str(json)?;
        options = options.payload(Payload::Json(value));
    }
    if let Some(proxy) = &cli.proxy {
        options = options.proxy(Url::parse(proxy)?);
    }
    if cli.no_tunnel {
        options = options.tunnel(false);
    }
    if let Some(ms) = cli.timeout {
        options = options.timeout(Duration::from_millis(ms));
    }
    if let Some(max) = cli.max_redirects {
        options = options.max_redirects(max);
    }
    if cli.no_compression {
        options = options.compression(false);
    }

    Ok(options)
}
