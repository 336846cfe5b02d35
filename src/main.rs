//! Mannerly command-line entry point
//!
//! Fetches URLs politely from the terminal and inspects robots.txt rules.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use mannerly::client::{extract_user_agent, headers_from_pairs};
use mannerly::config::{load_config, ClientConfig};
use mannerly::transport::ReqwestTransport;
use mannerly::{ClientBuilder, RobotsRules};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Mannerly: a well-mannered HTTP client
///
/// Requests are checked against robots.txt, served from a local cache when
/// possible, retried with backoff on dropped connections and spaced out by
/// the site's crawl-delay.
#[derive(Parser, Debug)]
#[command(name = "mannerly")]
#[command(version)]
#[command(about = "A well-mannered HTTP client for bots and scrapers", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// User-Agent to send (overrides the configuration)
    #[arg(short = 'A', long, global = true)]
    user_agent: Option<String>,

    /// Do not fetch or enforce robots.txt
    #[arg(long, global = true)]
    ignore_robots: bool,

    /// Disable the response cache
    #[arg(long, global = true)]
    no_cache: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// GET a URL and print status, headers and body
    Get(FetchArgs),

    /// HEAD a URL and print status and headers
    Head(FetchArgs),

    /// Show robots.txt decisions for a netloc
    Robots {
        /// Domain to read robots.txt from
        netloc: String,

        /// Paths to check
        paths: Vec<String>,
    },
}

#[derive(clap::Args, Debug)]
struct FetchArgs {
    /// Absolute URL to request
    url: String,

    /// Skip the cache for this request
    #[arg(long)]
    bypass_cache: bool,

    /// Extra header, e.g. -H 'Accept: application/json'
    #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
    headers: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?
        }
        None => ClientConfig::default(),
    };

    if let Some(user_agent) = &cli.user_agent {
        config.headers.retain(|name, _| !name.eq_ignore_ascii_case("user-agent"));
        config
            .headers
            .insert("User-Agent".to_string(), user_agent.clone());
    }
    if cli.ignore_robots {
        config.respect_robots_txt = false;
    }
    if cli.no_cache {
        config.cache.enabled = false;
    }

    match cli.command {
        Command::Get(args) => handle_fetch(config, args, false).await,
        Command::Head(args) => handle_fetch(config, args, true).await,
        Command::Robots { netloc, paths } => handle_robots(config, &netloc, &paths).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("mannerly=info,warn"),
            1 => EnvFilter::new("mannerly=debug,info"),
            2 => EnvFilter::new("mannerly=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles `get` and `head`
async fn handle_fetch(mut config: ClientConfig, args: FetchArgs, head: bool) -> anyhow::Result<()> {
    let url = url::Url::parse(&args.url).with_context(|| format!("invalid URL '{}'", args.url))?;
    if config.netloc.is_none() {
        let host = url
            .host_str()
            .ok_or_else(|| anyhow!("URL '{}' has no host", args.url))?;
        config.netloc = Some(host.to_string());
    }

    let client = ClientBuilder::from_config(&config)?.build().await?;

    let mut options = client.request_options().bypass_cache(args.bypass_cache);
    if !args.headers.is_empty() {
        let extra = headers_from_pairs(parse_header_args(&args.headers)?)?;
        options = options.with_headers(extra);
    }

    let response = if head {
        client.head_with(&args.url, &options).await?
    } else {
        client.get_with(&args.url, &options).await?
    };

    println!("{} {}", response.status, response.url);
    if response.from_cache {
        println!("(served from cache)");
    }
    for (name, value) in response.headers.iter() {
        println!("{}: {}", name, String::from_utf8_lossy(value.as_bytes()));
    }
    if !head {
        println!();
        println!("{}", response.text());
    }

    Ok(())
}

/// Handles `robots`: prints crawl-delay and a verdict per path
async fn handle_robots(config: ClientConfig, netloc: &str, paths: &[String]) -> anyhow::Result<()> {
    let headers = config.header_map()?;
    let user_agent = extract_user_agent(&headers)?;
    let transport = ReqwestTransport::new()?;
    let robots = RobotsRules::fetch(netloc, &headers, &transport).await?;

    println!("robots.txt for {} (user-agent: {})", netloc, user_agent);
    println!("  crawl-delay: {}ms", robots.crawl_delay(&user_agent)?);
    for sitemap in robots.rules().sitemaps() {
        println!("  sitemap: {}", sitemap);
    }
    for path in paths {
        let verdict = if robots.allowed(&user_agent, path) {
            "allowed"
        } else {
            "disallowed"
        };
        println!("  {} {}", verdict, path);
    }

    Ok(())
}

/// Splits `Name: value` arguments
fn parse_header_args(raw: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    raw.iter()
        .map(|header| {
            header
                .split_once(':')
                .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
                .ok_or_else(|| anyhow!("header '{}' is not in 'Name: value' form", header))
        })
        .collect()
}
