mod cache;
mod config;
mod models;
mod scraper;
mod server;
#[cfg(test)]
mod testing;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cache::OperatorCache;
use crate::config::AppConfig;
use crate::scraper::{OperatorSource, Termination, TourOperatorScraper, WalkReport};

#[derive(Parser)]
#[command(name = "bto-scraper", about = "Belize licensed tour operator listing service", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the cached operator listing over HTTP
    Serve {
        /// Address to listen on (overrides server.bind)
        #[arg(short, long, env = "BTO_BIND")]
        bind: Option<SocketAddr>,
    },

    /// Walk the remote listing once and print it (no cache)
    Fetch {
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,

        /// Print per-district and per-category counts instead of JSON
        #[arg(long, conflicts_with = "pretty")]
        summary: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "bto_scraper=info,warn",
        1 => "bto_scraper=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;

    match cli.command {
        Command::Serve { bind } => {
            let scraper = TourOperatorScraper::from_config(&config.scraper)
                .context("Failed to build scraper")?;
            let source: Arc<dyn OperatorSource> = Arc::new(scraper);
            let cache = Arc::new(OperatorCache::from_config(source, &config.cache));

            info!(
                "Serving {} (cache TTL {}s, page limit {})",
                config.scraper.base_url, config.cache.ttl_secs, config.scraper.max_pages
            );
            server::serve(cache, bind.unwrap_or(config.server.bind)).await?;
        }

        Command::Fetch { pretty, summary } => {
            let _t = utils::Timer::start("Operator fetch");
            let scraper = TourOperatorScraper::from_config(&config.scraper)
                .context("Failed to build scraper")?;
            let report = scraper.walk().await.context("Operator walk failed")?;

            if summary {
                print_summary(&report);
            } else if pretty {
                println!("{}", serde_json::to_string_pretty(&report.records)?);
            } else {
                println!("{}", serde_json::to_string(&report.records)?);
            }
        }
    }

    Ok(())
}

fn print_summary(report: &WalkReport) {
    let mut by_district = BTreeMap::new();
    let mut by_category = BTreeMap::new();
    let mut by_price = BTreeMap::new();
    for r in &report.records {
        *by_district.entry(r.district).or_insert(0usize) += 1;
        *by_category.entry(r.category).or_insert(0usize) += 1;
        *by_price.entry(r.price_range).or_insert(0usize) += 1;
    }

    let stopped = match report.termination {
        Termination::LastPage => "last page",
        Termination::MalformedContinuation => "unreadable pager link",
        Termination::SafetyBound => "page limit",
    };

    println!("─────────────────────────────────");
    println!("  Tour operators: {} over {} pages", report.records.len(), report.pages);
    println!("  Stopped at: {}", stopped);
    println!("─────────────────────────────────");
    for (district, n) in &by_district {
        println!("  {} {:>4}", utils::dotted(district.as_str(), 16), n);
    }
    println!("─────────────────────────────────");
    for (category, n) in &by_category {
        println!("  {} {:>4}", utils::dotted(category.as_str(), 16), n);
    }
    println!("─────────────────────────────────");
    for (tier, n) in &by_price {
        println!("  {} {:>4}", utils::dotted(tier.as_str(), 16), n);
    }
    println!("─────────────────────────────────");
}
