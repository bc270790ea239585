//! Matchday CLI
//!
//! Command-line interface for the Matchday football data service.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use matchday_api::{ApiConfig, ApiServer, AppState};
use matchday_cache::TtlCache;
use matchday_core::keys::{self, LIVE_ALL};
use matchday_sports::Cached;

/// Matchday - cached football fixtures, standings and news
#[derive(Parser)]
#[command(name = "matchday")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3001", env = "PORT")]
        port: u16,
        /// Bind address
        #[arg(short, long, default_value = "0.0.0.0")]
        bind: String,
    },

    /// Show fixtures for a day, or fixtures in play
    Fixtures {
        /// Match date (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<String>,
        /// Live selector: "all" or dash-separated league ids
        #[arg(short, long, conflicts_with = "date", num_args = 0..=1, default_missing_value = LIVE_ALL)]
        live: Option<String>,
    },

    /// Show a league table
    Standings {
        /// League id
        #[arg(short, long)]
        league: String,
        /// Season year
        #[arg(short, long)]
        season: Option<String>,
    },

    /// List leagues of the current season
    Leagues,

    /// Show latest news, or one post
    News {
        /// Post id
        #[arg(long)]
        id: Option<String>,
    },

    /// Measure request deduplication under concurrent misses
    Bench {
        /// Number of concurrent requests for the same key
        #[arg(short, long, default_value = "1000")]
        count: usize,
        /// Simulated upstream latency in milliseconds
        #[arg(long, default_value = "50")]
        latency_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "matchday=debug,info"
    } else {
        "matchday=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Serve { port, bind } => cmd_serve(port, &bind).await,
        Commands::Fixtures { date, live } => cmd_fixtures(date, live).await,
        Commands::Standings { league, season } => cmd_standings(&league, season.as_deref()).await,
        Commands::Leagues => cmd_leagues().await,
        Commands::News { id } => cmd_news(id.as_deref()).await,
        Commands::Bench { count, latency_ms } => cmd_bench(count, latency_ms).await,
    }
}

/// Builds services from the environment for one-shot commands.
fn load_state() -> Result<AppState> {
    AppState::new(ApiConfig::from_env()).context("Failed to configure upstream clients")
}

/// Runs `request` behind a spinner.
async fn with_spinner<F>(message: String, request: F) -> Result<Cached<Value>>
where
    F: Future<Output = matchday_core::Result<Cached<Value>>>,
{
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.set_message(message.clone());
    spinner.enable_steady_tick(Duration::from_millis(80));

    let result = request.await;
    spinner.finish_and_clear();

    result.with_context(|| format!("{} failed", message))
}

fn print_cached(title: &str, cached: &Cached<Value>) -> Result<()> {
    let source = if cached.from_cache {
        format!("cache, {}ms old", cached.age.as_millis()).yellow()
    } else {
        "upstream".green()
    };
    println!("{} {} ({})", "✅".green(), title.bold(), source);
    println!("{}", serde_json::to_string_pretty(&*cached.data)?);
    Ok(())
}

/// Run API server
async fn cmd_serve(port: u16, bind: &str) -> Result<()> {
    println!("{}", "🚀 Starting Matchday API server...".cyan().bold());
    println!("   {} http://{}:{}", "Listening on:".green(), bind, port);
    println!("   {} http://{}:{}/health", "Health check:".dimmed(), bind, port);
    println!("\n   Press Ctrl+C to stop.\n");

    let server = ApiServer::new(ApiConfig::from_env()).context("Failed to configure API server")?;

    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind, port))?;
    server.run(addr).await?;

    Ok(())
}

/// Show fixtures
async fn cmd_fixtures(date: Option<String>, live: Option<String>) -> Result<()> {
    let state = load_state()?;

    let (title, cached) = match date {
        Some(date) => {
            let cached = with_spinner(format!("Fetching fixtures for {}", date), state.sports.fixtures_by_date(&date)).await?;
            (format!("Fixtures on {}", date), cached)
        }
        None => {
            let live = live.unwrap_or_else(|| LIVE_ALL.to_string());
            let cached = with_spinner(format!("Fetching live fixtures ({})", live), state.sports.fixtures_live(&live)).await?;
            (format!("Live fixtures ({})", live), cached)
        }
    };

    let count = cached.data.as_array().map(Vec::len).unwrap_or(0);
    print_cached(&format!("{} - {} fixture(s)", title, count), &cached)
}

/// Show standings
async fn cmd_standings(league: &str, season: Option<&str>) -> Result<()> {
    let state = load_state()?;
    let cached = with_spinner(
        format!("Fetching standings for league {}", league),
        state.sports.standings(league, season),
    )
    .await?;
    print_cached(&format!("Standings for league {}", league), &cached)
}

/// List leagues
async fn cmd_leagues() -> Result<()> {
    let state = load_state()?;
    let cached = with_spinner("Fetching leagues".to_string(), state.sports.leagues()).await?;
    print_cached("Leagues", &cached)
}

/// Show news
async fn cmd_news(id: Option<&str>) -> Result<()> {
    let state = load_state()?;
    let cached = match id {
        Some(id) => with_spinner(format!("Fetching post {}", id), state.news.post(id)).await?,
        None => with_spinner("Fetching latest news".to_string(), state.news.latest()).await?,
    };
    let title = id.map(|id| format!("Post {}", id)).unwrap_or_else(|| "Latest news".to_string());
    print_cached(&title, &cached)
}

/// Run the deduplication benchmark
async fn cmd_bench(count: usize, latency_ms: u64) -> Result<()> {
    println!(
        "{} {} concurrent requests, {}ms upstream latency",
        "📊 Benchmarking with".cyan().bold(),
        count,
        latency_ms
    );

    let cache = TtlCache::new();
    let key = keys::fixtures_live(LIVE_ALL);
    let upstream_calls = Arc::new(AtomicUsize::new(0));

    let pb = ProgressBar::new(count as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("   [{bar:40.cyan/blue}] {pos}/{len}")?
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let mut tasks = Vec::with_capacity(count);
    for _ in 0..count {
        let cache = cache.clone();
        let key = key.clone();
        let calls = upstream_calls.clone();
        let pb = pb.clone();
        tasks.push(tokio::spawn(async move {
            let result = cache
                .fetch_with_dedup(&key, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(latency_ms)).await;
                    Ok::<_, Infallible>(Value::Array(Vec::new()))
                })
                .await;
            pb.inc(1);
            result
        }));
    }

    let mut failures = 0;
    for task in tasks {
        if task.await.context("Bench task panicked")?.is_err() {
            failures += 1;
        }
    }
    pb.finish();
    let elapsed = start.elapsed();

    let calls = upstream_calls.load(Ordering::SeqCst);
    println!("\n{}", "📈 Results:".green().bold());
    println!("   Requests: {}", count);
    println!("   Upstream calls: {}", calls);
    println!("   Failures: {}", failures);
    println!("   Wall time: {:?}", elapsed);

    if calls == 1 && failures == 0 {
        println!("   {} All requests shared one upstream call!", "✅".green());
    } else {
        println!("   {} Expected 1 upstream call, saw {}", "❌".red(), calls);
    }

    Ok(())
}
