use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tradeforge_backtest::{load_candles_csv, run_backtest, ReportFormatter};
use tradeforge_core::{gate, ConfigLoader, RunRecord};
use tradeforge_strategy::StrategyConfig;

#[derive(Parser)]
#[command(name = "tradeforge")]
#[command(about = "Trading engine core: backtests and live-gate inspection", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a deterministic backtest over historical candles
    Backtest {
        /// Historical data CSV file (timestamp,open,high,low,close,volume)
        #[arg(short, long)]
        data: String,
        /// Starting capital
        #[arg(long, default_value = "10000")]
        capital: Decimal,
        /// Strategy config JSON file; built-in defaults apply when omitted
        #[arg(short, long)]
        strategy: Option<String>,
    },
    /// Evaluate the live-trading gate for a persisted run record snapshot
    GateCheck {
        /// Run record JSON file
        #[arg(short, long)]
        run: String,
        /// Whether exchange credentials resolve for this run
        #[arg(long)]
        secrets_ready: bool,
        /// Config profile (merges config/Config.<profile>.toml)
        #[arg(short, long)]
        profile: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Backtest {
            data,
            capital,
            strategy,
        } => backtest(&data, capital, strategy.as_deref()),
        Commands::GateCheck {
            run,
            secrets_ready,
            profile,
        } => gate_check(&run, secrets_ready, profile.as_deref()),
    }
}

fn backtest(data: &str, capital: Decimal, strategy_path: Option<&str>) -> Result<()> {
    let config = match strategy_path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading strategy config {path}"))?;
            serde_json::from_str::<StrategyConfig>(&text)
                .with_context(|| format!("parsing strategy config {path}"))?
        }
        None => StrategyConfig::default(),
    };
    config.validate()?;

    let candles =
        load_candles_csv(data).with_context(|| format!("loading candles from {data}"))?;
    tracing::info!(bars = candles.len(), "loaded candle history");

    let (report, result) = run_backtest(&candles, &config, capital)?;
    println!(
        "{}",
        ReportFormatter::format(&report, capital, result.final_capital)
    );
    Ok(())
}

fn gate_check(run_path: &str, secrets_ready: bool, profile: Option<&str>) -> Result<()> {
    let text = std::fs::read_to_string(run_path)
        .with_context(|| format!("reading run record {run_path}"))?;
    let record: RunRecord =
        serde_json::from_str(&text).with_context(|| format!("parsing run record {run_path}"))?;

    let app = match profile {
        Some(profile) => ConfigLoader::load_with_profile(profile)?,
        None => ConfigLoader::load()?,
    };

    let decision = gate::evaluate(&record, &app.live.gate_context(secrets_ready), Utc::now());
    if decision.allowed {
        println!("ALLOWED: run {} may submit live orders", record.run_id);
    } else {
        println!("BLOCKED: run {}", record.run_id);
        for reason in &decision.reasons {
            println!("  - {reason}");
        }
    }
    Ok(())
}
