#![forbid(unsafe_code)]
//! Race a set of miners against one pool and dump the resulting chain.

use clap::Parser;
use colored::*;
use powpool::config::load_config;
use powpool::miner::race;
use powpool::MiningPool;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "powpool.toml")]
    config: PathBuf,
    /// Override the required leading zero bits
    #[arg(long)]
    difficulty: Option<u32>,
    /// Override the width of each nonce range
    #[arg(long)]
    increment: Option<u64>,
    /// Override the number of racing workers
    #[arg(long)]
    workers: Option<usize>,
    /// Number of blocks to mine on top of genesis
    #[arg(long, default_value_t = 5)]
    blocks: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    tracing_subscriber::fmt::init();

    let mut config = load_config(&cli.config)?;
    if let Some(difficulty) = cli.difficulty {
        config.mining.difficulty = difficulty;
    }
    if let Some(increment) = cli.increment {
        config.mining.increment = increment;
    }
    if let Some(workers) = cli.workers {
        config.mining.workers = workers;
    }
    config.validate()?;

    info!(
        "Mining genesis at difficulty {} with {} workers",
        config.mining.difficulty, config.mining.workers
    );
    let pool = Arc::new(MiningPool::from_config(&config)?);
    let target_len = pool.len() + cli.blocks;

    let start_time = Instant::now();
    let race = race(&pool, config.mining.workers as u64, target_len);
    let elapsed = start_time.elapsed();

    let chain = pool.snapshot();
    for (height, block) in chain.blocks().enumerate() {
        println!("{}", "=".repeat(80).bright_black());
        println!("{}", format!("Block #{}", height).bright_cyan());
        println!("{}", block);
    }
    println!("{}", "=".repeat(80).bright_black());

    println!("\n{}", "Workers".bright_cyan());
    for report in &race.workers {
        println!(
            "  miner {:>3}: attempts {:>4}  won {:?}  stale {:>3}  exhausted {:>3}  rejected {:>2}",
            report.miner_id,
            report.attempts,
            report.accepted,
            report.stale,
            report.exhausted,
            report.rejected
        );
        if let Some(e) = &report.last_error {
            println!("             {} {}", "stopped:".bright_yellow(), e);
        }
    }
    for id in &race.panicked {
        println!("  miner {:>3}: {}", id, "panicked".bright_red());
    }

    let stats = pool.stats();
    println!("\n{}", "Pool".bright_cyan());
    println!("  ranges issued : {}", stats.ranges_issued);
    println!("  accepted      : {}", stats.accepted);
    println!("  stale         : {}", stats.stale);
    println!("  rejected      : {}", stats.rejected);
    println!("  chain length  : {}", chain.len());
    println!("  elapsed       : {:.3}s", elapsed.as_secs_f64());

    match race.check(&pool) {
        Ok(()) => {
            println!("\n{}", "Chain is valid".bright_green());
            Ok(())
        }
        Err(e) => {
            println!("\n{} {}", "Race FAILED:".bright_red(), e);
            Err(e.into())
        }
    }
}
