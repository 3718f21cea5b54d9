#![forbid(unsafe_code)]
//! Command-line driver for an in-memory powledger chain

use clap::{Parser, Subcommand};
use colored::*;
use std::time::Instant;
use powledger::blockchain::{hash_block, Ledger};
use powledger::config::load_config;
use powledger::miner::ProofOfWork;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Leading hex zeros required by the puzzle (defaults to miner.difficulty from config.toml)
    #[arg(long, global = true)]
    difficulty: Option<usize>,

    /// Search proofs on all cores
    #[arg(long, global = true)]
    parallel: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mines blocks on a fresh in-memory ledger and validates the result
    Mine {
        /// Number of blocks to mine after genesis
        #[arg(long, default_value_t = 3)]
        blocks: u64,
        /// Transaction to queue before the first block, as SENDER:RECIPIENT:AMOUNT
        #[arg(long = "tx")]
        transactions: Vec<String>,
        /// Print the final chain as JSON
        #[arg(long)]
        json: bool,
    },
    /// Searches the proof that follows LAST_PROOF
    Proof {
        last_proof: u64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = load_config()?;
    let mut settings = config.node_config();
    if let Some(difficulty) = cli.difficulty {
        settings.difficulty = difficulty;
    }
    let pow = settings.proof_of_work();

    match &cli.command {
        Commands::Mine {
            blocks,
            transactions,
            json,
        } => mine(&pow, cli.parallel, *blocks, transactions, *json)?,
        Commands::Proof { last_proof } => proof(&pow, cli.parallel, *last_proof)?,
    }

    Ok(())
}

fn search(pow: &ProofOfWork, parallel: bool, last_proof: u64) -> powledger::error::Result<u64> {
    if parallel {
        pow.find_proof_parallel(last_proof)
    } else {
        pow.find_proof(last_proof)
    }
}

fn parse_transaction(spec: &str) -> Result<(String, String, f64), Box<dyn std::error::Error>> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() != 3 {
        return Err(format!("Expected SENDER:RECIPIENT:AMOUNT, got '{}'", spec).into());
    }
    let amount = parts[2]
        .parse::<f64>()
        .map_err(|e| format!("Invalid amount '{}': {}", parts[2], e))?;
    Ok((parts[0].to_string(), parts[1].to_string(), amount))
}

fn mine(
    pow: &ProofOfWork,
    parallel: bool,
    blocks: u64,
    transactions: &[String],
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut ledger = Ledger::new();

    for spec in transactions {
        let (sender, recipient, amount) = parse_transaction(spec)?;
        let index = ledger.submit_transaction(sender, recipient, amount)?;
        println!("{} queued for block {}", spec.bright_white(), index);
    }

    println!(
        "{}",
        format!("⛏️  Mining {} block(s) at difficulty {}", blocks, pow.difficulty()).bright_cyan()
    );

    for _ in 0..blocks {
        let last_proof = ledger
            .last_block()
            .map(|b| b.proof())
            .ok_or("ledger has no blocks")?;

        let start = Instant::now();
        let proof = search(pow, parallel, last_proof)?;
        let elapsed = start.elapsed();

        let block = ledger.seal_block(proof);
        println!(
            "{} #{} proof={} txs={} prev={} ({:.3}s)",
            "✅".green(),
            block.index(),
            block.proof(),
            block.transactions().len(),
            &block.previous_hash()[..block.previous_hash().len().min(16)],
            elapsed.as_secs_f64()
        );
    }

    match ledger.verify_chain() {
        Ok(()) => println!("{}", "Chain is valid".bright_green()),
        Err(e) => println!("{} {}", "Chain is invalid:".red().bold(), e),
    }
    if let Err(e) = pow.verify_proofs(ledger.chain()) {
        println!("{} {}", "Proof check failed:".red().bold(), e);
    }

    if let Some(tip) = ledger.last_block() {
        println!("Tip hash: {}", hash_block(tip).bright_yellow());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(ledger.chain())?);
    }

    Ok(())
}

fn proof(pow: &ProofOfWork, parallel: bool, last_proof: u64) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    let found = search(pow, parallel, last_proof)?;
    let elapsed = start.elapsed();

    println!("Proof:   {}", found.to_string().bright_green());
    println!("Digest:  {}", ProofOfWork::proof_digest(last_proof, found));
    println!("Elapsed: {:.3}s", elapsed.as_secs_f64());

    Ok(())
}
