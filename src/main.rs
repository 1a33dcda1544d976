use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use voteledger::ballot::{self, Ballot};
use voteledger::config::{LedgerConfig, DEFAULT_CHAIN_FILE};
use voteledger::error::LedgerError;
use voteledger::storage::{ChainStore, LoadOutcome};

#[derive(Parser)]
#[command(
    name = "voteledger",
    version,
    about = "Tamper-evident append-only ledger for classroom voting"
)]
struct Cli {
    /// Chain file path
    #[arg(long, env = "VOTELEDGER_CHAIN", default_value = DEFAULT_CHAIN_FILE)]
    chain: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the chain, creating a genesis block if needed
    Init,
    /// Append a raw payload as a new block
    Append { payload: String },
    /// Record a student's vote
    Vote {
        #[arg(long)]
        name: String,
        #[arg(long)]
        surname: String,
        /// Numeric student code
        #[arg(long)]
        student_id: String,
        #[arg(long)]
        candidate: String,
    },
    /// List blocks
    Show {
        /// Max blocks to show, newest last
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Check every hash and predecessor link
    Verify,
    /// Overwrite a block's data without rehashing (tamper demo)
    Corrupt { id: u64, data: String },
    /// Write a copy of the chain to another file
    Export { path: PathBuf },
    /// Count ballots per candidate
    Tally,
    /// Show chain statistics
    Stats,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("voteledger=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = LedgerConfig::at(&cli.chain);

    let result = match cli.command {
        Commands::Init => cmd_init(&config),
        Commands::Append { payload } => cmd_append(&config, &payload),
        Commands::Vote {
            name,
            surname,
            student_id,
            candidate,
        } => cmd_vote(&config, &name, &surname, &student_id, &candidate),
        Commands::Show { limit } => cmd_show(&config, limit),
        Commands::Verify => cmd_verify(&config),
        Commands::Corrupt { id, data } => cmd_corrupt(&config, id, &data),
        Commands::Export { path } => cmd_export(&config, &path),
        Commands::Tally => cmd_tally(&config),
        Commands::Stats => cmd_stats(&config),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_init(config: &LedgerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = ChainStore::open(config)?;
    match store.load_outcome() {
        LoadOutcome::Loaded { blocks } => {
            println!("Loaded {} block(s) from {}", blocks, store.path().display())
        }
        LoadOutcome::Bootstrapped { reason } => println!(
            "Created genesis chain at {} ({})",
            store.path().display(),
            reason
        ),
    }
    Ok(())
}

fn cmd_append(config: &LedgerConfig, payload: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = ChainStore::open(config)?;
    let block = store.append(payload)?;
    println!("[{}] block {}", block.short_hash(), block.id);
    Ok(())
}

fn cmd_vote(
    config: &LedgerConfig,
    name: &str,
    surname: &str,
    student_id: &str,
    candidate: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = ChainStore::open(config)?;
    let ballot = Ballot::new(name, surname, student_id, candidate)?;
    let block = ballot::cast(&mut store, &ballot)?;
    println!(
        "[{}] vote for {} recorded in block {}",
        block.short_hash(),
        ballot.candidate,
        block.id
    );
    Ok(())
}

fn cmd_show(config: &LedgerConfig, limit: Option<usize>) -> Result<(), Box<dyn std::error::Error>> {
    let store = ChainStore::open(config)?;
    let blocks = store.blocks();
    let skip = limit.map_or(0, |n| blocks.len().saturating_sub(n));
    for b in &blocks[skip..] {
        println!(
            "{:>4} {} {} {}",
            b.id,
            b.short_hash(),
            b.created_at()
                .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| b.timestamp.clone()),
            b.data,
        );
    }
    Ok(())
}

fn cmd_verify(config: &LedgerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = ChainStore::open(config)?;
    let report = store.verify();
    if report.valid {
        println!("Chain is valid ({} blocks)", store.len());
        return Ok(());
    }
    println!("Chain has been tampered with:");
    for d in &report.discrepancies {
        println!("  {:#}", d);
    }
    std::process::exit(2);
}

fn cmd_corrupt(config: &LedgerConfig, id: u64, data: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = ChainStore::open(config)?;
    if !store.corrupt(id, data)? {
        return Err(LedgerError::BlockNotFound(id).into());
    }
    println!("Block {} corrupted", id);
    Ok(())
}

fn cmd_export(config: &LedgerConfig, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let store = ChainStore::open(config)?;
    store.export(path)?;
    println!("Chain exported to {}", path.display());
    Ok(())
}

fn cmd_tally(config: &LedgerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = ChainStore::open(config)?;
    let counts = ballot::tally(store.blocks());
    if counts.is_empty() {
        println!("(no votes yet)");
    } else {
        for (candidate, votes) in &counts {
            println!("{:>5}  {}", votes, candidate);
        }
    }
    Ok(())
}

fn cmd_stats(config: &LedgerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = ChainStore::open(config)?;
    let stats = store.stats()?;
    print!("{}", stats);
    Ok(())
}
