use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use wpkgar::config::IndexOptions;
use wpkgar::core::diagnostics::{Diagnostics, HealthStatus};
use wpkgar::storage::format::ModeFlags;
use wpkgar::storage::{Entry, IndexReader, MmapIndex};

#[derive(Parser, Debug)]
#[command(author, about = "Inspect wpkgar block indexes", long_about = None)]
struct Args {
    /// JSON options file (see `IndexOptions`)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List entries in `ls -l` form
    List { index: PathBuf },
    /// Export entries as JSON
    Export {
        index: PathBuf,
        #[arg(short, long, default_value = "index.json")]
        output: PathBuf,
    },
    /// Check every header checksum
    Verify { index: PathBuf },
    /// Run the full health check
    Health { index: PathBuf },
}

#[derive(Serialize)]
struct IndexExport {
    blocks: usize,
    entries: Vec<Entry>,
}

fn read_entries(path: &Path, options: &IndexOptions) -> Result<Vec<Entry>, Box<dyn std::error::Error>> {
    let reader = IndexReader::new(BufReader::new(File::open(path)?))
        .verify_checksums(options.verify_checksums);
    Ok(reader.collect::<Result<_, _>>()?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let options = match &args.config {
        Some(path) => IndexOptions::load(path)?,
        None => IndexOptions::default(),
    };

    match args.command {
        Command::List { index } => {
            for entry in read_entries(&index, &options)? {
                let perms = ModeFlags::from_bits_truncate(entry.mode).permissions();
                let user = if entry.user.is_empty() { entry.uid.to_string() } else { entry.user.clone() };
                let group = if entry.group.is_empty() { entry.gid.to_string() } else { entry.group.clone() };
                print!(
                    "{}{} {:>8}/{:<8} {:>10} {}",
                    entry.kind.type_char(),
                    perms,
                    user,
                    group,
                    entry.size,
                    entry.name
                );
                if entry.link.is_empty() {
                    println!();
                } else {
                    println!(" -> {}", entry.link);
                }
            }
        }
        Command::Export { index, output } => {
            let mapped = MmapIndex::load(&index)?;
            let export = IndexExport {
                blocks: mapped.block_count(),
                entries: mapped.entries().collect::<Result<_, _>>()?,
            };
            let json = serde_json::to_string_pretty(&export)?;
            let mut file = File::create(&output)?;
            file.write_all(json.as_bytes())?;
            println!("Exported {} entries to {:?}", export.entries.len(), output);
        }
        Command::Verify { index } => {
            let mapped = MmapIndex::load(&index)?;
            let failures = mapped.verify()?;
            if failures.is_empty() {
                println!("OK: {} blocks", mapped.block_count());
            } else {
                for (block, e) in &failures {
                    eprintln!("block {}: {}", block, e);
                }
                std::process::exit(1);
            }
        }
        Command::Health { index } => {
            let mapped = MmapIndex::load(&index)?;
            match Diagnostics::check_health(&mapped) {
                HealthStatus::Healthy => println!("healthy"),
                HealthStatus::Suspicious(msg) => println!("suspicious: {}", msg),
                HealthStatus::Corrupted(msg) => {
                    println!("corrupted: {}", msg);
                    std::process::exit(2);
                }
            }
        }
    }

    Ok(())
}
