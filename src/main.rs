use clap::{Parser, Subcommand};
use integrt::algorithm::{key_size_from_name, tag_size_from_name, IntegrityAlgorithm};
use integrt::{dump_superblock, read_superblock, IntegrityError, StreamDevice, SECTOR_SIZE};
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "integrt", about = "Inspect dm-integrity superblocks and integrity algorithms")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read and print the integrity superblock of a device or image
    Dump {
        device: PathBuf,
        /// Byte offset of the superblock within the device
        #[arg(short, long, default_value = "0")]
        offset: u64,
        /// Block size to report for the device (the format requires 512)
        #[arg(short, long, default_value_t = SECTOR_SIZE)]
        block_size: usize,
        /// Print the superblock as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the supported integrity algorithms
    Algorithms {
        #[arg(long)]
        json: bool,
    },
    /// Show tag and key sizes for an algorithm name
    Lookup {
        name: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {

        // ── Dump ─────────────────────────────────────────────────────────────
        Commands::Dump { device, offset, block_size, json } => {
            let mut dev = StreamDevice::new(File::open(&device)?, block_size);
            let sb = match read_superblock(&mut dev, offset) {
                Ok(sb) => sb,
                Err(IntegrityError::NotFound) => {
                    eprintln!("{}: no integrity superblock at offset {}", device.display(), offset);
                    std::process::exit(2);
                }
                Err(e) => return Err(e.into()),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&sb)?);
            } else {
                dump_superblock(Some(&sb), &mut std::io::stdout().lock())?;
            }
        }

        // ── Algorithms ───────────────────────────────────────────────────────
        Commands::Algorithms { json } => {
            if json {
                let table: Vec<_> = IntegrityAlgorithm::ALL
                    .iter()
                    .map(|alg| serde_json::json!({
                        "name": alg,
                        "tag_size": alg.tag_size(),
                        "key_size": alg.key_size(),
                    }))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&table)?);
            } else {
                println!("{:<14} {:>8} {:>8}", "Name", "Tag", "Key");
                for alg in IntegrityAlgorithm::ALL {
                    println!("{:<14} {:>8} {:>8}", alg.name(), alg.tag_size(), alg.key_size());
                }
            }
        }

        // ── Lookup ───────────────────────────────────────────────────────────
        Commands::Lookup { name } => {
            match tag_size_from_name(&name) {
                Some(tag_size) => {
                    println!("  Algorithm  {}", IntegrityAlgorithm::parse(&name));
                    println!("  Tag size   {} B", tag_size);
                    println!("  Key size   {} B", key_size_from_name(&name));
                }
                None => {
                    eprintln!("Unknown integrity algorithm '{}'", name);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
