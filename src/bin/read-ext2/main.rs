use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ext2_reader::{BlockSize, BlockSource, FileBlockSource, Volume, VolumeOptions};

mod logging;

#[derive(Parser)]
#[command(name = "read-ext2", about = "Inspect ext2 volume images without mounting them")]
struct Cli {
    /// Path to the ext2 image.
    image: PathBuf,

    /// Block size used for all block arithmetic, in bytes.
    #[arg(long, default_value_t = 1024)]
    block_size: u16,

    /// Log more; repeat for more detail.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the superblock and block group descriptors.
    Info,
    /// List a directory.
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Print every allocated block of a file.
    Cat { path: String },
    /// Copy a byte range of a file to stdout.
    Read {
        path: String,
        offset: u64,
        length: u64,
    },
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose).context("failed to install logger")?;

    log::info!("Reading ext2 disk file: {}", cli.image.display());
    let source = FileBlockSource::open(&cli.image)
        .with_context(|| format!("failed to open {}", cli.image.display()))?;
    let options = VolumeOptions {
        block_size: BlockSize::new(cli.block_size),
    };
    let volume = Volume::open_with_options(source, options)
        .with_context(|| format!("failed to read ext2 metadata from {}", cli.image.display()))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Command::Info => info(&volume, &mut out)?,
        Command::Ls { path } => {
            let listing = volume
                .list(&path)
                .with_context(|| format!("cannot list {path}"))?;
            write!(out, "{listing}")?;
        }
        Command::Cat { path } => {
            let file = volume
                .open_file(&path)
                .with_context(|| format!("cannot open {path}"))?;
            file.dump_contents(&mut out)?;
        }
        Command::Read {
            path,
            offset,
            length,
        } => {
            let file = volume
                .open_file(&path)
                .with_context(|| format!("cannot open {path}"))?;
            let bytes = file
                .read_at(offset, length)
                .with_context(|| format!("cannot read {length} bytes at {offset} from {path}"))?;
            out.write_all(&bytes)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn info<S: BlockSource, W: Write>(volume: &Volume<S>, out: &mut W) -> Result<()> {
    let superblock = volume.superblock();
    writeln!(out, "{superblock:#X?}")?;
    writeln!(out, "Volume name: {}", volume.label())?;
    writeln!(out, "Num block groups: {}", volume.block_groups().len())?;
    writeln!(
        out,
        "Block size: {} (superblock declares {:?})",
        volume.block_size().bytes(),
        superblock.declared_block_size()
    )?;
    for (index, descriptor) in volume.block_groups().iter().enumerate() {
        writeln!(out, "Block group {index}: {descriptor:#X?}")?;
    }
    Ok(())
}
