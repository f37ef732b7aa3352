use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;

use bitbloom_core::{BloomFilter, FilterConfig};

#[derive(Parser)]
#[command(name = "bitbloom", about = "bitbloom CLI: Bloom filter files")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

/// Sizing: explicit shape, target accuracy, or a JSON config file.
#[derive(Args)]
struct SizeArgs {
    #[arg(long, requires = "hashes", conflicts_with_all = ["items", "config"])]
    bits: Option<u64>,
    #[arg(long, requires = "bits")]
    hashes: Option<u64>,
    #[arg(long, requires = "fpp", conflicts_with = "config")]
    items: Option<u64>,
    #[arg(long, requires = "items")]
    fpp: Option<f64>,
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Cmd {
    Create {
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        size: SizeArgs,
    },

    Add {
        #[arg(long)]
        filter: PathBuf,
        /// Values hashed as UTF-8 strings
        #[arg(long, num_args = 0.., value_delimiter = ',')]
        value: Vec<String>,
        /// Pre-hashed 64-bit seeds
        #[arg(long, num_args = 0.., value_delimiter = ',')]
        seed: Vec<u64>,
    },

    Check {
        #[arg(long)]
        filter: PathBuf,
        #[arg(long, conflicts_with = "seed", required_unless_present = "seed")]
        value: Option<String>,
        #[arg(long)]
        seed: Option<u64>,
    },

    Union {
        #[arg(long)]
        into: PathBuf,
        #[arg(long)]
        from: PathBuf,
    },

    Info {
        #[arg(long)]
        filter: PathBuf,
    },

    ExportText {
        #[arg(long)]
        filter: PathBuf,
    },

    ImportText {
        #[arg(long)]
        text_file: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
}

impl SizeArgs {
    fn to_config(&self) -> Result<FilterConfig> {
        match (self.bits, self.hashes, self.items, self.fpp, &self.config) {
            (Some(bits), Some(hashes), None, None, None) => Ok(FilterConfig::Size { bits, hashes }),
            (None, None, Some(items), Some(fpp), None) => Ok(FilterConfig::Optimal { items, fpp }),
            (None, None, None, None, Some(path)) => FilterConfig::load(path)
                .with_context(|| format!("config {}", path.display())),
            _ => Err(anyhow!("give --bits/--hashes, --items/--fpp, or --config")),
        }
    }
}

fn load_filter(path: &Path) -> Result<BloomFilter> {
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let (filter, _) = BloomFilter::read_from(BufReader::new(f))
        .with_context(|| format!("read {}", path.display()))?;
    Ok(filter)
}

/// Write to a temp file next to `path`, then rename over it.
fn save_filter(path: &Path, filter: &BloomFilter) -> Result<()> {
    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new().prefix(".bitbloom_").tempfile_in(dir)?;
    filter.write_to(BufWriter::new(tmp.as_file_mut()))?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Create { out, size } => {
            let filter = size.to_config()?.build()?;
            save_filter(&out, &filter)?;
            info!(path = %out.display(), "filter created");
            println!("created: {} m={} k={}", out.display(), filter.num_bits(), filter.num_hashes());
        }
        Cmd::Add { filter: path, value, seed } => {
            if value.is_empty() && seed.is_empty() {
                return Err(anyhow!("nothing to add: pass --value or --seed"));
            }
            let mut filter = load_filter(&path)?;
            for v in &value {
                filter.add(v.as_str());
            }
            for &s in &seed {
                filter.add_hash(s);
            }
            save_filter(&path, &filter)?;
            println!("added: {}", value.len() + seed.len());
        }
        Cmd::Check { filter: path, value, seed } => {
            let filter = load_filter(&path)?;
            let hit = match (value, seed) {
                (Some(v), _) => filter.contains(v.as_str()),
                (None, Some(s)) => filter.contains_hash(s),
                (None, None) => return Err(anyhow!("pass --value or --seed")),
            };
            println!("{}", if hit { "maybe" } else { "no" });
        }
        Cmd::Union { into, from } => {
            let mut dst = load_filter(&into)?;
            let src = load_filter(&from)?;
            dst.union(&src)
                .with_context(|| format!("union {} into {}", from.display(), into.display()))?;
            save_filter(&into, &dst)?;
            println!("union: bits_set={}", dst.bits_set());
        }
        Cmd::Info { filter: path } => {
            let f = load_filter(&path)?;
            println!("m          : {}", f.num_bits());
            println!("k          : {}", f.num_hashes());
            println!("bits_set   : {}", f.bits_set());
            println!("load       : {:.4}", f.load_factor());
            println!("est_count  : {:.1}", f.estimate_count());
            println!("est_fpp    : {:.6}", f.estimated_fpp());
        }
        Cmd::ExportText { filter: path } => {
            println!("{}", load_filter(&path)?.to_text());
        }
        Cmd::ImportText { text_file, out } => {
            let text = fs::read_to_string(&text_file)
                .with_context(|| format!("read {}", text_file.display()))?;
            let filter = BloomFilter::from_text(&text)?;
            save_filter(&out, &filter)?;
            println!("imported: {} m={} k={}", out.display(), filter.num_bits(), filter.num_hashes());
        }
    }
    Ok(())
}
