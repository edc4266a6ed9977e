use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::Parser;
use ibtopotool::{Fabric, OutputFormat, Pipeline, RootSet};
use tracing_subscriber::{fmt, EnvFilter};

/// Do things with an InfiniBand topology.
///
/// TOPOFILE is a file containing the output of `ibnetdiscover`.
#[derive(Parser)]
#[command(name = "ibtopotool", version, about)]
struct Cli {
    /// Output of ibnetdiscover
    topofile: PathBuf,

    /// Include only switch nodes
    #[arg(short, long)]
    switches: bool,

    /// Output file, stdout if omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output in Slurm topology.conf format. Implies --shortlabels
    #[arg(long)]
    slurm: bool,

    /// File with the GUIDs of the spine switches
    #[arg(short, long, value_name = "ROOTFILE")]
    treeify: Option<PathBuf>,

    /// Use short labels for switches
    #[arg(long = "shortlabels")]
    short_labels: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(io::stderr)
        .init();
}

/// Open the output without truncating it, so a failed run leaves an
/// existing file as it was.
fn open_output(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
}

/// Replace the whole content of `output`, or write to stdout.
fn write_output(output: Option<File>, rendered: &[u8]) -> io::Result<()> {
    match output {
        Some(mut file) => {
            file.set_len(0)?;
            file.write_all(rendered)?;
            file.flush()
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(rendered)?;
            stdout.flush()
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // every file is opened before the dump is looked at
    let input = File::open(&cli.topofile)
        .with_context(|| format!("cannot open topology file {}", cli.topofile.display()))?;
    let roots = cli
        .treeify
        .as_ref()
        .map(RootSet::from_path)
        .transpose()
        .context("cannot read root file")?;
    let output = cli
        .output
        .as_deref()
        .map(|path| {
            open_output(path)
                .with_context(|| format!("cannot open output file {}", path.display()))
        })
        .transpose()?;

    let pipeline = Pipeline {
        switches_only: cli.switches,
        short_labels: cli.short_labels,
        roots,
        format: if cli.slurm {
            OutputFormat::Slurm
        } else {
            OutputFormat::Dot
        },
    };

    let fabric = Fabric::from_ibnetdiscover(input, pipeline.label_style())
        .with_context(|| format!("cannot parse {}", cli.topofile.display()))?;
    let fabric = pipeline.transform(fabric)?;

    let mut rendered = Vec::new();
    pipeline.render(&fabric, &mut rendered)?;
    write_output(output, &rendered).context("cannot write output")?;

    Ok(())
}
