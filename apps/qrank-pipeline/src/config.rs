//! Command-line surface for the batch executable.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "qrank-pipeline",
    version,
    about = "Ranks Wikidata entities by the pageview traffic of the wikis that link to them."
)]
pub struct CommandArguments {
    /// Root directory containing the entity dump and pageview dump trees.
    #[arg(short, long, value_name = "DIR")]
    pub input_root: PathBuf,

    /// Scratch directory for sort spill files, intermediate streams
    /// and the cache manifest.
    #[arg(short = 'w', long, default_value = "work")]
    pub work_dir: PathBuf,

    /// Directory the final `qrank.csv` and `qrank-stats.json` are
    /// published into.
    #[arg(short, long, default_value = "dist")]
    pub output_dir: PathBuf,

    /// Number of OS threads used for the parallel stages. Defaults to
    /// the number of logical CPUs.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Run every stage and report what would be published without
    /// writing the final artifacts.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}
