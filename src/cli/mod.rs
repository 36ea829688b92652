use clap::Args;
use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[clap(about = "Launch ecosystem model training jobs on AWS EMR")]
pub(crate) struct Cli {
    #[clap(subcommand)]
    pub(crate) ecosystem: Ecosystem,

    /// Launcher config (YAML). Built-in defaults are used when omitted.
    #[clap(short, long, global = true)]
    pub(crate) config: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub(crate) enum Ecosystem {
    /// Train the maven ecosystem model
    Maven(JobArgs),
}

#[derive(Debug, Clone, Args)]
pub(crate) struct JobArgs {
    /// Job request file (YAML or JSON)
    #[clap(short, long)]
    pub(crate) request: PathBuf,

    /// Print the cluster configuration instead of submitting it
    #[clap(long)]
    pub(crate) dry_run: bool,
}
