use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// YAML configuration file
    #[arg(long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Starting wallet balance of the paper chain
    #[arg(long, default_value_t = 100.0)]
    pub paper_balance: f64,

    /// Number of subnets the paper chain lists, root included
    #[arg(long, default_value_t = 32)]
    pub paper_subnets: u16,

    /// Start paused regardless of the configuration file
    #[arg(long)]
    pub paused: bool,
}
