use std::path::PathBuf;

use clap::Parser;
use dotenv::dotenv;

pub const DEFAULT_HOST: &str = "http://127.0.0.1:9234";

#[derive(Debug, Clone, Parser)]
#[command(name = "dropmon", about = "Decode packet drop notifications and annotate them with endpoint identity")]
pub struct Config {
    /// Agent API base URL used for endpoint lookups
    #[arg(long, env = "DROPMON_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// File of hex-encoded events, one per line (stdin when omitted)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Also print the identity-annotated line for every drop
    #[arg(short, long)]
    pub verbose: bool,

    /// Dissect captured packet bytes layer by layer instead of a one-line
    /// summary; applies with or without --verbose
    #[arg(long)]
    pub dissect: bool,
}

impl Config {
    /// Command line, with `.env` values filling in unset environment variables.
    pub fn load() -> Self {
        dotenv().ok();
        Self::parse()
    }
}
