use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};
use tuner::{run, Cli};

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    run(Cli::parse())
}
