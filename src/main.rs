use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod core;
mod engine;
mod parsing;
mod utils;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("ww_mutfreq=debug,info")
    } else {
        EnvFilter::new("ww_mutfreq=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        cli::Commands::Frequencies(args) => {
            cli::frequencies::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Diffs(args) => {
            cli::diffs::run(args, cli.format, cli.verbose)?;
        }
    }

    Ok(())
}
