mod auth;
mod cli;
mod commits;
mod config;
mod dora;
mod error;
mod insights;
mod output;
mod providers;
mod time;
mod timeline;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = log_filter(cli.verbose);
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    output::print_banner();

    info!("Starting DORALens - DORA metrics from build timelines");
    cli.execute().await?;

    Ok(())
}

/// Default filter when `RUST_LOG` is unset; dependencies stay at their own defaults.
fn log_filter(verbose: bool) -> &'static str {
    if verbose {
        "doralens=debug"
    } else {
        "doralens=info"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_is_scoped_to_crate() {
        assert_eq!(log_filter(true), "doralens=debug");
        assert_eq!(log_filter(false), "doralens=info");
    }
}
