//! crucible - OpenSSL build recipe CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crucible_cli::cmd;
use crucible_cli::cmd::build::BuildArgs;
use crucible_cli::{Cli, Commands};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            source,
            prefix,
            openssldir,
            archs,
            universal,
            without_test,
            without_check,
        } => {
            if without_check {
                tracing::warn!("--without-check is deprecated; use --without-test");
            }
            cmd::build::build(BuildArgs {
                source,
                prefix,
                openssldir,
                archs,
                universal,
                skip_tests: without_test || without_check,
            })
        }
        Commands::Bootstrap { prefix, openssldir } => cmd::bootstrap::bootstrap(prefix, openssldir),
        Commands::Check { prefix, openssldir } => cmd::check::check(prefix, openssldir),
        Commands::Caveats { prefix, openssldir } => cmd::caveats::caveats(prefix, openssldir),
    }
}
