#[macro_use]
extern crate tracing;

use std::env;
use std::process::ExitCode;

use clap::Parser;
use tickglide::cli::{Cli, Sub};
use tickglide::utils::config_path;
use tickglide::{demo, replay};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "tickglide=debug,tickglide_config=debug,info";

fn main() -> ExitCode {
    let directives = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_owned());
    let env_filter = EnvFilter::builder().parse_lossy(directives);
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .init();

    let cli = Cli::parse();

    let _client = tracy_client::Client::start();

    let path = config_path(cli.config);

    // Validation needs an actual file; everything else can run on defaults.
    let config = if matches!(cli.subcommand, Sub::Validate) {
        path.load()
    } else {
        path.load_or_default()
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => {
            // The Debug form of a miette report is the rendered diagnostic.
            eprintln!("{err:?}");
            return ExitCode::FAILURE;
        }
    };

    let rv = match cli.subcommand {
        Sub::Validate => {
            info!("config is valid");
            Ok(())
        }
        Sub::Replay(args) => replay::run(&args, &config),
        Sub::Demo(args) => demo::run(&args, &config),
    };

    if let Err(err) = rv {
        error!("{err:?}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
