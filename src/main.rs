//! Binary entry point for the flotilla CLI.

use std::io::{self, Write};
use std::process;
use std::sync::Arc;

use clap::Parser;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use flotilla::config::{FleetConfig, TailConfig};
use flotilla::exec::SshExecClient;
use flotilla::fleet::{Fleet, FleetError};
use flotilla::gce::{GceError, GceProvider};
use flotilla::logs::{LogTailer, TailError};
use flotilla::provider::Node;
use flotilla::retry::Backoff;

mod cli;

use cli::{Cli, TailCommand, UpCommand};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("fleet error: {0}")]
    Fleet(#[from] FleetError<GceError>),
    #[error("tail error: {0}")]
    Tail(#[from] TailError),
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

async fn dispatch(cli: Cli) -> Result<i32, CliError> {
    match cli {
        Cli::Up(command) => up_command(command).await,
        Cli::Tail(command) => tail_command(command).await,
        Cli::Down => down_command().await,
    }
}

fn build_fleet() -> Result<Fleet<GceProvider>, CliError> {
    let config =
        FleetConfig::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    let prefix = config.name_prefix.clone();
    let provider = GceProvider::new(config).map_err(|err| CliError::Provider(err.to_string()))?;
    Ok(Fleet::new(Arc::new(provider), prefix))
}

async fn up_command(args: UpCommand) -> Result<i32, CliError> {
    let fleet = build_fleet()?;
    match fleet.start(args.count).await {
        Ok(nodes) => {
            print_nodes(&nodes);
            Ok(0)
        }
        Err(err) => {
            // A partial failure still produced usable nodes; report them
            // before exiting non-zero.
            if let FleetError::Partial { nodes, .. } = &err {
                print_nodes(nodes);
            }
            Err(err.into())
        }
    }
}

async fn tail_command(args: TailCommand) -> Result<i32, CliError> {
    let config =
        TailConfig::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    config
        .validate()
        .map_err(|err| CliError::Config(err.to_string()))?;

    let credential = Arc::new(config.credential());
    let follow_command = config.follow_command.clone();
    let client = Arc::new(SshExecClient::new(config, credential));
    let tailer = LogTailer::new(client, follow_command, Backoff::default());

    let node = Node {
        name: args.name,
        address: args.address,
    };
    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            watcher.cancel();
        }
    });

    let mut stream = tailer.tail(&node, cancel);
    let mut stdout = io::stdout();
    while let Some(chunk) = stream.next_chunk().await {
        if stdout
            .write_all(&chunk)
            .and_then(|()| stdout.flush())
            .is_err()
        {
            break;
        }
    }

    match stream.finish().await {
        Ok(()) | Err(TailError::Canceled) => Ok(0),
        Err(err) => Err(err.into()),
    }
}

async fn down_command() -> Result<i32, CliError> {
    let fleet = build_fleet()?;
    let deleted = fleet.retire_all().await?;
    writeln!(io::stdout(), "deleted {deleted} nodes").ok();
    Ok(0)
}

fn print_nodes(nodes: &[Node]) {
    let mut stdout = io::stdout();
    for node in nodes {
        writeln!(stdout, "{}\t{}", node.name, node.address).ok();
    }
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
