//! mactools - macOS maintenance helpers

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use mactools_cli::cmd;
use mactools_cli::cmd::network::Sections;
use mactools_cli::cmd::ports::{KillArgs, ListSelection, ScanArgs};
use mactools_cli::ui::Reported;
use mactools_cli::{
    BrewCommands, Cli, Commands, DockerCommands, NetworkCommands, PortsCommands, SystemCommands,
    XcodeCommands,
};
use mactools_core::{Config, paths};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so --json output on stdout stays parseable.
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !e.is::<Reported>() {
                eprintln!("✗ {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.unwrap_or_else(paths::config_file);
    let config = Config::load(&config_path)?;
    tracing::debug!(path = %config_path.display(), "configuration loaded");

    match cli.command {
        Commands::Xcode {
            command: XcodeCommands::Cleanup { target },
        } => cmd::xcode::cleanup(target, &config),

        Commands::System { command } => match command {
            SystemCommands::Info { json } => cmd::system::info(json),
            SystemCommands::CleanupTemp(args) => cmd::system::cleanup_temp(args),
        },

        Commands::Ports { command } => match command {
            PortsCommands::List {
                ports,
                web,
                db,
                dev,
                mail,
                groups,
                all_common,
                json,
            } => {
                let selection = ListSelection {
                    ports,
                    web,
                    db,
                    dev,
                    mail,
                    groups,
                    all_common,
                };
                cmd::ports::list(&selection, json, &config)
            }
            PortsCommands::Kill {
                port,
                force,
                yes,
                signal,
                json,
            } => cmd::ports::kill(
                &KillArgs {
                    port,
                    force,
                    yes,
                    signal,
                },
                json,
            ),
            PortsCommands::Scan {
                start,
                end,
                common,
                open_only,
                host,
                timeout,
                json,
            } => cmd::ports::scan(
                &ScanArgs {
                    start,
                    end,
                    common,
                    open_only,
                    host,
                    timeout,
                },
                json,
                &config,
            ),
        },

        Commands::Network { command } => match command {
            NetworkCommands::Info {
                interface,
                dns,
                ip,
                routes,
                json,
            } => cmd::network::info(interface.as_deref(), Sections { dns, ip, routes }, json),
            NetworkCommands::DnsFlush { force, json } => cmd::network::dns_flush(force, json),
        },

        Commands::Brew { command } => match command {
            BrewCommands::Size { json } => cmd::brew::size(json),
            BrewCommands::Cleanup { dry_run, json } => cmd::brew::cleanup(dry_run, json),
            BrewCommands::Leaves { with_deps, json } => cmd::brew::leaves(with_deps, json),
            BrewCommands::Update { json } => cmd::brew::update(json),
            BrewCommands::Doctor { json } => cmd::brew::doctor(json),
        },

        Commands::Docker {
            command: DockerCommands::Cleanup { target },
        } => cmd::docker::cleanup(target),

        Commands::Completions { shell } => {
            cmd::completions::completions(shell);
            Ok(())
        }
    }
}
