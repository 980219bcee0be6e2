//! mactools - macOS maintenance helpers
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Disk cleanup for Xcode and temporary files, port and network
//! diagnostics, and thin wrappers over Homebrew and Docker housekeeping.
//!
//! # Layout
//!
//! ```text
//! mactools
//! ├── xcode cleanup   derived-data | archives | device-support | simulators | all
//! ├── system          info | cleanup-temp
//! ├── ports           list | kill | scan
//! ├── network         info | dns-flush
//! ├── brew            size | cleanup | leaves | update | doctor
//! ├── docker cleanup  containers | images
//! └── completions
//! ```
//!
//! Every cleanup goes through the retention reaper in `mactools-core`:
//! discover entries, plan what to remove, then (unless it is a dry run)
//! remove them one at a time with failures collected.

pub mod cmd;
pub mod ui;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "mactools")]
#[command(author, version = env!("MACTOOLS_VERSION"), about = "mactools - macOS maintenance helpers")]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file [default: ~/.config/mactools/config.toml]
    #[arg(long, global = true, env = "MACTOOLS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Xcode disk cleanup
    Xcode {
        #[command(subcommand)]
        command: XcodeCommands,
    },
    /// System information and temporary file cleanup
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },
    /// Inspect, kill and scan network ports
    Ports {
        #[command(subcommand)]
        command: PortsCommands,
    },
    /// Network interface, DNS and routing information
    Network {
        #[command(subcommand)]
        command: NetworkCommands,
    },
    /// Homebrew housekeeping
    Brew {
        #[command(subcommand)]
        command: BrewCommands,
    },
    /// Docker housekeeping
    Docker {
        #[command(subcommand)]
        command: DockerCommands,
    },
    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Subcommand)]
pub enum XcodeCommands {
    /// Remove Xcode build products, archives, device support and simulator data
    Cleanup {
        #[command(subcommand)]
        target: XcodeTarget,
    },
}

#[derive(Debug, Subcommand)]
pub enum XcodeTarget {
    /// Empty ~/Library/Developer/Xcode/DerivedData
    DerivedData(CleanupArgs),
    /// Remove old .xcarchive bundles
    Archives(RetentionArgs),
    /// Remove iOS DeviceSupport symbol directories
    DeviceSupport(RetentionArgs),
    /// Remove simulator data and caches, keeping the devices
    Simulators(CleanupArgs),
    /// Run every cleanup above in turn
    All(RetentionArgs),
}

/// Flags shared by every cleanup.
#[derive(Debug, Clone, Copy, Args)]
pub struct CleanupArgs {
    /// Clean even if the directory appears to be in use
    #[arg(long)]
    pub force: bool,
    /// Show what would be removed without removing anything
    #[arg(long)]
    pub dry_run: bool,
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Debug, Clone, Copy, Args)]
pub struct RetentionArgs {
    #[command(flatten)]
    pub common: CleanupArgs,
    /// Keep the newest entry of each project / OS version
    #[arg(long)]
    pub keep_latest: bool,
}

#[derive(Debug, Subcommand)]
pub enum SystemCommands {
    /// Show OS, processor and memory information
    Info {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Clean temporary files (simulates unless --force is given)
    CleanupTemp(TempArgs),
}

#[derive(Debug, Clone, Copy, Args)]
pub struct TempArgs {
    /// Actually delete instead of simulating
    #[arg(long)]
    pub force: bool,
    /// Clean ~/Library/Caches
    #[arg(long)]
    pub caches: bool,
    /// Clean ~/Library/Logs
    #[arg(long)]
    pub logs: bool,
    /// Clean ~/Library/Application Support/Caches
    #[arg(long)]
    pub app_caches: bool,
    /// Clean /tmp
    #[arg(long)]
    pub tmp: bool,
    /// Clean /private/var/folders (use with caution)
    #[arg(long)]
    pub var_folders: bool,
    /// Clean every location above
    #[arg(long)]
    pub all: bool,
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum PortsCommands {
    /// List processes using ports (all common groups when none are selected)
    List {
        /// Port to check; repeatable
        #[arg(short, long = "port")]
        ports: Vec<u16>,
        /// Include web ports: 80, 443, 3000, 8000, 8080, 8888
        #[arg(long)]
        web: bool,
        /// Include database ports: 3306, 5432, 27017, 6379, 5672, 9200
        #[arg(long)]
        db: bool,
        /// Include development ports: 3000, 3001, 4200, 5000, 8000, 8080, 9000
        #[arg(long)]
        dev: bool,
        /// Include mail ports: 25, 465, 587, 993, 995
        #[arg(long)]
        mail: bool,
        /// Include a group defined in the config file; repeatable
        #[arg(short, long = "group")]
        groups: Vec<String>,
        /// Include every port group
        #[arg(short, long)]
        all_common: bool,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Send a signal to the processes using a port
    Kill {
        /// Port whose processes should be signalled
        #[arg(short, long)]
        port: u16,
        /// Use SIGKILL instead of SIGTERM
        #[arg(short, long)]
        force: bool,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Signal to send (e.g. 9, 15, TERM, SIGHUP)
        #[arg(short, long)]
        signal: Option<String>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Probe a range of ports for listeners
    Scan {
        /// First port of the range
        #[arg(short, long, default_value_t = 8000)]
        start: u32,
        /// Last port of the range
        #[arg(short, long, default_value_t = 9000)]
        end: u32,
        /// Also scan every common port group
        #[arg(short, long)]
        common: bool,
        /// Only report open ports
        #[arg(short, long)]
        open_only: bool,
        /// Host to scan
        #[arg(long, default_value = "localhost")]
        host: String,
        /// Connect timeout in seconds [default: config or 0.5]
        #[arg(short, long)]
        timeout: Option<f64>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum NetworkCommands {
    /// Show interfaces, DNS and routes (all sections when none are selected)
    Info {
        /// Only this interface (e.g. en0)
        #[arg(short, long)]
        interface: Option<String>,
        /// Show DNS configuration
        #[arg(long)]
        dns: bool,
        /// Show interface addresses
        #[arg(long)]
        ip: bool,
        /// Show the routing table
        #[arg(long)]
        routes: bool,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Flush the DNS cache (requires sudo)
    DnsFlush {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum BrewCommands {
    /// Show disk usage of Homebrew's directories
    Size {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Remove old versions and cached downloads
    Cleanup {
        /// Show what would be removed without removing anything
        #[arg(long)]
        dry_run: bool,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// List formulae that nothing else depends on
    Leaves {
        /// Show each formula's dependency tree
        #[arg(long)]
        with_deps: bool,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Update Homebrew and its formulae
    Update {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Run brew doctor
    Doctor {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum DockerCommands {
    /// Remove stopped containers or unused images
    Cleanup {
        #[command(subcommand)]
        target: DockerTarget,
    },
}

#[derive(Debug, Subcommand)]
pub enum DockerTarget {
    /// Remove stopped containers (all containers with --all)
    Containers(DockerArgs),
    /// Remove dangling images (all unused images with --all)
    Images(DockerArgs),
}

#[derive(Debug, Clone, Copy, Args)]
pub struct DockerArgs {
    /// Include running containers / tagged images
    #[arg(long)]
    pub all: bool,
    /// Pass -f to docker rm / rmi
    #[arg(short, long)]
    pub force: bool,
    /// Show what would be removed without removing anything
    #[arg(long)]
    pub dry_run: bool,
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
