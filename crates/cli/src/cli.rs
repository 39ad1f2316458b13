use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::commands::{
    config_command, conflicts_command, disable_command, enable_command, hooks_command,
    info_command, init_command, install_command, list_command, refresh_command, resolve_command,
    uninstall_command, upgrade_command, url_command,
};
use crate::utils::load_manager;

#[derive(Parser, Debug)]
#[command(name = "addonctl")]
#[command(version, about = "Install, enable and route addon packages", long_about = None)]
#[command(
    after_help = "ENVIRONMENT:\n    ADDON_ROOT=<dir>    Host root, same as --root\n    RUST_LOG=debug      Enable debug logging"
)]
pub struct Cli {
    /// Host root (defaults to the nearest .addon-manager.json, else the current directory)
    #[arg(long, env = "ADDON_ROOT", global = true)]
    pub root: Option<PathBuf>,

    /// Directory holding <name>.zip packages (defaults to <runtime_dir>/packages)
    #[arg(long, global = true)]
    pub packages: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindFilter {
    All,
    Modules,
    Apps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Entry {
    Addon,
    App,
    Backend,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default .addon-manager.json into the host root
    Init {
        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },
    /// List installed addons
    #[command(visible_alias = "ls")]
    List {
        /// Which package kinds to show
        #[arg(short, long, value_enum, default_value = "all")]
        kind: KindFilter,

        /// Only show enabled addons
        #[arg(short, long)]
        running: bool,

        /// Print descriptors as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one addon's descriptor and configuration
    Info {
        name: String,
    },
    /// Fetch a package and install it
    Install {
        name: String,

        /// Overwrite an existing addon and conflicting host files
        #[arg(short, long)]
        force: bool,

        /// Extra package parameters (e.g. version=1.2.0)
        #[arg(short, long = "extra", value_name = "KEY=VALUE")]
        extra: Vec<String>,
    },
    /// Remove an addon
    Uninstall {
        name: String,

        /// Also remove the addon's files from the host tree
        #[arg(short, long)]
        force: bool,
    },
    /// Copy an addon's overlay into the host tree and enable it
    Enable {
        name: String,

        /// Overwrite conflicting host files
        #[arg(short, long)]
        force: bool,
    },
    /// Disable an addon and restore the host files it replaced
    Disable {
        name: String,

        /// Disable even when already disabled
        #[arg(short, long)]
        force: bool,
    },
    /// Replace a disabled addon with a newer package
    Upgrade {
        name: String,

        /// Extra package parameters (e.g. version=1.2.0)
        #[arg(short, long = "extra", value_name = "KEY=VALUE")]
        extra: Vec<String>,
    },
    /// Regenerate the hook index, bootstrap bundle and route config
    Refresh,
    /// List host files an addon's overlay would replace
    Conflicts {
        name: String,

        /// List every overlay file, not just the conflicting ones
        #[arg(short, long)]
        all: bool,
    },
    /// Show or change an addon's configuration values
    Config {
        name: String,

        /// Values to set; JSON literals are parsed, anything else is a string
        #[arg(short, long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },
    /// Show which addons implement each hook. Only addons registered in
    /// the running process contribute, and addonctl registers none.
    Hooks,
    /// Build the URL of an addon route
    Url {
        /// Route as addon/controller/action
        url: String,

        /// Route parameters
        #[arg(short, long = "param", value_name = "KEY=VALUE")]
        param: Vec<String>,
    },
    /// Resolve a request path to its addon route
    Resolve {
        path: String,

        /// Entry point the request arrived through
        #[arg(short, long, value_enum, default_value = "addon")]
        entry: Entry,

        /// Root path of the request (e.g. /admin)
        #[arg(long, default_value = "/")]
        request_root: String,

        /// Host name of the request, for domain-bound addons
        #[arg(long)]
        host: Option<String>,
    },
}

impl Cli {
    pub fn execute(self) -> Result<()> {
        let root = self.root.as_deref();
        let packages = self.packages.as_deref();
        let manager = || load_manager(root, packages);

        match self.command {
            Commands::Init { force } => init_command(root, force),
            Commands::List {
                kind,
                running,
                json,
            } => list_command(&manager()?, kind, running, json),
            Commands::Info { name } => info_command(&manager()?, &name),
            Commands::Install { name, force, extra } => {
                install_command(&manager()?, &name, force, &extra)
            }
            Commands::Uninstall { name, force } => uninstall_command(&manager()?, &name, force),
            Commands::Enable { name, force } => enable_command(&manager()?, &name, force),
            Commands::Disable { name, force } => disable_command(&manager()?, &name, force),
            Commands::Upgrade { name, extra } => upgrade_command(&manager()?, &name, &extra),
            Commands::Refresh => refresh_command(&manager()?),
            Commands::Conflicts { name, all } => conflicts_command(&manager()?, &name, all),
            Commands::Config { name, set } => config_command(&manager()?, &name, &set),
            Commands::Hooks => hooks_command(&manager()?),
            Commands::Url { url, param } => url_command(&manager()?, &url, &param),
            Commands::Resolve {
                path,
                entry,
                request_root,
                host,
            } => resolve_command(&manager()?, &path, entry, &request_root, host.as_deref()),
        }
    }
}
