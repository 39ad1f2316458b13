pub mod config_cmd;
pub mod conflicts;
pub mod init;
pub mod install;
pub mod list;
pub mod refresh;
pub mod route;
pub mod toggle;
pub mod uninstall;

pub use config_cmd::config_command;
pub use conflicts::conflicts_command;
pub use init::init_command;
pub use install::{install_command, upgrade_command};
pub use list::{info_command, list_command};
pub use refresh::{hooks_command, refresh_command};
pub use route::{resolve_command, url_command};
pub use toggle::{disable_command, enable_command};
pub use uninstall::uninstall_command;
