//! addon-manager - Lifecycle management and request routing for addon packages
//!
//! This crate provides functionality to:
//! - Read and write addon descriptors and per-addon configuration
//! - Install, enable, disable, upgrade and uninstall addon packages, keeping
//!   the host file tree consistent with the addons' overlay files
//! - Build the hook index from the hooks each enabled addon declares
//! - Resolve request paths into addon controllers and dispatch them
pub mod addon;
pub mod config;
pub mod conflict;
pub mod descriptor;
pub mod error;
pub mod hooks;
pub mod lifecycle;
pub mod package;
pub mod route;
pub mod schema;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{Error, Result};

// Re-export main API components
pub use addon::{Addon, AddonRegistry};
pub use config::Config;
pub use conflict::{ConflictCheck, ConflictResolver};
pub use descriptor::{AddonDescriptor, AddonState, DescriptorStore, PackageKind};
pub use hooks::{HookCache, HookIndex};
pub use lifecycle::AddonManager;
pub use package::{DirectorySource, Extra, PackageSource};
pub use route::{
    Controller, ControllerRegistry, Dispatched, Dispatcher, EntryPoint, Host, NullHost, Request,
    RouteArgs, RouteError, RouteTuple,
};
pub use schema::{ImportReport, NoopExecutor, SqlExecutor};
