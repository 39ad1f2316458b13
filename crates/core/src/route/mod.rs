//! Convention-based request routing into addon controllers

pub mod controller;
pub mod dispatcher;
pub mod rewrite;

pub use controller::{Controller, ControllerFactory, ControllerKey, ControllerRegistry};
pub use dispatcher::{Dispatched, Dispatcher};
pub use rewrite::{RewriteCache, RewriteRule, RewriteTable, UrlBuilder};

use indexmap::IndexMap;
use serde::Serialize;
use std::path::Path;

/// Emitted when dispatch begins, before the addon is validated
pub const MODULE_BEGIN: &str = "module_begin";
/// Emitted once the addon and module are initialised
pub const ADDON_MODULE_INIT: &str = "addon_module_init";
/// Emitted with the resolved call target just before invocation
pub const MODULE_ACTION_BEGIN: &str = "module_action_begin";

/// Request parameters, in arrival order
pub type Params = IndexMap<String, String>;

/// Routing failure carrying an HTTP-equivalent status
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RouteError {
    pub status: u16,
    pub message: String,
}

impl RouteError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: 404,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: 500,
            message: message.into(),
        }
    }
}

/// Which entry point matched the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    /// `<addon_url_prefix>/:addon/[:controller]/[:action]`, no module
    Addon,
    /// `<app_url_prefix>/:addon/[:module]/[:controller]/[:action]`
    App,
    /// Administrative entry point, module defaults to `admin`
    Backend,
}

/// Inbound request as seen by the dispatcher
#[derive(Debug, Clone, Default, Serialize)]
pub struct Request {
    /// Path info without the leading `/`
    pub path: String,
    /// Root the request arrived through, e.g. `/admin`
    pub root: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    pub params: Params,
}

impl Request {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into().trim_start_matches('/').to_string(),
            ..Default::default()
        }
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }
}

/// Explicitly bound route parts; anything missing is taken from the path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteArgs {
    pub addon: Option<String>,
    pub module: Option<String>,
    pub controller: Option<String>,
    pub action: Option<String>,
}

/// Fully resolved dispatch target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteTuple {
    pub addon: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    pub controller: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

/// Payload handed to event observers
#[derive(Debug, Clone, Copy)]
pub enum EventPayload<'a> {
    Request(&'a Request),
    Call { class: &'a str, action: &'a str },
}

/// Capabilities the dispatcher needs from the host framework
pub trait Host: Send + Sync {
    /// Notification point; observers cannot change dispatch
    fn trigger(&self, _event: &str, _payload: &EventPayload<'_>) {}

    /// Points template lookup at the resolved addon's view directory
    fn set_view_path(&self, _path: &Path) {}
}

/// Host with no observers and no view layer
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl Host for NullHost {}
