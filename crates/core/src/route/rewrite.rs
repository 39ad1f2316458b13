//! Per-addon rewrite rules: matching inbound paths and building URLs
//!
//! A descriptor's `[rewrite]` section maps a logical path inside the addon
//! (`post/view`, or `module/controller/action`) to a URL template such as
//! `article/[id]`. `[name]` placeholders capture one path segment.

use parking_lot::RwLock;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

use super::{Params, RouteArgs};
use crate::config::Config;
use crate::descriptor::{AddonDescriptor, DescriptorStore};
use crate::error::Result;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\w+)\]").expect("valid regex"));

#[derive(Debug, Clone)]
pub struct RewriteRule {
    pub addon: String,
    pub target: RouteArgs,
    pub template: String,
    /// Host the rule is bound to in domain deployment mode
    pub domain: Option<String>,
    pattern: Regex,
}

impl RewriteRule {
    pub fn new(addon: &str, logical_path: &str, template: &str, domain: Option<String>) -> Option<Self> {
        let target = logical_target(addon, logical_path)?;
        let template = strip_anchors(template);
        let pattern = match compile(&template) {
            Ok(pattern) => pattern,
            Err(e) => {
                warn!("Ignoring rewrite rule {template} of addon {addon}: {e}");
                return None;
            }
        };
        Some(Self {
            addon: addon.to_string(),
            target,
            template,
            domain,
            pattern,
        })
    }

    /// Captured placeholder values when `path` matches this rule
    pub fn captures(&self, path: &str) -> Option<Params> {
        let captures = self.pattern.captures(path)?;
        Some(
            self.pattern
                .capture_names()
                .flatten()
                .filter_map(|name| {
                    captures
                        .name(name)
                        .map(|m| (name.to_string(), m.as_str().to_string()))
                })
                .collect(),
        )
    }
}

/// `post/view` -> controller `post`, action `view`; three segments add a module
fn logical_target(addon: &str, logical_path: &str) -> Option<RouteArgs> {
    let parts: Vec<&str> = logical_path
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    let (module, controller, action) = match parts.as_slice() {
        [controller] => (None, *controller, "index"),
        [controller, action] => (None, *controller, *action),
        [module, controller, action] => (Some(*module), *controller, *action),
        _ => {
            warn!("Ignoring rewrite path {logical_path:?} of addon {addon}");
            return None;
        }
    };
    Some(RouteArgs {
        addon: Some(addon.to_string()),
        module: module.map(str::to_string),
        controller: Some(controller.to_string()),
        action: Some(action.to_string()),
    })
}

fn strip_anchors(template: &str) -> String {
    template.replace(['^', '$'], "")
}

fn compile(template: &str) -> std::result::Result<Regex, regex::Error> {
    let template = template.trim_matches('/');
    let mut pattern = String::from("^");
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(template) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        pattern.push_str(&regex::escape(&template[last..whole.start()]));
        pattern.push_str(&format!("(?P<{}>[^/]+)", name.as_str()));
        last = whole.end();
    }
    pattern.push_str(&regex::escape(&template[last..]));
    pattern.push_str("/?$");
    Regex::new(&pattern)
}

/// Combined rewrite rules of every enabled addon, in listing order
#[derive(Debug, Clone, Default)]
pub struct RewriteTable {
    rules: Vec<RewriteRule>,
}

impl RewriteTable {
    pub fn build(addons: &[AddonDescriptor], config: &Config) -> Self {
        let mut rules = Vec::new();
        for descriptor in addons.iter().filter(|d| d.state.is_enabled()) {
            let domain = descriptor
                .domain
                .clone()
                .filter(|_| config.url_domain_deploy);
            for (logical_path, template) in &descriptor.rewrite {
                if template.is_empty() {
                    continue;
                }
                if let Some(rule) =
                    RewriteRule::new(&descriptor.name, logical_path, template, domain.clone())
                {
                    rules.push(rule);
                }
            }
        }
        debug!("Built rewrite table with {} rule(s)", rules.len());
        Self { rules }
    }

    pub fn rules(&self) -> &[RewriteRule] {
        &self.rules
    }

    /// First rule matching `path` (and `host`, for domain-bound rules)
    pub fn match_path(&self, path: &str, host: Option<&str>) -> Option<(RouteArgs, Params)> {
        let path = path.trim_matches('/');
        self.rules
            .iter()
            .filter(|rule| match &rule.domain {
                Some(domain) => host == Some(domain.as_str()),
                None => true,
            })
            .find_map(|rule| {
                rule.captures(path)
                    .map(|params| (rule.target.clone(), params))
            })
    }
}

/// Rewrite table cache shared by the dispatcher and the lifecycle manager
#[derive(Debug, Default)]
pub struct RewriteCache {
    table: RwLock<Option<Arc<RewriteTable>>>,
}

impl RewriteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, store: &DescriptorStore, config: &Config) -> Result<Arc<RewriteTable>> {
        if let Some(table) = self.table.read().as_ref() {
            return Ok(Arc::clone(table));
        }
        self.rebuild(store, config)
    }

    pub fn rebuild(&self, store: &DescriptorStore, config: &Config) -> Result<Arc<RewriteTable>> {
        let table = Arc::new(RewriteTable::build(&store.enabled()?, config));
        *self.table.write() = Some(Arc::clone(&table));
        Ok(table)
    }

    pub fn invalidate(&self) {
        *self.table.write() = None;
    }
}

/// Builds URLs for `addon/controller/action` paths, honouring rewrite rules
/// and domain deployment
#[derive(Debug)]
pub struct UrlBuilder<'a> {
    config: &'a Config,
    store: &'a DescriptorStore,
}

impl<'a> UrlBuilder<'a> {
    pub fn new(config: &'a Config, store: &'a DescriptorStore) -> Self {
        Self { config, store }
    }

    /// `url` is `addon/controller/action`. Parameters consumed by rewrite
    /// placeholders are substituted, the rest become the query string.
    pub fn build(&self, url: &str, params: &Params) -> String {
        let url = url.trim_matches('/');
        let (addon, path) = url.split_once('/').unwrap_or((url, ""));
        let descriptor = self.store.load(addon).ok();

        let domain = descriptor
            .as_ref()
            .and_then(|d| d.domain.clone())
            .filter(|_| self.config.url_domain_deploy);
        let prefix = format!("{}/{}", self.config.addon_url_prefix, addon);

        let mut remaining = params.clone();
        let mut with_suffix = true;
        let rewritten = descriptor
            .as_ref()
            .and_then(|d| d.rewrite.get(path))
            .filter(|t| !t.is_empty());

        let mut value = match rewritten {
            Some(template) => {
                let mut value = template.clone();
                for (key, param) in params {
                    let placeholder = format!("[{key}]");
                    if value.contains(&placeholder) {
                        value = value.replace(&placeholder, param);
                        remaining.shift_remove(key);
                    }
                }
                let value = strip_anchors(&value);
                if value.ends_with('/') {
                    with_suffix = false;
                }
                value
            }
            None => format!("{prefix}/{path}"),
        };

        // the bound domain already implies the addon prefix
        if domain.is_some() {
            if let Some(rest) = value.strip_prefix(&format!("{prefix}/")) {
                value = rest.to_string();
            } else if value == prefix {
                value.clear();
            }
        }

        let mut value = value.trim_start_matches('/').to_string();
        if with_suffix && !value.is_empty() {
            if let Some(suffix) = &self.config.url_suffix {
                value = format!("{}.{suffix}", value.trim_end_matches('/'));
            }
        }
        if !remaining.is_empty() {
            let query: Vec<String> = remaining
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            value = format!("{value}?{}", query.join("&"));
        }

        match domain {
            Some(domain) => format!("//{domain}/{value}"),
            None => value,
        }
    }
}
