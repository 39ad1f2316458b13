use addon_manager_core::route::Params;
use addon_manager_core::{AddonManager, ControllerRegistry, EntryPoint, NullHost, Request, RouteArgs};
use anyhow::{Context, Result};
use std::sync::Arc;

use crate::cli::Entry;
use crate::utils::parse_pairs;

pub fn url_command(manager: &AddonManager, url: &str, params: &[String]) -> Result<()> {
    let params: Params = parse_pairs(params)?.into_iter().collect();
    println!("{}", manager.build_url(url, &params));
    Ok(())
}

pub fn resolve_command(
    manager: &AddonManager,
    path: &str,
    entry: Entry,
    request_root: &str,
    host: Option<&str>,
) -> Result<()> {
    let entry = match entry {
        Entry::Addon => EntryPoint::Addon,
        Entry::App => EntryPoint::App,
        Entry::Backend => EntryPoint::Backend,
    };
    let mut request = Request::new(path).with_root(request_root);
    if let Some(host) = host {
        request = request.with_host(host);
    }

    let dispatcher = manager.dispatcher(ControllerRegistry::new(), Arc::new(NullHost));
    let (route, request) = dispatcher
        .route(entry, &request, RouteArgs::default())
        .with_context(|| format!("Failed to resolve {path}"))?;

    println!("{}", serde_json::to_string_pretty(&route)?);
    if !request.params.is_empty() {
        println!("{}", serde_json::to_string_pretty(&request.params)?);
    }
    Ok(())
}
