use heck::ToUpperCamelCase;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use super::controller::{ControllerKey, ControllerRegistry};
use super::rewrite::RewriteCache;
use super::{
    ADDON_MODULE_INIT, EntryPoint, EventPayload, Host, MODULE_ACTION_BEGIN, MODULE_BEGIN, Params,
    Request, RouteArgs, RouteError, RouteTuple,
};
use crate::config::Config;
use crate::descriptor::DescriptorStore;
use crate::error::Error;
use crate::hooks::HookCache;

/// Result of a successful dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    pub route: RouteTuple,
    pub class: String,
    pub view_path: PathBuf,
    pub response: Value,
}

/// Resolves requests to addon controllers and invokes them
pub struct Dispatcher {
    config: Arc<Config>,
    store: Arc<DescriptorStore>,
    hooks: Arc<HookCache>,
    rewrites: Arc<RewriteCache>,
    controllers: ControllerRegistry,
    host: Arc<dyn Host>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("controllers", &self.controllers)
            .finish()
    }
}

impl Dispatcher {
    pub fn new(
        config: Arc<Config>,
        store: Arc<DescriptorStore>,
        hooks: Arc<HookCache>,
        rewrites: Arc<RewriteCache>,
        controllers: ControllerRegistry,
        host: Arc<dyn Host>,
    ) -> Self {
        Self {
            config,
            store,
            hooks,
            rewrites,
            controllers,
            host,
        }
    }

    /// Resolves and invokes the matching controller action
    pub fn dispatch(&self, entry: EntryPoint, request: &Request, args: RouteArgs) -> Result<Dispatched, RouteError> {
        let (route, request) = self.route(entry, request, args)?;
        self.invoke(route, &request)
    }

    /// Resolves without invoking. Paths matching an enabled addon's rewrite
    /// rule are routed to the rule's target; the returned request carries
    /// the captured parameters.
    pub fn route(
        &self,
        entry: EntryPoint,
        request: &Request,
        args: RouteArgs,
    ) -> Result<(RouteTuple, Request), RouteError> {
        let mut request = request.clone();
        let mut args = args;

        if args == RouteArgs::default() && entry != EntryPoint::Backend {
            let table = self
                .rewrites
                .get(&self.store, &self.config)
                .map_err(|e| RouteError::internal(e.to_string()))?;
            if let Some((target, captured)) = table.match_path(&request.path, request.host.as_deref()) {
                debug!("Rewrite matched {} -> {:?}", request.path, target);
                request.params.extend(captured);
                args = target;
            }
        }

        let route = self.resolve(entry, &request, args)?;
        Ok((route, request))
    }

    /// Works out the route tuple, emitting `module_begin` and
    /// `addon_module_init` along the way
    pub fn resolve(&self, entry: EntryPoint, request: &Request, args: RouteArgs) -> Result<RouteTuple, RouteError> {
        let parsed = self.parse_path(entry, request);

        if entry == EntryPoint::Backend {
            let admin_root = format!("/{}", self.config.admin_root);
            if request.root != admin_root {
                return Err(RouteError::internal(format!(
                    "backend routes are only served under {admin_root}"
                )));
            }
        }

        let addon = args.addon.or(parsed.addon).unwrap_or_default();
        self.emit(MODULE_BEGIN, &EventPayload::Request(request), request_json(request));

        let module = match entry {
            EntryPoint::Addon => args.module.or(parsed.module),
            EntryPoint::App => Some(args.module.or(parsed.module).unwrap_or_else(|| "index".to_string())),
            EntryPoint::Backend => Some(args.module.unwrap_or_else(|| "admin".to_string())),
        };
        // admin controllers sit behind the backend root check, whether the
        // module came from the path, the caller or a rewrite rule
        if entry != EntryPoint::Backend && module.as_deref() == Some("admin") {
            return Err(RouteError::internal("admin module is only served by the backend entry"));
        }
        let controller = non_empty(args.controller.or(parsed.controller)).unwrap_or_else(|| "index".to_string());
        let action = non_empty(args.action.or(parsed.action)).unwrap_or_else(|| "index".to_string());

        if addon.is_empty() {
            return Err(RouteError::internal("addon can not be empty"));
        }

        let descriptor = match self.store.load(&addon) {
            Ok(descriptor) => descriptor,
            Err(Error::NotFound(_)) => {
                return Err(RouteError::not_found(format!("addon {addon} not found")));
            }
            Err(e) => return Err(RouteError::internal(e.to_string())),
        };
        if !descriptor.state.is_enabled() {
            return Err(RouteError::internal(format!("addon {addon} is disabled")));
        }

        self.emit(ADDON_MODULE_INIT, &EventPayload::Request(request), request_json(request));

        Ok(RouteTuple {
            addon,
            module,
            controller,
            action,
            domain: descriptor.domain.filter(|_| self.config.url_domain_deploy),
        })
    }

    fn invoke(&self, route: RouteTuple, request: &Request) -> Result<Dispatched, RouteError> {
        let key = ControllerKey::new(&route.addon, route.module.as_deref(), &route.controller);
        let factory = self.controllers.get(&key).ok_or_else(|| {
            RouteError::not_found(format!(
                "addon controller {} not found",
                route.controller.to_upper_camel_case()
            ))
        })?;

        let view_path = self
            .store
            .addon_path(&route.addon)
            .join("view");
        self.host.set_view_path(&view_path);

        let class = key.class_name();
        let mut controller = factory();
        let action = route.action.as_str();

        let (target, use_fallback) = if controller.has_action(action) {
            (action, false)
        } else if controller.has_fallback() {
            ("_empty", true)
        } else {
            return Err(RouteError::not_found(format!(
                "addon action {class}->{action}() not found"
            )));
        };

        self.emit(
            MODULE_ACTION_BEGIN,
            &EventPayload::Call { class: &class, action: target },
            json!({ "class": class, "action": target }),
        );

        let result = if use_fallback {
            controller.fallback(action)
        } else {
            controller.call(action, &request.params)
        };
        let response = result.map_err(|e| RouteError::internal(e.to_string()))?;

        Ok(Dispatched {
            route,
            class,
            view_path,
            response,
        })
    }

    /// Route parts implied by the path for this entry point
    fn parse_path(&self, entry: EntryPoint, request: &Request) -> RouteArgs {
        let path = match entry {
            EntryPoint::Backend => {
                let suffix = format!(".{}", self.config.default_return_type);
                request
                    .path
                    .strip_suffix(&suffix)
                    .unwrap_or(&request.path)
                    .to_string()
            }
            _ => request.path.clone(),
        };
        let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let prefix = match entry {
            EntryPoint::Addon => Some(self.config.addon_url_prefix.as_str()),
            EntryPoint::App => Some(self.config.app_url_prefix.as_str()),
            EntryPoint::Backend => None,
        };
        if prefix.is_some() && segments.first().copied() == prefix {
            segments.remove(0);
        }

        let owned = |s: Option<&&str>| s.map(|s| s.to_string());
        match entry {
            EntryPoint::App if segments.len() >= 4 => RouteArgs {
                addon: owned(segments.first()),
                module: owned(segments.get(1)),
                controller: owned(segments.get(2)),
                action: owned(segments.get(3)),
            },
            EntryPoint::Backend => RouteArgs {
                // `addon,extra/...`: the first comma-separated part names the addon
                addon: segments
                    .first()
                    .and_then(|s| s.split(',').next())
                    .map(str::to_string),
                module: None,
                controller: owned(segments.get(1)),
                action: owned(segments.get(2)),
            },
            _ => RouteArgs {
                addon: owned(segments.first()),
                module: None,
                controller: owned(segments.get(1)),
                action: owned(segments.get(2)),
            },
        }
    }

    fn emit(&self, event: &str, payload: &EventPayload<'_>, json_payload: Value) {
        self.host.trigger(event, payload);
        if let Err(e) = self.hooks.trigger(&self.store, event, &json_payload, false) {
            warn!("Hook {} failed: {}", event, e);
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn request_json(request: &Request) -> Value {
    serde_json::to_value(request).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addon::AddonRegistry;
    use crate::route::Controller;
    use parking_lot::Mutex;
    use std::path::Path;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingHost {
        events: Mutex<Vec<String>>,
        view: Mutex<Option<PathBuf>>,
    }

    impl Host for RecordingHost {
        fn trigger(&self, event: &str, payload: &EventPayload<'_>) {
            let detail = match payload {
                EventPayload::Request(r) => r.path.clone(),
                EventPayload::Call { action, .. } => action.to_string(),
            };
            self.events.lock().push(format!("{event}:{detail}"));
        }

        fn set_view_path(&self, path: &Path) {
            *self.view.lock() = Some(path.to_path_buf());
        }
    }

    struct Post;

    impl Controller for Post {
        fn has_action(&self, action: &str) -> bool {
            matches!(action, "view" | "index")
        }

        fn call(&mut self, action: &str, params: &Params) -> anyhow::Result<Value> {
            Ok(json!({ "action": action, "params": params }))
        }
    }

    struct CatchAll;

    impl Controller for CatchAll {
        fn has_action(&self, _action: &str) -> bool {
            false
        }

        fn call(&mut self, _action: &str, _params: &Params) -> anyhow::Result<Value> {
            unreachable!()
        }

        fn has_fallback(&self) -> bool {
            true
        }

        fn fallback(&mut self, action: &str) -> anyhow::Result<Value> {
            Ok(json!({ "missing": action }))
        }
    }

    fn write_addon(root: &Path, name: &str, state: u8) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("module.ini"),
            format!("name = {name}\ntitle = T\nversion = 1\nstate = {state}\n"),
        )
        .unwrap();
    }

    fn setup() -> (TempDir, Dispatcher, Arc<RecordingHost>) {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::with_root(temp_dir.path());
        write_addon(&config.addons_path(), "blog", 1);
        write_addon(&config.addons_path(), "shop", 0);

        let controllers = ControllerRegistry::new();
        controllers.register("blog", Some("index"), "post", || Box::new(Post));
        controllers.register("blog", None, "post", || Box::new(Post));
        controllers.register("blog", Some("admin"), "post", || Box::new(Post));
        controllers.register("blog", Some("index"), "misc", || Box::new(CatchAll));

        let host = Arc::new(RecordingHost::default());
        let store = Arc::new(DescriptorStore::from_config(&config));
        let dispatcher = Dispatcher::new(
            Arc::new(config),
            store,
            Arc::new(HookCache::new(AddonRegistry::new())),
            Arc::new(RewriteCache::new()),
            controllers,
            host.clone(),
        );
        (temp_dir, dispatcher, host)
    }

    #[test]
    fn test_app_entry_defaults_module_to_index() {
        let (temp_dir, dispatcher, host) = setup();

        let dispatched = dispatcher
            .dispatch(EntryPoint::App, &Request::new("blog/post/view"), RouteArgs::default())
            .unwrap();

        assert_eq!(
            dispatched.route,
            RouteTuple {
                addon: "blog".to_string(),
                module: Some("index".to_string()),
                controller: "post".to_string(),
                action: "view".to_string(),
                domain: None,
            }
        );
        assert_eq!(dispatched.class, "\\addons\\blog\\app\\index\\controller\\Post");
        let expected_view = temp_dir.path().join("addons").join("blog").join("view");
        assert_eq!(host.view.lock().as_deref(), Some(expected_view.as_path()));
        assert_eq!(
            *host.events.lock(),
            [
                "module_begin:blog/post/view",
                "addon_module_init:blog/post/view",
                "module_action_begin:view",
            ]
        );
    }

    #[test]
    fn test_missing_parts_default_to_index() {
        let (_temp_dir, dispatcher, _host) = setup();
        let args = RouteArgs {
            addon: Some("blog".to_string()),
            controller: Some("post".to_string()),
            ..Default::default()
        };

        let dispatched = dispatcher.dispatch(EntryPoint::Addon, &Request::new(""), args).unwrap();
        assert_eq!(dispatched.route.module, None);
        assert_eq!(dispatched.route.action, "index");
    }

    #[test]
    fn test_addon_validation_statuses() {
        let (_temp_dir, dispatcher, host) = setup();

        let err = dispatcher
            .dispatch(EntryPoint::App, &Request::new(""), RouteArgs::default())
            .unwrap_err();
        assert_eq!(err.status, 500);
        // the begin event fires before validation
        assert_eq!(host.events.lock().len(), 1);

        let err = dispatcher
            .dispatch(EntryPoint::App, &Request::new("ghost/post/view"), RouteArgs::default())
            .unwrap_err();
        assert_eq!(err, RouteError::not_found("addon ghost not found"));

        let err = dispatcher
            .dispatch(EntryPoint::App, &Request::new("shop/cart/index"), RouteArgs::default())
            .unwrap_err();
        assert_eq!(err, RouteError::internal("addon shop is disabled"));
    }

    #[test]
    fn test_unknown_controller_and_action_are_404() {
        let (_temp_dir, dispatcher, _host) = setup();

        let err = dispatcher
            .dispatch(EntryPoint::App, &Request::new("blog/tag_cloud/view"), RouteArgs::default())
            .unwrap_err();
        assert_eq!(err, RouteError::not_found("addon controller TagCloud not found"));

        let err = dispatcher
            .dispatch(EntryPoint::App, &Request::new("blog/post/delete"), RouteArgs::default())
            .unwrap_err();
        assert_eq!(err.status, 404);
        assert!(err.message.contains("Post->delete()"));
    }

    #[test]
    fn test_fallback_action_receives_action_name() {
        let (_temp_dir, dispatcher, host) = setup();

        let dispatched = dispatcher
            .dispatch(EntryPoint::App, &Request::new("blog/misc/anything"), RouteArgs::default())
            .unwrap();
        assert_eq!(dispatched.response, json!({ "missing": "anything" }));
        assert_eq!(host.events.lock().last().unwrap(), "module_action_begin:_empty");
    }

    #[test]
    fn test_backend_requires_admin_root() {
        let (_temp_dir, dispatcher, host) = setup();

        let err = dispatcher
            .dispatch(EntryPoint::Backend, &Request::new("blog/post/view"), RouteArgs::default())
            .unwrap_err();
        assert_eq!(err, RouteError::internal("backend routes are only served under /admin"));
        assert!(host.events.lock().is_empty());

        let request = Request::new("blog,extra/post/view.html").with_root("/admin");
        let dispatched = dispatcher
            .dispatch(EntryPoint::Backend, &request, RouteArgs::default())
            .unwrap();
        assert_eq!(dispatched.route.module.as_deref(), Some("admin"));
        assert_eq!(dispatched.route.action, "view");
    }

    #[test]
    fn test_app_entry_rejects_admin_module() {
        let (_temp_dir, dispatcher, _host) = setup();
        let args = RouteArgs {
            addon: Some("blog".to_string()),
            module: Some("admin".to_string()),
            ..Default::default()
        };

        let err = dispatcher.dispatch(EntryPoint::App, &Request::new(""), args).unwrap_err();
        assert_eq!(err.status, 500);
    }

    #[test]
    fn test_app_entry_rejects_admin_module_from_path() {
        let (_temp_dir, dispatcher, host) = setup();

        let err = dispatcher
            .dispatch(EntryPoint::App, &Request::new("app/blog/admin/post/view"), RouteArgs::default())
            .unwrap_err();

        assert_eq!(err, RouteError::internal("admin module is only served by the backend entry"));
        assert!(!host.events.lock().iter().any(|e| e.starts_with("module_action_begin")));
    }

    #[test]
    fn test_prefix_and_explicit_module_segment() {
        let (_temp_dir, dispatcher, _host) = setup();

        let dispatched = dispatcher
            .dispatch(EntryPoint::App, &Request::new("app/blog/index/post/view"), RouteArgs::default())
            .unwrap();
        assert_eq!(dispatched.route.module.as_deref(), Some("index"));
        assert_eq!(dispatched.route.controller, "post");

        let dispatched = dispatcher
            .dispatch(
                EntryPoint::Addon,
                &Request::new("addons/blog/post/view").with_param("id", "3"),
                RouteArgs::default(),
            )
            .unwrap();
        assert_eq!(dispatched.route.module, None);
        assert_eq!(dispatched.response["params"]["id"], "3");
    }
}
