//! Built-in hooks.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, error, info, warn};

use modhub_core::types::module::Module;

use super::definitions::{Hook, HookName};

/// Pattern → controller id.
pub type RouteMap = BTreeMap<String, String>;

fn participant_slug<'a>(namespace: &'a str, module: Option<&'a Module>) -> &'a str {
    module.map(|m| m.slug.as_str()).unwrap_or(namespace)
}

/// Collects the route table. Later tiers override earlier ones per pattern.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteHook {
    maintenance: bool,
}

impl RouteHook {
    /// Collects the normal route table.
    pub fn normal() -> Self {
        Self { maintenance: false }
    }

    /// Collects the maintenance-mode route table.
    pub fn maintenance() -> Self {
        Self { maintenance: true }
    }
}

impl Hook for RouteHook {
    type State = RouteMap;
    type Output = RouteMap;

    fn name(&self) -> HookName {
        if self.maintenance {
            HookName::MaintenanceRoute
        } else {
            HookName::Route
        }
    }

    fn initial_state(&self) -> RouteMap {
        RouteMap::new()
    }

    fn process(
        &self,
        result: Value,
        _module_path: &Path,
        namespace: &str,
        _module: Option<&Module>,
        mut state: RouteMap,
    ) -> RouteMap {
        match result {
            Value::Object(routes) => {
                for (pattern, target) in routes {
                    match target {
                        Value::String(controller) => {
                            state.insert(pattern, controller);
                        }
                        other => warn!(
                            namespace = %namespace,
                            pattern = %pattern,
                            target = %other,
                            "Ignoring route with non-string controller"
                        ),
                    }
                }
            }
            Value::Null => {}
            other => warn!(namespace = %namespace, result = %other, "Ignoring malformed route table"),
        }
        state
    }

    fn post_process(&self, state: RouteMap) -> RouteMap {
        state
    }
}

/// Picks the maintenance catch-all controller. The last non-empty answer wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaintenanceControllerHook;

impl Hook for MaintenanceControllerHook {
    type State = Option<String>;
    type Output = Option<String>;

    fn name(&self) -> HookName {
        HookName::MaintenanceController
    }

    fn initial_state(&self) -> Option<String> {
        None
    }

    fn process(
        &self,
        result: Value,
        _module_path: &Path,
        _namespace: &str,
        _module: Option<&Module>,
        state: Option<String>,
    ) -> Option<String> {
        match result {
            Value::String(controller) if !controller.is_empty() => Some(controller),
            _ => state,
        }
    }

    fn post_process(&self, state: Option<String>) -> Option<String> {
        state
    }
}

/// Side-effect-only notification around router boot.
#[derive(Debug, Clone, Copy)]
pub struct BootHook {
    post: bool,
}

impl BootHook {
    /// Fired before the route table is collected.
    pub fn pre() -> Self {
        Self { post: false }
    }

    /// Fired after the route table is known and before matching.
    pub fn post() -> Self {
        Self { post: true }
    }
}

impl Hook for BootHook {
    type State = ();
    type Output = ();

    fn name(&self) -> HookName {
        if self.post {
            HookName::PostBoot
        } else {
            HookName::PreBoot
        }
    }

    fn initial_state(&self) {}

    fn process(&self, _: Value, _: &Path, _: &str, _: Option<&Module>, _: ()) {}

    fn post_process(&self, _: ()) {}
}

/// Collects library files declared by modules, relative to each module directory.
///
/// Declared files that do not exist are logged and left out.
#[derive(Debug, Clone, Copy, Default)]
pub struct LibrariesHook;

impl Hook for LibrariesHook {
    type State = Vec<PathBuf>;
    type Output = Vec<PathBuf>;

    fn name(&self) -> HookName {
        HookName::Libraries
    }

    fn initial_state(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    fn process(
        &self,
        result: Value,
        module_path: &Path,
        namespace: &str,
        _module: Option<&Module>,
        mut state: Vec<PathBuf>,
    ) -> Vec<PathBuf> {
        let Value::Array(libraries) = result else {
            return state;
        };
        for library in libraries.iter().filter_map(Value::as_str) {
            let path = module_path.join(library.trim_start_matches('/'));
            if path.is_file() {
                debug!(namespace = %namespace, path = %path.display(), "Library found");
                state.push(path);
            } else {
                error!(namespace = %namespace, library = %library, "Library not found");
            }
        }
        state
    }

    fn post_process(&self, state: Vec<PathBuf>) -> Vec<PathBuf> {
        state
    }
}

/// Runs install routines on modules whose on-disk version is newer than
/// the installed one.
///
/// Yields the slugs whose routine did not answer `false`. The caller
/// records their installed version.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallHook;

impl Hook for InstallHook {
    type State = Vec<String>;
    type Output = Vec<String>;

    fn name(&self) -> HookName {
        HookName::Install
    }

    fn initial_state(&self) -> Vec<String> {
        Vec::new()
    }

    fn pre_process(&self, module: Option<&Module>) -> bool {
        module.is_some_and(Module::update_pending)
    }

    fn process(
        &self,
        result: Value,
        _module_path: &Path,
        namespace: &str,
        module: Option<&Module>,
        mut state: Vec<String>,
    ) -> Vec<String> {
        let slug = participant_slug(namespace, module);
        if result == Value::Bool(false) {
            error!(slug = %slug, "Failed to install module");
        } else {
            state.push(slug.to_string());
        }
        state
    }

    fn post_process(&self, state: Vec<String>) -> Vec<String> {
        state
    }
}

/// Runs uninstall routines on installed modules.
///
/// Yields the slugs whose routine did not answer `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UninstallHook;

impl Hook for UninstallHook {
    type State = Vec<String>;
    type Output = Vec<String>;

    fn name(&self) -> HookName {
        HookName::Uninstall
    }

    fn initial_state(&self) -> Vec<String> {
        Vec::new()
    }

    fn pre_process(&self, module: Option<&Module>) -> bool {
        module.is_some_and(|m| !m.installed_version.is_empty())
    }

    fn process(
        &self,
        result: Value,
        _module_path: &Path,
        namespace: &str,
        module: Option<&Module>,
        mut state: Vec<String>,
    ) -> Vec<String> {
        let slug = participant_slug(namespace, module);
        if result == Value::Bool(false) {
            error!(slug = %slug, "Failed to uninstall module");
        } else {
            state.push(slug.to_string());
        }
        state
    }

    fn post_process(&self, state: Vec<String>) -> Vec<String> {
        state
    }
}

/// Union of the permission names declared by modules.
///
/// Receivers answer with a list of names or an object keyed by name.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionHook;

impl Hook for PermissionHook {
    type State = BTreeSet<String>;
    type Output = BTreeSet<String>;

    fn name(&self) -> HookName {
        HookName::Permission
    }

    fn initial_state(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }

    fn process(
        &self,
        result: Value,
        _module_path: &Path,
        _namespace: &str,
        _module: Option<&Module>,
        mut state: BTreeSet<String>,
    ) -> BTreeSet<String> {
        match result {
            Value::Array(names) => {
                state.extend(names.iter().filter_map(Value::as_str).map(str::to_string));
            }
            Value::Object(names) => state.extend(names.into_iter().map(|(name, _)| name)),
            Value::String(name) => {
                state.insert(name);
            }
            _ => {}
        }
        state
    }

    fn post_process(&self, state: BTreeSet<String>) -> BTreeSet<String> {
        state
    }
}

/// Administrative control links: label → url.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControlsHook;

impl Hook for ControlsHook {
    type State = BTreeMap<String, String>;
    type Output = BTreeMap<String, String>;

    fn name(&self) -> HookName {
        HookName::Controls
    }

    fn initial_state(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn process(
        &self,
        result: Value,
        _module_path: &Path,
        _namespace: &str,
        _module: Option<&Module>,
        mut state: BTreeMap<String, String>,
    ) -> BTreeMap<String, String> {
        if let Value::Object(controls) = result {
            for (label, url) in controls {
                if let Value::String(url) = url {
                    state.insert(label, url);
                }
            }
        }
        state
    }

    fn post_process(&self, state: BTreeMap<String, String>) -> BTreeMap<String, String> {
        state
    }
}

/// Periodic tasks. Yields the number of participants that ran.
#[derive(Debug, Clone, Copy, Default)]
pub struct CronHook;

impl Hook for CronHook {
    type State = usize;
    type Output = usize;

    fn name(&self) -> HookName {
        HookName::Cron
    }

    fn initial_state(&self) -> usize {
        0
    }

    fn pre_process(&self, module: Option<&Module>) -> bool {
        info!(
            module = module.map(|m| m.slug.as_str()).unwrap_or("core"),
            "Running cron"
        );
        true
    }

    fn process(&self, _: Value, _: &Path, _: &str, _: Option<&Module>, state: usize) -> usize {
        state + 1
    }

    fn post_process(&self, state: usize) -> usize {
        state
    }
}

/// An arbitrary named hook (for example `preprocess_page`).
///
/// Collects every non-null answer together with the namespace that gave it.
#[derive(Debug, Clone)]
pub struct NamedHook {
    name: String,
    params: Value,
}

impl NamedHook {
    /// Creates a named hook with a parameter payload.
    pub fn new(name: impl Into<String>, params: Value) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

impl Hook for NamedHook {
    type State = Vec<(String, Value)>;
    type Output = Vec<(String, Value)>;

    fn name(&self) -> HookName {
        HookName::parse(&self.name)
    }

    fn initial_state(&self) -> Vec<(String, Value)> {
        Vec::new()
    }

    fn params(&self) -> Value {
        self.params.clone()
    }

    fn process(
        &self,
        result: Value,
        _module_path: &Path,
        namespace: &str,
        _module: Option<&Module>,
        mut state: Vec<(String, Value)>,
    ) -> Vec<(String, Value)> {
        if !result.is_null() {
            state.push((namespace.to_string(), result));
        }
        state
    }

    fn post_process(&self, state: Vec<(String, Value)>) -> Vec<(String, Value)> {
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modhub_core::types::module::Manifest;
    use modhub_core::types::version::Version;
    use serde_json::json;

    fn module(slug: &str, version: &str, installed: &str) -> Module {
        let manifest = Manifest {
            version: Version::new(version),
            ..Manifest::default()
        };
        let mut module = Module::discovered(slug, &manifest);
        module.installed_version = Version::new(installed);
        module
    }

    #[test]
    fn test_route_later_participant_overrides() {
        let hook = RouteHook::normal();
        let state = hook.process(
            json!({"/": "core.home", "/blog": "core.blog"}),
            Path::new("core"),
            "core",
            None,
            hook.initial_state(),
        );
        let state = hook.process(
            json!({"/blog": "blog.index", "/bad": 3}),
            Path::new("ext/blog"),
            "blog",
            None,
            state,
        );
        assert_eq!(state.get("/").map(String::as_str), Some("core.home"));
        assert_eq!(state.get("/blog").map(String::as_str), Some("blog.index"));
        assert!(!state.contains_key("/bad"));
        assert_eq!(RouteHook::maintenance().name(), HookName::MaintenanceRoute);
    }

    #[test]
    fn test_install_only_pending_modules() {
        let hook = InstallHook;
        assert!(!hook.pre_process(None));
        assert!(hook.pre_process(Some(&module("blog", "1.1", "1.0"))));
        assert!(hook.pre_process(Some(&module("blog", "1.0", ""))));
        assert!(!hook.pre_process(Some(&module("blog", "1.0", "1.0"))));

        let blog = module("blog", "1.1", "1.0");
        let files = module("files", "2.0", "");
        let state = hook.process(Value::Null, Path::new("x"), "blog", Some(&blog), Vec::new());
        let state = hook.process(json!(false), Path::new("y"), "files", Some(&files), state);
        assert_eq!(state, vec!["blog"]);
    }

    #[test]
    fn test_permission_union() {
        let hook = PermissionHook;
        let state = hook.process(
            json!(["administer_blog", "view_blog"]),
            Path::new("a"),
            "blog",
            None,
            BTreeSet::new(),
        );
        let state = hook.process(
            json!({"view_blog": "View", "upload_files": "Upload"}),
            Path::new("b"),
            "files",
            None,
            state,
        );
        let names: Vec<&str> = state.iter().map(String::as_str).collect();
        assert_eq!(names, vec!["administer_blog", "upload_files", "view_blog"]);
    }

    #[test]
    fn test_libraries_skip_missing_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("lib.js"), "").unwrap();

        let state = LibrariesHook.process(
            json!(["/lib.js", "missing.js"]),
            tmp.path(),
            "blog",
            None,
            Vec::new(),
        );
        assert_eq!(state, vec![tmp.path().join("lib.js")]);
    }

    #[test]
    fn test_maintenance_controller_keeps_last_answer() {
        let hook = MaintenanceControllerHook;
        let state = hook.process(json!("core.maintenance"), Path::new("c"), "core", None, None);
        let state = hook.process(Value::Null, Path::new("e"), "blog", None, state);
        assert_eq!(state.as_deref(), Some("core.maintenance"));
    }

    #[test]
    fn test_named_hook_collects_non_null() {
        let hook = NamedHook::new("preprocess_page", json!({"page": "/"}));
        assert_eq!(hook.name(), HookName::Custom("preprocess_page".into()));
        let state = hook.process(json!({"css": "a.css"}), Path::new("c"), "core", None, Vec::new());
        let state = hook.process(Value::Null, Path::new("e"), "blog", None, state);
        assert_eq!(state.len(), 1);
        assert_eq!(state[0].0, "core");
    }
}
