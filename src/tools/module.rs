//! Tool modules and the scanner that assembles them into a registry.

use std::fmt;
use std::panic::AssertUnwindSafe;

use tracing::{info, warn};

use super::registry::{CollisionPolicy, ToolRegistry};
use super::tool::{FunctionTool, ToolClass};
use crate::error::{Result, StockbotError};

/// Module names with this prefix are never loaded.
pub const RESERVED_PREFIX: &str = "__";

/// Everything one module contributes to the registry.
#[derive(Debug, Default)]
pub struct ModuleExports {
    pub functions: Vec<FunctionTool>,
    pub classes: Vec<ToolClass>,
}

impl ModuleExports {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn function(mut self, tool: FunctionTool) -> Self {
        self.functions.push(tool);
        self
    }

    pub fn class(mut self, class: ToolClass) -> Self {
        self.classes.push(class);
        self
    }
}

/// A unit of tool registration.
///
/// `load` builds the module's tools; any schema error in a declaration
/// makes the whole module fail to load.
pub trait ToolModule: Send + Sync {
    fn name(&self) -> &str;

    fn load(&self) -> Result<ModuleExports>;
}

type Loader = dyn Fn() -> Result<ModuleExports> + Send + Sync;

/// A [`ToolModule`] backed by a closure.
pub struct FnModule {
    name: String,
    loader: Box<Loader>,
}

impl FnModule {
    pub fn new<F>(name: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Result<ModuleExports> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            loader: Box::new(loader),
        }
    }
}

impl ToolModule for FnModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<ModuleExports> {
        (self.loader)()
    }
}

impl fmt::Debug for FnModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnModule").field("name", &self.name).finish()
    }
}

/// Outcome of one scan, for diagnostics.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub loaded: Vec<String>,
    pub skipped: Vec<String>,
    /// Modules that failed to load, as `ModuleLoad` errors.
    pub failed: Vec<StockbotError>,
    /// Registrations refused by the collision policy.
    pub collisions: Vec<StockbotError>,
}

/// Builds a [`ToolRegistry`] from a list of modules.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuleScanner {
    policy: CollisionPolicy,
}

impl ModuleScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: CollisionPolicy) -> Self {
        Self { policy }
    }

    /// Load every module and register its tools.
    pub fn scan(&self, modules: &[Box<dyn ToolModule>]) -> ToolRegistry {
        self.scan_with_report(modules).0
    }

    /// Like [`scan`](Self::scan), also returning what was loaded and skipped.
    ///
    /// Modules with a reserved name are skipped. A module that fails to load
    /// (error or panic) is logged and skipped; the rest still register.
    /// Within a module, functions register before class methods.
    pub fn scan_with_report(&self, modules: &[Box<dyn ToolModule>]) -> (ToolRegistry, ScanReport) {
        let mut registry = ToolRegistry::with_policy(self.policy);
        let mut report = ScanReport::default();

        for module in modules {
            let name = module.name();
            if name.starts_with(RESERVED_PREFIX) {
                report.skipped.push(name.to_string());
                continue;
            }

            let exports = match load_isolated(module.as_ref()) {
                Ok(exports) => exports,
                Err(e) => {
                    warn!(module = %name, error = %e, "skipping tool module");
                    report.failed.push(e);
                    continue;
                }
            };

            for function in exports.functions {
                if let Err(e) = registry.register_function(function) {
                    warn!(module = %name, error = %e, "tool not registered");
                    report.collisions.push(e);
                }
            }
            for class in exports.classes {
                for (descriptor, target) in class.into_parts() {
                    if let Err(e) = registry.insert_part(descriptor, target) {
                        warn!(module = %name, error = %e, "tool not registered");
                        report.collisions.push(e);
                    }
                }
            }
            report.loaded.push(name.to_string());
        }

        info!(
            tools = registry.len(),
            modules = report.loaded.len(),
            failed = report.failed.len(),
            "tool registry built"
        );
        (registry, report)
    }
}

fn load_isolated(module: &dyn ToolModule) -> Result<ModuleExports> {
    let module_load = |message: String| StockbotError::ModuleLoad {
        module: module.name().to_string(),
        message,
    };

    match std::panic::catch_unwind(AssertUnwindSafe(|| module.load())) {
        Ok(Ok(exports)) => Ok(exports),
        Ok(Err(e)) => Err(module_load(e.to_string())),
        Err(_) => Err(module_load("panicked while loading".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::arguments::ToolArguments;
    use crate::tools::schema::Signature;
    use crate::tools::spec::ToolSpec;
    use serde_json::json;
    use std::sync::Arc;

    fn news_module(module: &str, tool: &str) -> Box<dyn ToolModule> {
        let tool = tool.to_string();
        Box::new(FnModule::new(module, move || {
            let function = FunctionTool::new(
                ToolSpec::new(tool.clone(), "News")
                    .required(["stock"])
                    .signature(Signature::function().param::<str>("stock")),
                |_args: ToolArguments| async { Ok(json!([])) },
            )?;
            Ok(ModuleExports::new().function(function))
        }))
    }

    #[test]
    fn reserved_modules_are_skipped() {
        let modules = vec![news_module("__init__", "hidden"), news_module("news", "get_news")];

        let (registry, report) = ModuleScanner::new().scan_with_report(&modules);

        assert_eq!(registry.list_names(), vec!["get_news"]);
        assert_eq!(report.skipped, vec!["__init__"]);
    }

    #[test]
    fn failing_and_panicking_modules_do_not_stop_the_scan() {
        let modules: Vec<Box<dyn ToolModule>> = vec![
            Box::new(FnModule::new("broken", || {
                Err(StockbotError::Configuration("no such symbol".into()))
            })),
            Box::new(FnModule::new("panicky", || panic!("import blew up"))),
            news_module("news", "get_news"),
        ];

        let (registry, report) = ModuleScanner::new().scan_with_report(&modules);

        assert_eq!(registry.list_names(), vec!["get_news"]);
        assert_eq!(report.failed.len(), 2);
        assert!(matches!(
            &report.failed[0],
            StockbotError::ModuleLoad { module, .. } if module == "broken"
        ));
    }

    #[test]
    fn schema_error_fails_the_whole_module() {
        let modules: Vec<Box<dyn ToolModule>> = vec![Box::new(FnModule::new("bad", || {
            let class = ToolClass::new("Bad", ()).method(
                ToolSpec::new("oops", "Oops")
                    .required(["ticker"])
                    .signature(Signature::method()),
                |_: Arc<()>, _: ToolArguments| async { Ok(json!(null)) },
            )?;
            Ok(ModuleExports::new().class(class))
        }))];

        let (registry, report) = ModuleScanner::new().scan_with_report(&modules);

        assert!(registry.is_empty());
        assert!(report.failed[0].to_string().contains("ticker"));
    }

    #[test]
    fn collisions_across_modules_keep_first_by_default() {
        let modules = vec![news_module("a", "get_news"), news_module("b", "get_news")];

        let (registry, report) = ModuleScanner::new().scan_with_report(&modules);

        assert_eq!(registry.len(), 1);
        assert!(matches!(report.collisions[0], StockbotError::DuplicateTool(_)));
    }
}
