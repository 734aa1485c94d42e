//! The framework facade: registration before serving, a router afterwards.

use std::sync::Arc;

use axum::routing::MethodRouter;
use axum::Router;
use serde_json::Value;
use tracing::info;
use utoipa::openapi::OpenApi;

use crate::config::FrameworkConfig;
use crate::context::ContextStore;
use crate::dispatch::{DispatchState, RouterBuilder};
use crate::error::Result;
use crate::handler::Controller;
use crate::openapi;
use crate::registry::{ApiDefinition, Registry};
use crate::validation::{RuleValidator, Validator};

/// Collects controllers, context values and extra routes, then turns into an
/// `axum::Router` with [`ApiFramework::into_router`].
///
/// ```ignore
/// let mut framework = ApiFramework::new();
/// framework.set_context_value("region", "eu-west");
/// framework.register_controller("/api", ItemController::default())?;
/// let app = framework.into_router();
/// ```
pub struct ApiFramework {
    config: Arc<FrameworkConfig>,
    context: ContextStore,
    registry: Registry,
    validator: Arc<dyn Validator>,
    extra_routes: Vec<(String, MethodRouter)>,
}

/// What a controller keeps from the framework: its configuration and the
/// shared context values.
#[derive(Debug, Clone, Default)]
pub struct FrameworkHandle {
    config: Arc<FrameworkConfig>,
    context: ContextStore,
}

impl FrameworkHandle {
    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    pub fn set_context_value(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.context.set(key, value);
    }

    pub fn context_value(&self, key: &str) -> Option<Value> {
        self.context.snapshot().get(key).cloned()
    }
}

impl Default for ApiFramework {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiFramework {
    pub fn new() -> Self {
        ApiFramework {
            config: Arc::new(FrameworkConfig::default()),
            context: ContextStore::new(),
            registry: Registry::new(),
            validator: Arc::new(RuleValidator),
            extra_routes: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: FrameworkConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    pub fn handle(&self) -> FrameworkHandle {
        FrameworkHandle {
            config: self.config.clone(),
            context: self.context.clone(),
        }
    }

    /// Visible to every request dispatched after this call.
    pub fn set_context_value(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.context.set(key, value);
    }

    pub fn register_controller<C: Controller>(&mut self, prefix: &str, controller: C) -> Result<()> {
        let handle = self.handle();
        self.registry.register(prefix, controller, &handle)
    }

    /// A registered controller instance, by controller name.
    pub fn controller<C: Controller>(&self, name: &str) -> Option<Arc<C>> {
        self.registry.controller(name)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &ApiDefinition> {
        self.registry.definitions()
    }

    pub fn definition(&self, handler_name: &str) -> Option<&ApiDefinition> {
        self.registry.definition(handler_name)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn generate_openapi(&self) -> OpenApi {
        openapi::generate(&self.registry, &self.config)
    }

    pub fn openapi_json(&self) -> Result<String> {
        openapi::to_json(&self.generate_openapi())
    }

    /// Writes the document to `config.doc_file` in the working directory.
    pub fn save_openapi_json(&self) -> Result<()> {
        openapi::save(&self.generate_openapi(), &self.config.doc_file)
    }

    pub fn route_lines(&self) -> Vec<String> {
        self.registry.route_lines()
    }

    pub fn print_routes(&self) {
        println!("Registered API Routes:");
        println!("----------------------");
        for line in self.route_lines() {
            println!("{line}");
        }
        println!("----------------------");
    }

    /// Mounts an extra route next to the generated ones.
    pub fn bind_route(&mut self, path: impl Into<String>, route: MethodRouter) -> &mut Self {
        self.extra_routes.push((path.into(), route));
        self
    }

    /// Freezes the registry and builds the router. Registration is no longer
    /// possible afterwards.
    pub fn into_router(self) -> Router {
        info!(
            apis = self.registry.len(),
            doc_route = %self.config.doc_route,
            "building router"
        );
        RouterBuilder::new(DispatchState {
            registry: self.registry,
            config: self.config,
            context: self.context,
            validator: self.validator,
        })
        .extra_routes(self.extra_routes)
        .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn handle_shares_context_values() {
        let framework = ApiFramework::new();
        let handle = framework.handle();
        framework.set_context_value("tenant", "acme");
        assert_eq!(handle.context_value("tenant"), Some(json!("acme")));

        handle.set_context_value("region", 7);
        assert_eq!(framework.handle().context_value("region"), Some(json!(7)));
    }

    #[test]
    fn config_is_visible_through_handle() {
        let config = FrameworkConfig {
            title: "Items".into(),
            ..FrameworkConfig::default()
        };
        let framework = ApiFramework::new().with_config(config);
        assert_eq!(framework.handle().config().title, "Items");
        assert!(framework.route_lines().is_empty());
    }
}
