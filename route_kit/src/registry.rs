//! Controller registration and the API definition table.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, info};

use crate::descriptor::TypeDescriptor;
use crate::error::{Error, Result};
use crate::framework::FrameworkHandle;
use crate::handler::{BoundHandler, Controller};

/// Route metadata of a definition, with the controller prefix applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMeta {
    pub path: String,
    pub method: String,
    pub summary: String,
    /// Comma-separated.
    pub tags: String,
}

impl RouteMeta {
    pub fn tag_list(&self) -> impl Iterator<Item = &str> {
        self.tags.split(',').map(str::trim).filter(|tag| !tag.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct ApiDefinition {
    /// `<Controller>.<method>`.
    pub handler_name: String,
    pub controller: String,
    pub method: &'static str,
    pub request: &'static TypeDescriptor,
    pub response: &'static TypeDescriptor,
    pub route: RouteMeta,
}

pub struct RegisteredController {
    pub name: String,
    pub prefix: String,
    instance: Arc<dyn Any + Send + Sync>,
    handlers: HashMap<&'static str, BoundHandler>,
}

#[derive(Default)]
pub struct Registry {
    definitions: BTreeMap<String, ApiDefinition>,
    controllers: HashMap<String, RegisteredController>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `controller` under `prefix`, replacing any earlier
    /// registration with the same controller name.
    pub fn register<C: Controller>(
        &mut self,
        prefix: &str,
        mut controller: C,
        handle: &FrameworkHandle,
    ) -> Result<()> {
        if !prefix.is_empty() && !prefix.starts_with('/') {
            return Err(Error::Registration(format!(
                "prefix {prefix:?} must be empty or start with '/'"
            )));
        }
        let name = controller.name().to_string();
        if name.is_empty() {
            return Err(Error::Registration("controller name is empty".to_string()));
        }
        controller.attach(handle)?;

        let controller = Arc::new(controller);
        let mut definitions = Vec::new();
        let mut handlers = HashMap::new();
        for entry in C::methods() {
            let request = (entry.request)();
            let Some(route) = request.route else {
                debug!(controller = %name, method = entry.name, "request type has no Meta field, skipping");
                continue;
            };
            let handler_name = format!("{name}.{}", entry.name);
            let path = join_path(prefix, route.path);
            debug!(%handler_name, method = route.method, %path, summary = route.summary, "discovered API");
            definitions.push(ApiDefinition {
                handler_name,
                controller: name.clone(),
                method: entry.name,
                request,
                response: (entry.response)(),
                route: RouteMeta {
                    path,
                    method: route.method.to_ascii_uppercase(),
                    summary: route.summary.to_string(),
                    tags: route.tags.to_string(),
                },
            });
            handlers.insert(entry.name, entry.bind(controller.clone()));
        }

        self.definitions.retain(|_, def| def.controller != name);
        info!(controller = %name, prefix, apis = definitions.len(), "registered controller");
        self.definitions.extend(
            definitions
                .into_iter()
                .map(|def| (def.handler_name.clone(), def)),
        );
        self.controllers.insert(
            name.clone(),
            RegisteredController {
                name,
                prefix: prefix.to_string(),
                instance: controller,
                handlers,
            },
        );
        Ok(())
    }

    /// Definitions in handler-name order.
    pub fn definitions(&self) -> impl Iterator<Item = &ApiDefinition> {
        self.definitions.values()
    }

    pub fn definition(&self, handler_name: &str) -> Option<&ApiDefinition> {
        self.definitions.get(handler_name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn controller_names(&self) -> impl Iterator<Item = &str> {
        self.controllers.keys().map(String::as_str)
    }

    pub fn prefix(&self, controller: &str) -> Option<&str> {
        self.controllers.get(controller).map(|c| c.prefix.as_str())
    }

    /// The registered instance, if `name` was registered with type `C`.
    pub fn controller<C: Controller>(&self, name: &str) -> Option<Arc<C>> {
        let instance = self.controllers.get(name)?.instance.clone();
        instance.downcast::<C>().ok()
    }

    /// Finds the bound method for `<Controller>.<method>`.
    pub fn resolve(&self, handler_name: &str) -> Result<BoundHandler> {
        let not_found = || Error::HandlerNotFound(handler_name.to_string());
        let (controller, method) = handler_name.split_once('.').ok_or_else(not_found)?;
        self.controllers
            .get(controller)
            .and_then(|c| c.handlers.get(method))
            .cloned()
            .ok_or_else(not_found)
    }

    /// `VERB PATH - SUMMARY` per definition, sorted.
    pub fn route_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .definitions()
            .map(|def| format!("{} {} - {}", def.route.method, def.route.path, def.route.summary))
            .collect();
        lines.sort();
        lines
    }
}

fn join_path(prefix: &str, path: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), path.trim_start_matches('/'))
}
