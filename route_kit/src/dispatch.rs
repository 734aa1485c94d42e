use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Path, Request},
    response::{IntoResponse, Response},
    routing::{get, on, MethodFilter, MethodRouter},
    Json, Router,
};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::FrameworkConfig;
use crate::context::{ContextStore, RequestContext};
use crate::error::{Error, Result};
use crate::handler::{BoxFuture, Invocation};
use crate::openapi;
use crate::query::QueryValues;
use crate::registry::Registry;
use crate::validation::Validator;

/// Everything a served request reads. Frozen once the router is built.
pub(crate) struct DispatchState {
    pub registry: Registry,
    pub config: Arc<FrameworkConfig>,
    pub context: ContextStore,
    pub validator: Arc<dyn Validator>,
}

pub(crate) struct RouterBuilder {
    state: Arc<DispatchState>,
    extra: Vec<(String, MethodRouter)>,
}

impl RouterBuilder {
    pub fn new(state: DispatchState) -> Self {
        RouterBuilder {
            state: Arc::new(state),
            extra: Vec::new(),
        }
    }

    pub fn extra_routes(mut self, routes: Vec<(String, MethodRouter)>) -> Self {
        self.extra.extend(routes);
        self
    }

    /// One route per definition path, verbs at the same path merged into one
    /// method router. Unlisted verbs answer 405.
    pub fn build(self) -> Router {
        let mut by_path: BTreeMap<String, MethodRouter> = BTreeMap::new();
        for def in self.state.registry.definitions() {
            let Some(filter) = method_filter(&def.route.method) else {
                warn!(handler = %def.handler_name, method = %def.route.method, "unsupported method, route not installed");
                continue;
            };
            let handler = route_handler(self.state.clone(), def.handler_name.clone());
            let router = match by_path.remove(&def.route.path) {
                Some(existing) => existing.on(filter, handler),
                None => on(filter, handler),
            };
            by_path.insert(def.route.path.clone(), router);
        }

        let mut router = Router::new();
        for (path, method_router) in by_path {
            router = router.route(&path, method_router);
        }

        let doc_route = self.state.config.doc_route.clone();
        if !doc_route.is_empty() {
            let state = self.state.clone();
            router = router.route(
                &doc_route,
                get(move || async move { Json(openapi::generate(&state.registry, &state.config)) }),
            );
        }

        for (path, method_router) in self.extra {
            router = router.route(&path, method_router);
        }
        router
    }
}

fn method_filter(method: &str) -> Option<MethodFilter> {
    match method {
        "GET" => Some(MethodFilter::GET),
        "POST" => Some(MethodFilter::POST),
        "PUT" => Some(MethodFilter::PUT),
        "DELETE" => Some(MethodFilter::DELETE),
        _ => None,
    }
}

fn route_handler(
    state: Arc<DispatchState>,
    handler_name: String,
) -> impl Fn(Request) -> BoxFuture<'static, Response> + Clone + Send + Sync + 'static {
    move |req: Request| -> BoxFuture<'static, Response> {
        let state = state.clone();
        let handler_name = handler_name.clone();
        Box::pin(async move { serve(&state, &handler_name, req).await })
    }
}

async fn serve(state: &DispatchState, handler_name: &str, req: Request) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    match invoke(state, handler_name, req).await {
        Ok(value) => Json(value).into_response(),
        Err(err) => {
            if err.status().is_server_error() {
                error!(handler = handler_name, %method, %path, error = %err, "request failed");
            } else {
                warn!(handler = handler_name, %method, %path, error = %err, "request rejected");
            }
            err.into_response()
        }
    }
}

async fn invoke(state: &DispatchState, handler_name: &str, req: Request) -> Result<Value> {
    let (mut parts, body) = req.into_parts();

    let path_params: HashMap<String, String> =
        Path::<HashMap<String, String>>::from_request_parts(&mut parts, &())
            .await
            .map(|path| path.0)
            .unwrap_or_default();
    // Route captures win over query pairs of the same name.
    let mut query = QueryValues::new();
    if let Some(raw) = parts.uri.query() {
        for (key, value) in QueryValues::parse(raw)?.iter() {
            if !path_params.contains_key(key) {
                query.push(key, value);
            }
        }
    }
    query.extend(path_params);

    let body = axum::body::to_bytes(body, state.config.body_limit)
        .await
        .map_err(|e| Error::decode(format!("failed to read request body: {e}")))?;

    let ctx = RequestContext::new(
        state.context.snapshot(),
        handler_name,
        parts.method.clone(),
        parts.uri.path(),
    );
    if state.config.debug {
        info!(handler = handler_name, method = %parts.method, path = parts.uri.path(), "dispatching request");
    }

    let handler = state.registry.resolve(handler_name)?;
    handler(Invocation {
        ctx,
        method: parts.method,
        query,
        body,
        validator: state.validator.clone(),
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_documented_verbs_are_installed() {
        assert!(method_filter("GET").is_some());
        assert!(method_filter("DELETE").is_some());
        assert!(method_filter("PATCH").is_none());
        assert!(method_filter("OPTIONS").is_none());
        assert!(method_filter("get").is_none());
    }
}
