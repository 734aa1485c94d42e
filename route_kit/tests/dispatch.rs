use std::sync::atomic::{AtomicUsize, Ordering};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::Router;
use route_kit::{controller, ApiFramework, ApiModel, FrameworkHandle, Meta, RequestContext};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower::ServiceExt;

#[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
struct ListReq {
    #[serde(skip)]
    #[api(path = "/widgets", method = "GET", summary = "List widgets", tags = "widgets")]
    meta: Meta,
    #[api(p = "limit")]
    limit: i32,
    tags: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
struct ListRes {
    limit: i32,
    tags: Vec<String>,
    region: Option<String>,
    handler: String,
}

#[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
struct GetReq {
    #[serde(skip)]
    #[api(path = "/widgets/{id}", method = "GET", summary = "Get a widget")]
    meta: Meta,
    #[api(v = "required")]
    id: u64,
}

#[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
struct CreateReq {
    #[serde(skip)]
    #[api(path = "/widgets", method = "POST", summary = "Create a widget")]
    meta: Meta,
    #[api(v = "required#name is required")]
    name: String,
    count: u32,
}

#[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
struct FailReq {
    #[serde(skip)]
    #[api(path = "/widgets/fail", method = "POST", summary = "Always fails")]
    meta: Meta,
}

#[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
struct DeleteReq {
    #[serde(skip)]
    #[api(path = "/widgets", method = "DELETE", summary = "Delete a widget")]
    meta: Meta,
    id: u64,
    force: bool,
}

#[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
struct WidgetRes {
    id: u64,
    name: String,
    count: u32,
    force: bool,
}

#[derive(Default)]
struct Widgets {
    handle: FrameworkHandle,
    initialized: bool,
    creates: AtomicUsize,
}

#[controller(name = "Widgets", handle = handle)]
impl Widgets {
    fn initialize(&mut self, handle: &FrameworkHandle) -> Result<(), String> {
        self.initialized = true;
        handle.set_context_value("initialized", true);
        Ok(())
    }

    pub async fn list(&self, ctx: RequestContext, req: ListReq) -> Result<ListRes, String> {
        Ok(ListRes {
            limit: req.limit,
            tags: req.tags,
            region: ctx.value("region").and_then(Value::as_str).map(str::to_string),
            handler: ctx.handler_name().to_string(),
        })
    }

    pub async fn get(&self, _ctx: RequestContext, req: GetReq) -> Result<WidgetRes, String> {
        Ok(WidgetRes {
            id: req.id,
            ..Default::default()
        })
    }

    pub async fn create(&self, _ctx: RequestContext, req: CreateReq) -> Result<WidgetRes, String> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(WidgetRes {
            id: 1,
            name: req.name,
            count: req.count,
            force: false,
        })
    }

    pub async fn fail(&self, _ctx: RequestContext, _req: FailReq) -> Result<WidgetRes, String> {
        Err("storage offline".to_string())
    }

    pub async fn delete(&self, _ctx: RequestContext, req: DeleteReq) -> Result<WidgetRes, String> {
        Ok(WidgetRes {
            id: req.id,
            force: req.force,
            ..Default::default()
        })
    }

    /// Not an API: wrong shape.
    pub fn helper(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

mod gadgets {
    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
    pub struct ListReq {
        #[serde(skip)]
        #[api(path = "/gadgets", method = "GET", summary = "List gadgets")]
        pub meta: Meta,
        pub label: String,
    }

    #[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
    pub struct TouchReq {
        #[serde(skip)]
        #[api(path = "/gadgets", method = "PATCH", summary = "Touch a gadget")]
        pub meta: Meta,
        pub label: String,
    }

    #[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
    pub struct GadgetRes {
        pub label: String,
    }

    #[derive(Default)]
    pub struct Gadgets;

    #[controller(name = "Gadgets")]
    impl Gadgets {
        pub async fn list(&self, _ctx: RequestContext, req: ListReq) -> route_kit::Result<GadgetRes> {
            Ok(GadgetRes { label: req.label })
        }

        pub async fn touch(&self, _ctx: RequestContext, req: TouchReq) -> route_kit::Result<GadgetRes> {
            Ok(GadgetRes { label: req.label })
        }
    }
}

fn framework() -> ApiFramework {
    let mut framework = ApiFramework::new();
    framework
        .register_controller("", Widgets::default())
        .unwrap();
    framework
}

async fn send(router: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, String) {
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn json_of(text: &str) -> Value {
    serde_json::from_str(text).unwrap()
}

#[tokio::test]
async fn get_decodes_query_parameters() {
    let router = framework().into_router();
    let (status, body) = send(router, "GET", "/widgets?limit=10&tags=a&tags=b", None).await;
    assert_eq!(status, StatusCode::OK);
    let body = json_of(&body);
    assert_eq!(body["limit"], 10);
    assert_eq!(body["tags"], json!(["a", "b"]));
    assert_eq!(body["handler"], "Widgets.list");
}

#[tokio::test]
async fn unparseable_query_value_is_a_bad_request() {
    let router = framework().into_router();
    let (status, _) = send(router, "GET", "/widgets?limit=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn path_parameters_fill_request_fields() {
    let router = framework().into_router();
    let (status, body) = send(router, "GET", "/widgets/42", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body)["id"], 42);
}

#[tokio::test]
async fn path_parameters_win_over_query_values() {
    let router = framework().into_router();
    let (status, body) = send(router, "GET", "/widgets/42?id=9", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body)["id"], 42);
}

#[tokio::test]
async fn head_is_served_by_get_routes() {
    let router = framework().into_router();
    let (status, body) = send(router, "HEAD", "/widgets/42", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
}

#[tokio::test]
async fn post_decodes_body() {
    let router = framework().into_router();
    let (status, body) = send(
        router,
        "POST",
        "/widgets",
        Some(json!({"name": "gear", "count": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body = json_of(&body);
    assert_eq!(body["name"], "gear");
    assert_eq!(body["count"], 3);
}

#[tokio::test]
async fn body_type_mismatch_never_reaches_the_handler() {
    let framework = framework();
    let widgets = framework.controller::<Widgets>("Widgets").unwrap();
    let router = framework.into_router();

    let (status, _) = send(
        router,
        "POST",
        "/widgets",
        Some(json!({"name": "gear", "count": "three"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(widgets.helper(), 0);
}

#[tokio::test]
async fn validation_failure_uses_custom_message() {
    let router = framework().into_router();
    let (status, body) = send(router, "POST", "/widgets", Some(json!({"count": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "name is required");
}

#[tokio::test]
async fn default_required_message_names_the_field() {
    let router = framework().into_router();
    let (status, body) = send(router, "GET", "/widgets/0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "The id field is required");
}

#[tokio::test]
async fn handler_error_is_a_server_error() {
    let router = framework().into_router();
    let (status, body) = send(router, "POST", "/widgets/fail", Some(json!({}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "storage offline");
}

#[tokio::test]
async fn unregistered_verb_is_method_not_allowed() {
    let router = framework().into_router();
    let (status, _) = send(router, "PATCH", "/widgets", Some(json!({}))).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn single_argument_result_aliases_are_handlers() {
    let mut framework = ApiFramework::new();
    framework
        .register_controller("", gadgets::Gadgets)
        .unwrap();
    assert!(framework.definition("Gadgets.list").is_some());
    let (status, body) = send(framework.into_router(), "GET", "/gadgets?label=dial", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body)["label"], "dial");
}

#[tokio::test]
async fn patch_declared_methods_get_no_route() {
    let mut framework = ApiFramework::new();
    framework
        .register_controller("", gadgets::Gadgets)
        .unwrap();
    assert!(framework.definition("Gadgets.touch").is_some());
    let (status, _) = send(
        framework.into_router(),
        "PATCH",
        "/gadgets",
        Some(json!({"label": "knob"})),
    )
    .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn delete_reads_query_then_body() {
    let router = framework().into_router();
    let (status, body) = send(router.clone(), "DELETE", "/widgets?id=5&force=true", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body)["id"], 5);

    let (status, body) = send(
        router,
        "DELETE",
        "/widgets?id=5&force=true",
        Some(json!({"id": 7})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body = json_of(&body);
    assert_eq!(body["id"], 7);
    assert_eq!(body["force"], true);
}

#[tokio::test]
async fn context_values_reach_handlers() {
    let framework = framework();
    framework.set_context_value("region", "eu-west");
    let router = framework.into_router();
    let (_, body) = send(router, "GET", "/widgets", None).await;
    assert_eq!(json_of(&body)["region"], "eu-west");
}

#[tokio::test]
async fn doc_route_serves_the_document() {
    let router = framework().into_router();
    let (status, body) = send(router, "GET", "/api-docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    let doc = json_of(&body);
    assert!(doc["paths"]["/widgets"]["get"].is_object());
    assert!(doc["paths"]["/widgets"]["post"].is_object());
    assert!(doc["paths"]["/widgets"]["delete"].is_object());
}

#[tokio::test]
async fn bound_routes_sit_next_to_generated_ones() {
    let mut framework = framework();
    framework.bind_route("/ping", get(|| async { "pong" }));
    let router = framework.into_router();
    let (status, body) = send(router, "GET", "/ping", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "pong");
}

#[test]
fn registration_discovers_eligible_methods_only() {
    let framework = framework();
    let names: Vec<&str> = framework
        .definitions()
        .map(|def| def.handler_name.as_str())
        .collect();
    assert_eq!(
        names,
        [
            "Widgets.create",
            "Widgets.delete",
            "Widgets.fail",
            "Widgets.get",
            "Widgets.list"
        ]
    );
    let get = framework.definition("Widgets.get").unwrap();
    assert_eq!(get.route.path, "/widgets/{id}");
    assert_eq!(get.request.name, "GetReq");
    assert_eq!(get.response.name, "WidgetRes");
}

#[test]
fn initialize_runs_after_handle_injection() {
    let framework = framework();
    let widgets = framework.controller::<Widgets>("Widgets").unwrap();
    assert!(widgets.initialized);
    assert_eq!(
        widgets.handle.context_value("initialized"),
        Some(json!(true))
    );
}

#[test]
fn re_registration_replaces_earlier_routes() {
    let mut framework = framework();
    framework
        .register_controller("/v2", Widgets::default())
        .unwrap();
    assert_eq!(framework.registry().prefix("Widgets"), Some("/v2"));
    assert_eq!(framework.registry().len(), 5);
    assert!(framework
        .route_lines()
        .iter()
        .all(|line| line.contains(" /v2/widgets")));
    assert!(framework
        .route_lines()
        .contains(&"GET /v2/widgets - List widgets".to_string()));
}

#[test]
fn bad_prefix_is_rejected() {
    let mut framework = ApiFramework::new();
    let err = framework
        .register_controller("api", Widgets::default())
        .unwrap_err();
    assert!(err.to_string().contains("must be empty or start with '/'"));
}
