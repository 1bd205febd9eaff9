//! Layer creation and chain assembly.

use std::sync::Arc;

use axum::http::{header, StatusCode};
use tower::ServiceExt;

use context_handler::context::assembler::{ROUTING_STAGE, SECURITY_STAGE, SESSION_STAGE};
use context_handler::routing::DispatcherTypes;
use context_handler::security::{Constraint, ConstraintSecurityLayer};
use context_handler::session::Session;
use context_handler::{LayerOptions, ListenerSource, MiddlewareSource, ProcessingContext, RouteSource};

mod common;
use common::{
    body_string, get, Labeled, LateRouteInstaller, ProbeMiddleware, ProbeRoute,
    ProbeSecurityLayer, ProbeSessionLayer, Trace,
};

#[test]
fn test_session_layer_never_created_without_flag() {
    let context = ProcessingContext::new("", LayerOptions::SECURITY);
    assert!(context.ensure_session_layer().is_none());
    context.start().unwrap();

    assert!(context.ensure_session_layer().is_none());
    assert!(context.session_layer().is_none());
    assert_eq!(context.entry_point().unwrap().stages(), [SECURITY_STAGE, ROUTING_STAGE]);
}

#[test]
fn test_ensure_returns_same_instance() {
    let context = ProcessingContext::new("", LayerOptions::SESSIONS | LayerOptions::SECURITY);
    let session = context.ensure_session_layer().unwrap();
    assert!(Arc::ptr_eq(&session, &context.ensure_session_layer().unwrap()));

    let security = context.ensure_security_layer().unwrap().unwrap();
    assert!(Arc::ptr_eq(&security, &context.ensure_security_layer().unwrap().unwrap()));

    context.start().unwrap();
    assert!(Arc::ptr_eq(&session, &context.session_layer().unwrap()));
    assert!(Arc::ptr_eq(&security, &context.security_layer().unwrap()));
}

#[test]
fn test_routing_layer_kept_across_ensure() {
    let context = ProcessingContext::new("", LayerOptions::empty());
    assert!(context.ensure_routing_layer());
    context.add_route("r1", RouteSource::instance(Labeled("r1")), "/a").unwrap();
    assert!(context.ensure_routing_layer());
    let names = context.with_routing_layer(|routing| routing.ledger().route_names());
    assert_eq!(names, Some(vec!["r1".to_string()]));
}

#[tokio::test]
async fn test_chain_order_session_security_routing() {
    let trace = Trace::new();
    let context = ProcessingContext::new("", LayerOptions::SESSIONS | LayerOptions::SECURITY);
    context.set_session_layer(Arc::new(ProbeSessionLayer::new(trace.clone()))).unwrap();
    context
        .set_security_layer(Arc::new(ProbeSecurityLayer { trace: trace.clone() }))
        .unwrap();
    context
        .add_route("probe", RouteSource::instance(ProbeRoute::new(trace.clone())), "/")
        .unwrap();
    context.start().unwrap();

    assert_eq!(
        context.entry_point().unwrap().stages(),
        [SESSION_STAGE, SECURITY_STAGE, ROUTING_STAGE]
    );
    let response = context.clone().oneshot(get("/anything")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(trace.events(), ["session", "security", "routing"]);
}

#[tokio::test]
async fn test_routing_only_when_flags_disabled() {
    let trace = Trace::new();
    let context = ProcessingContext::new("", LayerOptions::empty());
    context
        .add_route("probe", RouteSource::instance(ProbeRoute::new(trace.clone())), "/")
        .unwrap();
    context.start().unwrap();

    assert_eq!(context.entry_point().unwrap().stages(), [ROUTING_STAGE]);
    assert!(context.session_layer().is_none());
    assert!(context.security_layer().is_none());

    let response = context.clone().oneshot(get("/x")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(trace.events(), ["routing"]);
}

#[tokio::test]
async fn test_route_added_while_starting_resolves() {
    let context = ProcessingContext::new("", LayerOptions::empty());
    context.add_listener(ListenerSource::of::<LateRouteInstaller>()).unwrap();
    context.start().unwrap();

    let table = context
        .with_routing_layer(|routing| routing.dispatch_table())
        .flatten()
        .unwrap();
    assert_eq!(table.resolve("/late/x").unwrap().name, "late");
    assert!(table.resolve("/b").is_none());

    let response = context.clone().oneshot(get("/late/x")).await.unwrap();
    assert_eq!(body_string(response).await, "late");
    let response = context.clone().oneshot(get("/b")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_context_path_is_stripped() {
    let context = ProcessingContext::new("/app", LayerOptions::empty());
    context.add_route("r1", RouteSource::instance(Labeled("r1")), "/a/*").unwrap();
    context.start().unwrap();

    let response = context.clone().oneshot(get("/app/a/x")).await.unwrap();
    assert_eq!(body_string(response).await, "r1");
    let response = context.clone().oneshot(get("/a/x")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_middleware_order_and_dispatch_types() {
    let trace = Trace::new();
    let context = ProcessingContext::new("", LayerOptions::empty());
    context.add_route("r1", RouteSource::instance(ProbeRoute::new(trace.clone())), "/a/*").unwrap();

    let by_name = context
        .add_middleware(
            "by-name",
            MiddlewareSource::instance(ProbeMiddleware { label: "by-name", trace: trace.clone() }),
            "/never",
            DispatcherTypes::REQUEST,
        )
        .unwrap();
    by_name
        .add_mapping_for_route_names(&["r1"], DispatcherTypes::REQUEST | DispatcherTypes::FORWARD)
        .unwrap();
    context
        .add_middleware(
            "by-path",
            MiddlewareSource::instance(ProbeMiddleware { label: "by-path", trace: trace.clone() }),
            "/a/*",
            DispatcherTypes::empty(),
        )
        .unwrap();
    context.start().unwrap();

    context.clone().oneshot(get("/a/x")).await.unwrap();
    assert_eq!(trace.events(), ["by-path", "by-name", "routing"]);

    trace.clear();
    let dispatcher = context.facade().named_dispatcher("r1").unwrap();
    let response = dispatcher.forward(get("/ignored")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(trace.events(), ["by-name", "routing"]);
}

#[tokio::test]
async fn test_default_layers_end_to_end() {
    let context = ProcessingContext::new("", LayerOptions::SESSIONS | LayerOptions::SECURITY);
    context
        .set_security_layer(Arc::new(
            ConstraintSecurityLayer::new()
                .with_constraint("/admin/*", Constraint::Deny)
                .unwrap(),
        ))
        .unwrap();
    context.add_route("r1", RouteSource::instance(Labeled("open")), "/").unwrap();
    context.start().unwrap();

    let response = context.clone().oneshot(get("/admin/x")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    // The session layer runs first, so even a denied request gets a session.
    assert!(response.headers().contains_key(header::SET_COOKIE));

    let response = context.clone().oneshot(get("/public")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "open");
}

#[tokio::test]
async fn test_session_extension_reaches_route() {
    use axum::body::Body;
    use axum::http::Request;
    use axum::response::{IntoResponse, Response};
    use futures_util::future::BoxFuture;

    struct WhoAmI;

    impl context_handler::Route for WhoAmI {
        fn handle(&self, request: Request<Body>) -> BoxFuture<'static, Response> {
            let id = request.extensions().get::<Session>().map(|s| s.id.clone());
            Box::pin(async move { id.unwrap_or_default().into_response() })
        }
    }

    let context = ProcessingContext::new("", LayerOptions::SESSIONS);
    context.add_route("who", RouteSource::instance(WhoAmI), "/who").unwrap();
    context.start().unwrap();

    let request = Request::builder()
        .uri("/who")
        .header(header::COOKIE, "SESSIONID=abc123")
        .body(Body::empty())
        .unwrap();
    let response = context.clone().oneshot(request).await.unwrap();
    assert_eq!(body_string(response).await, "abc123");
}

#[tokio::test]
async fn test_compound_extension_reaches_route_and_middleware() {
    let trace = Trace::new();
    let context = ProcessingContext::new("", LayerOptions::empty());
    context
        .add_route("tarball", RouteSource::instance(ProbeRoute::new(trace.clone())), "*.tar.gz")
        .unwrap();
    context.add_route("gzip", RouteSource::instance(Labeled("gzip")), "*.gz").unwrap();
    context
        .add_middleware(
            "archives",
            MiddlewareSource::instance(ProbeMiddleware { label: "archives", trace: trace.clone() }),
            "*.tar.gz",
            DispatcherTypes::REQUEST,
        )
        .unwrap();
    context.start().unwrap();

    let response = context.clone().oneshot(get("/a/x.tar.gz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(trace.events(), ["archives", "routing"]);

    trace.clear();
    let response = context.clone().oneshot(get("/a/x.gz")).await.unwrap();
    assert_eq!(body_string(response).await, "gzip");
    assert!(trace.events().is_empty());
}
