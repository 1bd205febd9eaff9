//! Injection hook: who gets injected, when, and how failures surface.

use std::sync::Arc;

use tower::ServiceExt;

use context_handler::error::{BoxError, ConstructionError};
use context_handler::{
    ContextError, Factory, Injector, LayerOptions, ProcessingContext, Route, RouteSource,
    TypeRegistry,
};

mod common;
use common::{body_string, get, Echo, Tagger};

fn context_with_tagger() -> (ProcessingContext, Arc<Tagger>) {
    let tagger = Arc::new(Tagger::default());
    let context = ProcessingContext::new("", LayerOptions::empty());
    context.set_injector(tagger.clone()).unwrap();
    let mut types = TypeRegistry::new();
    types.register_route("echo", Factory::<dyn Route>::of::<Echo>());
    context.register_types(types).unwrap();
    (context, tagger)
}

#[test]
fn test_class_and_name_sources_are_injected() {
    let (context, tagger) = context_with_tagger();
    let facade = context.facade();

    let by_class = facade.create_route(&RouteSource::of::<Echo>()).unwrap();
    let by_name = facade.create_route(&RouteSource::named("echo")).unwrap();

    for route in [by_class, by_name] {
        let echo = route.downcast_ref::<Echo>().unwrap();
        assert_eq!(echo.injected.as_deref(), Some("injected"));
    }
    assert_eq!(tagger.calls(), 2);
}

#[test]
fn test_instances_are_never_injected() {
    let (context, tagger) = context_with_tagger();
    let route = context
        .facade()
        .create_route(&RouteSource::instance(Echo::default()))
        .unwrap();

    assert!(route.downcast_ref::<Echo>().unwrap().injected.is_none());
    assert_eq!(tagger.calls(), 0);
}

#[tokio::test]
async fn test_routes_built_at_start_are_injected() {
    let (context, tagger) = context_with_tagger();
    context.add_route("class", RouteSource::of::<Echo>(), "/class").unwrap();
    context.add_route("name", RouteSource::named("echo"), "/name").unwrap();
    context.add_route("ready", RouteSource::instance(Echo::default()), "/ready").unwrap();
    context.start().unwrap();

    for (path, expected) in [("/class", "injected"), ("/name", "injected"), ("/ready", "echo")] {
        let response = context.clone().oneshot(get(path)).await.unwrap();
        assert_eq!(body_string(response).await, expected, "path {path}");
    }
    assert_eq!(tagger.calls(), 2);
}

#[test]
fn test_no_injector_builds_plain_instances() {
    let context = ProcessingContext::new("", LayerOptions::empty());
    let route = context.facade().create_route(&RouteSource::of::<Echo>()).unwrap();
    assert!(route.downcast_ref::<Echo>().unwrap().injected.is_none());
}

#[test]
fn test_unknown_name_is_construction_error() {
    let context = ProcessingContext::new("", LayerOptions::empty());
    let err = context.facade().create_route(&RouteSource::named("missing")).err().unwrap();
    assert!(matches!(
        err,
        ContextError::Construction(ConstructionError::UnknownType { ref name, .. }) if name == "missing"
    ));
}

#[test]
fn test_factory_failure_is_wrapped() {
    let context = ProcessingContext::new("", LayerOptions::empty());
    let broken = Factory::<dyn Route>::new("Broken", || Err("no database".into()));
    let err = context.facade().create_route(&RouteSource::class(broken)).err().unwrap();

    match err {
        ContextError::Construction(ConstructionError::Failed { type_name, source, .. }) => {
            assert_eq!(type_name, "Broken");
            assert_eq!(source.to_string(), "no database");
        }
        other => panic!("unexpected error: {other}"),
    }
}

struct Refuser;

impl Injector for Refuser {
    fn inject_route(&self, _route: Box<dyn Route>) -> Result<Box<dyn Route>, BoxError> {
        Err("dependency unavailable".into())
    }
}

#[test]
fn test_injection_failure_aborts_start() {
    let context = ProcessingContext::new("", LayerOptions::empty());
    context.set_injector(Arc::new(Refuser)).unwrap();
    context.add_route("r1", RouteSource::of::<Echo>(), "/a").unwrap();

    let err = context.start().unwrap_err();
    assert!(matches!(
        err,
        ContextError::Construction(ConstructionError::Injection { .. })
    ));
    assert!(context.is_configuring());
    assert!(context.entry_point().is_none());
}
