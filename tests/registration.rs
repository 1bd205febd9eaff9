//! Registration ledger and handle behavior through the public surface.

use context_handler::artifact::{InitParameters, SourceKind};
use context_handler::context::{ContextFacade, InitParamPolicy};
use context_handler::error::BoxError;
use context_handler::routing::DispatcherTypes;
use context_handler::{
    ContextListener, LayerOptions, ListenerSource, MiddlewareSource, ProcessingContext, RouteSource,
};

mod common;
use common::{Echo, Labeled, Passthrough};

#[test]
fn test_duplicate_route_name_leaves_ledger_unchanged() {
    let context = ProcessingContext::new("", LayerOptions::empty());
    context.add_route("r1", RouteSource::of::<Echo>(), "/a").unwrap();

    let err = context
        .add_route("r1", RouteSource::instance(Labeled("other")), "/b")
        .err()
        .unwrap();
    assert!(err.is_duplicate_name());

    let registration = context.facade().route_registration("r1").unwrap();
    assert_eq!(registration.source_kind(), Some(SourceKind::Class));
    assert_eq!(registration.mappings(), vec!["/a".to_string()]);
    assert_eq!(context.facade().route_registrations().len(), 1);
}

#[test]
fn test_duplicate_middleware_name() {
    let context = ProcessingContext::new("", LayerOptions::empty());
    let facade = context.facade();
    facade.add_middleware("m", MiddlewareSource::of::<Passthrough>()).unwrap();

    let err = context
        .add_middleware("m", MiddlewareSource::named("other"), "/*", DispatcherTypes::REQUEST)
        .err()
        .unwrap();
    assert!(err.is_duplicate_name());
    let only = facade.middleware_registration("m").unwrap();
    assert_eq!(only.source_kind(), Some(SourceKind::Class));
    assert!(only.mappings().is_empty());
}

#[test]
fn test_route_and_middleware_names_are_separate() {
    let context = ProcessingContext::new("", LayerOptions::empty());
    context.add_route("shared", RouteSource::of::<Echo>(), "/a").unwrap();
    assert!(context
        .add_middleware("shared", MiddlewareSource::of::<Passthrough>(), "/*", DispatcherTypes::REQUEST)
        .is_ok());
}

#[test]
fn test_listings_keep_insertion_order() {
    let context = ProcessingContext::new("", LayerOptions::empty());
    for name in ["c", "a", "b"] {
        context.add_route(name, RouteSource::of::<Echo>(), &format!("/{name}")).unwrap();
    }
    let names: Vec<String> = context
        .facade()
        .route_registrations()
        .iter()
        .map(|r| r.name().to_string())
        .collect();
    assert_eq!(names, ["c", "a", "b"]);
}

#[test]
fn test_invalid_pattern_registers_nothing() {
    let context = ProcessingContext::new("", LayerOptions::empty());
    assert!(context.add_route("r1", RouteSource::of::<Echo>(), "no-slash").is_err());
    assert!(context.facade().route_registration("r1").is_none());
}

#[test]
fn test_route_init_parameters_reach_the_route() {
    let context = ProcessingContext::new("", LayerOptions::empty());
    let route = context.add_route("r1", RouteSource::named("echo"), "/a").unwrap();
    assert_eq!(route.source_kind(), Some(SourceKind::Name));
    assert_eq!(route.type_name().as_deref(), Some("echo"));

    let mut params = InitParameters::new();
    params.insert("a".into(), "1".into());
    params.insert("b".into(), "2".into());
    assert!(route.set_init_parameters(params.clone()).unwrap().is_empty());

    params.insert("c".into(), "3".into());
    assert_eq!(route.set_init_parameters(params).unwrap(), ["a", "b"]);
    assert_eq!(route.init_parameters().len(), 3);
}

/// Listener that sets one context init parameter during startup and records
/// whether it took effect.
struct ParamWriter;

impl ContextListener for ParamWriter {
    fn context_initialized(&self, context: &ContextFacade) -> Result<(), BoxError> {
        let applied = context.set_init_parameter("mode", "listener")?;
        context.set_init_parameter("applied", applied.to_string())?;
        Ok(())
    }
}

fn start_with_policy(policy: InitParamPolicy) -> ProcessingContext {
    let context = ProcessingContext::new("", LayerOptions::empty());
    context.set_init_param_policy(policy).unwrap();
    context.set_init_parameter("mode", "host").unwrap();
    context.add_listener(ListenerSource::instance(ParamWriter)).unwrap();
    context.start().unwrap();
    context
}

#[test]
fn test_reject_policy_keeps_existing_value() {
    let context = start_with_policy(InitParamPolicy::Reject);
    let facade = context.facade();
    assert_eq!(facade.init_parameter("mode").as_deref(), Some("host"));
    assert_eq!(facade.init_parameter("applied").as_deref(), Some("false"));
}

#[test]
fn test_overwrite_policy_replaces_value() {
    let context = start_with_policy(InitParamPolicy::Overwrite);
    let facade = context.facade();
    assert_eq!(facade.init_parameter("mode").as_deref(), Some("listener"));
    assert_eq!(facade.init_parameter("applied").as_deref(), Some("true"));

    let mut names = facade.init_parameter_names();
    names.sort();
    assert_eq!(names, ["applied", "mode"]);
}

#[test]
fn test_listener_count_and_middleware_from_facade() {
    let context = ProcessingContext::new("", LayerOptions::empty());
    context.add_listener(ListenerSource::instance(ParamWriter)).unwrap();
    context.add_listener(ListenerSource::named("later")).unwrap();
    assert_eq!(context.facade().listener_count(), 2);

    let m = context.facade().add_middleware("m", MiddlewareSource::of::<Passthrough>()).unwrap();
    m.add_mapping_for_paths(&["/a/*", "*.txt"], DispatcherTypes::INCLUDE).unwrap();
    let mappings = m.mappings();
    assert_eq!(mappings.len(), 2);
    assert!(mappings.iter().all(|mapping| mapping.dispatch == DispatcherTypes::INCLUDE));
    assert!(m.set_init_parameter("k", "v").unwrap());
    assert_eq!(m.init_parameter("k").as_deref(), Some("v"));
}
