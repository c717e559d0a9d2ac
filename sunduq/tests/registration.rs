use std::sync::Arc;

use sunduq::naming::default_bean_name;
use sunduq::prelude::*;

struct Heartbeat {
    interval: u64,
}

struct Pulse {
    heartbeat: Arc<Heartbeat>,
}

struct BeatsApp;

fn describe_app() -> TypeDescriptor {
    TypeDescriptor::new::<BeatsApp>("beats.BeatsApp")
        .component_scan(["beats"])
        .import(["beats.Heartbeat", "beats.Pulse"])
}

fn describe_heartbeat() -> TypeDescriptor {
    TypeDescriptor::new::<Heartbeat>("beats.Heartbeat")
        .component()
        .constructor(ConstructorDescriptor::new::<Heartbeat>(
            vec![InjectionPoint::value::<u64>("interval", "${beats.interval:30}")],
            |args| Ok(Heartbeat { interval: args.take(0)? }),
        ))
}

fn describe_pulse() -> TypeDescriptor {
    TypeDescriptor::new::<Pulse>("beats.Pulse")
        .component()
        .named("mainPulse")
        .constructor(ConstructorDescriptor::new::<Pulse>(
            vec![InjectionPoint::autowire::<Heartbeat>("heartbeat")],
            |args| Ok(Pulse { heartbeat: args.take(0)? }),
        ))
}

submit_type!("beats.BeatsApp", describe_app);
submit_type!("beats.Heartbeat", describe_heartbeat);
submit_type!("beats.Pulse", describe_pulse);

#[test]
fn link_time_registrations() {
    let catalog = TypeCatalog::from_inventory();
    assert!(catalog.contains("beats.Heartbeat"));

    let ctx = ApplicationContext::builder()
        .catalog(catalog)
        .properties(PropertyStore::builder().with_map([("beats.interval", "5")]).build())
        .root("beats.BeatsApp")
        .build()
        .unwrap();

    assert_eq!(ctx.bean_names(), vec!["heartbeat", "mainPulse"]);
    let pulse: Arc<Pulse> = ctx.get_bean("mainPulse").unwrap();
    assert_eq!(pulse.heartbeat.interval, 5);
}

struct BeatsProvider;

impl TypeProvider for BeatsProvider {
    fn register(&self, registry: &mut dyn DescriptorRegistry) {
        registry.register_descriptor(describe_app());
        registry.register_descriptor(describe_heartbeat());
        registry.register_lazy("beats.Pulse", describe_pulse);
    }

    fn name(&self) -> &str {
        "beats"
    }
}

#[test]
fn provider_registrations() {
    let mut catalog = TypeCatalog::new();
    catalog.add_provider(&BeatsProvider);
    assert_eq!(catalog.names(), vec!["beats.BeatsApp", "beats.Heartbeat", "beats.Pulse"]);

    let ctx = ApplicationContext::builder()
        .catalog(catalog)
        .root("beats.BeatsApp")
        .build()
        .unwrap();

    let heartbeat: Arc<Heartbeat> = ctx.get_bean_by_type().unwrap();
    assert_eq!(heartbeat.interval, 30);
}

#[test]
fn unknown_root_suggests_registered_types() {
    let mut catalog = TypeCatalog::new();
    catalog.add_provider(&BeatsProvider);

    match ApplicationContext::builder().catalog(catalog).root("beats.BeatApp").build() {
        Err(SunduqError::TypeNotFound(err)) => {
            assert_eq!(err.requested, "beats.BeatApp");
            assert!(err.suggestions.contains(&"beats.BeatsApp".to_string()));
        }
        other => panic!("Expected TypeNotFound, got: {other:?}"),
    }
}

#[test]
fn default_names_follow_simple_type_name() {
    assert_eq!(default_bean_name("beats.Heartbeat"), "heartbeat");
    assert_eq!(default_bean_name("shop.order.OrderService"), "orderService");
}
