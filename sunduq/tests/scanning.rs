mod common;

use std::sync::Arc;

use common::{Journal, OrderService, catalog, init_tracing};
use sunduq::prelude::*;

const SHOP_BEANS: [&str; 5] = ["orderRepository", "orderService", "pricingPolicy", "shopConfig", "systemClock"];

fn build(search_path: SearchPath, properties: PropertyStore) -> Result<ApplicationContext> {
    let journal = Arc::new(Journal::default());
    ApplicationContext::builder()
        .catalog(catalog(&journal))
        .search_path(search_path)
        .properties(properties)
        .root("shop.ShopApp")
        .build()
}

#[test]
fn builds_context_from_directory() {
    init_tracing();
    let dir = common::directory_fixture();

    let ctx = build(
        SearchPath::new().with_root(Root::directory(dir.path())),
        PropertyStore::builder()
            .with_map([("shop.currency", "AED"), ("shop.discount", "10")])
            .build(),
    )
    .unwrap();

    assert_eq!(ctx.bean_names(), SHOP_BEANS);
    let service: Arc<OrderService> = ctx.get_bean("orderService").unwrap();
    assert_eq!(service.quote(200), "180 AED (UTC)");
    assert!(service.is_ready());
}

#[test]
fn builds_context_from_archives() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    for compressed in [false, true] {
        let archive = common::archive_fixture(dir.path(), compressed);
        let ctx = build(SearchPath::new().with_root(Root::archive(&archive)), PropertyStore::empty()).unwrap();

        assert_eq!(ctx.bean_names(), SHOP_BEANS, "compressed: {compressed}");
        let service: Arc<OrderService> = ctx.get_bean_by_type().unwrap();
        assert_eq!(service.quote(50), "50 USD (UTC)");
    }
}

#[test]
fn search_path_from_uris() {
    let types = common::directory_fixture();
    let archives = tempfile::tempdir().unwrap();
    let archive = common::archive_fixture(archives.path(), true);

    for uri in [
        format!("file://{}/", types.path().display()),
        format!("tar:file://{}", archive.display()),
    ] {
        let search_path = SearchPath::parse([uri.as_str()]).unwrap();
        let ctx = build(search_path, PropertyStore::empty()).unwrap();
        assert_eq!(ctx.len(), SHOP_BEANS.len(), "root: {uri}");
    }
}

#[test]
fn types_found_in_several_roots_are_defined_once() {
    let first = common::directory_fixture();
    let archives = tempfile::tempdir().unwrap();
    let archive = common::archive_fixture(archives.path(), false);

    let search_path = SearchPath::new()
        .with_root(Root::directory(first.path()))
        .with_root(Root::archive(&archive));

    let ctx = build(search_path, PropertyStore::empty()).unwrap();
    assert_eq!(ctx.bean_names(), SHOP_BEANS);
}

#[test]
fn unreadable_root_is_skipped() {
    let dir = common::directory_fixture();
    let missing = dir.path().join("missing.tar");

    let search_path = SearchPath::new()
        .with_root(Root::archive(&missing))
        .with_root(Root::directory(dir.path()));

    let ctx = build(search_path, PropertyStore::empty()).unwrap();
    assert_eq!(ctx.len(), SHOP_BEANS.len());
}

#[test]
fn unsupported_root_uri() {
    match SearchPath::parse(["http://example.com/types"]) {
        Err(SunduqError::Resource(err)) => assert!(err.to_string().contains("Unsupported")),
        other => panic!("Expected Resource error, got: {other:?}"),
    }
}

#[test]
fn scanned_type_missing_from_catalog() {
    let dir = common::directory_fixture();
    std::fs::write(dir.path().join("shop/order/Invoice.type"), "").unwrap();

    match build(SearchPath::new().with_root(Root::directory(dir.path())), PropertyStore::empty()) {
        Err(SunduqError::TypeNotFound(err)) => assert_eq!(err.requested, "shop.order.Invoice"),
        other => panic!("Expected TypeNotFound, got: {other:?}"),
    }
}

#[test]
fn root_without_scan_directive() {
    struct Plain;
    let catalog = TypeCatalog::new().with(TypeDescriptor::new::<Plain>("shop.Plain"));

    match ApplicationContext::builder().catalog(catalog).root("shop.Plain").build() {
        Err(SunduqError::MissingComponentScan { type_name }) => assert_eq!(type_name, "shop.Plain"),
        other => panic!("Expected MissingComponentScan, got: {other:?}"),
    }
}

#[test]
fn custom_type_suffix() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("shop/clock")).unwrap();
    std::fs::write(dir.path().join("shop/clock/SystemClock.bean"), "").unwrap();
    std::fs::write(dir.path().join("shop/clock/Ignored.type"), "").unwrap();

    let journal = Arc::new(Journal::default());
    let ctx = ApplicationContext::builder()
        .catalog(catalog(&journal))
        .search_path(SearchPath::new().with_root(Root::directory(dir.path())))
        .type_suffix(".bean")
        .root("shop.ShopApp")
        .build()
        .unwrap();

    assert_eq!(ctx.bean_names(), vec!["systemClock"]);
}
