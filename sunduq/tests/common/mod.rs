//! A small shop application shared by the integration tests.
#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use flate2::Compression;
use flate2::write::GzEncoder;
use parking_lot::Mutex;
use sunduq::prelude::*;

/// Records lifecycle events in the order they happen.
#[derive(Default)]
pub struct Journal {
    events: Mutex<Vec<String>>,
}

impl Journal {
    pub fn record(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

/// Type files of the shop, relative to a search root.
pub const TYPE_FILES: &[&str] = &[
    "shop/ShopApp.type",
    "shop/ShopConfig.type",
    "shop/clock/SystemClock.type",
    "shop/order/OrderRepository.type",
    "shop/order/OrderService.type",
    "shop/order/model/Order.type",
];

/// Files on the search path that do not name types.
pub const OTHER_FILES: &[&str] = &["shop/README.txt", "shop/order/schema.sql"];

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("sunduq_container=debug")
        .with_test_writer()
        .try_init();
}

// ── Domain ──

pub trait Clock: Send + Sync {
    fn zone(&self) -> &str;
}

pub struct SystemClock {
    zone: String,
}

impl Clock for SystemClock {
    fn zone(&self) -> &str {
        &self.zone
    }
}

pub struct ShopConfig {
    pub currency: String,
}

pub struct PricingPolicy {
    pub currency: String,
    pub discount: u8,
}

impl PricingPolicy {
    pub fn price(&self, amount: u32) -> u32 {
        amount * (100 - u32::from(self.discount)) / 100
    }
}

pub struct OrderRepository {
    journal: Arc<Journal>,
}

impl OrderRepository {
    pub fn next_id(&self) -> u64 {
        self.journal.record("next id");
        1
    }
}

pub struct OrderService {
    clock: Arc<dyn Clock>,
    pricing: Arc<PricingPolicy>,
    pub repository: Slot<Arc<OrderRepository>>,
    pub ready: AtomicBool,
}

impl OrderService {
    pub fn quote(&self, amount: u32) -> String {
        format!(
            "{} {} ({})",
            self.pricing.price(amount),
            self.pricing.currency,
            self.clock.zone()
        )
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

pub struct Order;

pub struct ShopApp;

/// Descriptors of every shop type; lifecycle events go to `journal`.
pub fn catalog(journal: &Arc<Journal>) -> TypeCatalog {
    let repository_journal = Arc::clone(journal);
    let destroy_journal = Arc::clone(journal);
    let ready_journal = Arc::clone(journal);
    let stop_journal = Arc::clone(journal);

    TypeCatalog::new()
        .with(TypeDescriptor::new::<ShopApp>("shop.ShopApp").component_scan(["shop"]))
        .with(TypeDescriptor::new::<Order>("shop.order.model.Order"))
        .with(
            TypeDescriptor::new::<ShopConfig>("shop.ShopConfig")
                .configuration()
                .constructor(ConstructorDescriptor::new::<ShopConfig>(
                    vec![InjectionPoint::value::<String>("currency", "${shop.currency:USD}")],
                    |args| Ok(ShopConfig { currency: args.take(0)? }),
                ))
                .factory(FactoryMember::new::<ShopConfig, PricingPolicy>(
                    "pricingPolicy",
                    vec![InjectionPoint::value::<u8>("discount", "${shop.discount:0}")],
                    |config, args| {
                        Ok(PricingPolicy {
                            currency: config.currency.clone(),
                            discount: args.take(0)?,
                        })
                    },
                )),
        )
        .with(
            TypeDescriptor::new::<SystemClock>("shop.clock.SystemClock")
                .component()
                .implements::<SystemClock, dyn Clock>(|c| c)
                .constructor(ConstructorDescriptor::new::<SystemClock>(
                    vec![InjectionPoint::value::<String>("zone", "${clock.zone:UTC}")],
                    |args| Ok(SystemClock { zone: args.take(0)? }),
                )),
        )
        .with(
            TypeDescriptor::new::<OrderRepository>("shop.order.OrderRepository")
                .component()
                .constructor(ConstructorDescriptor::new::<OrderRepository>(vec![], move |_| {
                    Ok(OrderRepository {
                        journal: Arc::clone(&repository_journal),
                    })
                }))
                .callback(CallbackMethod::pre_destroy("close", move |_: &OrderRepository| {
                    destroy_journal.record("repository closed");
                    Ok(())
                })),
        )
        .with(
            TypeDescriptor::new::<OrderService>("shop.order.OrderService")
                .component()
                .constructor(ConstructorDescriptor::new::<OrderService>(
                    vec![
                        InjectionPoint::autowire::<dyn Clock>("clock"),
                        InjectionPoint::autowire::<PricingPolicy>("pricing"),
                    ],
                    |args| {
                        Ok(OrderService {
                            clock: args.take(0)?,
                            pricing: args.take(1)?,
                            repository: Slot::default(),
                            ready: AtomicBool::new(false),
                        })
                    },
                ))
                .member(MemberDescriptor::field(
                    InjectionPoint::autowire::<OrderRepository>("repository"),
                    |service: &OrderService, repository: Arc<OrderRepository>| {
                        service.repository.set(repository);
                    },
                ))
                .callback(CallbackMethod::post_construct("ready", move |service: &OrderService| {
                    ready_journal.record(format!("service ready, repository set: {}", service.repository.get().is_some()));
                    service.ready.store(true, Ordering::SeqCst);
                    Ok(())
                }))
                .callback(CallbackMethod::pre_destroy("stop", move |_: &OrderService| {
                    stop_journal.record("service stopped");
                    Ok(())
                })),
        )
}

// ── Fixtures ──

fn contents(path: &str) -> String {
    format!("{path}\n")
}

/// A directory search root holding the shop's type files.
pub fn directory_fixture() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for path in TYPE_FILES.iter().chain(OTHER_FILES) {
        let file = dir.path().join(path);
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(file, contents(path)).unwrap();
    }
    dir
}

fn append_files<W: Write>(writer: W) -> W {
    let mut builder = tar::Builder::new(writer);
    for path in TYPE_FILES.iter().chain(OTHER_FILES) {
        let data = contents(path);
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, data.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap()
}

/// A tar archive (gzip-compressed if asked) holding the shop's type files.
pub fn archive_fixture(dir: &Path, compressed: bool) -> PathBuf {
    let path = dir.join(if compressed { "shop.tar.gz" } else { "shop.tar" });
    let file = File::create(&path).unwrap();
    if compressed {
        append_files(GzEncoder::new(file, Compression::default()))
            .finish()
            .unwrap();
    } else {
        append_files(file).flush().unwrap();
    }
    path
}
