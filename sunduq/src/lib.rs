//! # Sunduq: a component-scanning IoC container for Rust
//!
//! Types describe themselves once through descriptors; the application
//! context discovers them on a search path of directories and tar archives,
//! builds one bean per component eagerly and wires constructor parameters,
//! fields and setters from other beans or from typed properties.
//!
//! ```rust
//! use std::sync::Arc;
//! use sunduq::prelude::*;
//!
//! struct Settings {
//!     port: u16,
//! }
//! struct App;
//!
//! let catalog = TypeCatalog::new()
//!     .with(
//!         TypeDescriptor::new::<App>("demo.App")
//!             .component_scan(Vec::<String>::new())
//!             .import(["demo.Settings"]),
//!     )
//!     .with(
//!         TypeDescriptor::new::<Settings>("demo.Settings")
//!             .component()
//!             .constructor(ConstructorDescriptor::new::<Settings>(
//!                 vec![InjectionPoint::value::<u16>("port", "${server.port:8080}")],
//!                 |args| Ok(Settings { port: args.take(0)? }),
//!             )),
//!     );
//!
//! let context = ApplicationContext::builder()
//!     .catalog(catalog)
//!     .properties(PropertyStore::builder().with_map([("server.port", "9090")]).build())
//!     .root("demo.App")
//!     .build()?;
//!
//! let settings: Arc<Settings> = context.get_bean("settings")?;
//! assert_eq!(settings.port, 9090);
//! # Ok::<(), sunduq::SunduqError>(())
//! ```

pub use sunduq_container::*;
pub use sunduq_support::*;
