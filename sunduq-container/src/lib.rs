//! Core of the Sunduq IoC container: type descriptors, component scanning,
//! bean definitions, property resolution and the application context.

pub mod bean;
pub mod catalog;
pub mod container;
pub mod convert;
pub mod definition;
pub mod descriptor;
pub mod error;
pub mod inject;
pub mod key;
pub mod property;
pub mod provider;
pub mod registry;
pub mod resource;
pub mod scanner;
pub mod source;

pub use container::{ApplicationContext, ApplicationContextBuilder, prelude};
pub use error::{Result, SunduqError};
pub use inventory;
pub use key::TypeKey;
