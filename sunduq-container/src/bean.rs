//! Type-erased bean instances and resolved arguments.
//!
//! A bean of type `T` is stored as an `Arc<T>` erased to [`Bean`]. Resolved
//! arguments are boxed [`Value`]s holding exactly the Rust type the injection
//! point asked for: the converted property (`u16`, `String`, ...) for value
//! points and `Arc<K>` for autowired points of type `K`.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::{Result, SunduqError};

/// A constructed bean, shared and type-erased.
pub type Bean = Arc<dyn Any + Send + Sync>;

/// A resolved argument or injected member value.
pub type Value = Box<dyn Any + Send + Sync>;

/// Resolved arguments handed to a constructor or factory member.
///
/// Arguments are taken by position, in declaration order of the
/// parameters.
///
/// ```rust,ignore
/// ConstructorDescriptor::new::<OrderService>(params, |args| {
///     let clock: Arc<dyn Clock> = args.take(0)?;
///     let port: u16 = args.take(1)?;
///     Ok(OrderService { clock, port })
/// })
/// ```
pub struct Args {
    bean: String,
    values: Vec<Option<Value>>,
}

impl Args {
    pub(crate) fn new(bean: impl Into<String>, values: Vec<Option<Value>>) -> Self {
        Self {
            bean: bean.into(),
            values,
        }
    }

    /// Name of the bean being built.
    pub fn bean_name(&self) -> &str {
        &self.bean
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Takes the argument at `index` as `T`.
    ///
    /// # Errors
    /// [`SunduqError::TypeMismatch`] when the argument is absent (an optional
    /// autowire that found nothing, or already taken) or is not a `T`.
    pub fn take<T: 'static>(&mut self, index: usize) -> Result<T> {
        self.take_optional(index)?
            .ok_or_else(|| self.mismatch::<T>(index))
    }

    /// Takes the argument at `index`, allowing it to be absent.
    pub fn take_optional<T: 'static>(&mut self, index: usize) -> Result<Option<T>> {
        let Some(slot) = self.values.get_mut(index) else {
            return Err(self.mismatch::<T>(index));
        };
        match slot.take() {
            None => Ok(None),
            Some(value) => value
                .downcast::<T>()
                .map(|v| Some(*v))
                .map_err(|_| self.mismatch::<T>(index)),
        }
    }

    fn mismatch<T>(&self, index: usize) -> SunduqError {
        SunduqError::TypeMismatch {
            context: format!("argument {index} of bean '{}'", self.bean),
            expected: type_name::<T>(),
        }
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("bean", &self.bean)
            .field("len", &self.values.len())
            .finish()
    }
}

/// A write-once cell for fields filled by member injection.
///
/// Beans are shared behind `Arc` once constructed, so injected fields need
/// interior mutability.
///
/// ```
/// use sunduq_container::bean::Slot;
///
/// let port: Slot<u16> = Slot::new();
/// assert!(port.get().is_none());
/// assert!(port.set(8080));
/// assert!(!port.set(9090));
/// assert_eq!(port.get(), Some(&8080));
/// ```
pub struct Slot<T> {
    cell: OnceCell<T>,
}

impl<T> Slot<T> {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Stores the value; returns `false` if the slot was already filled.
    pub fn set(&self, value: T) -> bool {
        self.cell.set(value).is_ok()
    }

    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some(value) => f.debug_tuple("Slot").field(value).finish(),
            None => f.write_str("Slot(<empty>)"),
        }
    }
}
