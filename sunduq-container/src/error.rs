//! Error types for Sunduq container operations.
//!
//! Every wiring failure is fatal and carries enough context (bean name,
//! member name, property key) to find the offending declaration.

use std::fmt;

use sunduq_support::rendering::render_chain;

use crate::key::TypeKey;

/// Main error type for all Sunduq operations.
#[derive(Debug, thiserror::Error)]
pub enum SunduqError {
    /// The root descriptor carries no component-scan directive.
    #[error(
        "Root type {type_name} has no component-scan directive\n  Hint: tag the root descriptor with .component_scan([...])"
    )]
    MissingComponentScan { type_name: String },

    /// The context builder was not told which type drives the scan.
    #[error("No root type set\n  Hint: call .root(\"app.AppConfig\") on the context builder")]
    MissingRoot,

    /// A scanned or imported type name is not known to the catalog.
    #[error("{}", .0)]
    TypeNotFound(NotFoundError),

    /// A component must declare exactly one public constructor.
    #[error("Type {type_name} must declare exactly one public constructor, found {found}")]
    ConstructorCount { type_name: String, found: usize },

    /// A factory member is abstract, final, non-public or returns nothing usable.
    #[error("Invalid factory member {owner}.{member}: {reason}")]
    InvalidFactoryMember {
        owner: String,
        member: String,
        reason: String,
    },

    /// Lifecycle callbacks are malformed (duplicated, take parameters, unknown).
    #[error("Invalid lifecycle callback on {type_name}: {reason}")]
    InvalidCallback { type_name: String, reason: String },

    /// Two definitions share a bean name.
    #[error("{}", .0)]
    DuplicateBeanName(DuplicateBeanError),

    /// A bean was requested while it was still being constructed.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),

    /// Several beans match a type and none of them is primary.
    #[error("No primary bean assignable to {requested} among candidates: {}", .candidates.join(", "))]
    NoPrimaryBean {
        requested: TypeKey,
        candidates: Vec<String>,
    },

    /// Several beans match a type and more than one is primary.
    #[error("Ambiguous primary beans assignable to {requested}: {}", .primaries.join(", "))]
    AmbiguousPrimaryBean {
        requested: TypeKey,
        primaries: Vec<String>,
    },

    /// A required dependency could not be found.
    #[error("{}", .0)]
    DependencyNotFound(NotFoundError),

    /// A bean found by name is not assignable to the requested type.
    #[error("Bean '{name}' of type {actual} is not assignable to {requested}")]
    BeanTypeMismatch {
        name: String,
        actual: TypeKey,
        requested: TypeKey,
    },

    /// Configuration beans may only take value parameters.
    #[error(
        "Cannot autowire parameter '{parameter}' of configuration bean '{bean}'\n  Hint: configuration beans may only take value parameters"
    )]
    AutowireInConfiguration { bean: String, parameter: String },

    /// An injection point carries both the value and the autowire tag.
    #[error("Cannot specify both value and autowire on {point} of bean '{bean}'")]
    ConflictingTags { bean: String, point: String },

    /// A constructor or factory parameter carries neither tag.
    #[error("Parameter {point} of bean '{bean}' must be tagged with value or autowire")]
    MissingTag { bean: String, point: String },

    /// Static members are never injected.
    #[error("Cannot inject static member {declaring_type}.{member} of bean '{bean}'")]
    StaticMember {
        bean: String,
        declaring_type: String,
        member: String,
    },

    /// Final fields cannot be assigned after construction.
    #[error("Cannot inject final field {declaring_type}.{member} of bean '{bean}'")]
    FinalField {
        bean: String,
        declaring_type: String,
        member: String,
    },

    /// Only setter-shaped methods (one or more parameters) can be injected.
    #[error("Cannot inject non-setter method {declaring_type}.{member} of bean '{bean}'")]
    NonSetter {
        bean: String,
        declaring_type: String,
        member: String,
    },

    /// A value was read back as a different type than it was produced as.
    #[error("Type mismatch in {context}: expected {expected}")]
    TypeMismatch {
        context: String,
        expected: &'static str,
    },

    /// A constructor, factory member or setter returned an error.
    #[error("Failed to construct bean '{name}': {source}")]
    ConstructionFailed {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Property(#[from] PropertyError),

    #[error(transparent)]
    Resource(#[from] ResourceError),
}

impl SunduqError {
    /// Wraps an arbitrary error raised while building a bean.
    pub fn construction(
        name: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        SunduqError::ConstructionFailed {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Returns the failure class this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            SunduqError::MissingComponentScan { .. }
            | SunduqError::MissingRoot
            | SunduqError::TypeNotFound(_)
            | SunduqError::ConstructorCount { .. }
            | SunduqError::InvalidFactoryMember { .. }
            | SunduqError::InvalidCallback { .. }
            | SunduqError::DuplicateBeanName(_)
            | SunduqError::AutowireInConfiguration { .. }
            | SunduqError::ConflictingTags { .. }
            | SunduqError::MissingTag { .. }
            | SunduqError::StaticMember { .. }
            | SunduqError::FinalField { .. }
            | SunduqError::NonSetter { .. } => ErrorCategory::Configuration,
            SunduqError::CircularDependency(_)
            | SunduqError::NoPrimaryBean { .. }
            | SunduqError::AmbiguousPrimaryBean { .. }
            | SunduqError::DependencyNotFound(_)
            | SunduqError::BeanTypeMismatch { .. }
            | SunduqError::TypeMismatch { .. }
            | SunduqError::ConstructionFailed { .. } => ErrorCategory::Resolution,
            SunduqError::Property(_) => ErrorCategory::Property,
            SunduqError::Resource(_) => ErrorCategory::Resource,
        }
    }
}

/// Coarse classification of [`SunduqError`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed declarations, whenever they are detected.
    Configuration,
    /// Failures while constructing or wiring beans.
    Resolution,
    /// Malformed keys, missing properties, unsupported conversions.
    Property,
    /// Unusable search roots.
    Resource,
}

/// Something was requested by name and is not there.
///
/// Includes "did you mean" suggestions taken from what IS registered.
#[derive(Debug)]
pub struct NotFoundError {
    /// The bean name, type name or type that was requested
    pub requested: String,
    /// The bean that needed it (if known)
    pub required_by: Option<String>,
    /// Similar names that are registered
    pub suggestions: Vec<String>,
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Not found: {}", self.requested)?;

        if let Some(ref parent) = self.required_by {
            write!(f, "\n  Required by: {parent}")?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        Ok(())
    }
}

/// A bean was re-entered while under construction.
///
/// The chain starts at the bean that was requested twice and ends with it.
#[derive(Debug)]
pub struct CircularDependencyError {
    /// Example: ["orderService", "paymentGateway", "orderService"]
    pub chain: Vec<String>,
}

impl CircularDependencyError {
    /// The bean at which the cycle was entered.
    pub fn entry_point(&self) -> Option<&str> {
        self.chain.first().map(String::as_str)
    }
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Circular dependency detected:\n  {}", render_chain(&self.chain))?;
        write!(
            f,
            "\n  Hint: move one of the dependencies to member injection or restructure the beans"
        )
    }
}

/// Two definitions claim the same bean name.
#[derive(Debug)]
pub struct DuplicateBeanError {
    pub name: String,
    /// Type that registered the name first
    pub existing: String,
    /// Type that tried to register it again
    pub duplicate: String,
}

impl fmt::Display for DuplicateBeanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Duplicate bean name '{}': already defined by {}, redefined by {}",
            self.name, self.existing, self.duplicate
        )?;
        write!(f, "\n  Hint: give one of them an explicit name")
    }
}

/// Failures of the property resolver.
#[derive(Debug, thiserror::Error)]
pub enum PropertyError {
    /// Expression is not `${name}` / `${name:default}`, or `name` is empty.
    #[error("Invalid property key expression {expression:?}: expected ${{name}} or ${{name:default}}")]
    InvalidKey { expression: String },

    /// No value and no default.
    #[error("Property not found: {key}")]
    NotFound { key: String },

    /// No converter is registered for the target type.
    #[error("Unsupported property type {target} for key {key}")]
    UnsupportedType { key: String, target: TypeKey },

    /// The converter rejected the text.
    #[error("Cannot convert property {key}={value:?} to {target}: {reason}")]
    ConversionFailed {
        key: String,
        value: String,
        target: TypeKey,
        reason: String,
    },

    /// A property source could not be parsed.
    #[error("Invalid property source {source_name}: {reason}")]
    InvalidSource { source_name: String, reason: String },
}

/// Failures of the resource resolver that abort a whole scan.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// A root location could not be expressed or parsed as a URI.
    #[error("Invalid resource URI {uri:?}: {reason}")]
    InvalidUri { uri: String, reason: String },

    /// A root URI uses a scheme the resolver does not mount.
    #[error("Unsupported resource root {uri:?}\n  Hint: use file:///dir or tar:file:///path/archive.tar")]
    UnsupportedRoot { uri: String },
}

/// Convenient Result type for Sunduq operations.
pub type Result<T> = std::result::Result<T, SunduqError>;
