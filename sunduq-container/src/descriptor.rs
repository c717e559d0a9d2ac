//! Type descriptors: the tags, constructors and members of a component.
//!
//! Rust has no runtime reflection, so every type the container may wire
//! describes itself once through a [`TypeDescriptor`]: its qualified name,
//! its tags, how to construct it, which members take injected values, which
//! methods are lifecycle callbacks, which factory members produce further
//! beans, and which types it is assignable to.
//!
//! # Examples
//! ```rust
//! use std::sync::Arc;
//! use sunduq_container::descriptor::*;
//!
//! trait Clock: Send + Sync {
//!     fn now(&self) -> u64;
//! }
//!
//! struct SystemClock;
//! impl Clock for SystemClock {
//!     fn now(&self) -> u64 { 0 }
//! }
//!
//! struct OrderService {
//!     clock: Arc<dyn Clock>,
//!     port: u16,
//! }
//!
//! let clock = TypeDescriptor::new::<SystemClock>("shop.SystemClock")
//!     .component()
//!     .implements::<SystemClock, dyn Clock>(|c| c)
//!     .constructor(ConstructorDescriptor::new::<SystemClock>(vec![], |_| Ok(SystemClock)));
//!
//! let service = TypeDescriptor::new::<OrderService>("shop.OrderService")
//!     .component()
//!     .constructor(ConstructorDescriptor::new::<OrderService>(
//!         vec![
//!             InjectionPoint::autowire::<dyn Clock>("clock"),
//!             InjectionPoint::value::<u16>("port", "${server.port:8080}"),
//!         ],
//!         |args| Ok(OrderService { clock: args.take(0)?, port: args.take(1)? }),
//!     ));
//!
//! assert_eq!(service.name(), "shop.OrderService");
//! assert!(clock.tags().component);
//! ```

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::bean::{Args, Bean, Value};
use crate::error::{Result, SunduqError};
use crate::key::TypeKey;

type Construct = Arc<dyn Fn(&mut Args) -> Result<Bean> + Send + Sync>;
type Invoke = Arc<dyn Fn(&Bean, &mut Args) -> Result<Bean> + Send + Sync>;
type Assign = Arc<dyn Fn(&(dyn Any + Send + Sync), Value) -> Result<()> + Send + Sync>;
type Call = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> Result<()> + Send + Sync>;
type Cast = Arc<dyn Fn(Bean) -> Option<Value> + Send + Sync>;

// ═══════════════════════════════════════════
// Tags
// ═══════════════════════════════════════════

/// Type-level tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeTags {
    /// Eligible for a bean definition.
    pub component: bool,
    /// Explicit bean name from the component/configuration tag.
    pub name: Option<String>,
    /// Factory members of this type produce further definitions.
    pub configuration: bool,
    pub primary: bool,
    pub order: Option<i32>,
    /// Namespaces to scan; `Some(vec![])` means "my own namespace".
    pub component_scan: Option<Vec<String>>,
    /// Qualified type names added to the candidates without scanning.
    pub imports: Vec<String>,
}

/// Visibility of a constructor or factory member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// The autowire tag: resolve a bean by name, or by type through the primary rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Autowire {
    pub name: Option<String>,
    pub required: bool,
}

/// The tag an injection point resolves through.
#[derive(Debug, Clone, Copy)]
pub enum Tag<'a> {
    Value(&'a str),
    Autowire(&'a Autowire),
}

// ═══════════════════════════════════════════
// InjectionPoint
// ═══════════════════════════════════════════

/// A constructor/factory parameter or an injected member.
///
/// `target` is the Rust type the value is delivered as: the property type for
/// value points, `K` for autowired points delivered as `Arc<K>`.
#[derive(Debug, Clone)]
pub struct InjectionPoint {
    name: String,
    target: TypeKey,
    value: Option<String>,
    autowire: Option<Autowire>,
}

impl InjectionPoint {
    /// A point with no tag at all.
    pub fn untagged<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: TypeKey::of::<T>(),
            value: None,
            autowire: None,
        }
    }

    /// A property value converted to `T`, e.g. `"${server.port:8080}"`.
    pub fn value<T: 'static>(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::untagged::<T>(name).with_value(expression)
    }

    /// A required bean delivered as `Arc<T>`, found by the primary rule.
    pub fn autowire<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self::untagged::<T>(name).with_autowire(Autowire {
            name: None,
            required: true,
        })
    }

    /// A required bean delivered as `Arc<T>`, found by bean name.
    pub fn autowire_named<T: ?Sized + 'static>(
        name: impl Into<String>,
        bean: impl Into<String>,
    ) -> Self {
        Self::untagged::<T>(name).with_autowire(Autowire {
            name: Some(bean.into()),
            required: true,
        })
    }

    /// Marks an autowired point as not required.
    pub fn optional(mut self) -> Self {
        if let Some(ref mut autowire) = self.autowire {
            autowire.required = false;
        }
        self
    }

    pub fn with_value(mut self, expression: impl Into<String>) -> Self {
        self.value = Some(expression.into());
        self
    }

    pub fn with_autowire(mut self, autowire: Autowire) -> Self {
        self.autowire = Some(autowire);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> TypeKey {
        self.target
    }

    pub fn value_expression(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn autowire_tag(&self) -> Option<&Autowire> {
        self.autowire.as_ref()
    }

    /// Returns `None` if the point carries no tag.
    ///
    /// # Errors
    /// [`SunduqError::ConflictingTags`] if both tags are present.
    pub fn tag(&self, bean: &str) -> Result<Option<Tag<'_>>> {
        match (&self.value, &self.autowire) {
            (Some(_), Some(_)) => Err(SunduqError::ConflictingTags {
                bean: bean.to_string(),
                point: self.name.clone(),
            }),
            (Some(expression), None) => Ok(Some(Tag::Value(expression))),
            (None, Some(autowire)) => Ok(Some(Tag::Autowire(autowire))),
            (None, None) => Ok(None),
        }
    }
}

// ═══════════════════════════════════════════
// Binding
// ═══════════════════════════════════════════

/// A type a bean is assignable to, with the cast that produces the view.
#[derive(Clone)]
pub struct Binding {
    key: TypeKey,
    cast: Cast,
}

impl Binding {
    /// The bean as itself: delivers `Arc<T>`.
    pub fn of<T: Send + Sync + 'static>() -> Self {
        Self {
            key: TypeKey::of::<T>(),
            cast: Arc::new(|bean: Bean| {
                bean.downcast::<T>().ok().map(|arc| Box::new(arc) as Value)
            }),
        }
    }

    /// The bean viewed as `I` (usually a trait object): delivers `Arc<I>`.
    pub fn view<T, I>(upcast: fn(Arc<T>) -> Arc<I>) -> Self
    where
        T: Send + Sync + 'static,
        I: ?Sized + Send + Sync + 'static,
    {
        Self {
            key: TypeKey::of::<I>(),
            cast: Arc::new(move |bean: Bean| {
                bean.downcast::<T>()
                    .ok()
                    .map(|arc| Box::new(upcast(arc)) as Value)
            }),
        }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub(crate) fn cast(&self, bean: &Bean) -> Option<Value> {
        (self.cast)(Arc::clone(bean))
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Binding").field(&self.key).finish()
    }
}

// ═══════════════════════════════════════════
// Constructors & factory members
// ═══════════════════════════════════════════

/// How a component is constructed.
#[derive(Clone)]
pub struct ConstructorDescriptor {
    visibility: Visibility,
    params: Vec<InjectionPoint>,
    construct: Construct,
}

impl ConstructorDescriptor {
    /// A public constructor taking `params` in order.
    pub fn new<T: Send + Sync + 'static>(
        params: Vec<InjectionPoint>,
        construct: impl Fn(&mut Args) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            visibility: Visibility::Public,
            params,
            construct: Arc::new(move |args: &mut Args| Ok(Arc::new(construct(args)?) as Bean)),
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn params(&self) -> &[InjectionPoint] {
        &self.params
    }

    pub(crate) fn construct(&self, args: &mut Args) -> Result<Bean> {
        (self.construct)(args)
    }
}

impl fmt::Debug for ConstructorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDescriptor")
            .field("visibility", &self.visibility)
            .field("params", &self.params)
            .finish()
    }
}

/// What a factory member returns.
#[derive(Debug, Clone)]
pub enum ReturnKind {
    Void,
    /// A primitive such as `i32`; never a bean.
    Primitive(&'static str),
    /// A produced type, described by its own descriptor.
    Type(Arc<TypeDescriptor>),
}

/// A bean-producing member of a configuration type.
#[derive(Clone)]
pub struct FactoryMember {
    name: String,
    bean_name: Option<String>,
    visibility: Visibility,
    is_abstract: bool,
    is_final: bool,
    returns: ReturnKind,
    params: Vec<InjectionPoint>,
    init: Option<String>,
    destroy: Option<String>,
    primary: bool,
    order: Option<i32>,
    invoke: Invoke,
}

impl FactoryMember {
    /// A factory member on owner `O` producing `T`.
    ///
    /// The produced type is described by a bare descriptor named after `T`;
    /// use [`returning`](Self::returning) to supply a richer one.
    pub fn new<O, T>(
        name: impl Into<String>,
        params: Vec<InjectionPoint>,
        produce: impl Fn(&O, &mut Args) -> Result<T> + Send + Sync + 'static,
    ) -> Self
    where
        O: Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        let name = name.into();
        let member = name.clone();
        Self {
            name,
            bean_name: None,
            visibility: Visibility::Public,
            is_abstract: false,
            is_final: false,
            returns: ReturnKind::Type(Arc::new(TypeDescriptor::new::<T>(type_name::<T>()))),
            params,
            init: None,
            destroy: None,
            primary: false,
            order: None,
            invoke: Arc::new(move |owner: &Bean, args: &mut Args| {
                let owner = (**owner).downcast_ref::<O>().ok_or_else(|| {
                    SunduqError::TypeMismatch {
                        context: format!("owner of factory member '{member}'"),
                        expected: type_name::<O>(),
                    }
                })?;
                Ok(Arc::new(produce(owner, args)?) as Bean)
            }),
        }
    }

    /// Describes the produced type (its bindings, members and callbacks).
    ///
    /// The descriptor must describe the same `T` the member produces.
    pub fn returning(mut self, produced: TypeDescriptor) -> Self {
        self.returns = ReturnKind::Type(Arc::new(produced));
        self
    }

    pub fn with_return(mut self, returns: ReturnKind) -> Self {
        self.returns = returns;
        self
    }

    /// Explicit bean name instead of the member name.
    pub fn named(mut self, bean_name: impl Into<String>) -> Self {
        self.bean_name = Some(bean_name.into());
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn abstract_member(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn final_member(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// Name of the produced type's callback method run after injection.
    pub fn init_method(mut self, name: impl Into<String>) -> Self {
        self.init = Some(name.into());
        self
    }

    /// Name of the produced type's callback method run on close.
    pub fn destroy_method(mut self, name: impl Into<String>) -> Self {
        self.destroy = Some(name.into());
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bean_name(&self) -> Option<&str> {
        self.bean_name.as_deref()
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn returns(&self) -> &ReturnKind {
        &self.returns
    }

    pub fn params(&self) -> &[InjectionPoint] {
        &self.params
    }

    pub fn init(&self) -> Option<&str> {
        self.init.as_deref()
    }

    pub fn destroy(&self) -> Option<&str> {
        self.destroy.as_deref()
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn order_hint(&self) -> Option<i32> {
        self.order
    }

    pub(crate) fn invoke(&self, owner: &Bean, args: &mut Args) -> Result<Bean> {
        (self.invoke)(owner, args)
    }
}

impl fmt::Debug for FactoryMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryMember")
            .field("name", &self.name)
            .field("bean_name", &self.bean_name)
            .field("returns", &self.returns)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

// ═══════════════════════════════════════════
// Members & callbacks
// ═══════════════════════════════════════════

/// Field or setter-shaped method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Field,
    Method { arity: usize },
}

/// A member that receives an injected value after construction.
#[derive(Clone)]
pub struct MemberDescriptor {
    name: String,
    kind: MemberKind,
    is_static: bool,
    is_final: bool,
    point: InjectionPoint,
    assign: Assign,
}

impl MemberDescriptor {
    /// A field of `O` receiving a `V`.
    ///
    /// The injection point's name is the member name.
    pub fn field<O, V>(point: InjectionPoint, assign: impl Fn(&O, V) + Send + Sync + 'static) -> Self
    where
        O: Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        Self::build(MemberKind::Field, point, move |owner: &O, value: V| {
            assign(owner, value);
            Ok(())
        })
    }

    /// A one-argument setter of `O` receiving a `V`.
    pub fn setter<O, V>(
        point: InjectionPoint,
        assign: impl Fn(&O, V) -> Result<()> + Send + Sync + 'static,
    ) -> Self
    where
        O: Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        Self::build(MemberKind::Method { arity: 1 }, point, assign)
    }

    /// A method with an explicit parameter count.
    pub fn method<O, V>(
        point: InjectionPoint,
        arity: usize,
        assign: impl Fn(&O, V) -> Result<()> + Send + Sync + 'static,
    ) -> Self
    where
        O: Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        Self::build(MemberKind::Method { arity }, point, assign)
    }

    fn build<O, V>(
        kind: MemberKind,
        point: InjectionPoint,
        assign: impl Fn(&O, V) -> Result<()> + Send + Sync + 'static,
    ) -> Self
    where
        O: Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        let member = point.name().to_string();
        Self {
            name: member.clone(),
            kind,
            is_static: false,
            is_final: false,
            point,
            assign: Arc::new(move |owner: &(dyn Any + Send + Sync), value: Value| {
                let owner = owner.downcast_ref::<O>().ok_or_else(|| SunduqError::TypeMismatch {
                    context: format!("owner of member '{member}'"),
                    expected: type_name::<O>(),
                })?;
                let value = value.downcast::<V>().map_err(|_| SunduqError::TypeMismatch {
                    context: format!("value for member '{member}'"),
                    expected: type_name::<V>(),
                })?;
                assign(owner, *value)
            }),
        }
    }

    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn final_member(mut self) -> Self {
        self.is_final = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn point(&self) -> &InjectionPoint {
        &self.point
    }

    pub(crate) fn assign(&self, owner: &(dyn Any + Send + Sync), value: Value) -> Result<()> {
        (self.assign)(owner, value)
    }
}

impl fmt::Debug for MemberDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("static", &self.is_static)
            .field("final", &self.is_final)
            .field("point", &self.point)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackKind {
    PostConstruct,
    PreDestroy,
    /// Untagged; reachable by name from a factory member's init/destroy.
    Plain,
}

/// A zero-argument method invoked around a bean's life.
#[derive(Clone)]
pub struct CallbackMethod {
    name: String,
    kind: CallbackKind,
    arity: usize,
    call: Call,
}

impl CallbackMethod {
    pub fn new<O: Send + Sync + 'static>(
        name: impl Into<String>,
        kind: CallbackKind,
        call: impl Fn(&O) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        let name = name.into();
        let method = name.clone();
        Self {
            name,
            kind,
            arity: 0,
            call: Arc::new(move |owner: &(dyn Any + Send + Sync)| {
                let owner = owner.downcast_ref::<O>().ok_or_else(|| SunduqError::TypeMismatch {
                    context: format!("owner of callback '{method}'"),
                    expected: type_name::<O>(),
                })?;
                call(owner)
            }),
        }
    }

    pub fn post_construct<O: Send + Sync + 'static>(
        name: impl Into<String>,
        call: impl Fn(&O) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, CallbackKind::PostConstruct, call)
    }

    pub fn pre_destroy<O: Send + Sync + 'static>(
        name: impl Into<String>,
        call: impl Fn(&O) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, CallbackKind::PreDestroy, call)
    }

    /// Declares how many parameters the method takes. Callbacks must take none.
    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = arity;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> CallbackKind {
        self.kind
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub(crate) fn call(&self, owner: &(dyn Any + Send + Sync)) -> Result<()> {
        (self.call)(owner)
    }
}

impl fmt::Debug for CallbackMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackMethod")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("arity", &self.arity)
            .finish()
    }
}

// ═══════════════════════════════════════════
// Ancestors
// ═══════════════════════════════════════════

/// Reaches the embedded ancestor value inside a descendant value.
trait Projection: Send + Sync {
    fn project<'a>(&self, value: &'a (dyn Any + Send + Sync)) -> Option<&'a (dyn Any + Send + Sync)>;
}

struct FieldProjection<T, P> {
    project: fn(&T) -> &P,
}

impl<T, P> Projection for FieldProjection<T, P>
where
    T: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    fn project<'a>(&self, value: &'a (dyn Any + Send + Sync)) -> Option<&'a (dyn Any + Send + Sync)> {
        let owner = value.downcast_ref::<T>()?;
        let parent: &(dyn Any + Send + Sync) = (self.project)(owner);
        Some(parent)
    }
}

#[derive(Clone)]
struct Ancestor {
    descriptor: Arc<TypeDescriptor>,
    projection: Arc<dyn Projection>,
}

/// An injectable member of a type or of one of its ancestors.
#[derive(Clone)]
pub struct InjectableMember {
    declaring_type: String,
    member: Arc<MemberDescriptor>,
    path: Vec<Arc<dyn Projection>>,
}

impl InjectableMember {
    /// Qualified name of the type that declares the member.
    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    pub fn member(&self) -> &MemberDescriptor {
        &self.member
    }

    /// Follows the ancestor projections from the bean to the declaring value.
    pub(crate) fn reach<'a>(
        &self,
        bean: &'a (dyn Any + Send + Sync),
    ) -> Option<&'a (dyn Any + Send + Sync)> {
        self.path
            .iter()
            .try_fold(bean, |value, projection| projection.project(value))
    }
}

impl fmt::Debug for InjectableMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectableMember")
            .field("declaring_type", &self.declaring_type)
            .field("member", &self.member.name())
            .field("depth", &self.path.len())
            .finish()
    }
}

// ═══════════════════════════════════════════
// TypeDescriptor
// ═══════════════════════════════════════════

/// Everything the container knows about one type.
pub struct TypeDescriptor {
    name: String,
    key: TypeKey,
    tags: TypeTags,
    constructors: Vec<ConstructorDescriptor>,
    members: Vec<Arc<MemberDescriptor>>,
    callbacks: Vec<CallbackMethod>,
    factories: Vec<FactoryMember>,
    bindings: Vec<Binding>,
    ancestor: Option<Ancestor>,
    injectable: OnceCell<Vec<InjectableMember>>,
}

impl TypeDescriptor {
    /// Describes `T` under a dotted qualified name. `T` is bound to itself.
    pub fn new<T: Send + Sync + 'static>(qualified_name: impl Into<String>) -> Self {
        Self {
            name: qualified_name.into(),
            key: TypeKey::of::<T>(),
            tags: TypeTags::default(),
            constructors: Vec::new(),
            members: Vec::new(),
            callbacks: Vec::new(),
            factories: Vec::new(),
            bindings: vec![Binding::of::<T>()],
            ancestor: None,
            injectable: OnceCell::new(),
        }
    }

    // ── Tags ──

    pub fn component(mut self) -> Self {
        self.tags.component = true;
        self
    }

    /// Explicit bean name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.tags.name = Some(name.into());
        self
    }

    /// Configuration types are components whose factory members emit beans.
    pub fn configuration(mut self) -> Self {
        self.tags.component = true;
        self.tags.configuration = true;
        self
    }

    pub fn primary(mut self) -> Self {
        self.tags.primary = true;
        self
    }

    pub fn order(mut self, order: i32) -> Self {
        self.tags.order = Some(order);
        self
    }

    /// Namespaces to scan; an empty list scans the type's own namespace.
    pub fn component_scan<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.component_scan = Some(namespaces.into_iter().map(Into::into).collect());
        self
    }

    pub fn import<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.imports.extend(types.into_iter().map(Into::into));
        self
    }

    // ── Structure ──

    pub fn constructor(mut self, constructor: ConstructorDescriptor) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn member(mut self, member: MemberDescriptor) -> Self {
        self.members.push(Arc::new(member));
        self
    }

    pub fn callback(mut self, callback: CallbackMethod) -> Self {
        self.callbacks.push(callback);
        self
    }

    pub fn factory(mut self, factory: FactoryMember) -> Self {
        self.factories.push(factory);
        self
    }

    /// Makes the described type `T` assignable to `I` through `upcast`.
    pub fn implements<T, I>(mut self, upcast: fn(Arc<T>) -> Arc<I>) -> Self
    where
        T: Send + Sync + 'static,
        I: ?Sized + Send + Sync + 'static,
    {
        self.bindings.push(Binding::view(upcast));
        self
    }

    /// Declares `parent` as the ancestor of the described type `T`, embedded
    /// in it and reached through `project`.
    ///
    /// The ancestor's injectable members are injected into every descendant.
    pub fn extends<T, P>(mut self, parent: impl Into<Arc<TypeDescriptor>>, project: fn(&T) -> &P) -> Self
    where
        T: Send + Sync + 'static,
        P: Send + Sync + 'static,
    {
        self.ancestor = Some(Ancestor {
            descriptor: parent.into(),
            projection: Arc::new(FieldProjection { project }),
        });
        self
    }

    // ── Accessors ──

    /// The dotted qualified name, e.g. `shop.order.OrderService`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn tags(&self) -> &TypeTags {
        &self.tags
    }

    pub fn constructors(&self) -> &[ConstructorDescriptor] {
        &self.constructors
    }

    pub fn callbacks(&self) -> &[CallbackMethod] {
        &self.callbacks
    }

    pub fn factories(&self) -> &[FactoryMember] {
        &self.factories
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// The ancestor descriptor, if any.
    pub fn parent(&self) -> Option<&Arc<TypeDescriptor>> {
        self.ancestor.as_ref().map(|a| &a.descriptor)
    }

    /// True if a bean of this type can be delivered as `requested`.
    pub fn is_assignable_to(&self, requested: TypeKey) -> bool {
        self.bindings.iter().any(|b| b.key() == requested)
    }

    /// Casts a bean of this type to the `requested` view.
    pub(crate) fn view(&self, bean: &Bean, requested: TypeKey) -> Option<Value> {
        self.bindings
            .iter()
            .find(|b| b.key() == requested)
            .and_then(|b| b.cast(bean))
    }

    /// Own members first, then each ancestor's, outermost last.
    ///
    /// Computed once and cached.
    pub fn injectable_members(&self) -> &[InjectableMember] {
        self.injectable.get_or_init(|| {
            let mut flattened: Vec<InjectableMember> = self
                .members
                .iter()
                .map(|member| InjectableMember {
                    declaring_type: self.name.clone(),
                    member: Arc::clone(member),
                    path: Vec::new(),
                })
                .collect();

            if let Some(ref ancestor) = self.ancestor {
                for inherited in ancestor.descriptor.injectable_members() {
                    let mut path = Vec::with_capacity(inherited.path.len() + 1);
                    path.push(Arc::clone(&ancestor.projection));
                    path.extend(inherited.path.iter().cloned());
                    flattened.push(InjectableMember {
                        declaring_type: inherited.declaring_type.clone(),
                        member: Arc::clone(&inherited.member),
                        path,
                    });
                }
            }

            flattened
        })
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("tags", &self.tags)
            .field("constructors", &self.constructors.len())
            .field("members", &self.members.len())
            .field("factories", &self.factories.len())
            .field("parent", &self.parent().map(|p| p.name()))
            .finish()
    }
}
