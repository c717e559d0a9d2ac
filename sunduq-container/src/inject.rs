//! Member injection: filling tagged fields and setters after construction.
//!
//! Members are visited in the order of
//! [`TypeDescriptor::injectable_members`](crate::descriptor::TypeDescriptor::injectable_members):
//! the bean's own members first, then each ancestor's.

use tracing::{debug, trace, warn};

use crate::bean::{Bean, Value};
use crate::definition::BeanDefinition;
use crate::descriptor::{Autowire, InjectableMember, InjectionPoint, MemberKind, Tag};
use crate::error::{Result, SunduqError};

/// Where injected values come from.
///
/// Implemented by the application context; separate so the injector can be
/// exercised on its own.
pub trait DependencySource {
    /// The property value of a `value` point, converted to the point's target type.
    fn value(&self, requester: &str, point: &InjectionPoint, expression: &str) -> Result<Value>;

    /// The bean for an `autowire` point, viewed as the point's target type.
    ///
    /// `Ok(None)` only for non-required points that found nothing.
    fn autowired(&self, requester: &str, point: &InjectionPoint, autowire: &Autowire) -> Result<Option<Value>>;
}

/// Injects the tagged members of built beans.
pub struct MemberInjector<'a, S: DependencySource + ?Sized> {
    source: &'a S,
}

impl<'a, S: DependencySource + ?Sized> MemberInjector<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Injects every tagged member of `bean`, built from `definition`.
    ///
    /// Returns the number of members assigned.
    pub fn inject(&self, definition: &BeanDefinition, bean: &Bean) -> Result<usize> {
        let mut injected = 0;

        for member in definition.descriptor().injectable_members() {
            let point = member.member().point();
            if point.value_expression().is_none() && point.autowire_tag().is_none() {
                continue;
            }

            check_member(definition.name(), member)?;
            if self.inject_member(definition.name(), bean, member)? {
                injected += 1;
            }
        }

        if injected > 0 {
            debug!(bean = definition.name(), members = injected, "Injected members");
        }
        Ok(injected)
    }

    fn inject_member(&self, bean_name: &str, bean: &Bean, member: &InjectableMember) -> Result<bool> {
        let point = member.member().point();
        let value = match point.tag(bean_name)? {
            Some(Tag::Value(expression)) => Some(self.source.value(bean_name, point, expression)?),
            Some(Tag::Autowire(autowire)) => self.source.autowired(bean_name, point, autowire)?,
            None => None,
        };

        let Some(value) = value else {
            trace!(bean = bean_name, member = member.member().name(), "Optional dependency absent, skipped");
            return Ok(false);
        };

        let target = member.reach(&**bean).ok_or_else(|| SunduqError::TypeMismatch {
            context: format!("declaring type of member '{}' of bean '{bean_name}'", member.member().name()),
            expected: "an embedded ancestor value",
        })?;
        member.member().assign(target, value)?;

        trace!(
            bean = bean_name,
            declaring_type = member.declaring_type(),
            member = member.member().name(),
            "Member injected"
        );
        Ok(true)
    }
}

/// Rejects static members, final fields and methods that are not setters.
fn check_member(bean_name: &str, member: &InjectableMember) -> Result<()> {
    let descriptor = member.member();
    let location = || {
        (
            bean_name.to_string(),
            member.declaring_type().to_string(),
            descriptor.name().to_string(),
        )
    };

    if descriptor.is_static() {
        let (bean, declaring_type, member) = location();
        return Err(SunduqError::StaticMember {
            bean,
            declaring_type,
            member,
        });
    }

    match descriptor.kind() {
        MemberKind::Field if descriptor.is_final() => {
            let (bean, declaring_type, member) = location();
            Err(SunduqError::FinalField {
                bean,
                declaring_type,
                member,
            })
        }
        MemberKind::Method { arity } => {
            if descriptor.is_final() {
                warn!(
                    bean = bean_name,
                    declaring_type = member.declaring_type(),
                    member = descriptor.name(),
                    "Injecting a final method; it is not overridable and may be bypassed"
                );
            }
            if arity == 0 {
                let (bean, declaring_type, member) = location();
                return Err(SunduqError::NonSetter {
                    bean,
                    declaring_type,
                    member,
                });
            }
            Ok(())
        }
        MemberKind::Field => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::bean::Slot;
    use crate::descriptor::{ConstructorDescriptor, MemberDescriptor, TypeDescriptor};
    use crate::error::NotFoundError;

    struct Clock;

    #[derive(Default)]
    struct Base {
        zone: Slot<String>,
    }

    #[derive(Default)]
    struct Service {
        base: Base,
        port: Slot<u16>,
        clock: Slot<Arc<Clock>>,
        audit: Slot<Arc<Clock>>,
    }

    /// Hands out fixed values and records what was asked for.
    struct MockSource {
        requests: Mutex<Vec<String>>,
    }

    impl MockSource {
        fn new() -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl DependencySource for MockSource {
        fn value(&self, _requester: &str, point: &InjectionPoint, expression: &str) -> Result<Value> {
            self.requests.lock().push(expression.to_string());
            Ok(match point.name() {
                "port" => Box::new(8080u16),
                _ => Box::new(String::from("UTC")),
            })
        }

        fn autowired(&self, requester: &str, point: &InjectionPoint, autowire: &Autowire) -> Result<Option<Value>> {
            self.requests.lock().push(point.name().to_string());
            match autowire.name.as_deref() {
                Some("clock") => Ok(Some(Box::new(Arc::new(Clock)))),
                _ if !autowire.required => Ok(None),
                other => Err(SunduqError::DependencyNotFound(NotFoundError {
                    requested: other.unwrap_or("?").to_string(),
                    required_by: Some(requester.to_string()),
                    suggestions: vec![],
                })),
            }
        }
    }

    fn base_descriptor() -> TypeDescriptor {
        TypeDescriptor::new::<Base>("shop.Base").member(MemberDescriptor::field(
            InjectionPoint::value::<String>("zone", "${zone:UTC}"),
            |base: &Base, zone: String| {
                base.zone.set(zone);
            },
        ))
    }

    fn service_descriptor() -> TypeDescriptor {
        TypeDescriptor::new::<Service>("shop.Service")
            .component()
            .constructor(ConstructorDescriptor::new::<Service>(vec![], |_| Ok(Service::default())))
            .member(MemberDescriptor::field(
                InjectionPoint::value::<u16>("port", "${port}"),
                |svc: &Service, port: u16| {
                    svc.port.set(port);
                },
            ))
            .member(MemberDescriptor::setter(
                InjectionPoint::autowire_named::<Clock>("clock", "clock"),
                |svc: &Service, clock: Arc<Clock>| {
                    svc.clock.set(clock);
                    Ok(())
                },
            ))
            .member(MemberDescriptor::setter(
                InjectionPoint::autowire_named::<Clock>("audit", "auditClock").optional(),
                |svc: &Service, clock: Arc<Clock>| {
                    svc.audit.set(clock);
                    Ok(())
                },
            ))
            .member(MemberDescriptor::field(
                InjectionPoint::untagged::<u16>("untouched"),
                |_: &Service, _: u16| {},
            ))
            .extends(base_descriptor(), |svc: &Service| &svc.base)
    }

    fn definition(descriptor: TypeDescriptor) -> BeanDefinition {
        let descriptor = Arc::new(descriptor);
        let constructor = descriptor.constructors()[0].clone();
        BeanDefinition::from_constructor("service", descriptor, constructor)
    }

    #[test]
    fn injects_own_and_inherited_members() {
        let source = MockSource::new();
        let def = definition(service_descriptor());
        let bean: Bean = Arc::new(Service::default());

        let injected = MemberInjector::new(&source).inject(&def, &bean).unwrap();

        assert_eq!(injected, 3);
        let svc = bean.downcast::<Service>().unwrap();
        assert_eq!(svc.port.get(), Some(&8080));
        assert!(svc.clock.get().is_some());
        assert!(svc.audit.get().is_none());
        assert_eq!(svc.base.zone.get().map(String::as_str), Some("UTC"));
        assert_eq!(
            *source.requests.lock(),
            vec!["${port}", "clock", "audit", "${zone:UTC}"]
        );
    }

    #[test]
    fn static_member_rejected() {
        let descriptor = TypeDescriptor::new::<Service>("shop.Service").member(
            MemberDescriptor::field(InjectionPoint::value::<u16>("port", "${port}"), |_: &Service, _: u16| {})
                .static_member(),
        );

        match MemberInjector::new(&MockSource::new()).inject(&definition_without_ctor(descriptor), &service()) {
            Err(SunduqError::StaticMember { bean, declaring_type, member }) => {
                assert_eq!(bean, "service");
                assert_eq!(declaring_type, "shop.Service");
                assert_eq!(member, "port");
            }
            other => panic!("Expected StaticMember, got: {other:?}"),
        }
    }

    #[test]
    fn final_field_rejected() {
        let descriptor = TypeDescriptor::new::<Service>("shop.Service").member(
            MemberDescriptor::field(InjectionPoint::value::<u16>("port", "${port}"), |_: &Service, _: u16| {})
                .final_member(),
        );

        assert!(matches!(
            MemberInjector::new(&MockSource::new()).inject(&definition_without_ctor(descriptor), &service()),
            Err(SunduqError::FinalField { .. })
        ));
    }

    #[test]
    fn final_method_only_warns() {
        let descriptor = TypeDescriptor::new::<Service>("shop.Service").member(
            MemberDescriptor::setter(InjectionPoint::value::<u16>("port", "${port}"), |svc: &Service, port: u16| {
                svc.port.set(port);
                Ok(())
            })
            .final_member(),
        );

        let injected = MemberInjector::new(&MockSource::new())
            .inject(&definition_without_ctor(descriptor), &service())
            .unwrap();
        assert_eq!(injected, 1);
    }

    #[test]
    fn zero_arity_method_is_not_a_setter() {
        let descriptor = TypeDescriptor::new::<Service>("shop.Service").member(MemberDescriptor::method(
            InjectionPoint::value::<u16>("refresh", "${port}"),
            0,
            |_: &Service, _: u16| Ok(()),
        ));

        assert!(matches!(
            MemberInjector::new(&MockSource::new()).inject(&definition_without_ctor(descriptor), &service()),
            Err(SunduqError::NonSetter { .. })
        ));
    }

    #[test]
    fn both_tags_rejected() {
        let descriptor = TypeDescriptor::new::<Service>("shop.Service").member(MemberDescriptor::field(
            InjectionPoint::value::<u16>("port", "${port}").with_autowire(Autowire {
                name: None,
                required: true,
            }),
            |_: &Service, _: u16| {},
        ));

        assert!(matches!(
            MemberInjector::new(&MockSource::new()).inject(&definition_without_ctor(descriptor), &service()),
            Err(SunduqError::ConflictingTags { .. })
        ));
    }

    #[test]
    fn required_dependency_missing() {
        let descriptor = TypeDescriptor::new::<Service>("shop.Service").member(MemberDescriptor::setter(
            InjectionPoint::autowire_named::<Clock>("audit", "auditClock"),
            |_: &Service, _: Arc<Clock>| Ok(()),
        ));

        match MemberInjector::new(&MockSource::new()).inject(&definition_without_ctor(descriptor), &service()) {
            Err(SunduqError::DependencyNotFound(err)) => {
                assert_eq!(err.requested, "auditClock");
                assert_eq!(err.required_by.as_deref(), Some("service"));
            }
            other => panic!("Expected DependencyNotFound, got: {other:?}"),
        }
    }

    fn service() -> Bean {
        Arc::new(Service::default())
    }

    fn definition_without_ctor(descriptor: TypeDescriptor) -> BeanDefinition {
        definition(descriptor.constructor(ConstructorDescriptor::new::<Service>(vec![], |_| Ok(Service::default()))))
    }
}
