//! # Declarations
//!
//! A [`Declaration`] is what callers hand to the container: an already-built value, or a
//! factory closure. Factories are plain Rust closures whose parameters are `Arc<T>`s; the
//! parameter types are the factory's inputs and its return type is its output, so the
//! dependency graph falls out of the signatures at compile time.
//!
//! ```rust
//! use std::sync::Arc;
//! use wiring::Declaration;
//!
//! struct Config { url: String }
//! struct Pool { url: String }
//! struct Repo { pool: Arc<Pool> }
//!
//! let declarations = [
//!     Declaration::value(Config { url: "db://local".into() }),
//!     Declaration::factory(|c: Arc<Config>| Pool { url: c.url.clone() }).into(),
//!     Declaration::factory(|pool: Arc<Pool>| Repo { pool }).into(),
//! ];
//! assert_eq!(declarations.len(), 3);
//! ```
//!
//! Outputs that need starting and stopping are marked at registration with
//! [`FactoryDecl::service`] or [`FactoryDecl::context_service`]. A factory returning a
//! tuple provides each element separately, and [`TupleDecl`] marks the elements that are
//! services by type.

use crate::error::{BoxError, ContainerError};
use crate::identity::Identity;
use crate::registry::{Registry, Value};
use crate::service::{ContextService, Lifecycle, Service};
use std::sync::Arc;

/// A factory parameter that the container can supply.
pub trait Inject: Sized + Send + 'static {
    fn identity() -> Identity;
    fn resolve(registry: &Registry) -> Result<Self, ContainerError>;
}

impl<T: Send + Sync + 'static> Inject for Arc<T> {
    fn identity() -> Identity {
        Identity::of::<T>()
    }

    fn resolve(registry: &Registry) -> Result<Self, ContainerError> {
        registry.resolve::<T>()
    }
}

/// Closures whose every parameter is [`Inject`].
///
/// `Args` is the tuple of parameter types; it only exists to keep the impls for different
/// arities apart.
pub trait Constructor<Args>: Send + Sync + 'static {
    type Output;

    fn inputs() -> Vec<Identity>;

    fn construct(&self, registry: &Registry) -> Result<Self::Output, ContainerError>;
}

macro_rules! impl_constructor {
    ($($arg:ident),*) => {
        paste::paste! {
            impl<Func, Out, $($arg,)*> Constructor<($($arg,)*)> for Func
            where
                Func: Fn($($arg),*) -> Out + Send + Sync + 'static,
                $($arg: Inject,)*
            {
                type Output = Out;

                fn inputs() -> Vec<Identity> {
                    vec![$(<$arg as Inject>::identity()),*]
                }

                #[allow(unused_variables)]
                fn construct(&self, registry: &Registry) -> Result<Out, ContainerError> {
                    $(let [<$arg:lower>] = <$arg as Inject>::resolve(registry)?;)*
                    Ok((self)($([<$arg:lower>]),*))
                }
            }
        }
    };
}

impl_constructor!();
impl_constructor!(A);
impl_constructor!(A, B);
impl_constructor!(A, B, C);
impl_constructor!(A, B, C, D);
impl_constructor!(A, B, C, D, E);
impl_constructor!(A, B, C, D, E, F);
impl_constructor!(A, B, C, D, E, F, G);
impl_constructor!(A, B, C, D, E, F, G, H);

type Probe = fn(&Value) -> Option<Lifecycle>;
type Call<T> = Box<dyn Fn(&Registry) -> Result<T, ContainerError> + Send + Sync>;

fn probe_service<T: Service>(value: &Value) -> Option<Lifecycle> {
    let service: Arc<T> = value.clone().downcast::<T>().ok()?;
    Some(Lifecycle::Plain(service as Arc<dyn Service>))
}

fn probe_context_service<T: ContextService>(value: &Value) -> Option<Lifecycle> {
    let service: Arc<T> = value.clone().downcast::<T>().ok()?;
    Some(Lifecycle::Contextual(service as Arc<dyn ContextService>))
}

/// Tuples a factory can return to provide several values from one call.
pub trait Outputs: Send + Sync + 'static {
    fn identities() -> Vec<Identity>;

    fn into_values(self) -> Vec<Value>;
}

macro_rules! impl_outputs {
    ($($out:ident),+) => {
        paste::paste! {
            impl<$($out,)+> Outputs for ($($out,)+)
            where
                $($out: Send + Sync + 'static,)+
            {
                fn identities() -> Vec<Identity> {
                    vec![$(Identity::of::<$out>()),+]
                }

                fn into_values(self) -> Vec<Value> {
                    let ($([<$out:lower>],)+) = self;
                    vec![$(Arc::new([<$out:lower>]) as Value),+]
                }
            }
        }
    };
}

impl_outputs!(A, B);
impl_outputs!(A, B, C);
impl_outputs!(A, B, C, D);
impl_outputs!(A, B, C, D, E);
impl_outputs!(A, B, C, D, E, F);

/// One value a factory produces.
pub struct Output {
    identity: Identity,
    probe: Option<Probe>,
}

impl Output {
    fn plain(identity: Identity) -> Self {
        Self {
            identity,
            probe: None,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The lifecycle handle for `value`, when this output was registered as a service.
    pub(crate) fn lifecycle(&self, value: &Value) -> Option<Lifecycle> {
        self.probe.and_then(|probe| probe(value))
    }
}

/// A registered factory with its inputs and outputs spelled out.
pub struct Factory {
    name: &'static str,
    inputs: Vec<Identity>,
    outputs: Vec<Output>,
    strays: Vec<Identity>,
    call: Call<Vec<Value>>,
}

impl Factory {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn inputs(&self) -> &[Identity] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// Types marked as services that the factory does not return.
    pub(crate) fn strays(&self) -> &[Identity] {
        &self.strays
    }

    /// Resolves the inputs and runs the closure; values come back in `outputs()` order.
    pub(crate) fn call(&self, registry: &Registry) -> Result<Vec<Value>, ContainerError> {
        (self.call)(registry)
    }
}

pub(crate) enum Kind {
    Value { identity: Identity, value: Value },
    Factory(Arc<Factory>),
}

/// A value or factory waiting to be registered.
pub struct Declaration {
    pub(crate) kind: Kind,
}

impl Declaration {
    /// An already-constructed value.
    pub fn value<T: Send + Sync + 'static>(value: T) -> Self {
        Self::shared(Arc::new(value))
    }

    /// An already-constructed value the caller keeps a handle to.
    pub fn shared<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        Declaration {
            kind: Kind::Value {
                identity: Identity::of::<T>(),
                value,
            },
        }
    }

    /// A factory that cannot fail.
    ///
    /// The output is keyed by the closure's return type as written, so a closure returning
    /// `Arc<Pool>` provides `Arc<Pool>` and not `Pool`. Use
    /// [`shared_factory`](Self::shared_factory) for that.
    pub fn factory<Args, C>(ctor: C) -> FactoryDecl<C::Output>
    where
        C: Constructor<Args>,
        C::Output: Send + Sync + 'static,
    {
        FactoryDecl {
            name: std::any::type_name::<C>(),
            inputs: C::inputs(),
            call: Box::new(move |registry: &Registry| ctor.construct(registry).map(Arc::new)),
        }
    }

    /// A factory returning `Arc<T>`; the output is `T`, stored without another `Arc`.
    pub fn shared_factory<Args, C, T>(ctor: C) -> FactoryDecl<T>
    where
        C: Constructor<Args, Output = Arc<T>>,
        T: Send + Sync + 'static,
    {
        FactoryDecl {
            name: std::any::type_name::<C>(),
            inputs: C::inputs(),
            call: Box::new(move |registry: &Registry| ctor.construct(registry)),
        }
    }

    /// A factory returning `Result`; an `Err` aborts the build.
    pub fn try_factory<Args, C, T, E>(ctor: C) -> FactoryDecl<T>
    where
        C: Constructor<Args, Output = Result<T, E>>,
        T: Send + Sync + 'static,
        E: Into<BoxError>,
    {
        FactoryDecl {
            name: std::any::type_name::<C>(),
            inputs: C::inputs(),
            call: Box::new(move |registry: &Registry| {
                ctor.construct(registry)?
                    .map(Arc::new)
                    .map_err(|e| ContainerError::Factory(e.into()))
            }),
        }
    }

    /// A factory producing every element of a tuple from a single call.
    pub fn factory_tuple<Args, C>(ctor: C) -> TupleDecl
    where
        C: Constructor<Args>,
        C::Output: Outputs,
    {
        TupleDecl::new(
            std::any::type_name::<C>(),
            C::inputs(),
            <C::Output as Outputs>::identities(),
            Box::new(move |registry: &Registry| Ok(ctor.construct(registry)?.into_values())),
        )
    }

    /// Like [`factory_tuple`](Self::factory_tuple), for closures returning
    /// `Result<(A, B, ..), E>`.
    pub fn try_factory_tuple<Args, C, T, E>(ctor: C) -> TupleDecl
    where
        C: Constructor<Args, Output = Result<T, E>>,
        T: Outputs,
        E: Into<BoxError>,
    {
        TupleDecl::new(
            std::any::type_name::<C>(),
            C::inputs(),
            T::identities(),
            Box::new(move |registry: &Registry| {
                ctor.construct(registry)?
                    .map(T::into_values)
                    .map_err(|e| ContainerError::Factory(e.into()))
            }),
        )
    }

    /// A closure run for its effect. It has no output type, so it is keyed by an
    /// anonymous identity unique to this declaration.
    pub fn task<Args, C>(ctor: C) -> Self
    where
        C: Constructor<Args, Output = ()>,
    {
        Self::effect(
            move |registry: &Registry| ctor.construct(registry),
            C::inputs(),
            std::any::type_name::<C>(),
        )
    }

    /// Like [`task`](Self::task), for closures returning `Result<(), E>`.
    pub fn fallible_task<Args, C, E>(ctor: C) -> Self
    where
        C: Constructor<Args, Output = Result<(), E>>,
        E: Into<BoxError>,
    {
        Self::effect(
            move |registry: &Registry| {
                ctor.construct(registry)?
                    .map_err(|e| ContainerError::Factory(e.into()))
            },
            C::inputs(),
            std::any::type_name::<C>(),
        )
    }

    fn effect<F>(run: F, inputs: Vec<Identity>, name: &'static str) -> Self
    where
        F: Fn(&Registry) -> Result<(), ContainerError> + Send + Sync + 'static,
    {
        Self::from_factory(Factory {
            name,
            inputs,
            outputs: vec![Output::plain(Identity::anonymous(name))],
            strays: Vec::new(),
            call: Box::new(move |registry: &Registry| {
                run(registry)?;
                Ok(vec![Arc::new(()) as Value])
            }),
        })
    }

    fn from_factory(factory: Factory) -> Self {
        Declaration {
            kind: Kind::Factory(Arc::new(factory)),
        }
    }

    /// The identity this declaration is looked up by: the value's type, or the factory's
    /// first output.
    pub fn identity(&self) -> &Identity {
        match &self.kind {
            Kind::Value { identity, .. } => identity,
            Kind::Factory(factory) => &factory.outputs[0].identity,
        }
    }
}

/// A single-output factory, not yet turned into a [`Declaration`].
///
/// Converting it directly registers a plain value; [`service`](Self::service) and
/// [`context_service`](Self::context_service) additionally mark the output for starting.
pub struct FactoryDecl<T> {
    name: &'static str,
    inputs: Vec<Identity>,
    call: Call<Arc<T>>,
}

impl<T: Send + Sync + 'static> FactoryDecl<T> {
    /// Start the output with [`Service::up`] once it is built.
    pub fn service(self) -> Declaration
    where
        T: Service,
    {
        self.finish(Some(probe_service::<T> as Probe))
    }

    /// Start the output with [`ContextService::up`] once it is built.
    pub fn context_service(self) -> Declaration
    where
        T: ContextService,
    {
        self.finish(Some(probe_context_service::<T> as Probe))
    }

    fn finish(self, probe: Option<Probe>) -> Declaration {
        let call = self.call;
        Declaration::from_factory(Factory {
            name: self.name,
            inputs: self.inputs,
            outputs: vec![Output {
                identity: Identity::of::<T>(),
                probe,
            }],
            strays: Vec::new(),
            call: Box::new(move |registry: &Registry| Ok(vec![call(registry)? as Value])),
        })
    }
}

impl<T: Send + Sync + 'static> From<FactoryDecl<T>> for Declaration {
    fn from(decl: FactoryDecl<T>) -> Self {
        decl.finish(None)
    }
}

/// A multi-output factory, not yet turned into a [`Declaration`].
///
/// Every tuple element is registered as a plain value unless it is picked out by type
/// with [`service`](Self::service) or [`context_service`](Self::context_service). Naming a
/// type the tuple does not contain makes registration fail with
/// [`ContainerError::NotAnOutput`].
pub struct TupleDecl {
    name: &'static str,
    inputs: Vec<Identity>,
    outputs: Vec<Output>,
    strays: Vec<Identity>,
    call: Call<Vec<Value>>,
}

impl TupleDecl {
    fn new(
        name: &'static str,
        inputs: Vec<Identity>,
        identities: Vec<Identity>,
        call: Call<Vec<Value>>,
    ) -> Self {
        Self {
            name,
            inputs,
            outputs: identities.into_iter().map(Output::plain).collect(),
            strays: Vec::new(),
            call,
        }
    }

    /// Start the `S` element with [`Service::up`] once it is built.
    pub fn service<S: Service>(self) -> Self {
        self.mark(Identity::of::<S>(), probe_service::<S>)
    }

    /// Start the `S` element with [`ContextService::up`] once it is built.
    pub fn context_service<S: ContextService>(self) -> Self {
        self.mark(Identity::of::<S>(), probe_context_service::<S>)
    }

    fn mark(mut self, identity: Identity, probe: Probe) -> Self {
        match self.outputs.iter_mut().find(|o| o.identity == identity) {
            Some(output) => output.probe = Some(probe),
            None => self.strays.push(identity),
        }
        self
    }
}

impl From<TupleDecl> for Declaration {
    fn from(decl: TupleDecl) -> Self {
        Declaration::from_factory(Factory {
            name: decl.name,
            inputs: decl.inputs,
            outputs: decl.outputs,
            strays: decl.strays,
            call: decl.call,
        })
    }
}

/// An ordered list of declarations, built up by plugins before registration.
#[derive(Default)]
pub struct Modules(Vec<Declaration>);

impl Modules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, declaration: impl Into<Declaration>) -> Self {
        self.0.push(declaration.into());
        self
    }

    pub fn extend(mut self, other: Modules) -> Self {
        self.0.extend(other.0);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for Modules {
    type Item = Declaration;
    type IntoIter = std::vec::IntoIter<Declaration>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Journal, MockService};
    use crate::registry::{Stored, Tag};

    struct Host(String);
    struct Port(u16);
    struct Addr(String);

    fn registry_with(host: &str, port: u16) -> Registry {
        let registry = Registry::new();
        registry
            .add(
                Identity::of::<Host>(),
                Stored::Value(Arc::new(Host(host.into()))),
                Tag::Existing,
            )
            .unwrap();
        registry
            .add(
                Identity::of::<Port>(),
                Stored::Value(Arc::new(Port(port))),
                Tag::Existing,
            )
            .unwrap();
        registry
    }

    fn factory_of(decl: &Declaration) -> &Factory {
        match &decl.kind {
            Kind::Factory(factory) => factory,
            Kind::Value { .. } => panic!("expected a factory"),
        }
    }

    #[test]
    fn test_inputs_follow_parameter_types() {
        let decl: Declaration =
            Declaration::factory(|h: Arc<Host>, p: Arc<Port>| Addr(format!("{}:{}", h.0, p.0)))
                .into();
        let factory = factory_of(&decl);

        assert_eq!(
            factory.inputs(),
            &[Identity::of::<Host>(), Identity::of::<Port>()]
        );
        assert_eq!(decl.identity(), &Identity::of::<Addr>());

        let values = factory.call(&registry_with("localhost", 8080)).unwrap();
        let addr = values[0].clone().downcast::<Addr>().ok().unwrap();
        assert_eq!(addr.0, "localhost:8080");
    }

    #[test]
    fn test_missing_input_is_not_initiated() {
        let decl: Declaration = Declaration::factory(|p: Arc<Port>| Addr(p.0.to_string())).into();
        let err = factory_of(&decl).call(&Registry::new()).err().unwrap();
        assert!(matches!(err, ContainerError::NotInitiated(ref id) if *id == Identity::of::<Port>()));
    }

    #[test]
    fn test_factory_error_is_reported() {
        let decl: Declaration =
            Declaration::try_factory(|| Err::<Addr, _>("no route")).into();
        let err = factory_of(&decl).call(&Registry::new()).err().unwrap();
        assert_eq!(err.to_string(), "no route");
    }

    #[test]
    fn test_tuple_declares_every_element() {
        let decl: Declaration =
            Declaration::factory_tuple(|| (Host("h".into()), Port(1), Addr("h:1".into()))).into();
        let factory = factory_of(&decl);
        let outputs: Vec<_> = factory
            .outputs()
            .iter()
            .map(|o| o.identity().clone())
            .collect();
        assert_eq!(
            outputs,
            vec![
                Identity::of::<Host>(),
                Identity::of::<Port>(),
                Identity::of::<Addr>()
            ]
        );

        let values = factory.call(&Registry::new()).unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(values[1].clone().downcast::<Port>().ok().unwrap().0, 1);
    }

    #[test]
    fn test_tuple_marks_only_the_named_element_as_a_service() {
        let decl: Declaration =
            Declaration::factory_tuple(|| (MockService::new("web", &Journal::new()), Port(1)))
                .service::<MockService>()
                .into();
        let factory = factory_of(&decl);
        let values = factory.call(&Registry::new()).unwrap();

        let lifecycles: Vec<_> = factory
            .outputs()
            .iter()
            .zip(&values)
            .map(|(output, value)| output.lifecycle(value).is_some())
            .collect();
        assert_eq!(lifecycles, vec![true, false]);
        assert!(factory.strays().is_empty());
    }

    #[test]
    fn test_tuple_remembers_services_it_does_not_return() {
        let decl: Declaration = Declaration::factory_tuple(|| (Host("h".into()), Port(1)))
            .service::<MockService>()
            .into();
        assert_eq!(
            factory_of(&decl).strays(),
            &[Identity::of::<MockService>()]
        );
    }

    #[test]
    fn test_failing_tuple_factory_is_reported() {
        let decl: Declaration =
            Declaration::try_factory_tuple(|| Err::<(Host, Port), _>("no route")).into();
        let err = factory_of(&decl).call(&Registry::new()).err().unwrap();
        assert_eq!(err.to_string(), "no route");
    }

    #[test]
    fn test_shared_factory_keys_by_the_inner_type() {
        let host = Arc::new(Host("shared".into()));
        let handed = Arc::clone(&host);
        let decl: Declaration = Declaration::shared_factory(move || Arc::clone(&handed)).into();
        assert_eq!(decl.identity(), &Identity::of::<Host>());

        let values = factory_of(&decl).call(&Registry::new()).unwrap();
        let built = values[0].clone().downcast::<Host>().ok().unwrap();
        assert!(Arc::ptr_eq(&built, &host));
    }

    #[test]
    fn test_tasks_get_distinct_identities() {
        let a = Declaration::task(|_: Arc<Host>| {});
        let b = Declaration::task(|_: Arc<Host>| {});
        assert_ne!(a.identity(), b.identity());
    }

    #[test]
    fn test_modules_keep_declaration_order() {
        let modules = Modules::new()
            .with(Declaration::value(Port(1)))
            .extend(Modules::new().with(Declaration::factory(|| Host("h".into()))));
        let ids: Vec<_> = modules.into_iter().map(|d| d.identity().clone()).collect();
        assert_eq!(ids, vec![Identity::of::<Port>(), Identity::of::<Host>()]);
    }
}
