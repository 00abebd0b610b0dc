//! Fluent class definition.

use crate::{
    runtime::{CallContext, ClassFlags, ClassId, ClassRegistry, MethodDef, Value, Visibility},
    Result,
};

/// Builder for defining a class together with its methods.
///
/// # Examples
///
/// ```rust
/// use anystub::runtime::{ClassBuilder, ClassRegistry, Value, Visibility};
///
/// let registry = ClassRegistry::new();
/// let base = ClassBuilder::new("Base")
///     .method("name", |_| Ok(Value::from("base")))
///     .build(&registry)?;
///
/// let sub = ClassBuilder::new("Sub")
///     .superclass(base)
///     .private_method("helper", |ctx| Ok(ctx.arg(0)))
///     .build(&registry)?;
///
/// assert_eq!(registry.instance_methods(sub, Visibility::Private, false)?, vec!["helper"]);
/// # Ok::<(), anystub::Error>(())
/// ```
pub struct ClassBuilder {
    name: String,
    superclass: Option<ClassId>,
    flags: ClassFlags,
    methods: Vec<MethodDef>,
}

impl ClassBuilder {
    /// Starts a class definition
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        ClassBuilder {
            name: name.into(),
            superclass: None,
            flags: ClassFlags::empty(),
            methods: Vec::new(),
        }
    }

    /// Sets the direct superclass
    #[must_use]
    pub fn superclass(mut self, superclass: ClassId) -> Self {
        self.superclass = Some(superclass);
        self
    }

    /// Marks the class as abstract
    #[must_use]
    pub fn abstract_class(mut self) -> Self {
        self.flags |= ClassFlags::ABSTRACT;
        self
    }

    /// Freezes the class once its methods are defined
    #[must_use]
    pub fn frozen(mut self) -> Self {
        self.flags |= ClassFlags::FROZEN;
        self
    }

    /// Adds a public method
    #[must_use]
    pub fn method<F>(self, name: &str, body: F) -> Self
    where
        F: Fn(&CallContext<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        self.method_with_visibility(name, Visibility::Public, body)
    }

    /// Adds a protected method
    #[must_use]
    pub fn protected_method<F>(self, name: &str, body: F) -> Self
    where
        F: Fn(&CallContext<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        self.method_with_visibility(name, Visibility::Protected, body)
    }

    /// Adds a private method
    #[must_use]
    pub fn private_method<F>(self, name: &str, body: F) -> Self
    where
        F: Fn(&CallContext<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        self.method_with_visibility(name, Visibility::Private, body)
    }

    /// Adds a method with an explicit visibility
    #[must_use]
    pub fn method_with_visibility<F>(mut self, name: &str, visibility: Visibility, body: F) -> Self
    where
        F: Fn(&CallContext<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        self.methods.push(MethodDef::new(name, visibility, body));
        self
    }

    /// Registers the class and its methods.
    ///
    /// The `FROZEN` flag, if requested, is applied after the methods are in
    /// place.
    ///
    /// # Errors
    ///
    /// Propagates [`ClassRegistry::define_class`] failures.
    pub fn build(self, registry: &ClassRegistry) -> Result<ClassId> {
        let frozen = self.flags.contains(ClassFlags::FROZEN);
        let id = registry.define_class_with_flags(
            &self.name,
            self.superclass,
            self.flags - ClassFlags::FROZEN,
        )?;

        for def in self.methods {
            registry.define_method(id, def)?;
        }
        if frozen {
            registry.freeze(id)?;
        }
        Ok(id)
    }
}
