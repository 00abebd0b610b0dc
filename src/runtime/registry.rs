//! Central class registry and dispatcher.
//!
//! This module provides the [`ClassRegistry`], which owns every class, their
//! method tables and override layers, and performs method resolution and
//! dispatch for instances.
//!
//! # Registry Architecture
//!
//! - **Id-based lookup**: Primary storage in a `SkipMap` keyed by [`ClassId`]
//! - **Name-based lookup**: Secondary `DashMap` index from class name to id
//! - **Atomic id generation**: Class and object ids come from atomic counters
//! - **Per-class tables**: Each class guards its own table and layer with a `RwLock`
//!
//! # Resolution Order
//!
//! Resolving a method on a class walks its ancestor chain, starting with the
//! class itself. For every class on the chain the override layer (if linked)
//! is checked before the class's own table:
//!
//! ```text
//! Sub.layer -> Sub.methods -> Base.layer -> Base.methods -> ...
//! ```
//!
//! # Reentrancy
//!
//! Dispatch clones the resolved [`MethodDef`] out of the table before
//! invoking it, so no lock is held while a method body runs and bodies are
//! free to call back into the registry, including mutating it.
//!
//! # Examples
//!
//! ```rust
//! use anystub::runtime::{ClassBuilder, ClassRegistry, Value};
//!
//! let registry = ClassRegistry::new();
//! let account = ClassBuilder::new("Account")
//!     .method("balance", |_| Ok(Value::Int(100)))
//!     .build(&registry)?;
//!
//! let instance = registry.new_instance(account)?;
//! assert_eq!(registry.call(instance, "balance", &[], None)?, Value::Int(100));
//! # Ok::<(), anystub::Error>(())
//! ```

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU32, AtomicU64, Ordering},
        Arc,
    },
};

use crossbeam_skiplist::SkipMap;
use dashmap::{mapref::entry::Entry, DashMap};

use crate::{
    runtime::{
        Block, CallContext, Capabilities, Class, ClassFlags, ClassId, ClassRc, Instance,
        MethodDef, MethodTable, RuntimeConfig, Value, Visibility,
    },
    Error, Result,
};

/// Where a resolved method was found.
#[derive(Clone, Debug)]
pub struct ResolvedMethod {
    /// The class on whose chain entry the method was found
    pub owner: ClassId,
    /// True if the method lives in the owner's override layer
    pub in_layer: bool,
    /// The definition, cloned out of the table
    pub def: MethodDef,
}

/// Registry of classes, their method tables, and instances.
///
/// The registry is the single shared resource every instance of a class
/// dispatches through. All structural mutation goes through its methods,
/// which refuse to touch classes flagged [`ClassFlags::FROZEN`].
pub struct ClassRegistry {
    classes: SkipMap<ClassId, ClassRc>,
    classes_by_name: DashMap<String, ClassId>,
    next_class: AtomicU32,
    next_object: AtomicU64,
    config: RuntimeConfig,
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::with_config(RuntimeConfig::default())
    }
}

impl ClassRegistry {
    /// Creates an empty registry with the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry with the given configuration
    #[must_use]
    pub fn with_config(config: RuntimeConfig) -> Self {
        ClassRegistry {
            classes: SkipMap::new(),
            classes_by_name: DashMap::new(),
            next_class: AtomicU32::new(1),
            next_object: AtomicU64::new(1),
            config,
        }
    }

    /// Returns the structural primitives this registry supports
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.config.capabilities()
    }

    /// Registers a new class.
    ///
    /// # Arguments
    ///
    /// * `name` - Class name, unique within the registry
    /// * `superclass` - Optional direct superclass, which must already exist
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateClass`] if the name is taken
    /// - [`Error::ClassNotFound`] if the superclass is unknown
    pub fn define_class(&self, name: &str, superclass: Option<ClassId>) -> Result<ClassId> {
        self.define_class_with_flags(name, superclass, ClassFlags::empty())
    }

    /// Registers a new class with initial flags.
    ///
    /// # Errors
    ///
    /// See [`ClassRegistry::define_class`].
    pub fn define_class_with_flags(
        &self,
        name: &str,
        superclass: Option<ClassId>,
        flags: ClassFlags,
    ) -> Result<ClassId> {
        if let Some(parent) = superclass {
            self.class(parent)?;
        }

        let id = match self.classes_by_name.entry(name.to_string()) {
            Entry::Occupied(_) => return Err(Error::DuplicateClass(name.to_string())),
            Entry::Vacant(entry) => {
                let id = ClassId(self.next_class.fetch_add(1, Ordering::Relaxed));
                entry.insert(id);
                id
            }
        };

        self.classes.insert(
            id,
            Arc::new(Class::new(id, name.to_string(), superclass, flags)),
        );
        Ok(id)
    }

    /// Looks up a class by id
    #[must_use]
    pub fn get(&self, id: ClassId) -> Option<ClassRc> {
        self.classes.get(&id).map(|entry| entry.value().clone())
    }

    /// Looks up a class by name
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<ClassRc> {
        let id = *self.classes_by_name.get(name)?;
        self.get(id)
    }

    /// Looks up a class by id, failing if it is unknown
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassNotFound`] if the id is not registered.
    pub fn class(&self, id: ClassId) -> Result<ClassRc> {
        self.get(id).ok_or(Error::ClassNotFound(id))
    }

    /// Returns the class name, or the id's display form if it is unknown
    #[must_use]
    pub fn name_of(&self, id: ClassId) -> String {
        self.get(id)
            .map_or_else(|| id.to_string(), |class| class.name.clone())
    }

    /// Returns the number of registered classes
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns `true` if no classes are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Returns the class followed by its superclasses, nearest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassNotFound`] if any class on the chain is unknown.
    pub fn ancestors(&self, id: ClassId) -> Result<Vec<ClassId>> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(class_id) = current {
            let class = self.class(class_id)?;
            chain.push(class_id);
            current = class.superclass;
        }
        Ok(chain)
    }

    /// Marks a class as frozen; further structural modification fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassNotFound`] if the id is not registered.
    pub fn freeze(&self, id: ClassId) -> Result<()> {
        self.class(id)?.set_flags(ClassFlags::FROZEN);
        Ok(())
    }

    fn mutable_class(&self, id: ClassId, operation: &str) -> Result<ClassRc> {
        let class = self.class(id)?;
        if class.is_frozen() {
            return Err(Error::NotSupported {
                class: class.name.clone(),
                reason: format!("can't {operation} on a frozen class"),
            });
        }
        Ok(class)
    }

    /// Defines (or redefines) a method directly on a class.
    ///
    /// # Errors
    ///
    /// - [`Error::ClassNotFound`] if the class is unknown
    /// - [`Error::NotSupported`] if the class is frozen
    pub fn define_method(&self, id: ClassId, def: MethodDef) -> Result<()> {
        self.replace_method(id, def).map(|_| ())
    }

    /// Swaps a method on a class in a single write, returning the previous definition.
    ///
    /// Name, body and visibility change together under one lock, so no
    /// reader ever observes the method missing or carrying an intermediate
    /// visibility.
    ///
    /// # Errors
    ///
    /// - [`Error::ClassNotFound`] if the class is unknown
    /// - [`Error::NotSupported`] if the class is frozen
    pub fn replace_method(&self, id: ClassId, def: MethodDef) -> Result<Option<MethodDef>> {
        let class = self.mutable_class(id, "define a method")?;
        let mut tables = write_lock!(class.tables);
        Ok(tables.methods.insert(def.name.clone(), def))
    }

    /// Removes a method from a class's own table.
    ///
    /// Returns the removed definition, or `None` if the class did not define
    /// the method directly. Inherited definitions are never touched.
    ///
    /// # Errors
    ///
    /// - [`Error::ClassNotFound`] if the class is unknown
    /// - [`Error::NotSupported`] if the class is frozen
    pub fn remove_method(&self, id: ClassId, name: &str) -> Result<Option<MethodDef>> {
        let class = self.mutable_class(id, "remove a method")?;
        let mut tables = write_lock!(class.tables);
        Ok(tables.methods.remove(name))
    }

    /// Changes the visibility of a method defined directly on a class.
    ///
    /// This is the low-level accessibility primitive; it is scoped to the
    /// owning class and never reaches into ancestors.
    ///
    /// # Errors
    ///
    /// - [`Error::NoMethod`] if the class does not define the method directly
    /// - [`Error::NotSupported`] if the class is frozen
    pub fn set_visibility(&self, id: ClassId, name: &str, visibility: Visibility) -> Result<()> {
        let class = self.mutable_class(id, "change method visibility")?;
        let mut tables = write_lock!(class.tables);
        match tables.methods.get_mut(name) {
            Some(def) => {
                def.visibility = visibility;
                Ok(())
            }
            None => Err(Error::NoMethod {
                class: class.name.clone(),
                method: name.to_string(),
            }),
        }
    }

    /// Returns the method defined directly on a class, ignoring its layer and ancestors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassNotFound`] if the class is unknown.
    pub fn own_method(&self, id: ClassId, name: &str) -> Result<Option<MethodDef>> {
        let class = self.class(id)?;
        let tables = read_lock!(class.tables);
        Ok(tables.methods.get(name).cloned())
    }

    /// Links an empty override layer ahead of a class.
    ///
    /// Idempotent: returns `true` if a layer was linked by this call and
    /// `false` if one was already present.
    ///
    /// # Errors
    ///
    /// - [`Error::NotSupported`] if the runtime lacks override layers or the class is frozen
    /// - [`Error::ClassNotFound`] if the class is unknown
    pub fn prepend_layer(&self, id: ClassId) -> Result<bool> {
        if !self.config.prepend {
            return Err(Error::NotSupported {
                class: self.name_of(id),
                reason: "runtime does not support override layers".to_string(),
            });
        }

        let class = self.mutable_class(id, "prepend an override layer")?;
        let mut tables = write_lock!(class.tables);
        if tables.layer.is_some() {
            return Ok(false);
        }

        tables.layer = Some(MethodTable::new());
        log::debug!("linked override layer ahead of {}", class.name);
        Ok(true)
    }

    /// Returns true if an override layer is linked ahead of the class
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassNotFound`] if the class is unknown.
    pub fn has_layer(&self, id: ClassId) -> Result<bool> {
        self.class(id)?.has_layer()
    }

    /// Defines a method in the class's override layer.
    ///
    /// # Errors
    ///
    /// - [`Error::NotSupported`] if no layer is linked or the class is frozen
    /// - [`Error::ClassNotFound`] if the class is unknown
    pub fn define_in_layer(&self, id: ClassId, def: MethodDef) -> Result<()> {
        let class = self.mutable_class(id, "define a method in the override layer")?;
        let mut tables = write_lock!(class.tables);
        match tables.layer.as_mut() {
            Some(layer) => {
                layer.insert(def.name.clone(), def);
                Ok(())
            }
            None => Err(Error::NotSupported {
                class: class.name.clone(),
                reason: "no override layer is linked".to_string(),
            }),
        }
    }

    /// Returns the method defined in the class's override layer, if any
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassNotFound`] if the class is unknown.
    pub fn layer_method(&self, id: ClassId, name: &str) -> Result<Option<MethodDef>> {
        let class = self.class(id)?;
        let tables = read_lock!(class.tables);
        Ok(tables
            .layer
            .as_ref()
            .and_then(|layer| layer.get(name).cloned()))
    }

    /// Removes a method from the class's override layer.
    ///
    /// Returns `None` if there is no layer or the layer lacks the method.
    ///
    /// # Errors
    ///
    /// - [`Error::NotSupported`] if the class is frozen
    /// - [`Error::ClassNotFound`] if the class is unknown
    pub fn remove_from_layer(&self, id: ClassId, name: &str) -> Result<Option<MethodDef>> {
        let class = self.mutable_class(id, "remove a method from the override layer")?;
        let mut tables = write_lock!(class.tables);
        Ok(tables.layer.as_mut().and_then(|layer| layer.remove(name)))
    }

    /// Unlinks the class's override layer, returning whatever it still held.
    ///
    /// # Errors
    ///
    /// - [`Error::NotSupported`] if the class is frozen
    /// - [`Error::ClassNotFound`] if the class is unknown
    pub fn unlink_layer(&self, id: ClassId) -> Result<Option<MethodTable>> {
        let class = self.mutable_class(id, "unlink the override layer")?;
        let mut tables = write_lock!(class.tables);
        let layer = tables.layer.take();
        if layer.is_some() {
            log::debug!("unlinked override layer from {}", class.name);
        }
        Ok(layer)
    }

    /// Unlinks the class's override layer, but only once it holds nothing.
    ///
    /// Returns `true` if the layer was unlinked. A layer that still carries
    /// entries stays linked, so definitions another party placed in it keep
    /// resolving.
    ///
    /// # Errors
    ///
    /// - [`Error::NotSupported`] if the class is frozen
    /// - [`Error::ClassNotFound`] if the class is unknown
    pub fn unlink_empty_layer(&self, id: ClassId) -> Result<bool> {
        let class = self.mutable_class(id, "unlink the override layer")?;
        let mut tables = write_lock!(class.tables);
        if !tables.layer.as_ref().is_some_and(|layer| layer.is_empty()) {
            return Ok(false);
        }

        tables.layer = None;
        log::debug!("unlinked override layer from {}", class.name);
        Ok(true)
    }

    /// Resolves a method along the class's resolution chain.
    ///
    /// Returns `None` if no class on the chain defines the method.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassNotFound`] if any class on the chain is unknown.
    pub fn resolve(&self, id: ClassId, name: &str) -> Result<Option<ResolvedMethod>> {
        self.resolve_where(id, name, |def| Some(def))
    }

    /// Resolves a method while skipping interceptor-installed forwarders.
    ///
    /// This is the definition a call would reach if no stub were active. A
    /// forwarder that overwrote an own definition resolves to that definition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassNotFound`] if any class on the chain is unknown.
    pub fn resolve_defined(&self, id: ClassId, name: &str) -> Result<Option<ResolvedMethod>> {
        self.resolve_where(id, name, MethodDef::defined)
    }

    fn resolve_where<F>(&self, id: ClassId, name: &str, select: F) -> Result<Option<ResolvedMethod>>
    where
        F: for<'a> Fn(&'a MethodDef) -> Option<&'a MethodDef>,
    {
        for class_id in self.ancestors(id)? {
            let class = self.class(class_id)?;
            let tables = read_lock!(class.tables);

            let layered = tables.layer.as_ref().and_then(|layer| layer.get(name));
            if let Some(def) = layered.and_then(&select) {
                return Ok(Some(ResolvedMethod {
                    owner: class_id,
                    in_layer: true,
                    def: def.clone(),
                }));
            }
            if let Some(def) = tables.methods.get(name).and_then(&select) {
                return Ok(Some(ResolvedMethod {
                    owner: class_id,
                    in_layer: false,
                    def: def.clone(),
                }));
            }
        }
        Ok(None)
    }

    /// Returns true if the method resolves on the class with any visibility
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassNotFound`] if any class on the chain is unknown.
    pub fn method_defined(&self, id: ClassId, name: &str) -> Result<bool> {
        Ok(self.resolve(id, name)?.is_some())
    }

    /// Lists the method names with the given visibility, sorted.
    ///
    /// With `inherited`, every name resolvable on the class is considered and
    /// the first definition along the resolution chain decides its
    /// visibility. Without it, only the class's own table is listed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassNotFound`] if any class on the chain is unknown.
    pub fn instance_methods(
        &self,
        id: ClassId,
        visibility: Visibility,
        inherited: bool,
    ) -> Result<Vec<String>> {
        let mut names = Vec::new();

        if !inherited {
            let class = self.class(id)?;
            let tables = read_lock!(class.tables);
            names.extend(
                tables
                    .methods
                    .values()
                    .filter(|def| def.visibility == visibility)
                    .map(|def| def.name.clone()),
            );
            names.sort();
            return Ok(names);
        }

        let mut seen = HashSet::new();
        for class_id in self.ancestors(id)? {
            let class = self.class(class_id)?;
            let tables = read_lock!(class.tables);
            let layer = tables.layer.iter().flat_map(|layer| layer.values());
            for def in layer.chain(tables.methods.values()) {
                if seen.insert(def.name.clone()) && def.visibility == visibility {
                    names.push(def.name.clone());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Creates a new instance of a class.
    ///
    /// # Errors
    ///
    /// - [`Error::ClassNotFound`] if the class is unknown
    /// - [`Error::NotSupported`] if the class is abstract
    pub fn new_instance(&self, id: ClassId) -> Result<Instance> {
        let class = self.class(id)?;
        if class.flags().contains(ClassFlags::ABSTRACT) {
            return Err(Error::NotSupported {
                class: class.name.clone(),
                reason: "abstract classes cannot be instantiated".to_string(),
            });
        }
        Ok(Instance::new(
            self.next_object.fetch_add(1, Ordering::Relaxed),
            id,
        ))
    }

    /// Calls a method from a public call site.
    ///
    /// Protected and private methods are not reachable this way.
    ///
    /// # Errors
    ///
    /// - [`Error::NoMethod`] if the method does not resolve
    /// - [`Error::NotAccessible`] if the resolved method is not public
    /// - Any error raised by the method body, unchanged
    pub fn call(
        &self,
        receiver: Instance,
        name: &str,
        args: &[Value],
        block: Option<&Block>,
    ) -> Result<Value> {
        self.dispatch(receiver, name, args, block, true)
    }

    /// Calls a method regardless of its visibility.
    ///
    /// # Errors
    ///
    /// - [`Error::NoMethod`] if the method does not resolve
    /// - Any error raised by the method body, unchanged
    pub fn send(
        &self,
        receiver: Instance,
        name: &str,
        args: &[Value],
        block: Option<&Block>,
    ) -> Result<Value> {
        self.dispatch(receiver, name, args, block, false)
    }

    fn dispatch(
        &self,
        receiver: Instance,
        name: &str,
        args: &[Value],
        block: Option<&Block>,
        public_site: bool,
    ) -> Result<Value> {
        let Some(resolved) = self.resolve(receiver.class(), name)? else {
            return Err(Error::NoMethod {
                class: self.name_of(receiver.class()),
                method: name.to_string(),
            });
        };

        if public_site && resolved.def.visibility != Visibility::Public {
            return Err(Error::NotAccessible {
                class: self.name_of(receiver.class()),
                method: name.to_string(),
                visibility: resolved.def.visibility,
            });
        }

        let ctx = CallContext {
            runtime: self,
            receiver,
            method: name,
            args,
            block,
        };
        resolved.def.invoke(&ctx)
    }
}

impl std::fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("class_count", &self.classes.len())
            .field("config", &self.config)
            .finish()
    }
}
