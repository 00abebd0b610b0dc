//! Class representation.
//!
//! A [`Class`] owns two method tables: its own table, holding methods
//! defined directly on the class, and an optional override layer that sits
//! ahead of the own table in resolution order. The layer is the runtime half
//! of a dispatch shim; the interceptor decides what goes into it.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, RwLock,
    },
};

use bitflags::bitflags;

use crate::{
    runtime::{ClassId, MethodDef},
    Result,
};

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    /// Structural class flags
    pub struct ClassFlags: u32 {
        /// Method tables can no longer be modified
        const FROZEN = 0x0001;
        /// The class cannot be instantiated
        const ABSTRACT = 0x0002;
    }
}

/// Methods keyed by name.
pub type MethodTable = HashMap<String, MethodDef>;

/// Reference-counted class
pub type ClassRc = Arc<Class>;

pub(crate) struct ClassTables {
    pub(crate) methods: MethodTable,
    pub(crate) layer: Option<MethodTable>,
}

/// A class registered in a [`ClassRegistry`](crate::runtime::ClassRegistry).
pub struct Class {
    /// Identity of this class
    pub id: ClassId,
    /// Class name, unique within the registry
    pub name: String,
    /// Direct superclass, if any
    pub superclass: Option<ClassId>,
    flags: AtomicU32,
    pub(crate) tables: RwLock<ClassTables>,
}

impl Class {
    pub(crate) fn new(
        id: ClassId,
        name: String,
        superclass: Option<ClassId>,
        flags: ClassFlags,
    ) -> Self {
        Class {
            id,
            name,
            superclass,
            flags: AtomicU32::new(flags.bits()),
            tables: RwLock::new(ClassTables {
                methods: HashMap::new(),
                layer: None,
            }),
        }
    }

    /// Returns the current class flags
    #[must_use]
    pub fn flags(&self) -> ClassFlags {
        ClassFlags::from_bits_truncate(self.flags.load(Ordering::Acquire))
    }

    /// Returns true if the class rejects structural modification
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.flags().contains(ClassFlags::FROZEN)
    }

    pub(crate) fn set_flags(&self, flags: ClassFlags) {
        self.flags.fetch_or(flags.bits(), Ordering::AcqRel);
    }

    /// Returns the names of methods defined directly on this class, sorted.
    ///
    /// Override-layer entries are not part of the class's own method set.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LockError`] if the method table lock is poisoned.
    pub fn own_method_names(&self) -> Result<Vec<String>> {
        with_read!(self.tables, |tables: &ClassTables| {
            let mut names: Vec<String> = tables.methods.keys().cloned().collect();
            names.sort();
            Ok(names)
        })
    }

    /// Returns true if an override layer is linked ahead of this class
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LockError`] if the method table lock is poisoned.
    pub fn has_layer(&self) -> Result<bool> {
        Ok(read_lock!(self.tables).layer.is_some())
    }
}

impl std::fmt::Debug for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Class")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("superclass", &self.superclass)
            .field("flags", &self.flags())
            .finish_non_exhaustive()
    }
}
