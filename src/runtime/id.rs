use std::fmt;

/// Identity of a class registered in a [`ClassRegistry`](crate::runtime::ClassRegistry).
///
/// Ids are issued by the registry in increasing order starting at 1 and are
/// never reused; `0` is reserved as the null id.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassId(pub u32);

impl ClassId {
    /// Creates a class id from a raw value
    #[must_use]
    pub fn new(value: u32) -> Self {
        ClassId(value)
    }

    /// Returns the raw id value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Returns true if this is the null id (value 0)
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for ClassId {
    fn from(value: u32) -> Self {
        ClassId(value)
    }
}

impl From<ClassId> for u32 {
    fn from(id: ClassId) -> Self {
        id.0
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.0)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class#{}", self.0)
    }
}
