#![allow(unused_macros)]

/// Helper macro for reading locked items
///
/// Lock poisoning is reported as [`crate::Error::LockError`] through `?`.
///
/// ```rust, ignore
///  let table = read_lock!(class.table);
///  println!("{}", table.methods.len());
/// ```
macro_rules! read_lock {
    ($rwlock:expr) => {
        $rwlock.read().map_err(|_| crate::Error::LockError)?
    };
}

/// Helper macro for writing to locked items
///
/// Lock poisoning is reported as [`crate::Error::LockError`] through `?`.
///
/// ```rust, ignore
///  let mut table = write_lock!(class.table);
///  table.methods.insert(name, def);
/// ```
macro_rules! write_lock {
    ($rwlock:expr) => {
        $rwlock.write().map_err(|_| crate::Error::LockError)?
    };
}

/// Helper macro for reading locked items through a closure
///
/// ```rust, ignore
///  let names = with_read!(class.table, |table| table.methods.keys().cloned().collect());
/// ```
macro_rules! with_read {
    ($rwlock:expr, $closure:expr) => {{
        let guard = $rwlock.read().map_err(|_| crate::Error::LockError)?;
        $closure(&*guard)
    }};
}
