//! The backend seam: where directory listings and raw values come from.

use tinydconf_variant::Variant;

use crate::{BackendError, Path};

/// A hierarchical configuration store.
///
/// This is the read interface the [`Client`](crate::Client) drives. A
/// backend deals in raw variants; decoding happens above it.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Box<dyn Backend>`.
pub trait Backend: Send {
    /// Immediate children of the directory `dir`, in backend order.
    ///
    /// Keys are returned as `name`, sub-directories as `name/`.
    ///
    /// # Returns
    ///
    /// * `Ok(names)` - The children; empty if there are none or `dir` does
    ///   not exist.
    /// * `Err(BackendError)` - The store could not be queried.
    fn list(&mut self, dir: &Path) -> Result<Vec<String>, BackendError>;

    /// Read the raw value stored at `key`.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - The key is unset.
    /// * `Ok(Some(variant))` - The stored value.
    /// * `Err(BackendError)` - The store could not be queried.
    fn read(&mut self, key: &Path) -> Result<Option<Variant>, BackendError>;
}

// Blanket implementations for references and boxes

impl<B: Backend + ?Sized> Backend for &mut B {
    fn list(&mut self, dir: &Path) -> Result<Vec<String>, BackendError> {
        (**self).list(dir)
    }

    fn read(&mut self, key: &Path) -> Result<Option<Variant>, BackendError> {
        (**self).read(key)
    }
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn list(&mut self, dir: &Path) -> Result<Vec<String>, BackendError> {
        (**self).list(dir)
    }

    fn read(&mut self, key: &Path) -> Result<Option<Variant>, BackendError> {
        (**self).read(key)
    }
}
