//! The client session.

use tinydconf_variant::Variant;

use crate::decode::{decode, decode_optional};
use crate::{Backend, Error, Path, Value};

/// A read-only session against a configuration backend.
///
/// The session owns its backend; there is no process-wide connection.
/// Every operation takes `&mut self`, so a session is used by one caller at
/// a time. Share one across threads behind a `Mutex`.
///
/// # Example
///
/// ```rust
/// use tinydconf::{Client, KeyfileBackend, Path, Value};
///
/// let text = "[org/app]\nsize=12\nrecent=['a', 'b']\n";
/// let backend = KeyfileBackend::from_str(text, Path::root()).unwrap();
/// let mut client = Client::new(backend);
///
/// assert_eq!(client.list("/org/app/").unwrap(), vec!["recent", "size"]);
/// assert_eq!(client.read("/org/app/size").unwrap(), Some(Value::Integer(12)));
/// assert_eq!(client.read("/org/app/unset").unwrap(), None);
/// ```
pub struct Client<B> {
    backend: B,
}

impl<B: Backend> Client<B> {
    pub fn new(backend: B) -> Self {
        Client { backend }
    }

    /// Names of the immediate children of the directory `dir`.
    ///
    /// Keys appear as `name`, sub-directories as `name/`, in backend order.
    /// A directory with no children, or one that does not exist, yields an
    /// empty vector.
    pub fn list(&mut self, dir: &str) -> Result<Vec<String>, Error> {
        let dir = Path::dir(dir)?;
        log::trace!("list {}", dir);
        Ok(self.backend.list(&dir)?)
    }

    /// Read and decode the value at `key`.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - The key is unset.
    /// * `Ok(Some(value))` - The decoded value.
    /// * `Err(Error)` - Invalid path, backend failure or a value that cannot
    ///   be decoded; see [`Error::is_type_error`].
    pub fn read(&mut self, key: &str) -> Result<Option<Value>, Error> {
        let variant = self.read_variant(key)?;
        Ok(decode_optional(variant.as_ref())?)
    }

    /// Read the raw value at `key` without decoding it.
    pub fn read_variant(&mut self, key: &str) -> Result<Option<Variant>, Error> {
        let key = Path::key(key)?;
        log::trace!("read {}", key);
        Ok(self.backend.read(&key)?)
    }

    /// Read and decode every key below `dir`, depth first.
    ///
    /// Keys come out in listing order, each directory's keys and
    /// sub-directories interleaved as the backend lists them. The walk
    /// stops at the first error.
    pub fn dump(&mut self, dir: &str) -> Result<Vec<(Path, Value)>, Error> {
        let dir = Path::dir(dir)?;
        log::trace!("dump {}", dir);
        let mut out = Vec::new();
        self.walk(&dir, &mut out)?;
        Ok(out)
    }

    fn walk(&mut self, dir: &Path, out: &mut Vec<(Path, Value)>) -> Result<(), Error> {
        for name in self.backend.list(dir)? {
            let child = dir.join(&name)?;
            if child.is_dir() {
                self.walk(&child, out)?;
            } else if let Some(variant) = self.backend.read(&child)? {
                let value = decode(&variant)?;
                out.push((child, value));
            }
        }
        Ok(())
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}
