//! In-memory backend.

use std::collections::{BTreeMap, BTreeSet};

use tinydconf_variant::Variant;

use crate::{Backend, BackendError, Path, PathError};

/// A backend holding every key in an ordered map.
///
/// Directories are implicit: a directory exists while some key lies below
/// it.
///
/// # Example
///
/// ```rust
/// use tinydconf::{path, Backend, MemoryBackend};
/// use tinydconf_variant::Variant;
///
/// let mut backend = MemoryBackend::new();
/// backend.insert(path!("/org/app/size"), Variant::from(12i32)).unwrap();
/// backend.insert(path!("/org/app/theme/name"), Variant::from("dark")).unwrap();
///
/// let names = backend.list(&path!("/org/app/")).unwrap();
/// assert_eq!(names, vec!["size", "theme/"]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
    entries: BTreeMap<Path, Variant>,
}

impl MemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` at `key`, returning the previous value.
    pub fn insert(&mut self, key: Path, value: Variant) -> Result<Option<Variant>, PathError> {
        if !key.is_key() {
            return Err(PathError::NotAKey {
                path: key.to_string(),
            });
        }
        Ok(self.entries.insert(key, value))
    }

    pub fn remove(&mut self, key: &Path) -> Option<Variant> {
        self.entries.remove(key)
    }

    pub fn get(&self, key: &Path) -> Option<&Variant> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate over keys and values in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Variant)> {
        self.entries.iter()
    }

    fn children(&self, dir: &Path) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for key in self.entries.range(dir.clone()..).map(|(key, _)| key) {
            let Some(rest) = key.strip_prefix(dir) else {
                break;
            };
            let name = match rest.find('/') {
                Some(slash) => &rest[..=slash],
                None => rest,
            };
            names.insert(name.to_string());
        }
        names
    }
}

impl Backend for MemoryBackend {
    fn list(&mut self, dir: &Path) -> Result<Vec<String>, BackendError> {
        Ok(self.children(dir).into_iter().collect())
    }

    fn read(&mut self, key: &Path) -> Result<Option<Variant>, BackendError> {
        Ok(self.entries.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;

    fn sample() -> MemoryBackend {
        let mut backend = MemoryBackend::new();
        for (key, value) in [
            ("/org/app/size", Variant::from(12i32)),
            ("/org/app/theme/name", Variant::from("dark")),
            ("/org/app/theme/accent", Variant::from("blue")),
            ("/org/app.x", Variant::from(true)),
            ("/org/zz", Variant::from(1.5)),
        ] {
            backend.insert(path!(key), value).unwrap();
        }
        backend
    }

    #[test]
    fn list_immediate_children() {
        let mut backend = sample();
        assert_eq!(backend.list(&Path::root()).unwrap(), vec!["org/"]);
        assert_eq!(
            backend.list(&path!("/org/")).unwrap(),
            vec!["app.x", "app/", "zz"]
        );
        assert_eq!(
            backend.list(&path!("/org/app/theme/")).unwrap(),
            vec!["accent", "name"]
        );
    }

    #[test]
    fn list_missing_directory_is_empty() {
        let mut backend = sample();
        assert!(backend.list(&path!("/nope/")).unwrap().is_empty());
        assert!(MemoryBackend::new().list(&Path::root()).unwrap().is_empty());
    }

    #[test]
    fn read_and_remove() {
        let mut backend = sample();
        assert_eq!(
            backend.read(&path!("/org/zz")).unwrap(),
            Some(Variant::from(1.5))
        );
        assert_eq!(backend.read(&path!("/org/missing")).unwrap(), None);

        assert_eq!(backend.len(), 5);
        assert!(backend.remove(&path!("/org/zz")).is_some());
        assert_eq!(backend.len(), 4);
        assert_eq!(backend.list(&path!("/org/")).unwrap(), vec!["app.x", "app/"]);
    }

    #[test]
    fn key_and_directory_may_share_a_name() {
        let mut backend = MemoryBackend::new();
        backend.insert(path!("/a"), Variant::from(1i32)).unwrap();
        backend.insert(path!("/a/b"), Variant::from(2i32)).unwrap();
        assert_eq!(backend.list(&Path::root()).unwrap(), vec!["a", "a/"]);
    }

    #[test]
    fn insert_rejects_directories() {
        let mut backend = MemoryBackend::new();
        assert!(matches!(
            backend.insert(path!("/a/"), Variant::from(1i32)),
            Err(PathError::NotAKey { .. })
        ));
        assert!(backend.is_empty());
    }
}
