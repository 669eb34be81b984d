//! dconf paths.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

pub use crate::error::PathError;

/// A validated dconf path.
///
/// Every path is absolute and contains no empty segments. A path ending in
/// `/` names a directory; any other path names a key. The root `/` is a
/// directory.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Path {
    raw: String,
}

impl Path {
    /// Parse a path string of either kind.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tinydconf::Path;
    ///
    /// let dir = Path::parse("/org/gnome/").unwrap();
    /// assert!(dir.is_dir());
    ///
    /// let key = Path::parse("/org/gnome/font").unwrap();
    /// assert!(key.is_key());
    /// assert_eq!(key.name(), Some("font"));
    ///
    /// assert!(Path::parse("org/gnome").is_err());
    /// assert!(Path::parse("/org//gnome").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, PathError> {
        if s.is_empty() {
            return Err(PathError::Empty);
        }
        if !s.starts_with('/') {
            return Err(PathError::NotAbsolute {
                path: s.to_string(),
            });
        }
        if let Some(offset) = s.find("//") {
            return Err(PathError::DoubleSlash {
                path: s.to_string(),
                offset,
            });
        }
        for component in s.split('/').filter(|c| !c.is_empty()) {
            validate_component(component)?;
        }
        Ok(Path { raw: s.to_string() })
    }

    /// Parse a path that must name a directory.
    pub fn dir(s: &str) -> Result<Self, PathError> {
        let path = Self::parse(s)?;
        if !path.is_dir() {
            return Err(PathError::NotADirectory { path: path.raw });
        }
        Ok(path)
    }

    /// Parse a path that must name a key.
    pub fn key(s: &str) -> Result<Self, PathError> {
        let path = Self::parse(s)?;
        if !path.is_key() {
            return Err(PathError::NotAKey { path: path.raw });
        }
        Ok(path)
    }

    /// The root directory `/`.
    pub fn root() -> Self {
        Path {
            raw: "/".to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_dir(&self) -> bool {
        self.raw.ends_with('/')
    }

    pub fn is_key(&self) -> bool {
        !self.is_dir()
    }

    pub fn is_root(&self) -> bool {
        self.raw == "/"
    }

    /// Iterate over the non-empty segments.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.raw.split('/').filter(|c| !c.is_empty())
    }

    /// Last segment without any trailing slash; `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.components().last()
    }

    /// Directory containing this path; `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Path> {
        if self.is_root() {
            return None;
        }
        let trimmed = self.raw.strip_suffix('/').unwrap_or(&self.raw);
        let cut = trimmed.rfind('/')? + 1;
        Some(Path {
            raw: trimmed[..cut].to_string(),
        })
    }

    /// Append a child name to this directory.
    ///
    /// `name` is a single segment, with a trailing `/` for a
    /// sub-directory; this is the form directory listings return.
    pub fn join(&self, name: &str) -> Result<Path, PathError> {
        if !self.is_dir() {
            return Err(PathError::NotADirectory {
                path: self.raw.clone(),
            });
        }
        let segment = name.strip_suffix('/').unwrap_or(name);
        if segment.is_empty() || segment.contains('/') {
            return Err(PathError::InvalidComponent {
                component: name.to_string(),
                message: "expected a single name, optionally ending in '/'".to_string(),
            });
        }
        validate_component(segment)?;
        Ok(Path {
            raw: format!("{}{}", self.raw, name),
        })
    }

    /// Check if this path lies at or below the directory `prefix`.
    pub fn has_prefix(&self, prefix: &Path) -> bool {
        prefix.is_dir() && self.raw.starts_with(&prefix.raw)
    }

    /// The part of this path below the directory `prefix`.
    ///
    /// Returns `None` if `prefix` is not a directory containing this path.
    pub fn strip_prefix(&self, prefix: &Path) -> Option<&str> {
        if self.has_prefix(prefix) {
            Some(&self.raw[prefix.raw.len()..])
        } else {
            None
        }
    }
}

fn validate_component(component: &str) -> Result<(), PathError> {
    if let Some(c) = component.chars().find(|c| c.is_control()) {
        return Err(PathError::InvalidComponent {
            component: component.to_string(),
            message: format!("control character {:?}", c),
        });
    }
    Ok(())
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

impl AsRef<str> for Path {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Serialize for Path {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.raw)
    }
}

/// Create a path from a string literal, panicking if invalid.
///
/// This is intended for use with string literals where the path is known
/// to be valid at compile time.
///
/// # Example
///
/// ```rust
/// use tinydconf::path;
///
/// let p = path!("/org/gnome/desktop/");
/// assert!(p.is_dir());
/// ```
#[macro_export]
macro_rules! path {
    ($s:expr) => {
        $crate::Path::parse($s).expect("invalid path literal")
    };
}
