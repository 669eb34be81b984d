//! Keyfile backend.
//!
//! Reads the text format produced by `dconf dump` and used for the
//! `.d` directories of system databases:
//!
//! ```text
//! # comment
//! [org/gnome/desktop/interface]
//! font-name='Cantarell 11'
//! text-scaling-factor=1.25
//!
//! [/]
//! top-level-key=true
//! ```
//!
//! Group names are relative to a base directory; `[/]` is the base itself.

use std::path::PathBuf;
use std::{fs, io};

use tinydconf_variant::Variant;

use crate::{Backend, BackendError, KeyfileError, MemoryBackend, Path};

/// A backend loaded from a dconf keyfile.
///
/// The file is read once on [`open`](KeyfileBackend::open) and again on
/// every [`reload`](KeyfileBackend::reload); reads and listings are served
/// from memory in between.
#[derive(Clone, Debug)]
pub struct KeyfileBackend {
    source: Option<PathBuf>,
    base: Path,
    entries: MemoryBackend,
}

impl KeyfileBackend {
    /// Load the keyfile at `file`, placing its groups below `base`.
    ///
    /// A file that does not exist loads as an empty database, the way an
    /// unwritten dconf user database reads as empty.
    pub fn open(file: impl Into<PathBuf>, base: Path) -> Result<Self, KeyfileError> {
        let mut backend = KeyfileBackend {
            source: Some(file.into()),
            base,
            entries: MemoryBackend::new(),
        };
        backend.reload()?;
        Ok(backend)
    }

    /// Load keyfile text, placing its groups below `base`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tinydconf::{path, Backend, KeyfileBackend, Path};
    ///
    /// let text = "[org/app]\nsize=12\ntheme='dark'\n";
    /// let mut backend = KeyfileBackend::from_str(text, Path::root()).unwrap();
    /// assert_eq!(backend.list(&path!("/org/app/")).unwrap(), vec!["size", "theme"]);
    /// ```
    pub fn from_str(text: &str, base: Path) -> Result<Self, KeyfileError> {
        let entries = parse(text, &base)?;
        Ok(KeyfileBackend {
            source: None,
            base,
            entries,
        })
    }

    /// Re-read the file this backend was opened from.
    ///
    /// On failure the previously loaded values are kept. Backends built
    /// with [`from_str`](KeyfileBackend::from_str) have nothing to re-read.
    pub fn reload(&mut self) -> Result<(), KeyfileError> {
        let Some(file) = &self.source else {
            return Ok(());
        };

        log::debug!("Reading keyfile {}...", file.display());
        let text = match fs::read_to_string(file) {
            Ok(text) => text,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                log::debug!("Keyfile {} does not exist; no keys set", file.display());
                String::new()
            }
            Err(source) => {
                return Err(KeyfileError::Io {
                    path: file.clone(),
                    source,
                })
            }
        };

        self.entries = parse(&text, &self.base)?;
        log::debug!(
            "Loaded {} keys from {} below {}",
            self.entries.len(),
            file.display(),
            self.base
        );
        Ok(())
    }

    /// File this backend reads, if any.
    pub fn source(&self) -> Option<&std::path::Path> {
        self.source.as_deref()
    }

    /// Directory the keyfile groups are placed below.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// The loaded keys.
    pub fn entries(&self) -> &MemoryBackend {
        &self.entries
    }
}

impl Backend for KeyfileBackend {
    fn list(&mut self, dir: &Path) -> Result<Vec<String>, BackendError> {
        self.entries.list(dir)
    }

    fn read(&mut self, key: &Path) -> Result<Option<Variant>, BackendError> {
        self.entries.read(key)
    }
}

fn syntax(line: usize, message: impl Into<String>) -> KeyfileError {
    KeyfileError::Syntax {
        line,
        message: message.into(),
    }
}

fn group_dir(group: &str, base: &Path, line: usize) -> Result<Path, KeyfileError> {
    if group == "/" {
        return Ok(base.clone());
    }
    if group.is_empty() || group.starts_with('/') || group.ends_with('/') {
        return Err(syntax(line, format!("invalid group name '[{}]'", group)));
    }
    Path::dir(&format!("{}{}/", base, group))
        .map_err(|e| syntax(line, format!("invalid group name '[{}]': {}", group, e)))
}

fn parse(text: &str, base: &Path) -> Result<MemoryBackend, KeyfileError> {
    let mut entries = MemoryBackend::new();
    let mut group: Option<Path> = None;

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        if let Some(header) = trimmed.strip_prefix('[') {
            let name = header
                .strip_suffix(']')
                .ok_or_else(|| syntax(line, "unterminated group header"))?;
            group = Some(group_dir(name.trim(), base, line)?);
            continue;
        }

        let dir = group
            .as_ref()
            .ok_or_else(|| syntax(line, "key outside of any group"))?;
        let (name, value) = trimmed
            .split_once('=')
            .ok_or_else(|| syntax(line, "expected 'key=value'"))?;
        let name = name.trim();
        if name.is_empty() || name.contains('/') {
            return Err(syntax(line, format!("invalid key name '{}'", name)));
        }

        let key = dir
            .join(name)
            .map_err(|e| syntax(line, format!("invalid key name '{}': {}", name, e)))?;
        let value = Variant::parse(value.trim()).map_err(|source| KeyfileError::Value {
            line,
            key: name.to_string(),
            source,
        })?;
        // Later duplicates win.
        entries
            .insert(key, value)
            .map_err(|e| syntax(line, e.to_string()))?;
    }

    Ok(entries)
}
