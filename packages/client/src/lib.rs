//! tinydconf: a small read-only dconf client
//!
//! This layer turns raw GVariant settings into host values:
//! - `Path`: Validated dconf key and directory paths
//! - `Backend`: Where listings and raw values come from (`MemoryBackend`,
//!   `KeyfileBackend`)
//! - `decode`: Variant tree to `Value`, with scoped child handles
//! - `Client`: An explicit session with `list`, `read` and `dump`
//!
//! # Example
//!
//! ```rust
//! use tinydconf::{Client, KeyfileBackend, Path, Value};
//!
//! let keyfile = "[org/gnome/desktop/interface]\nfont-name='Cantarell 11'\n";
//! let backend = KeyfileBackend::from_str(keyfile, Path::root()).unwrap();
//! let mut client = Client::new(backend);
//!
//! let font = client.read("/org/gnome/desktop/interface/font-name").unwrap();
//! assert_eq!(font, Some(Value::from("Cantarell 11")));
//! ```

mod backend;
mod client;
mod decode;
mod error;
mod keyfile;
mod memory;
mod path;
mod value;

pub use backend::Backend;
pub use client::Client;
pub use decode::{decode, decode_optional};
pub use error::{BackendError, DecodeError, Error, KeyfileError};
pub use keyfile::KeyfileBackend;
pub use memory::MemoryBackend;
pub use path::{Path, PathError};
pub use value::Value;

// Re-export the variant layer for convenience
pub use tinydconf_variant as variant;
pub use tinydconf_variant::{Tag, Variant, VariantType};
