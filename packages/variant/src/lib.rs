//! tinydconf variant layer: GVariant values
//!
//! The value model dconf stores settings in:
//! - `VariantType`: Validated type string (`"s"`, `"a{sv}"`, `"(ii)"`)
//! - `Variant`: Immutable, reference-counted value tree
//! - `VariantNode`: Read interface decoders are written against
//! - Text format: `Variant::parse` and `Display`, as used by keyfiles
//!
//! # Example
//!
//! ```rust
//! use tinydconf_variant::{Variant, VariantNode, View};
//!
//! let v = Variant::parse("('hello', [1, 2, 3])").unwrap();
//! assert_eq!(v.ty().as_str(), "(sai)");
//!
//! let greeting = v.child_value(0).unwrap();
//! assert_eq!(greeting.view(), View::String("hello"));
//! assert_eq!(v.to_string(), "('hello', [1, 2, 3])");
//! ```

mod error;
mod node;
mod text;
mod ty;
mod variant;

pub use error::{ParseError, TypeError, VariantError};
pub use node::{VariantNode, View};
pub use ty::{Tag, VariantType, MAX_DEPTH};
pub use variant::Variant;
