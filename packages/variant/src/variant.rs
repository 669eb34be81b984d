//! The Variant type - an immutable, self-describing value tree.

use std::fmt;
use std::sync::Arc;

use crate::ty::scan;
use crate::{Tag, VariantError, VariantType};

/// An immutable GVariant value.
///
/// A `Variant` is a reference-counted handle: `clone()` acquires another
/// reference to the same node and dropping a handle releases it. Children of
/// containers are fetched with [`Variant::child_value`], which hands out an
/// owned handle the caller must drop.
///
/// # Examples
///
/// ```rust
/// use tinydconf_variant::{Variant, VariantType};
///
/// let pair = Variant::tuple(vec![Variant::from(1i32), Variant::from("a")]);
/// assert_eq!(pair.ty().as_str(), "(is)");
///
/// let list = Variant::array(VariantType::STRING, vec!["x".into(), "y".into()]).unwrap();
/// assert_eq!(list.n_children(), 2);
/// assert_eq!(list.child_value(1).unwrap().as_str(), Some("y"));
/// ```
#[derive(Clone)]
pub struct Variant(pub(crate) Arc<Inner>);

#[derive(Debug, PartialEq)]
pub(crate) struct Inner {
    pub(crate) ty: VariantType,
    pub(crate) payload: Payload,
}

#[derive(Debug, PartialEq)]
pub(crate) enum Payload {
    Boolean(bool),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Handle(i32),
    Double(f64),
    /// Strings, object paths and signatures.
    Text(String),
    /// Arrays, tuples, dict entries, maybes (zero or one child) and boxed
    /// variants (exactly one child).
    Children(Vec<Variant>),
}

impl Variant {
    fn new(ty: VariantType, payload: Payload) -> Self {
        Variant(Arc::new(Inner { ty, payload }))
    }

    /// A file descriptor index.
    pub fn handle(value: i32) -> Self {
        Self::new(VariantType::HANDLE, Payload::Handle(value))
    }

    /// A D-Bus object path such as `/org/example/Thing`.
    pub fn object_path(path: &str) -> Result<Self, VariantError> {
        if !is_object_path(path) {
            return Err(VariantError::InvalidObjectPath(path.to_string()));
        }
        Ok(Self::new(
            VariantType::OBJECT_PATH,
            Payload::Text(path.to_string()),
        ))
    }

    /// A signature: zero or more complete type strings back to back.
    pub fn signature(signature: &str) -> Result<Self, VariantError> {
        let mut pos = 0;
        while pos < signature.len() {
            pos = scan(signature, pos, 0).map_err(|source| VariantError::InvalidSignature {
                signature: signature.to_string(),
                source,
            })?;
        }
        Ok(Self::new(
            VariantType::SIGNATURE,
            Payload::Text(signature.to_string()),
        ))
    }

    /// An array whose children all have type `element`.
    pub fn array(element: VariantType, children: Vec<Variant>) -> Result<Self, VariantError> {
        for (index, child) in children.iter().enumerate() {
            if child.ty() != &element {
                return Err(VariantError::ElementType {
                    index,
                    expected: element,
                    found: child.ty().clone(),
                });
            }
        }
        Ok(Self::new(
            VariantType::array_of(&element),
            Payload::Children(children),
        ))
    }

    /// A tuple of arbitrary items. An empty tuple is the unit value `()`.
    pub fn tuple(children: Vec<Variant>) -> Self {
        let ty = VariantType::tuple_of(children.iter().map(Variant::ty));
        Self::new(ty, Payload::Children(children))
    }

    /// A dictionary entry. Arrays of entries form dictionaries.
    pub fn dict_entry(key: Variant, value: Variant) -> Result<Self, VariantError> {
        let ty = VariantType::dict_entry_of(key.ty(), value.ty())
            .map_err(|_| VariantError::NonBasicKey(key.ty().clone()))?;
        Ok(Self::new(ty, Payload::Children(vec![key, value])))
    }

    /// A maybe of type `m<element>`, either holding a value or empty.
    pub fn maybe(element: VariantType, value: Option<Variant>) -> Result<Self, VariantError> {
        if let Some(value) = &value {
            if value.ty() != &element {
                return Err(VariantError::MaybeType {
                    expected: element,
                    found: value.ty().clone(),
                });
            }
        }
        Ok(Self::new(
            VariantType::maybe_of(&element),
            Payload::Children(value.into_iter().collect()),
        ))
    }

    /// Box a value inside a variant (`v`).
    pub fn boxed(inner: Variant) -> Self {
        Self::new(VariantType::VARIANT, Payload::Children(vec![inner]))
    }

    /// A byte string (`ay`).
    pub fn bytestring(bytes: &[u8]) -> Self {
        let children = bytes.iter().copied().map(Variant::from).collect();
        Self::new(VariantType::BYTESTRING, Payload::Children(children))
    }

    pub fn ty(&self) -> &VariantType {
        &self.0.ty
    }

    pub fn tag(&self) -> Tag {
        self.0.ty.tag()
    }

    /// Number of children; zero for scalars.
    pub fn n_children(&self) -> usize {
        match &self.0.payload {
            Payload::Children(children) => children.len(),
            _ => 0,
        }
    }

    /// Acquire the child at `index`.
    ///
    /// The returned handle keeps the child alive independently of `self`.
    pub fn child_value(&self, index: usize) -> Option<Variant> {
        match &self.0.payload {
            Payload::Children(children) => children.get(index).cloned(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.0.payload {
            Payload::Boolean(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.0.payload {
            Payload::Double(d) => Some(d),
            _ => None,
        }
    }

    /// Text of a string, object path or signature.
    pub fn as_str(&self) -> Option<&str> {
        match &self.0.payload {
            Payload::Text(s) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn children(&self) -> &[Variant] {
        match &self.0.payload {
            Payload::Children(children) => children,
            _ => &[],
        }
    }

    /// Number of live handles to this node, including `self`.
    pub fn handle_count(this: &Variant) -> usize {
        Arc::strong_count(&this.0)
    }
}

fn is_object_path(path: &str) -> bool {
    if path == "/" {
        return true;
    }
    let Some(rest) = path.strip_prefix('/') else {
        return false;
    };
    rest.split('/').all(|element| {
        !element.is_empty()
            && element
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_')
    })
}

impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Variant({})", self)
    }
}

macro_rules! impl_from_scalar {
    ($($rust:ty => $ty:ident, $payload:ident;)*) => {
        $(
            impl From<$rust> for Variant {
                fn from(v: $rust) -> Self {
                    Variant::new(VariantType::$ty, Payload::$payload(v))
                }
            }
        )*
    };
}

impl_from_scalar! {
    bool => BOOLEAN, Boolean;
    u8 => BYTE, Byte;
    i16 => INT16, Int16;
    u16 => UINT16, UInt16;
    i32 => INT32, Int32;
    u32 => UINT32, UInt32;
    i64 => INT64, Int64;
    u64 => UINT64, UInt64;
    f64 => DOUBLE, Double;
    String => STRING, Text;
}

impl From<&str> for Variant {
    fn from(v: &str) -> Self {
        Variant::from(v.to_string())
    }
}
