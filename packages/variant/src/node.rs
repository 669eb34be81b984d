//! Read access to variant trees.

use crate::variant::Payload;
use crate::{Tag, Variant, VariantType};

/// One node of a variant tree, viewed by tag.
///
/// Scalars carry their payload; containers carry nothing and are walked
/// with [`VariantNode::n_children`] and [`VariantNode::child_value`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum View<'a> {
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
    String(&'a str),
    ObjectPath(&'a str),
    Signature(&'a str),
    Variant,
    Maybe,
    Array,
    Tuple,
    DictEntry,
}

/// Access to a self-describing value tree.
///
/// This is the interface a decoder walks. Fetching a child acquires it: the
/// returned handle is owned by the caller and released when dropped.
///
/// # Object Safety
///
/// Not object-safe (`child_value` returns `Self`); decoders are generic
/// over the node type instead.
pub trait VariantNode: Sized {
    /// Full type of this node.
    fn ty(&self) -> &VariantType;

    /// Tag-directed view of this node.
    fn view(&self) -> View<'_>;

    /// Number of children; zero for scalars.
    fn n_children(&self) -> usize;

    /// Acquire the child at `index`, or `None` past the end.
    fn child_value(&self, index: usize) -> Option<Self>;
}

impl VariantNode for Variant {
    fn ty(&self) -> &VariantType {
        Variant::ty(self)
    }

    fn view(&self) -> View<'_> {
        match &self.0.payload {
            Payload::Boolean(b) => View::Boolean(*b),
            Payload::Byte(n) => View::Byte(*n),
            Payload::Int16(n) => View::Int16(*n),
            Payload::UInt16(n) => View::UInt16(*n),
            Payload::Int32(n) => View::Int32(*n),
            Payload::UInt32(n) => View::UInt32(*n),
            Payload::Int64(n) => View::Int64(*n),
            Payload::UInt64(n) => View::UInt64(*n),
            Payload::Handle(n) => View::Handle(*n),
            Payload::Double(d) => View::Double(*d),
            Payload::Text(s) => match self.tag() {
                Tag::ObjectPath => View::ObjectPath(s),
                Tag::Signature => View::Signature(s),
                _ => View::String(s),
            },
            Payload::Children(_) => match self.tag() {
                Tag::Variant => View::Variant,
                Tag::Maybe => View::Maybe,
                Tag::Tuple => View::Tuple,
                Tag::DictEntry => View::DictEntry,
                _ => View::Array,
            },
        }
    }

    fn n_children(&self) -> usize {
        Variant::n_children(self)
    }

    fn child_value(&self, index: usize) -> Option<Self> {
        Variant::child_value(self, index)
    }
}
