//! Variant to [`Value`] decoding.
//!
//! The decoder walks a [`VariantNode`] tree depth first. Every child it
//! fetches is an owned handle that is dropped at the end of its loop
//! iteration, or as soon as an error propagates out of it; the node passed
//! in is never released by the decoder.

use tinydconf_variant::{VariantNode, View};

use crate::{DecodeError, Value};

/// Decode a variant tree into a [`Value`].
///
/// # Errors
///
/// * [`DecodeError::UnsupportedType`] - the node, or any node below it, is a
///   boxed variant, a maybe or a dictionary entry. Note that dictionaries
///   are arrays of dictionary entries, so only empty ones decode.
/// * [`DecodeError::AllocationFailure`] - storage for a container's
///   children could not be reserved. Reported before any child is fetched.
/// * [`DecodeError::MissingChild`] - the node reported more children than
///   it produced.
///
/// # Example
///
/// ```rust
/// use tinydconf::{decode, Value};
/// use tinydconf_variant::Variant;
///
/// let variant = Variant::parse("[(1, 'a'), (2, 'b')]").unwrap();
/// let value = decode(&variant).unwrap();
/// assert_eq!(
///     value,
///     Value::Array(vec![
///         Value::Tuple(vec![Value::from(1i64), Value::from("a")]),
///         Value::Tuple(vec![Value::from(2i64), Value::from("b")]),
///     ])
/// );
/// ```
pub fn decode<N: VariantNode>(node: &N) -> Result<Value, DecodeError> {
    match node.view() {
        View::Boolean(b) => Ok(Value::Bool(b)),
        View::Byte(n) => Ok(Value::Integer(n.into())),
        View::Int16(n) => Ok(Value::Integer(n.into())),
        View::UInt16(n) => Ok(Value::Integer(n.into())),
        View::Int32(n) => Ok(Value::Integer(n.into())),
        View::UInt32(n) => Ok(Value::Integer(n.into())),
        View::Int64(n) => Ok(Value::Integer(n)),
        View::UInt64(n) => Ok(Value::from(n)),
        View::Handle(n) => Ok(Value::Integer(n.into())),
        View::Double(f) => Ok(Value::Float(f)),
        View::String(s) | View::ObjectPath(s) | View::Signature(s) => {
            Ok(Value::String(s.to_owned()))
        }
        View::Array => decode_children(node).map(Value::Array),
        View::Tuple => decode_children(node).map(Value::Tuple),
        View::Variant | View::Maybe | View::DictEntry => Err(DecodeError::UnsupportedType {
            ty: node.ty().clone(),
        }),
    }
}

/// Decode an optional node; absence is `Ok(None)`, not an error.
pub fn decode_optional<N: VariantNode>(node: Option<&N>) -> Result<Option<Value>, DecodeError> {
    node.map(decode).transpose()
}

fn decode_children<N: VariantNode>(node: &N) -> Result<Vec<Value>, DecodeError> {
    let len = node.n_children();
    let mut items = Vec::new();
    items
        .try_reserve_exact(len)
        .map_err(|_| DecodeError::AllocationFailure { len })?;

    for index in 0..len {
        let child = node
            .child_value(index)
            .ok_or(DecodeError::MissingChild { index, len })?;
        items.push(decode(&child)?);
    }
    Ok(items)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use tinydconf_variant::{Variant, VariantType};

    proptest! {
        #[test]
        fn prop_int64_round_trip(n in any::<i64>()) {
            prop_assert_eq!(decode(&Variant::from(n)).unwrap(), Value::Integer(n));
        }

        #[test]
        fn prop_uint64_round_trip(n in any::<u64>()) {
            let value = decode(&Variant::from(n)).unwrap();
            prop_assert_eq!(value.as_u64(), Some(n));
        }

        #[test]
        fn prop_int32_round_trip(n in any::<i32>()) {
            prop_assert_eq!(decode(&Variant::from(n)).unwrap(), Value::from(n));
        }

        #[test]
        fn prop_double_round_trip(f in any::<f64>().prop_filter("not NaN", |f| !f.is_nan())) {
            prop_assert_eq!(decode(&Variant::from(f)).unwrap(), Value::Float(f));
        }

        #[test]
        fn prop_string_round_trip(s in any::<String>()) {
            prop_assert_eq!(decode(&Variant::from(s.as_str())).unwrap(), Value::String(s));
        }

        /// Decoding the same variant twice yields equal results.
        #[test]
        fn prop_decode_is_repeatable(items in prop::collection::vec((any::<i32>(), ".*"), 0..8)) {
            let children = items
                .iter()
                .map(|(n, s)| Variant::tuple(vec![Variant::from(*n), Variant::from(s.as_str())]))
                .collect::<Vec<_>>();
            let element = VariantType::new("(is)").unwrap();
            let array = Variant::array(element, children).unwrap();

            let first = decode(&array).unwrap();
            let second = decode(&array).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.as_slice().map(<[Value]>::len), Some(items.len()));
        }
    }
}
