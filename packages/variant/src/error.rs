//! Error types for the variant layer.

use crate::VariantType;

/// Errors from validating a type string.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// The type string was empty.
    #[error("empty type string")]
    Empty,

    /// A character that does not start any type.
    #[error("invalid character {character:?} at position {position}")]
    InvalidCharacter { character: char, position: usize },

    /// The string ended inside a container type.
    #[error("type string ended unexpectedly at position {position}")]
    UnexpectedEnd { position: usize },

    /// Dictionary entry keys must be basic types.
    #[error("dictionary entry key at position {position} is not a basic type")]
    NonBasicKey { position: usize },

    /// A complete type was followed by more characters.
    #[error("trailing characters after a complete type at position {position}")]
    TrailingData { position: usize },

    /// Container nesting exceeded [`crate::MAX_DEPTH`].
    #[error("type nesting exceeds {max} levels")]
    TooDeep { max: usize },
}

/// Errors from building a [`crate::Variant`] out of parts.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VariantError {
    #[error("invalid object path {0:?}")]
    InvalidObjectPath(String),

    #[error("invalid signature {signature:?}: {source}")]
    InvalidSignature {
        signature: String,
        #[source]
        source: TypeError,
    },

    /// An array child does not have the array's element type.
    #[error("array element {index} has type '{found}', expected '{expected}'")]
    ElementType {
        index: usize,
        expected: VariantType,
        found: VariantType,
    },

    /// The value stored in a maybe does not have its element type.
    #[error("maybe holds a value of type '{found}', expected '{expected}'")]
    MaybeType {
        expected: VariantType,
        found: VariantType,
    },

    #[error("dictionary entry key type '{0}' is not a basic type")]
    NonBasicKey(VariantType),
}

/// Errors from parsing the GVariant text format.
///
/// Offsets are byte offsets into the parsed text.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected character {character:?} at offset {offset}")]
    UnexpectedChar { character: char, offset: usize },

    #[error("unexpected end of input")]
    UnexpectedEnd,

    #[error("unexpected {token} at offset {offset}")]
    UnexpectedToken { token: String, offset: usize },

    #[error("unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("invalid escape sequence at offset {offset}")]
    InvalidEscape { offset: usize },

    #[error("invalid type annotation at offset {offset}: {source}")]
    Type {
        offset: usize,
        #[source]
        source: TypeError,
    },

    #[error("invalid number {text:?} at offset {offset}")]
    InvalidNumber { text: String, offset: usize },

    #[error("number {text:?} at offset {offset} is out of range for type '{ty}'")]
    OutOfRange {
        text: String,
        ty: VariantType,
        offset: usize,
    },

    #[error("value at offset {offset} does not match type '{expected}'")]
    TypeMismatch { expected: VariantType, offset: usize },

    #[error("tuple at offset {offset} has {found} items, type '{expected}' needs {needed}")]
    Arity {
        expected: VariantType,
        needed: usize,
        found: usize,
        offset: usize,
    },

    #[error("conflicting types '{first}' and '{second}' at offset {offset}")]
    Conflict {
        first: VariantType,
        second: VariantType,
        offset: usize,
    },

    #[error("cannot infer a type for the value at offset {offset}; add a type annotation")]
    CannotInfer { offset: usize },

    #[error("invalid value at offset {offset}: {source}")]
    Value {
        offset: usize,
        #[source]
        source: VariantError,
    },

    #[error("nesting exceeds {max} levels")]
    TooDeep { max: usize },

    #[error("trailing input at offset {offset}")]
    Trailing { offset: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn type_error_display() {
        let e = TypeError::InvalidCharacter {
            character: 'z',
            position: 3,
        };
        assert_eq!(e.to_string(), "invalid character 'z' at position 3");
    }

    #[test]
    fn element_type_display() {
        let e = VariantError::ElementType {
            index: 2,
            expected: VariantType::INT32,
            found: VariantType::STRING,
        };
        let display = e.to_string();
        assert!(display.contains("element 2"));
        assert!(display.contains("'s'"));
        assert!(display.contains("'i'"));
    }

    #[test]
    fn parse_error_keeps_source() {
        let e = ParseError::Type {
            offset: 1,
            source: TypeError::Empty,
        };
        assert!(StdError::source(&e).is_some());

        let e = ParseError::UnexpectedEnd;
        assert!(StdError::source(&e).is_none());
    }
}
