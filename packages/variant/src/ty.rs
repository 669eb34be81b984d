//! Type strings and tags.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::TypeError;

/// Maximum container nesting accepted when parsing type strings or text.
pub const MAX_DEPTH: usize = 128;

/// The class of a type: the first character of its type string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    Boolean,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Handle,
    Double,
    String,
    ObjectPath,
    Signature,
    Variant,
    Maybe,
    Array,
    Tuple,
    DictEntry,
}

impl Tag {
    fn from_code(code: u8) -> Option<Tag> {
        let tag = match code {
            b'b' => Tag::Boolean,
            b'y' => Tag::Byte,
            b'n' => Tag::Int16,
            b'q' => Tag::UInt16,
            b'i' => Tag::Int32,
            b'u' => Tag::UInt32,
            b'x' => Tag::Int64,
            b't' => Tag::UInt64,
            b'h' => Tag::Handle,
            b'd' => Tag::Double,
            b's' => Tag::String,
            b'o' => Tag::ObjectPath,
            b'g' => Tag::Signature,
            b'v' => Tag::Variant,
            b'm' => Tag::Maybe,
            b'a' => Tag::Array,
            b'(' => Tag::Tuple,
            b'{' => Tag::DictEntry,
            _ => return None,
        };
        Some(tag)
    }

    /// Basic types are the scalars that may key a dictionary.
    pub fn is_basic(self) -> bool {
        !matches!(
            self,
            Tag::Variant | Tag::Maybe | Tag::Array | Tag::Tuple | Tag::DictEntry
        )
    }

    /// Check if this tag holds an integer (handles included).
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Tag::Byte
                | Tag::Int16
                | Tag::UInt16
                | Tag::Int32
                | Tag::UInt32
                | Tag::Int64
                | Tag::UInt64
                | Tag::Handle
        )
    }

    /// Human readable name, e.g. `"object path"`.
    pub fn name(self) -> &'static str {
        match self {
            Tag::Boolean => "boolean",
            Tag::Byte => "byte",
            Tag::Int16 => "int16",
            Tag::UInt16 => "uint16",
            Tag::Int32 => "int32",
            Tag::UInt32 => "uint32",
            Tag::Int64 => "int64",
            Tag::UInt64 => "uint64",
            Tag::Handle => "handle",
            Tag::Double => "double",
            Tag::String => "string",
            Tag::ObjectPath => "object path",
            Tag::Signature => "signature",
            Tag::Variant => "variant",
            Tag::Maybe => "maybe",
            Tag::Array => "array",
            Tag::Tuple => "tuple",
            Tag::DictEntry => "dict entry",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated, definite GVariant type string such as `"a(is)"`.
///
/// # Examples
///
/// ```rust
/// use tinydconf_variant::{Tag, VariantType};
///
/// let ty = VariantType::new("a(is)").unwrap();
/// assert_eq!(ty.tag(), Tag::Array);
/// assert_eq!(ty.element().unwrap().as_str(), "(is)");
///
/// assert!(VariantType::new("a").is_err());
/// assert!(VariantType::new("{as}").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantType(Cow<'static, str>);

impl VariantType {
    pub const BOOLEAN: VariantType = VariantType(Cow::Borrowed("b"));
    pub const BYTE: VariantType = VariantType(Cow::Borrowed("y"));
    pub const INT16: VariantType = VariantType(Cow::Borrowed("n"));
    pub const UINT16: VariantType = VariantType(Cow::Borrowed("q"));
    pub const INT32: VariantType = VariantType(Cow::Borrowed("i"));
    pub const UINT32: VariantType = VariantType(Cow::Borrowed("u"));
    pub const INT64: VariantType = VariantType(Cow::Borrowed("x"));
    pub const UINT64: VariantType = VariantType(Cow::Borrowed("t"));
    pub const HANDLE: VariantType = VariantType(Cow::Borrowed("h"));
    pub const DOUBLE: VariantType = VariantType(Cow::Borrowed("d"));
    pub const STRING: VariantType = VariantType(Cow::Borrowed("s"));
    pub const OBJECT_PATH: VariantType = VariantType(Cow::Borrowed("o"));
    pub const SIGNATURE: VariantType = VariantType(Cow::Borrowed("g"));
    pub const VARIANT: VariantType = VariantType(Cow::Borrowed("v"));
    pub const UNIT: VariantType = VariantType(Cow::Borrowed("()"));
    pub const BYTESTRING: VariantType = VariantType(Cow::Borrowed("ay"));

    /// Parse and validate a type string.
    pub fn new(s: impl Into<String>) -> Result<Self, TypeError> {
        let s = s.into();
        if s.is_empty() {
            return Err(TypeError::Empty);
        }
        let end = scan(&s, 0, 0)?;
        if end != s.len() {
            return Err(TypeError::TrailingData { position: end });
        }
        Ok(VariantType(Cow::Owned(s)))
    }

    fn owned(s: String) -> Self {
        VariantType(Cow::Owned(s))
    }

    /// The type string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The class of this type.
    pub fn tag(&self) -> Tag {
        match Tag::from_code(self.0.as_bytes()[0]) {
            Some(tag) => tag,
            None => unreachable!("type strings are validated on construction"),
        }
    }

    pub fn is_basic(&self) -> bool {
        self.tag().is_basic()
    }

    /// Element type of an array or maybe type.
    pub fn element(&self) -> Option<VariantType> {
        match self.tag() {
            Tag::Array | Tag::Maybe => Some(Self::owned(self.0[1..].to_string())),
            _ => None,
        }
    }

    /// Item types of a tuple, or `[key, value]` for a dictionary entry.
    ///
    /// Empty for every other class.
    pub fn items(&self) -> Vec<VariantType> {
        if !matches!(self.tag(), Tag::Tuple | Tag::DictEntry) {
            return Vec::new();
        }
        let bytes = self.0.as_bytes();
        let mut items = Vec::new();
        let mut pos = 1;
        while bytes[pos] != b')' && bytes[pos] != b'}' {
            let end = skip(bytes, pos);
            items.push(Self::owned(self.0[pos..end].to_string()));
            pos = end;
        }
        items
    }

    // The builders below do not check `MAX_DEPTH`. A value of a deeper
    // type prints as text that `Variant::parse` rejects with `TooDeep`.

    /// `a<element>`
    pub fn array_of(element: &VariantType) -> VariantType {
        Self::owned(format!("a{}", element))
    }

    /// `m<element>`
    pub fn maybe_of(element: &VariantType) -> VariantType {
        Self::owned(format!("m{}", element))
    }

    /// `(<items>...)`
    pub fn tuple_of<'a>(items: impl IntoIterator<Item = &'a VariantType>) -> VariantType {
        let mut s = String::from("(");
        for item in items {
            s.push_str(item.as_str());
        }
        s.push(')');
        Self::owned(s)
    }

    /// `{<key><value>}`; the key must be basic.
    pub fn dict_entry_of(key: &VariantType, value: &VariantType) -> Result<VariantType, TypeError> {
        if !key.is_basic() {
            return Err(TypeError::NonBasicKey { position: 1 });
        }
        Ok(Self::owned(format!("{{{}{}}}", key, value)))
    }
}

impl fmt::Display for VariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for VariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VariantType({:?})", self.as_str())
    }
}

impl FromStr for VariantType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VariantType::new(s)
    }
}

impl AsRef<str> for VariantType {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Scan one complete type starting at `pos`, returning the end offset.
pub(crate) fn scan(s: &str, pos: usize, depth: usize) -> Result<usize, TypeError> {
    if depth > MAX_DEPTH {
        return Err(TypeError::TooDeep { max: MAX_DEPTH });
    }
    let bytes = s.as_bytes();
    let Some(&code) = bytes.get(pos) else {
        return Err(TypeError::UnexpectedEnd { position: pos });
    };

    match code {
        b'a' | b'm' => scan(s, pos + 1, depth + 1),
        b'(' => {
            let mut p = pos + 1;
            loop {
                match bytes.get(p) {
                    Some(b')') => return Ok(p + 1),
                    Some(_) => p = scan(s, p, depth + 1)?,
                    None => return Err(TypeError::UnexpectedEnd { position: p }),
                }
            }
        }
        b'{' => {
            let key = pos + 1;
            match bytes.get(key).copied().and_then(Tag::from_code) {
                Some(tag) if tag.is_basic() => {}
                Some(_) => return Err(TypeError::NonBasicKey { position: key }),
                None if key >= bytes.len() => {
                    return Err(TypeError::UnexpectedEnd { position: key })
                }
                None => return Err(invalid_character(s, key)),
            }
            let end = scan(s, key + 1, depth + 1)?;
            match bytes.get(end) {
                Some(b'}') => Ok(end + 1),
                Some(_) => Err(invalid_character(s, end)),
                None => Err(TypeError::UnexpectedEnd { position: end }),
            }
        }
        _ => match Tag::from_code(code) {
            Some(_) => Ok(pos + 1),
            None => Err(invalid_character(s, pos)),
        },
    }
}

fn invalid_character(s: &str, position: usize) -> TypeError {
    TypeError::InvalidCharacter {
        character: s[position..].chars().next().unwrap_or('\0'),
        position,
    }
}

// Only called on validated type strings.
fn skip(bytes: &[u8], pos: usize) -> usize {
    match bytes[pos] {
        b'a' | b'm' => skip(bytes, pos + 1),
        b'(' | b'{' => {
            let mut p = pos + 1;
            while bytes[p] != b')' && bytes[p] != b'}' {
                p = skip(bytes, p);
            }
            p + 1
        }
        _ => pos + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_types_parse() {
        for code in "bynqiuxthdsogv".chars() {
            let ty = VariantType::new(code.to_string()).unwrap();
            assert_eq!(ty.as_str().len(), 1);
        }
        assert!(VariantType::new("s").unwrap().is_basic());
        assert!(!VariantType::new("v").unwrap().is_basic());
    }

    #[test]
    fn container_types_parse() {
        assert_eq!(VariantType::new("as").unwrap().tag(), Tag::Array);
        assert_eq!(VariantType::new("mi").unwrap().tag(), Tag::Maybe);
        assert_eq!(VariantType::new("()").unwrap().tag(), Tag::Tuple);
        assert_eq!(VariantType::new("(is(ad)v)").unwrap().tag(), Tag::Tuple);
        assert_eq!(VariantType::new("a{sv}").unwrap().tag(), Tag::Array);
        assert_eq!(VariantType::new("{sv}").unwrap().tag(), Tag::DictEntry);
    }

    #[test]
    fn invalid_types_rejected() {
        assert_eq!(VariantType::new(""), Err(TypeError::Empty));
        assert_eq!(
            VariantType::new("a"),
            Err(TypeError::UnexpectedEnd { position: 1 })
        );
        assert_eq!(
            VariantType::new("(is"),
            Err(TypeError::UnexpectedEnd { position: 3 })
        );
        assert_eq!(
            VariantType::new("ii"),
            Err(TypeError::TrailingData { position: 1 })
        );
        assert_eq!(
            VariantType::new("{vs}"),
            Err(TypeError::NonBasicKey { position: 1 })
        );
        assert_eq!(
            VariantType::new("{sii}"),
            Err(TypeError::InvalidCharacter {
                character: 'i',
                position: 3
            })
        );
        assert!(matches!(
            VariantType::new("r"),
            Err(TypeError::InvalidCharacter { character: 'r', .. })
        ));
        assert!(VariantType::new("*").is_err());
    }

    #[test]
    fn nesting_is_capped() {
        let deep = format!("{}i", "a".repeat(MAX_DEPTH + 1));
        assert_eq!(
            VariantType::new(deep),
            Err(TypeError::TooDeep { max: MAX_DEPTH })
        );

        let ok = format!("{}i", "a".repeat(MAX_DEPTH));
        assert!(VariantType::new(ok).is_ok());
    }

    #[test]
    fn element_and_items() {
        let ty = VariantType::new("a(sa{sv}i)").unwrap();
        let element = ty.element().unwrap();
        assert_eq!(element.as_str(), "(sa{sv}i)");

        let items: Vec<String> = element.items().iter().map(|t| t.to_string()).collect();
        assert_eq!(items, vec!["s", "a{sv}", "i"]);

        let entry = VariantType::new("{sv}").unwrap();
        assert_eq!(entry.items(), vec![VariantType::STRING, VariantType::VARIANT]);

        assert!(VariantType::UNIT.items().is_empty());
        assert!(VariantType::INT32.items().is_empty());
        assert_eq!(VariantType::INT32.element(), None);
    }

    #[test]
    fn builders_produce_valid_types() {
        let entry = VariantType::dict_entry_of(&VariantType::STRING, &VariantType::VARIANT).unwrap();
        let dict = VariantType::array_of(&entry);
        assert_eq!(dict.as_str(), "a{sv}");
        assert_eq!(VariantType::new(dict.as_str()).unwrap(), dict);

        let tuple = VariantType::tuple_of([&VariantType::INT32, &dict]);
        assert_eq!(tuple.as_str(), "(ia{sv})");

        assert_eq!(VariantType::maybe_of(&tuple).as_str(), "m(ia{sv})");

        assert!(VariantType::dict_entry_of(&VariantType::VARIANT, &VariantType::INT32).is_err());
    }

    #[test]
    fn tag_names() {
        assert_eq!(Tag::ObjectPath.to_string(), "object path");
        assert_eq!(Tag::DictEntry.to_string(), "dict entry");
        assert!(Tag::Handle.is_integer());
        assert!(!Tag::Double.is_integer());
    }
}
