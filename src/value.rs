//! The decoded value tree.

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// A decoded MaxMind DB value.
///
/// Values are detached copies: strings and byte payloads are owned, so a
/// `Value` outlives the [`Database`](crate::Database) it was read from.
///
/// Maps preserve the key order of the encoded record. The 128-bit
/// unsigned wire type is surfaced as [`Value::Bytes`] holding the raw
/// big-endian payload.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// UTF-8 string.
    String(String),
    /// Raw bytes, including 128-bit unsigned integers.
    Bytes(Vec<u8>),
    /// Unsigned 16-bit integer.
    Uint16(u16),
    /// Unsigned 32-bit integer.
    Uint32(u32),
    /// Unsigned 64-bit integer.
    Uint64(u64),
    /// Signed 32-bit integer.
    Int32(i32),
    /// IEEE 754 double-precision float.
    Double(f64),
    /// IEEE 754 single-precision float.
    Float(f32),
    /// Boolean.
    Boolean(bool),
    /// Map from string keys to values, in encoded order.
    Map(Vec<(String, Value)>),
    /// Ordered sequence of values.
    Array(Vec<Value>),
}

impl Value {
    /// The name of this value's variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Uint16(_) => "uint16",
            Value::Uint32(_) => "uint32",
            Value::Uint64(_) => "uint64",
            Value::Int32(_) => "int32",
            Value::Double(_) => "double",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::Map(_) => "map",
            Value::Array(_) => "array",
        }
    }

    /// The string slice, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The raw bytes, if this is a bytes value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// The value as `u16`, if this is a 16-bit unsigned integer.
    pub fn as_u16(&self) -> Option<u16> {
        match self {
            Value::Uint16(n) => Some(*n),
            _ => None,
        }
    }

    /// The value as `u32`, if this is a 32-bit unsigned integer.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::Uint32(n) => Some(*n),
            _ => None,
        }
    }

    /// The value as `u64`, if this is a 64-bit unsigned integer.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Uint64(n) => Some(*n),
            _ => None,
        }
    }

    /// The value as `i32`, if this is a signed integer.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(n) => Some(*n),
            _ => None,
        }
    }

    /// The primitive `f64`, if this is a double.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// The primitive `f32`, if this is a float.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// The boolean, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// The ordered key/value entries, if this is a map.
    pub fn as_map(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// The elements, if this is an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Looks up `key` in a map value. `None` for non-maps and missing keys.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Indexes into an array value. `None` for non-arrays and out-of-range
    /// indexes.
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.as_array()?.get(index)
    }
}

/// JSON-compatible serialization. Byte payloads have no JSON
/// representation and serialize as null.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Bytes(_) => serializer.serialize_none(),
            Value::Uint16(n) => serializer.serialize_u16(*n),
            Value::Uint32(n) => serializer.serialize_u32(*n),
            Value::Uint64(n) => serializer.serialize_u64(*n),
            Value::Int32(n) => serializer.serialize_i32(*n),
            Value::Double(d) => serializer.serialize_f64(*d),
            Value::Float(f) => serializer.serialize_f32(*f),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        assert_eq!(Value::String("x".to_owned()).as_str(), Some("x"));
        assert_eq!(Value::Uint16(7).as_u16(), Some(7));
        assert_eq!(Value::Uint32(7).as_u32(), Some(7));
        assert_eq!(Value::Uint64(7).as_u64(), Some(7));
        assert_eq!(Value::Int32(-7).as_i32(), Some(-7));
        assert_eq!(Value::Double(1.5).as_f64(), Some(1.5));
        assert_eq!(Value::Float(0.5).as_f32(), Some(0.5));
        assert_eq!(Value::Boolean(true).as_bool(), Some(true));
        assert_eq!(Value::Bytes(vec![1]).as_bytes(), Some(&[1_u8][..]));

        // Accessors do not coerce across variants.
        assert_eq!(Value::Uint32(7).as_u16(), None);
        assert_eq!(Value::Double(1.5).as_f32(), None);
        assert_eq!(Value::String("x".to_owned()).as_bool(), None);
    }

    #[test]
    fn test_map_access_preserves_order() {
        let map = Value::Map(vec![
            ("z".to_owned(), Value::Uint16(1)),
            ("a".to_owned(), Value::Uint16(2)),
        ]);
        assert_eq!(map.get("z"), Some(&Value::Uint16(1)));
        assert_eq!(map.get("a"), Some(&Value::Uint16(2)));
        assert_eq!(map.get("missing"), None);

        let keys: Vec<_> = map.as_map().unwrap().iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["z", "a"]);
    }

    #[test]
    fn test_array_access() {
        let arr = Value::Array(vec![Value::Uint16(1), Value::Uint16(2)]);
        assert_eq!(arr.get_index(1), Some(&Value::Uint16(2)));
        assert_eq!(arr.get_index(2), None);
        assert_eq!(Value::Uint16(1).get_index(0), None);
    }

    #[test]
    fn test_json_rendering() {
        let value = Value::Map(vec![
            ("name".to_owned(), Value::String("x".to_owned())),
            ("n".to_owned(), Value::Uint32(5)),
            ("neg".to_owned(), Value::Int32(-2)),
            ("raw".to_owned(), Value::Bytes(vec![0xDE, 0xAD])),
            ("ok".to_owned(), Value::Boolean(false)),
            (
                "items".to_owned(),
                Value::Array(vec![Value::Double(1.5), Value::Float(2.0)]),
            ),
        ]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(
            json,
            r#"{"name":"x","n":5,"neg":-2,"raw":null,"ok":false,"items":[1.5,2.0]}"#
        );
    }
}
