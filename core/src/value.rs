//! Dynamically typed SQL values.

use crate::error::{MapError, Result};
use std::fmt;

/// A single SQL value as carried by descriptors, statement arguments and rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Reports whether this is the zero value of its type.
    ///
    /// `NULL`, `0`, `0.0`, `""` and empty blobs are all default. Required
    /// columns are only satisfied by non-default values.
    pub fn is_default(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Integer(v) => *v == 0,
            Value::Real(v) => *v == 0.0,
            Value::Text(v) => v.is_empty(),
            Value::Blob(v) => v.is_empty(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
        }
    }

    /// Raw bytes of a text or blob value, used for JSON columns.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Text(v) => Some(v.as_bytes()),
            Value::Blob(v) => Some(v),
            _ => None,
        }
    }

    /// Encoded JSON document held by a JSON column, `None` when empty.
    ///
    /// SQLite hands back numeric affinity for scalar documents, so integers
    /// and reals are rendered to their JSON text.
    pub fn into_json_bytes(self) -> Option<Vec<u8>> {
        match self {
            Value::Null => None,
            Value::Integer(v) => Some(v.to_string().into_bytes()),
            Value::Real(v) => Some(v.to_string().into_bytes()),
            Value::Text(v) => (!v.is_empty()).then(|| v.into_bytes()),
            Value::Blob(v) => (!v.is_empty()).then_some(v),
        }
    }

    /// Decodes into a concrete field type.
    #[inline]
    pub fn decode<T: FromValue>(self) -> Result<T> {
        T::from_value(self)
    }

    /// Hashable identity used to deduplicate rows by primary key.
    pub fn key(&self) -> Key {
        match self {
            Value::Null => Key::Null,
            Value::Integer(v) => Key::Integer(*v),
            Value::Real(v) => Key::Real(v.to_bits()),
            Value::Text(v) => Key::Text(v.clone()),
            Value::Blob(v) => Key::Blob(v.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Real(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "'{v}'"),
            Value::Blob(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

/// Hashable projection of a [`Value`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Null,
    Integer(i64),
    Real(u64),
    Text(String),
    Blob(Vec<u8>),
    /// Row position, for schemas without a primary key.
    Position(usize),
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                #[inline]
                fn from(value: $ty) -> Self {
                    Value::Integer(value as i64)
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Integer(value as i64)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Real(value as f64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Blob(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Conversion from a [`Value`] into a field type.
///
/// `NULL` decodes to the type's zero value so that outer-join misses and
/// nullable columns can land in plain fields; use `Option<T>` to keep the
/// distinction.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self>;
}

fn mismatch<T>(expected: &str, value: &Value) -> Result<T> {
    Err(MapError::Mapping(format!(
        "cannot decode {} value {value} as {expected}",
        value.type_name()
    )))
}

macro_rules! impl_from_value_int {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self> {
                    match value {
                        Value::Null => Ok(0),
                        Value::Integer(v) => <$ty>::try_from(v).map_err(|_| {
                            MapError::Mapping(format!(
                                "integer {v} out of range for {}",
                                stringify!($ty)
                            ))
                        }),
                        other => mismatch(stringify!($ty), &other),
                    }
                }
            }
        )*
    };
}

impl_from_value_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(false),
            Value::Integer(v) => Ok(v != 0),
            other => mismatch("bool", &other),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(0.0),
            Value::Real(v) => Ok(v),
            Value::Integer(v) => Ok(v as f64),
            other => mismatch("f64", &other),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(String::new()),
            Value::Text(v) => Ok(v),
            Value::Blob(v) => String::from_utf8(v)
                .map_err(|e| MapError::Mapping(format!("blob is not UTF-8: {e}"))),
            other => mismatch("String", &other),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Blob(v) => Ok(v),
            Value::Text(v) => Ok(v.into_bytes()),
            other => mismatch("Vec<u8>", &other),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl FromValue for Value {
    #[inline]
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

#[cfg(feature = "rusqlite")]
mod sqlite {
    use super::Value;
    use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

    impl ToSql for Value {
        fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
            Ok(match self {
                Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
                Value::Integer(v) => ToSqlOutput::Borrowed(ValueRef::Integer(*v)),
                Value::Real(v) => ToSqlOutput::Borrowed(ValueRef::Real(*v)),
                Value::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
                Value::Blob(v) => ToSqlOutput::Borrowed(ValueRef::Blob(v)),
            })
        }
    }

    impl FromSql for Value {
        fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
            Ok(match value {
                ValueRef::Null => Value::Null,
                ValueRef::Integer(v) => Value::Integer(v),
                ValueRef::Real(v) => Value::Real(v),
                ValueRef::Text(v) => Value::Text(String::from_utf8_lossy(v).into_owned()),
                ValueRef::Blob(v) => Value::Blob(v.to_vec()),
            })
        }
    }
}
