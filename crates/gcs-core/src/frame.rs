use std::collections::BTreeMap;

use crate::decode::{DecodeError, DecodeErrorKind};

/// A raw field value as demarshaled by the link adapter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl From<u8> for FieldValue {
    fn from(v: u8) -> Self { FieldValue::UInt(v.into()) }
}
impl From<u16> for FieldValue {
    fn from(v: u16) -> Self { FieldValue::UInt(v.into()) }
}
impl From<u32> for FieldValue {
    fn from(v: u32) -> Self { FieldValue::UInt(v.into()) }
}
impl From<u64> for FieldValue {
    fn from(v: u64) -> Self { FieldValue::UInt(v) }
}
impl From<i8> for FieldValue {
    fn from(v: i8) -> Self { FieldValue::Int(v.into()) }
}
impl From<i16> for FieldValue {
    fn from(v: i16) -> Self { FieldValue::Int(v.into()) }
}
impl From<i32> for FieldValue {
    fn from(v: i32) -> Self { FieldValue::Int(v.into()) }
}
impl From<i64> for FieldValue {
    fn from(v: i64) -> Self { FieldValue::Int(v) }
}
impl From<f32> for FieldValue {
    fn from(v: f32) -> Self { FieldValue::Float(v.into()) }
}
impl From<f64> for FieldValue {
    fn from(v: f64) -> Self { FieldValue::Float(v) }
}

/// One application-level message received from the vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub message_id: u32,
    pub fields: BTreeMap<String, FieldValue>,
}

impl Frame {
    pub fn new(message_id: u32) -> Self {
        Self { message_id, fields: BTreeMap::new() }
    }

    /// Builder-style insert, mostly used by the link adapter and tests.
    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Read a required field, coercing it to `T`.
    ///
    /// Integers must fit the target width and signedness; floats are only
    /// accepted for integer targets when finite and integral.
    pub fn field<T: FromField>(&self, name: &'static str) -> Result<T, DecodeError> {
        let raw = self.fields.get(name).ok_or(DecodeError {
            message_id: self.message_id,
            field: name,
            kind: DecodeErrorKind::Missing,
        })?;
        T::from_field(*raw).ok_or(DecodeError {
            message_id: self.message_id,
            field: name,
            kind: DecodeErrorKind::Malformed(*raw),
        })
    }
}

pub trait FromField: Sized {
    fn from_field(v: FieldValue) -> Option<Self>;
}

fn integral(v: FieldValue) -> Option<i128> {
    match v {
        FieldValue::Int(i) => Some(i.into()),
        FieldValue::UInt(u) => Some(u.into()),
        FieldValue::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e19 => {
            Some(f as i128)
        }
        FieldValue::Float(_) => None,
    }
}

macro_rules! int_from_field {
    ($($t:ty),*) => {$(
        impl FromField for $t {
            fn from_field(v: FieldValue) -> Option<Self> {
                integral(v).and_then(|i| <$t>::try_from(i).ok())
            }
        }
    )*};
}

int_from_field!(u8, u16, u32, u64, i8, i16, i32, i64);

impl FromField for f64 {
    fn from_field(v: FieldValue) -> Option<Self> {
        match v {
            FieldValue::Int(i) => Some(i as f64),
            FieldValue::UInt(u) => Some(u as f64),
            FieldValue::Float(f) => Some(f),
        }
    }
}

impl FromField for f32 {
    fn from_field(v: FieldValue) -> Option<Self> {
        let wide = f64::from_field(v)?;
        let narrow = wide as f32;
        // finite values past f32::MAX would silently become inf
        (narrow.is_finite() || !wide.is_finite()).then_some(narrow)
    }
}
