// earle-embed - Type conversion traits
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Type conversion between Rust and Earle values.
//!
//! | Rust Type | Earle Type |
//! |-----------|------------|
//! | `()` | `undefined` |
//! | `bool` | `integer` (1 / 0) |
//! | `i32`, `usize` | `integer` |
//! | `f32` | `float` |
//! | `String`, `&str` | `string` |
//! | `[f32; 2]`, `[f32; 3]` | `vector2`, `vector3` |
//! | `Vec<T>` | `array` |
//! | `Option<T>` | `T` or `undefined` |

use earle_vm::{EarleArray, EarleValue};
use num_traits::ToPrimitive;

use crate::error::{Error, Result};

/// Convert a Rust type into an `EarleValue`.
pub trait IntoEarleValue {
    fn into_earle_value(self) -> EarleValue;
}

/// Convert an `EarleValue` into a Rust type.
pub trait FromEarleValue: Sized {
    fn from_earle_value(value: &EarleValue) -> Result<Self>;
}

pub fn to_earle<T: IntoEarleValue>(value: T) -> EarleValue {
    value.into_earle_value()
}

pub fn from_earle<T: FromEarleValue>(value: &EarleValue) -> Result<T> {
    T::from_earle_value(value)
}

// ============================================================================
// IntoEarleValue implementations
// ============================================================================

impl IntoEarleValue for EarleValue {
    fn into_earle_value(self) -> EarleValue {
        self
    }
}

impl IntoEarleValue for () {
    fn into_earle_value(self) -> EarleValue {
        EarleValue::Undefined
    }
}

impl IntoEarleValue for bool {
    fn into_earle_value(self) -> EarleValue {
        EarleValue::from(self)
    }
}

impl IntoEarleValue for i32 {
    fn into_earle_value(self) -> EarleValue {
        EarleValue::Integer(self)
    }
}

/// Counts past `i32::MAX` have no Earle representation and become undefined.
impl IntoEarleValue for usize {
    fn into_earle_value(self) -> EarleValue {
        self.to_i32().map_or(EarleValue::Undefined, EarleValue::Integer)
    }
}

impl IntoEarleValue for f32 {
    fn into_earle_value(self) -> EarleValue {
        EarleValue::Float(self)
    }
}

impl IntoEarleValue for String {
    fn into_earle_value(self) -> EarleValue {
        EarleValue::from(self)
    }
}

impl IntoEarleValue for &str {
    fn into_earle_value(self) -> EarleValue {
        EarleValue::string(self)
    }
}

impl IntoEarleValue for [f32; 2] {
    fn into_earle_value(self) -> EarleValue {
        EarleValue::Vector2(self)
    }
}

impl IntoEarleValue for [f32; 3] {
    fn into_earle_value(self) -> EarleValue {
        EarleValue::Vector3(self)
    }
}

impl<T: IntoEarleValue> IntoEarleValue for Vec<T> {
    fn into_earle_value(self) -> EarleValue {
        let values = self.into_iter().map(IntoEarleValue::into_earle_value).collect();
        EarleValue::Array(EarleArray::from_vec(values))
    }
}

impl<T: IntoEarleValue> IntoEarleValue for Option<T> {
    fn into_earle_value(self) -> EarleValue {
        match self {
            Some(value) => value.into_earle_value(),
            None => EarleValue::Undefined,
        }
    }
}

// ============================================================================
// FromEarleValue implementations
// ============================================================================

impl FromEarleValue for EarleValue {
    fn from_earle_value(value: &EarleValue) -> Result<Self> {
        Ok(value.clone())
    }
}

impl FromEarleValue for () {
    fn from_earle_value(value: &EarleValue) -> Result<Self> {
        match value {
            EarleValue::Undefined => Ok(()),
            other => Err(Error::type_error("undefined", other.type_name())),
        }
    }
}

/// Script truthiness: undefined and 0 are false.
impl FromEarleValue for bool {
    fn from_earle_value(value: &EarleValue) -> Result<Self> {
        Ok(value.is_truthy())
    }
}

impl FromEarleValue for i32 {
    fn from_earle_value(value: &EarleValue) -> Result<Self> {
        value
            .as_integer()
            .ok_or_else(|| Error::type_error("integer", value.type_name()))
    }
}

impl FromEarleValue for f32 {
    fn from_earle_value(value: &EarleValue) -> Result<Self> {
        value
            .as_number()
            .ok_or_else(|| Error::type_error("number", value.type_name()))
    }
}

impl FromEarleValue for String {
    fn from_earle_value(value: &EarleValue) -> Result<Self> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::type_error("string", value.type_name()))
    }
}

impl FromEarleValue for [f32; 2] {
    fn from_earle_value(value: &EarleValue) -> Result<Self> {
        match value {
            EarleValue::Vector2(v) => Ok(*v),
            other => Err(Error::type_error("vector2", other.type_name())),
        }
    }
}

impl FromEarleValue for [f32; 3] {
    fn from_earle_value(value: &EarleValue) -> Result<Self> {
        match value {
            EarleValue::Vector3(v) => Ok(*v),
            other => Err(Error::type_error("vector3", other.type_name())),
        }
    }
}

impl<T: FromEarleValue> FromEarleValue for Vec<T> {
    fn from_earle_value(value: &EarleValue) -> Result<Self> {
        match value {
            EarleValue::Array(array) => array.to_vec().iter().map(T::from_earle_value).collect(),
            other => Err(Error::type_error("array", other.type_name())),
        }
    }
}

impl<T: FromEarleValue> FromEarleValue for Option<T> {
    fn from_earle_value(value: &EarleValue) -> Result<Self> {
        match value {
            EarleValue::Undefined => Ok(None),
            other => T::from_earle_value(other).map(Some),
        }
    }
}
