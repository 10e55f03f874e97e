// earle-vm - Operator table for Earle
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Operator dispatch by `(opcode, left kind, right kind)`.
//!
//! A lookup tries the exact kinds first, then `(Any, right)`, then
//! `(left, Any)`. Missing combinations evaluate to undefined: type
//! mismatches in Earle are soft.

use std::collections::HashMap;

use crate::opcode::OpCode;
use crate::value::{EarleValue, ValueKind};

pub type BinaryHandler = fn(&EarleValue, &EarleValue) -> EarleValue;
pub type UnaryHandler = fn(&EarleValue) -> EarleValue;

#[derive(Debug, Clone, Default)]
pub struct OperatorTable {
    binary: HashMap<(OpCode, ValueKind, ValueKind), BinaryHandler>,
    unary: HashMap<(OpCode, ValueKind), UnaryHandler>,
}

impl OperatorTable {
    /// An empty table: every operator evaluates to undefined.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard Earle operators.
    pub fn standard() -> Self {
        let mut table = Self::new();
        register_arithmetic(&mut table);
        register_comparison(&mut table);
        register_bitwise(&mut table);
        register_strings(&mut table);
        register_vectors(&mut table);
        register_unary(&mut table);
        table
    }

    pub fn register_binary(&mut self, op: OpCode, left: ValueKind, right: ValueKind, handler: BinaryHandler) {
        self.binary.insert((op, left, right), handler);
    }

    pub fn register_unary(&mut self, op: OpCode, operand: ValueKind, handler: UnaryHandler) {
        self.unary.insert((op, operand), handler);
    }

    pub fn binary_handler(&self, op: OpCode, left: ValueKind, right: ValueKind) -> Option<BinaryHandler> {
        self.binary
            .get(&(op, left, right))
            .or_else(|| self.binary.get(&(op, ValueKind::Any, right)))
            .or_else(|| self.binary.get(&(op, left, ValueKind::Any)))
            .copied()
    }

    pub fn evaluate_binary(&self, op: OpCode, left: &EarleValue, right: &EarleValue) -> EarleValue {
        match self.binary_handler(op, left.kind(), right.kind()) {
            Some(handler) => handler(left, right),
            None => EarleValue::Undefined,
        }
    }

    pub fn evaluate_unary(&self, op: OpCode, operand: &EarleValue) -> EarleValue {
        let handler = self
            .unary
            .get(&(op, operand.kind()))
            .or_else(|| self.unary.get(&(op, ValueKind::Any)));
        match handler {
            Some(handler) => handler(operand),
            None => EarleValue::Undefined,
        }
    }
}

// ============================================================================
// Numeric helpers
// ============================================================================

fn int_pair(left: &EarleValue, right: &EarleValue) -> Option<(i32, i32)> {
    Some((left.as_integer()?, right.as_integer()?))
}

fn float_pair(left: &EarleValue, right: &EarleValue) -> Option<(f32, f32)> {
    Some((left.as_number()?, right.as_number()?))
}

/// Register `handler` for every numeric kind pair that is mixed or float.
fn register_mixed(table: &mut OperatorTable, op: OpCode, handler: BinaryHandler) {
    for (left, right) in [
        (ValueKind::Float, ValueKind::Float),
        (ValueKind::Integer, ValueKind::Float),
        (ValueKind::Float, ValueKind::Integer),
    ] {
        table.register_binary(op, left, right, handler);
    }
}

fn register_numeric(table: &mut OperatorTable, op: OpCode, int: BinaryHandler, float: BinaryHandler) {
    table.register_binary(op, ValueKind::Integer, ValueKind::Integer, int);
    register_mixed(table, op, float);
}

fn int_result(value: Option<i32>) -> EarleValue {
    value.map_or(EarleValue::Undefined, EarleValue::Integer)
}

fn float_result(value: Option<f32>) -> EarleValue {
    value.map_or(EarleValue::Undefined, EarleValue::Float)
}

fn register_arithmetic(table: &mut OperatorTable) {
    register_numeric(
        table,
        OpCode::Add,
        |l, r| int_result(int_pair(l, r).map(|(a, b)| a.wrapping_add(b))),
        |l, r| float_result(float_pair(l, r).map(|(a, b)| a + b)),
    );
    register_numeric(
        table,
        OpCode::Subtract,
        |l, r| int_result(int_pair(l, r).map(|(a, b)| a.wrapping_sub(b))),
        |l, r| float_result(float_pair(l, r).map(|(a, b)| a - b)),
    );
    register_numeric(
        table,
        OpCode::Multiply,
        |l, r| int_result(int_pair(l, r).map(|(a, b)| a.wrapping_mul(b))),
        |l, r| float_result(float_pair(l, r).map(|(a, b)| a * b)),
    );
    register_numeric(
        table,
        OpCode::Divide,
        |l, r| int_result(int_pair(l, r).and_then(|(a, b)| a.checked_div(b))),
        |l, r| float_result(float_pair(l, r).map(|(a, b)| a / b)),
    );
    register_numeric(
        table,
        OpCode::Modulo,
        |l, r| int_result(int_pair(l, r).and_then(|(a, b)| a.checked_rem(b))),
        |l, r| float_result(float_pair(l, r).map(|(a, b)| a % b)),
    );
}

fn register_comparison(table: &mut OperatorTable) {
    register_numeric(
        table,
        OpCode::Less,
        |l, r| int_pair(l, r).map(|(a, b)| a < b).into_value(),
        |l, r| float_pair(l, r).map(|(a, b)| a < b).into_value(),
    );
    register_numeric(
        table,
        OpCode::LessOrEqual,
        |l, r| int_pair(l, r).map(|(a, b)| a <= b).into_value(),
        |l, r| float_pair(l, r).map(|(a, b)| a <= b).into_value(),
    );
    register_numeric(
        table,
        OpCode::Greater,
        |l, r| int_pair(l, r).map(|(a, b)| a > b).into_value(),
        |l, r| float_pair(l, r).map(|(a, b)| a > b).into_value(),
    );
    register_numeric(
        table,
        OpCode::GreaterOrEqual,
        |l, r| int_pair(l, r).map(|(a, b)| a >= b).into_value(),
        |l, r| float_pair(l, r).map(|(a, b)| a >= b).into_value(),
    );
    register_numeric(
        table,
        OpCode::Equal,
        |l, r| int_pair(l, r).map(|(a, b)| a == b).into_value(),
        |l, r| float_pair(l, r).map(|(a, b)| a == b).into_value(),
    );
    register_numeric(
        table,
        OpCode::NotEqual,
        |l, r| int_pair(l, r).map(|(a, b)| a != b).into_value(),
        |l, r| float_pair(l, r).map(|(a, b)| a != b).into_value(),
    );

    // Same-kind identity comparisons.
    for kind in [
        ValueKind::String,
        ValueKind::Vector2,
        ValueKind::Vector3,
        ValueKind::Array,
        ValueKind::Structure,
        ValueKind::Function,
        ValueKind::Object,
    ] {
        table.register_binary(OpCode::Equal, kind, kind, |l, r| EarleValue::from(l == r));
        table.register_binary(OpCode::NotEqual, kind, kind, |l, r| EarleValue::from(l != r));
    }

    // Anything compared with undefined.
    table.register_binary(OpCode::Equal, ValueKind::Any, ValueKind::Undefined, |l, _| {
        EarleValue::from(!l.is_defined())
    });
    table.register_binary(OpCode::Equal, ValueKind::Undefined, ValueKind::Any, |_, r| {
        EarleValue::from(!r.is_defined())
    });
    table.register_binary(OpCode::NotEqual, ValueKind::Any, ValueKind::Undefined, |l, _| {
        EarleValue::from(l.is_defined())
    });
    table.register_binary(OpCode::NotEqual, ValueKind::Undefined, ValueKind::Any, |_, r| {
        EarleValue::from(r.is_defined())
    });

    table.register_binary(OpCode::Less, ValueKind::String, ValueKind::String, |l, r| {
        EarleValue::from(l.as_str() < r.as_str())
    });
    table.register_binary(OpCode::Greater, ValueKind::String, ValueKind::String, |l, r| {
        EarleValue::from(l.as_str() > r.as_str())
    });
}

fn register_bitwise(table: &mut OperatorTable) {
    let int = ValueKind::Integer;
    table.register_binary(OpCode::BitwiseAnd, int, int, |l, r| {
        int_result(int_pair(l, r).map(|(a, b)| a & b))
    });
    table.register_binary(OpCode::BitwiseOr, int, int, |l, r| {
        int_result(int_pair(l, r).map(|(a, b)| a | b))
    });
    table.register_binary(OpCode::BitwiseXor, int, int, |l, r| {
        int_result(int_pair(l, r).map(|(a, b)| a ^ b))
    });
    table.register_binary(OpCode::ShiftLeft, int, int, |l, r| {
        int_result(int_pair(l, r).map(|(a, b)| a.wrapping_shl(b as u32)))
    });
    table.register_binary(OpCode::ShiftRight, int, int, |l, r| {
        int_result(int_pair(l, r).map(|(a, b)| a.wrapping_shr(b as u32)))
    });
}

fn register_strings(table: &mut OperatorTable) {
    fn concat(l: &EarleValue, r: &EarleValue) -> EarleValue {
        EarleValue::from(format!("{}{}", l, r))
    }
    table.register_binary(OpCode::Add, ValueKind::String, ValueKind::String, concat);
    table.register_binary(OpCode::Add, ValueKind::String, ValueKind::Any, concat);
    table.register_binary(OpCode::Add, ValueKind::Any, ValueKind::String, concat);
}

fn vector3(value: &EarleValue) -> Option<[f32; 3]> {
    match value {
        EarleValue::Vector3(v) => Some(*v),
        _ => None,
    }
}

fn vector2(value: &EarleValue) -> Option<[f32; 2]> {
    match value {
        EarleValue::Vector2(v) => Some(*v),
        _ => None,
    }
}

fn register_vectors(table: &mut OperatorTable) {
    let v3 = ValueKind::Vector3;
    let v2 = ValueKind::Vector2;
    table.register_binary(OpCode::Add, v3, v3, |l, r| match (vector3(l), vector3(r)) {
        (Some([a, b, c]), Some([x, y, z])) => EarleValue::Vector3([a + x, b + y, c + z]),
        _ => EarleValue::Undefined,
    });
    table.register_binary(OpCode::Subtract, v3, v3, |l, r| match (vector3(l), vector3(r)) {
        (Some([a, b, c]), Some([x, y, z])) => EarleValue::Vector3([a - x, b - y, c - z]),
        _ => EarleValue::Undefined,
    });
    table.register_binary(OpCode::Add, v2, v2, |l, r| match (vector2(l), vector2(r)) {
        (Some([a, b]), Some([x, y])) => EarleValue::Vector2([a + x, b + y]),
        _ => EarleValue::Undefined,
    });
    table.register_binary(OpCode::Subtract, v2, v2, |l, r| match (vector2(l), vector2(r)) {
        (Some([a, b]), Some([x, y])) => EarleValue::Vector2([a - x, b - y]),
        _ => EarleValue::Undefined,
    });

    fn scale(vector: &EarleValue, factor: &EarleValue) -> EarleValue {
        match (vector, factor.as_number()) {
            (EarleValue::Vector3([x, y, z]), Some(k)) => EarleValue::Vector3([x * k, y * k, z * k]),
            (EarleValue::Vector2([x, y]), Some(k)) => EarleValue::Vector2([x * k, y * k]),
            _ => EarleValue::Undefined,
        }
    }
    for vector in [v2, v3] {
        for number in [ValueKind::Integer, ValueKind::Float] {
            table.register_binary(OpCode::Multiply, vector, number, scale);
            table.register_binary(OpCode::Multiply, number, vector, |l, r| scale(r, l));
        }
    }
}

fn register_unary(table: &mut OperatorTable) {
    table.register_unary(OpCode::Not, ValueKind::Any, |v| EarleValue::from(!v.is_truthy()));
    table.register_unary(OpCode::Negate, ValueKind::Integer, |v| {
        int_result(v.as_integer().map(i32::wrapping_neg))
    });
    table.register_unary(OpCode::Negate, ValueKind::Float, |v| {
        float_result(v.as_number().map(|x| -x))
    });
    table.register_unary(OpCode::Negate, ValueKind::Vector3, |v| match vector3(v) {
        Some([x, y, z]) => EarleValue::Vector3([-x, -y, -z]),
        None => EarleValue::Undefined,
    });
    table.register_unary(OpCode::Negate, ValueKind::Vector2, |v| match vector2(v) {
        Some([x, y]) => EarleValue::Vector2([-x, -y]),
        None => EarleValue::Undefined,
    });
    table.register_unary(OpCode::BitwiseNot, ValueKind::Integer, |v| {
        int_result(v.as_integer().map(|n| !n))
    });
}

trait IntoValue {
    fn into_value(self) -> EarleValue;
}

impl IntoValue for Option<bool> {
    fn into_value(self) -> EarleValue {
        self.map_or(EarleValue::Undefined, EarleValue::from)
    }
}
