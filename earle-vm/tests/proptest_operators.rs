// earle-vm - Property-based tests for operators
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Property-based tests for the operator table and compiled arithmetic.
//!
//! - Integer arithmetic wraps like `i32`
//! - Division or modulo by zero is undefined, never a panic
//! - Comparisons are antisymmetric
//! - Compiled expressions honour precedence

mod common;

use common::{call, int};
use earle_vm::{EarleValue, OpCode, OperatorTable};
use proptest::prelude::*;

fn arith_op() -> impl Strategy<Value = OpCode> {
    prop_oneof![
        Just(OpCode::Add),
        Just(OpCode::Subtract),
        Just(OpCode::Multiply),
        Just(OpCode::Divide),
        Just(OpCode::Modulo),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn integer_arithmetic_wraps(a in any::<i32>(), b in any::<i32>(), op in arith_op()) {
        let table = OperatorTable::standard();
        let result = table.evaluate_binary(op, &EarleValue::Integer(a), &EarleValue::Integer(b));
        let expected = match op {
            OpCode::Add => Some(a.wrapping_add(b)),
            OpCode::Subtract => Some(a.wrapping_sub(b)),
            OpCode::Multiply => Some(a.wrapping_mul(b)),
            OpCode::Divide => a.checked_div(b),
            _ => a.checked_rem(b),
        };
        prop_assert_eq!(result, expected.map_or(EarleValue::Undefined, EarleValue::Integer));
    }

    #[test]
    fn division_by_zero_is_undefined(a in any::<i32>()) {
        let table = OperatorTable::standard();
        for op in [OpCode::Divide, OpCode::Modulo] {
            let result = table.evaluate_binary(op, &EarleValue::Integer(a), &EarleValue::Integer(0));
            prop_assert_eq!(result, EarleValue::Undefined);
        }
    }

    #[test]
    fn comparisons_are_antisymmetric(a in -1000.0f32..1000.0, b in any::<i32>()) {
        let table = OperatorTable::standard();
        let (l, r) = (EarleValue::Float(a), EarleValue::Integer(b));
        prop_assert_eq!(
            table.evaluate_binary(OpCode::Less, &l, &r),
            table.evaluate_binary(OpCode::Greater, &r, &l)
        );
        prop_assert_eq!(
            table.evaluate_binary(OpCode::LessOrEqual, &l, &r),
            table.evaluate_binary(OpCode::GreaterOrEqual, &r, &l)
        );
    }

    #[test]
    fn concatenation_formats_numbers(text in "[a-z]{0,8}", n in any::<i32>()) {
        let table = OperatorTable::standard();
        let result = table.evaluate_binary(OpCode::Add, &EarleValue::string(&text), &EarleValue::Integer(n));
        prop_assert_eq!(result, EarleValue::from(format!("{}{}", text, n)));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn compiled_expression_honours_precedence(
        a in -1000i32..1000,
        b in -1000i32..1000,
        c in -1000i32..1000,
    ) {
        let source = "f(a, b, c) { return a + b * c - (a - b) % 7; }";
        let result = call(source, "f", vec![int(a), int(b), int(c)]).unwrap();
        prop_assert_eq!(result, int(a + b * c - (a - b) % 7));
    }
}
