// earle-vm - Built-in natives for Earle
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Value natives: `isdefined`, `spawnstruct`, `print`, `println`,
//! `localize`, `int`, `float`, `string`, `size`.

use num_traits::ToPrimitive;

use crate::native::{Arity, NativeRegistry, NativeResult};
use crate::value::{EarleStructure, EarleValue};
use crate::vm::RuntimeError;

pub(super) fn register(registry: &mut NativeRegistry) {
    registry.register("isdefined", Arity::Exact(1), |_, args| {
        Ok(NativeResult::Complete(args[0].is_defined().into()))
    });

    registry.register("spawnstruct", Arity::Exact(0), |_, _| {
        Ok(NativeResult::Complete(EarleValue::Structure(EarleStructure::new())))
    });

    registry.register("print", Arity::AtLeast(0), |context, args| {
        context.printer.print(&concatenate(args));
        Ok(NativeResult::undefined())
    });

    registry.register("println", Arity::AtLeast(0), |context, args| {
        let mut line = concatenate(args);
        line.push('\n');
        context.printer.print(&line);
        Ok(NativeResult::undefined())
    });

    registry.register("localize", Arity::Exact(1), |context, args| {
        let key = args[0].as_str().ok_or_else(|| {
            RuntimeError::native("localize", format!("key must be a string, got {}", args[0].type_name()))
        })?;
        Ok(NativeResult::Complete(context.localizer.localize(key).into()))
    });

    registry.register("int", Arity::Exact(1), |_, args| {
        Ok(NativeResult::Complete(
            args[0].to_integer().map_or(EarleValue::Undefined, EarleValue::Integer),
        ))
    });

    registry.register("float", Arity::Exact(1), |_, args| {
        Ok(NativeResult::Complete(
            args[0].to_float().map_or(EarleValue::Undefined, EarleValue::Float),
        ))
    });

    registry.register("string", Arity::Exact(1), |_, args| {
        Ok(NativeResult::Complete(args[0].to_string().into()))
    });

    registry.register("size", Arity::Exact(1), |_, args| {
        let len = match &args[0] {
            EarleValue::Array(array) => Some(array.len()),
            EarleValue::String(text) => Some(text.chars().count()),
            EarleValue::Structure(structure) => Some(structure.len()),
            _ => None,
        };
        Ok(NativeResult::Complete(
            len.and_then(|n| n.to_i32())
                .map_or(EarleValue::Undefined, EarleValue::Integer),
        ))
    });
}

fn concatenate(args: &[EarleValue]) -> String {
    args.iter().map(ToString::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concatenate() {
        let args = [EarleValue::string("a"), EarleValue::Integer(1), EarleValue::Float(1.5)];
        assert_eq!(concatenate(&args), "a11.5");
    }
}
