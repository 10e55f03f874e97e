// earle-vm - Bytecode compiler and virtual machine for the Earle scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Variable, scope and container opcode handlers.
//!
//! Reading or indexing something that is not there yields undefined, and
//! writes into values that are not containers are dropped.

use num_traits::ToPrimitive;
use tracing::trace;

use crate::opcode::OpCode;
use crate::value::{EarleArray, EarleValue, VariableReference};
use crate::vm::frame::CallFrame;
use crate::vm::{Result, RuntimeError, VM};

const SELF: &str = "self";
const LEVEL: &str = "level";

impl VM {
    /// Execute a variable or container opcode.
    pub(crate) fn execute_variables(&self, frame: &mut CallFrame, op: OpCode) -> Result<()> {
        match op {
            OpCode::PushReference => {
                let name = frame.read_string()?;
                frame
                    .stack
                    .push(EarleValue::Reference(VariableReference::parse(&name)));
            }
            OpCode::PushFunction => {
                let name = frame.read_string()?;
                frame
                    .stack
                    .push(EarleValue::Function(VariableReference::parse(&name)));
            }
            OpCode::PushArray => frame.stack.push(EarleValue::Array(EarleArray::new())),
            OpCode::PushScope => frame.scopes.push(),
            OpCode::PopScope => frame.scopes.pop(),

            OpCode::Read => {
                let value = match frame.stack.pop()? {
                    EarleValue::Reference(reference) => self.read_variable(frame, &reference),
                    other => other,
                };
                frame.stack.push(value);
            }
            OpCode::Write => {
                let value = frame.stack.pop()?;
                match frame.stack.pop()? {
                    EarleValue::Reference(reference) => write_variable(frame, &reference, value),
                    other => trace!(target_type = other.type_name(), "write to non-reference ignored"),
                }
            }
            OpCode::WriteField => {
                let field = frame.read_string()?;
                let value = frame.stack.pop()?;
                let container = frame.stack.pop()?;
                if let EarleValue::Structure(structure) = &container {
                    structure.set(&field, value);
                } else {
                    trace!(container = container.type_name(), field = %field, "field write ignored");
                }
            }
            OpCode::WriteIndex => {
                let value = frame.stack.pop()?;
                let index = frame.stack.pop()?;
                let container = frame.stack.pop()?;
                write_index(&container, &index, value);
            }
            OpCode::DereferenceField => {
                let field = frame.read_string()?;
                let container = frame.stack.pop()?;
                frame.stack.push(field_of(&container, &field));
            }
            OpCode::DereferenceIndex => {
                let index = frame.stack.pop()?;
                let container = frame.stack.pop()?;
                frame.stack.push(index_of(&container, &index));
            }
            _ => {
                return Err(RuntimeError::InvalidBytecode(format!(
                    "execute_variables: unexpected opcode {}",
                    op
                )));
            }
        }
        Ok(())
    }

    fn read_variable(&self, frame: &CallFrame, reference: &VariableReference) -> EarleValue {
        match &*reference.name {
            SELF => frame.target.clone(),
            LEVEL => EarleValue::Structure(self.level.clone()),
            name => frame.scopes.get(name).cloned().unwrap_or_default(),
        }
    }
}

fn write_variable(frame: &mut CallFrame, reference: &VariableReference, value: EarleValue) {
    match &*reference.name {
        SELF | LEVEL => trace!(name = %reference, "write to builtin ignored"),
        name => frame.scopes.assign(name, value),
    }
}

fn write_index(container: &EarleValue, index: &EarleValue, value: EarleValue) {
    match (container, index) {
        (EarleValue::Array(array), EarleValue::Integer(i)) if *i >= 0 => {
            array.set(*i as usize, value);
        }
        (EarleValue::Structure(structure), EarleValue::String(key)) => structure.set(key, value),
        _ => trace!(
            container = container.type_name(),
            index = index.type_name(),
            "index write ignored"
        ),
    }
}

/// `container[index]`.
pub(crate) fn index_of(container: &EarleValue, index: &EarleValue) -> EarleValue {
    match (container, index) {
        (EarleValue::Array(array), EarleValue::Integer(i)) => usize::try_from(*i)
            .ok()
            .and_then(|i| array.get(i))
            .unwrap_or_default(),
        (EarleValue::Structure(structure), EarleValue::String(key)) => {
            structure.get(key).unwrap_or_default()
        }
        _ => EarleValue::Undefined,
    }
}

/// `container.field`.
pub(crate) fn field_of(container: &EarleValue, field: &str) -> EarleValue {
    let size = |len: usize| len.to_i32().map_or(EarleValue::Undefined, EarleValue::Integer);
    match (container, field) {
        (EarleValue::Structure(structure), _) => structure.get(field).unwrap_or_default(),
        (EarleValue::Array(array), "size") => size(array.len()),
        (EarleValue::String(text), "size") => size(text.chars().count()),
        (EarleValue::Vector2(v), _) => component(v, field),
        (EarleValue::Vector3(v), _) => component(v, field),
        (EarleValue::Object(object), _) => object.0.field(field).unwrap_or_default(),
        _ => EarleValue::Undefined,
    }
}

fn component(vector: &[f32], field: &str) -> EarleValue {
    let index = match field {
        "x" => 0,
        "y" => 1,
        "z" => 2,
        _ => return EarleValue::Undefined,
    };
    vector
        .get(index)
        .map_or(EarleValue::Undefined, |c| EarleValue::Float(*c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::EarleStructure;

    #[test]
    fn test_index_of_out_of_range_is_undefined() {
        let array = EarleValue::Array(EarleArray::from_vec(vec![EarleValue::Integer(4)]));
        assert_eq!(index_of(&array, &EarleValue::Integer(0)), EarleValue::Integer(4));
        assert_eq!(index_of(&array, &EarleValue::Integer(1)), EarleValue::Undefined);
        assert_eq!(index_of(&array, &EarleValue::Integer(-1)), EarleValue::Undefined);
        assert_eq!(index_of(&array, &EarleValue::string("0")), EarleValue::Undefined);
    }

    #[test]
    fn test_field_of() {
        let array = EarleValue::Array(EarleArray::from_vec(vec![EarleValue::Undefined; 3]));
        assert_eq!(field_of(&array, "size"), EarleValue::Integer(3));
        assert_eq!(field_of(&EarleValue::string("héllo"), "size"), EarleValue::Integer(5));
        assert_eq!(field_of(&EarleValue::Vector3([1.0, 2.0, 3.0]), "z"), EarleValue::Float(3.0));
        assert_eq!(field_of(&EarleValue::Vector2([1.0, 2.0]), "z"), EarleValue::Undefined);
        assert_eq!(field_of(&EarleValue::Integer(1), "size"), EarleValue::Undefined);

        let structure = EarleStructure::new();
        structure.set("name", EarleValue::string("bob"));
        let structure = EarleValue::Structure(structure);
        assert_eq!(field_of(&structure, "name"), EarleValue::string("bob"));
        assert_eq!(field_of(&structure, "size"), EarleValue::Undefined);
    }

    #[test]
    fn test_write_index_grows_array_and_ignores_scalars() {
        let array = EarleArray::new();
        write_index(&EarleValue::Array(array.clone()), &EarleValue::Integer(2), EarleValue::Integer(9));
        assert_eq!(array.len(), 3);
        assert_eq!(array.get(2), Some(EarleValue::Integer(9)));

        write_index(&EarleValue::Integer(1), &EarleValue::Integer(0), EarleValue::Integer(9));
    }
}
