// earle-vm - Runtime values for Earle
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Runtime values.
//!
//! Scalars are copied. Arrays and structures are shared through `Rc<RefCell>`,
//! so assigning one to another variable aliases it.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use im::OrdMap;
use num_traits::ToPrimitive;

/// A name resolved at run time: a variable, or a function with an optional file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableReference {
    pub file: Option<Rc<str>>,
    pub name: Rc<str>,
}

impl VariableReference {
    pub fn new(file: Option<&str>, name: &str) -> Self {
        VariableReference {
            file: file.map(Rc::from),
            name: Rc::from(name),
        }
    }

    /// Parse `path\file::name` or `name`.
    pub fn parse(text: &str) -> Self {
        match text.rsplit_once("::") {
            Some((file, name)) if !file.is_empty() => VariableReference::new(Some(file), name),
            Some((_, name)) => VariableReference::new(None, name),
            None => VariableReference::new(None, text),
        }
    }
}

impl fmt::Display for VariableReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}::{}", file, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Host-provided opaque value.
pub trait HostObject: fmt::Debug {
    fn type_name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;

    /// Field lookup for `object.name`.
    fn field(&self, _name: &str) -> Option<EarleValue> {
        None
    }
}

#[derive(Debug, Clone)]
pub struct ContextObject(pub Rc<dyn HostObject>);

impl ContextObject {
    pub fn new(object: impl HostObject + 'static) -> Self {
        ContextObject(Rc::new(object))
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }
}

#[derive(Debug, Clone, Default)]
pub struct EarleArray(Rc<RefCell<Vec<EarleValue>>>);

impl EarleArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(values: Vec<EarleValue>) -> Self {
        EarleArray(Rc::new(RefCell::new(values)))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<EarleValue> {
        self.0.borrow().get(index).cloned()
    }

    /// Store at `index`, padding with undefined when the array is shorter.
    pub fn set(&self, index: usize, value: EarleValue) {
        let mut values = self.0.borrow_mut();
        if index >= values.len() {
            values.resize(index + 1, EarleValue::Undefined);
        }
        values[index] = value;
    }

    pub fn push(&self, value: EarleValue) {
        self.0.borrow_mut().push(value);
    }

    pub fn to_vec(&self) -> Vec<EarleValue> {
        self.0.borrow().clone()
    }

    pub fn ptr_eq(&self, other: &EarleArray) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Named fields kept in key order.
#[derive(Debug, Clone, Default)]
pub struct EarleStructure(Rc<RefCell<OrdMap<String, EarleValue>>>);

impl EarleStructure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<EarleValue> {
        self.0.borrow().get(field).cloned()
    }

    pub fn set(&self, field: &str, value: EarleValue) {
        self.0.borrow_mut().insert(field.to_string(), value);
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Snapshot of the fields. Later writes do not affect it.
    pub fn fields(&self) -> OrdMap<String, EarleValue> {
        self.0.borrow().clone()
    }

    pub fn ptr_eq(&self, other: &EarleStructure) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Value classes used by the operator table. `Any` is a lookup wildcard and
/// never the kind of an actual value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKind {
    Undefined,
    Integer,
    Float,
    String,
    Vector2,
    Vector3,
    Array,
    Structure,
    Function,
    Reference,
    Object,
    Any,
}

impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Undefined => "undefined",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Vector2 => "vector2",
            ValueKind::Vector3 => "vector3",
            ValueKind::Array => "array",
            ValueKind::Structure => "struct",
            ValueKind::Function => "function",
            ValueKind::Reference => "reference",
            ValueKind::Object => "object",
            ValueKind::Any => "any",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Default)]
pub enum EarleValue {
    #[default]
    Undefined,
    Integer(i32),
    Float(f32),
    String(Rc<str>),
    Vector2([f32; 2]),
    Vector3([f32; 3]),
    Array(EarleArray),
    Structure(EarleStructure),
    Function(VariableReference),
    /// Unresolved name. Only ever lives on an operand stack.
    Reference(VariableReference),
    Object(ContextObject),
}

impl EarleValue {
    pub fn string(text: &str) -> Self {
        EarleValue::String(Rc::from(text))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            EarleValue::Undefined => ValueKind::Undefined,
            EarleValue::Integer(_) => ValueKind::Integer,
            EarleValue::Float(_) => ValueKind::Float,
            EarleValue::String(_) => ValueKind::String,
            EarleValue::Vector2(_) => ValueKind::Vector2,
            EarleValue::Vector3(_) => ValueKind::Vector3,
            EarleValue::Array(_) => ValueKind::Array,
            EarleValue::Structure(_) => ValueKind::Structure,
            EarleValue::Function(_) => ValueKind::Function,
            EarleValue::Reference(_) => ValueKind::Reference,
            EarleValue::Object(_) => ValueKind::Object,
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            EarleValue::Object(object) => object.0.type_name(),
            other => other.kind().name(),
        }
    }

    pub fn is_defined(&self) -> bool {
        !matches!(self, EarleValue::Undefined)
    }

    /// Undefined and integer zero are false; everything else is true.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, EarleValue::Undefined | EarleValue::Integer(0))
    }

    pub fn as_integer(&self) -> Option<i32> {
        match self {
            EarleValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            EarleValue::String(s) => Some(&**s),
            _ => None,
        }
    }

    /// Numeric value widened to `f32`.
    pub fn as_number(&self) -> Option<f32> {
        match self {
            EarleValue::Integer(n) => n.to_f32(),
            EarleValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Conversion used by `int()`: truncates floats, parses strings.
    pub fn to_integer(&self) -> Option<i32> {
        match self {
            EarleValue::Integer(n) => Some(*n),
            EarleValue::Float(f) => f.trunc().to_i32(),
            EarleValue::String(s) => {
                let text = s.trim();
                text.parse::<i32>()
                    .ok()
                    .or_else(|| text.parse::<f32>().ok().and_then(|f| f.trunc().to_i32()))
            }
            _ => None,
        }
    }

    /// Conversion used by `float()`.
    pub fn to_float(&self) -> Option<f32> {
        match self {
            EarleValue::String(s) => s.trim().parse::<f32>().ok(),
            other => other.as_number(),
        }
    }
}

impl PartialEq for EarleValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (EarleValue::Undefined, EarleValue::Undefined) => true,
            (EarleValue::Integer(a), EarleValue::Integer(b)) => a == b,
            (EarleValue::Float(a), EarleValue::Float(b)) => a == b,
            (EarleValue::String(a), EarleValue::String(b)) => a == b,
            (EarleValue::Vector2(a), EarleValue::Vector2(b)) => a == b,
            (EarleValue::Vector3(a), EarleValue::Vector3(b)) => a == b,
            (EarleValue::Array(a), EarleValue::Array(b)) => a.ptr_eq(b),
            (EarleValue::Structure(a), EarleValue::Structure(b)) => a.ptr_eq(b),
            (EarleValue::Function(a), EarleValue::Function(b)) => a == b,
            (EarleValue::Reference(a), EarleValue::Reference(b)) => a == b,
            (EarleValue::Object(a), EarleValue::Object(b)) => Rc::ptr_eq(&a.0, &b.0),
            _ => false,
        }
    }
}

impl fmt::Display for EarleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EarleValue::Undefined => write!(f, "undefined"),
            EarleValue::Integer(n) => write!(f, "{}", n),
            EarleValue::Float(x) => write!(f, "{}", x),
            EarleValue::String(s) => f.write_str(s),
            EarleValue::Vector2([x, y]) => write!(f, "({}, {})", x, y),
            EarleValue::Vector3([x, y, z]) => write!(f, "({}, {}, {})", x, y, z),
            EarleValue::Array(values) => {
                write!(f, "[")?;
                for (i, value) in values.to_vec().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
            EarleValue::Structure(fields) => write!(f, "struct({} fields)", fields.len()),
            EarleValue::Function(reference) => write!(f, "::{}", reference),
            EarleValue::Reference(reference) => write!(f, "&{}", reference),
            EarleValue::Object(object) => write!(f, "<{}>", object.0.type_name()),
        }
    }
}

impl From<i32> for EarleValue {
    fn from(n: i32) -> Self {
        EarleValue::Integer(n)
    }
}

impl From<f32> for EarleValue {
    fn from(x: f32) -> Self {
        EarleValue::Float(x)
    }
}

impl From<bool> for EarleValue {
    fn from(b: bool) -> Self {
        EarleValue::Integer(i32::from(b))
    }
}

impl From<&str> for EarleValue {
    fn from(s: &str) -> Self {
        EarleValue::string(s)
    }
}

impl From<String> for EarleValue {
    fn from(s: String) -> Self {
        EarleValue::String(Rc::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!EarleValue::Undefined.is_truthy());
        assert!(!EarleValue::Integer(0).is_truthy());
        assert!(EarleValue::Integer(-1).is_truthy());
        assert!(EarleValue::Float(0.0).is_truthy());
        assert!(EarleValue::string("").is_truthy());
    }

    #[test]
    fn test_reference_parse() {
        let qualified = VariableReference::parse("maps\\utility::spawn");
        assert_eq!(qualified.file.as_deref(), Some("maps\\utility"));
        assert_eq!(&*qualified.name, "spawn");
        assert_eq!(qualified.to_string(), "maps\\utility::spawn");
        assert_eq!(VariableReference::parse("::foo"), VariableReference::new(None, "foo"));
        assert_eq!(VariableReference::parse("foo"), VariableReference::new(None, "foo"));
    }

    #[test]
    fn test_arrays_are_shared() {
        let array = EarleArray::new();
        let alias = EarleValue::Array(array.clone());
        array.set(2, EarleValue::Integer(5));
        assert_eq!(array.len(), 3);
        assert_eq!(array.get(0), Some(EarleValue::Undefined));
        assert_eq!(alias, EarleValue::Array(array));
        assert_ne!(alias, EarleValue::Array(EarleArray::new()));
    }

    #[test]
    fn test_conversions() {
        assert_eq!(EarleValue::Float(3.9).to_integer(), Some(3));
        assert_eq!(EarleValue::string(" 12 ").to_integer(), Some(12));
        assert_eq!(EarleValue::string("2.5").to_integer(), Some(2));
        assert_eq!(EarleValue::Float(f32::NAN).to_integer(), None);
        assert_eq!(EarleValue::string("x").to_float(), None);
        assert_eq!(EarleValue::Integer(2).to_float(), Some(2.0));
    }
}
