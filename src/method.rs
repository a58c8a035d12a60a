//! Method reference resolution (§4.5, §6): turning a constant-pool `Methodref`/
//! `InterfaceMethodref` index into the class/name/descriptor triple the NPE analyzer
//! reasons about.
//!
//! Grounded on `examples/original_source/src/main/c/Method.cpp`'s
//! `readFromMemberRef`/`readFromCodeInvoke`.

use crate::access_flags::MethodAccessFlags;
use crate::constants::{ConstantPool, ConstantPoolTable};
use crate::descriptors::{parameter_length, parse_method_signature, to_java_class_name};
use crate::errors::{Error, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct Method {
    pub class_name: String,
    pub name: String,
    pub descriptor: String,
    pub params: Vec<String>,
    pub return_type: String,
    pub parameter_length: u8,
}

impl Method {
    /// Resolves a `Methodref`/`InterfaceMethodref` constant-pool entry at `index`.
    pub fn from_ref(pool: &ConstantPoolTable, index: u16) -> Result<Method> {
        let (class_index, name_and_type_index) = match pool.get(index)? {
            ConstantPool::MethodRef { class_index, name_and_type_index }
            | ConstantPool::InterfaceMethodRef { class_index, name_and_type_index } => {
                (*class_index, *name_and_type_index)
            }
            other => {
                return Err(Error::MalformedConstantPool(format!(
                    "index {index} expected a Methodref, found {other:?}"
                )))
            }
        };
        let class_name = to_java_class_name(&pool.entry_to_string(class_index, false)?);
        let (name, descriptor) = match pool.get(name_and_type_index)? {
            ConstantPool::NameAndType { name_index, descriptor_index } => (
                pool.entry_to_string(*name_index, false)?,
                pool.entry_to_string(*descriptor_index, false)?,
            ),
            other => {
                return Err(Error::MalformedConstantPool(format!(
                    "index {name_and_type_index} expected a NameAndType, found {other:?}"
                )))
            }
        };
        let (params, return_type) = parse_method_signature(&descriptor)?;
        let parameter_length = parameter_length(&params)?;
        Ok(Method { class_name, name, descriptor, params, return_type, parameter_length })
    }

    /// Whether this is the `Objects.requireNonNull` intrinsic family the analyzer's
    /// Phase A' rewrites to the caller frame (§4.5).
    pub fn is_objects_require_non_null(&self) -> bool {
        self.class_name == "java.util.Objects" && self.name == "requireNonNull"
    }

    pub fn label(&self) -> String {
        format!("{}#{}", self.class_name, self.name)
    }
}

/// The faulting frame's own method (§3 "Method record"): unlike `Method` (a call-site
/// reference resolved from a `Methodref`), this carries the modifier bit-set the host
/// adapter reads off the method handle directly, which the analyzer needs to know
/// whether an implicit `this` occupies local-variable slot 0 (§4.5 Phase B).
#[derive(Clone, Debug, PartialEq)]
pub struct CurrentMethod {
    pub class_name: String,
    pub name: String,
    pub descriptor: String,
    pub params: Vec<String>,
    pub return_type: String,
    pub parameter_length: u8,
    pub modifiers: Vec<MethodAccessFlags>,
}

impl CurrentMethod {
    /// Builds a `CurrentMethod` from what the host adapter exposes directly: the
    /// declaring class name, the raw `(name, descriptor)` pair, and the modifier
    /// bit-set (§6 `get_method_name_and_descriptor`/`get_method_modifiers`).
    pub fn new(
        class_name: String,
        name: String,
        descriptor: String,
        modifiers: Vec<MethodAccessFlags>,
    ) -> Result<CurrentMethod> {
        let (params, return_type) = parse_method_signature(&descriptor)?;
        let parameter_length = parameter_length(&params)?;
        Ok(CurrentMethod {
            class_name,
            name,
            descriptor,
            params,
            return_type,
            parameter_length,
            modifiers,
        })
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.contains(&MethodAccessFlags::AccStatic)
    }

    /// Whether local-variable slot `slot` is one of this method's declared parameters
    /// (as opposed to a genuine local). Slot 0 holds an implicit `this` unless the
    /// method is static.
    pub fn slot_is_parameter(&self, slot: u16) -> bool {
        let implicit_this = if self.is_static() { 0 } else { 1 };
        slot < self.parameter_length as u16 + implicit_this
    }

    /// The parameter index (0-based, counting `this` as occupying index 0 for instance
    /// methods) that owns local-variable `slot`, computed by walking the parameter-type
    /// list and summing widths — used when no `LocalVariableTable` entry names the slot
    /// (§4.5 Phase B, producer description "method parameter at index I").
    pub fn parameter_index_for_slot(&self, slot: u16) -> Option<u16> {
        if !self.slot_is_parameter(slot) {
            return None;
        }
        let implicit_this = if self.is_static() { 0u16 } else { 1 };
        if slot < implicit_this {
            return None;
        }
        let mut cursor = implicit_this;
        for (index, param) in self.params.iter().enumerate() {
            let width = if param == "long" || param == "double" { 2 } else { 1 };
            if slot < cursor + width {
                return Some(implicit_this + index as u16);
            }
            cursor += width;
        }
        None
    }

    pub fn is_objects_require_non_null(&self) -> bool {
        self.class_name == "java.util.Objects" && self.name == "requireNonNull"
    }

    pub fn label(&self) -> String {
        format!("{}#{}", self.class_name, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf8_pool(strings: &[&str]) -> ConstantPoolTable {
        let mut bytes = Vec::new();
        for s in strings {
            bytes.push(1u8);
            bytes.extend_from_slice(&(s.len() as u16).to_be_bytes());
            bytes.extend_from_slice(s.as_bytes());
        }
        ConstantPoolTable::read_all(&bytes).unwrap()
    }

    #[test]
    fn resolves_a_methodref() {
        let mut bytes = Vec::new();
        bytes.push(1u8);
        bytes.extend_from_slice(&7u16.to_be_bytes());
        bytes.extend_from_slice(b"java/util/Map"); // 1
        bytes.push(7); // Class
        bytes.extend_from_slice(&1u16.to_be_bytes()); // 2 -> Class(1)
        bytes.push(1u8);
        bytes.extend_from_slice(&3u16.to_be_bytes());
        bytes.extend_from_slice(b"get"); // 3
        bytes.push(1u8);
        bytes.extend_from_slice(&21u16.to_be_bytes());
        bytes.extend_from_slice(b"(Ljava/lang/Object;)Ljava/lang/Object;"); // 4
        bytes.push(12); // NameAndType
        bytes.extend_from_slice(&3u16.to_be_bytes());
        bytes.extend_from_slice(&4u16.to_be_bytes()); // 5
        bytes.push(11); // InterfaceMethodref
        bytes.extend_from_slice(&2u16.to_be_bytes());
        bytes.extend_from_slice(&5u16.to_be_bytes()); // 6

        let pool = ConstantPoolTable::read_all(&bytes).unwrap();
        let method = Method::from_ref(&pool, 6).unwrap();
        assert_eq!(method.class_name, "java.util.Map");
        assert_eq!(method.name, "get");
        assert_eq!(method.params, vec!["java.lang.Object".to_string()]);
        assert_eq!(method.parameter_length, 1);
    }

    #[test]
    fn recognizes_objects_require_non_null() {
        let method = Method {
            class_name: "java.util.Objects".into(),
            name: "requireNonNull".into(),
            descriptor: "(Ljava/lang/Object;)Ljava/lang/Object;".into(),
            params: vec!["java.lang.Object".into()],
            return_type: "java.lang.Object".into(),
            parameter_length: 1,
        };
        assert!(method.is_objects_require_non_null());
        let _ = utf8_pool(&[]);
    }
}
