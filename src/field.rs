//! Field reference resolution (§4.5, §6): turning a constant-pool `Fieldref` index into
//! the class/name/descriptor triple the NPE analyzer reasons about.
//!
//! Grounded on `examples/original_source/src/main/c/Field.cpp`'s
//! `readFromMemberRef`/`readFromFieldInsn`.

use crate::constants::{ConstantPool, ConstantPoolTable};
use crate::descriptors::{parse_type, to_java_class_name};
use crate::errors::{Error, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub class_name: String,
    pub name: String,
    pub descriptor: String,
    pub type_name: String,
}

impl Field {
    /// Resolves a `Fieldref` constant-pool entry at `index`.
    pub fn from_ref(pool: &ConstantPoolTable, index: u16) -> Result<Field> {
        let (class_index, name_and_type_index) = match pool.get(index)? {
            ConstantPool::FieldRef { class_index, name_and_type_index } => {
                (*class_index, *name_and_type_index)
            }
            other => {
                return Err(Error::MalformedConstantPool(format!(
                    "index {index} expected a Fieldref, found {other:?}"
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
        let (type_name, _) = parse_type(&descriptor, 0)?;
        Ok(Field { class_name, name, descriptor, type_name })
    }

    /// Stack-slot width of this field's type: 2 for `long`/`double`, 1 otherwise.
    pub fn value_width(&self) -> u8 {
        if self.type_name == "long" || self.type_name == "double" {
            2
        } else {
            1
        }
    }

    pub fn label(&self) -> String {
        format!("{}.{}", self.class_name, self.name)
    }
}
