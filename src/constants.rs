//! The constant pool (§3, §4.1): a 1-indexed, typed table of the symbolic constants a
//! class's bytecode refers to by index.
//!
//! Grounded on `examples/SarahGreyWolf-JVM-rs/src/constants.rs` for the tag/variant
//! shape and on `examples/original_source/src/main/cpp/bytecode/Constants.cpp` for the
//! `ReferenceKindMnemonic` table ported below as a const array.

use std::io::Cursor;

use byteorder::{ReadBytesExt, BE};

use crate::errors::{Error, Result};

#[derive(Clone, Debug, PartialEq)]
pub enum ConstantPool {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name_index: u16 },
    String { string_index: u16 },
    FieldRef { class_index: u16, name_and_type_index: u16 },
    MethodRef { class_index: u16, name_and_type_index: u16 },
    InterfaceMethodRef { class_index: u16, name_and_type_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },
    MethodHandle { reference_kind: u8, reference_index: u16 },
    MethodType { descriptor_index: u16 },
    Dynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
    InvokeDynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
    Module { name_index: u16 },
    Package { name_index: u16 },
    /// Index 0 (C1), and the filler slot following every `Long`/`Double` (C2).
    Padding,
}

const TAG_UTF8: u8 = 1;
const TAG_INTEGER: u8 = 3;
const TAG_FLOAT: u8 = 4;
const TAG_LONG: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_CLASS: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_FIELDREF: u8 = 9;
const TAG_METHODREF: u8 = 10;
const TAG_INTERFACE_METHODREF: u8 = 11;
const TAG_NAME_AND_TYPE: u8 = 12;
const TAG_METHOD_HANDLE: u8 = 15;
const TAG_METHOD_TYPE: u8 = 16;
const TAG_DYNAMIC: u8 = 17;
const TAG_INVOKE_DYNAMIC: u8 = 18;
const TAG_MODULE: u8 = 19;
const TAG_PACKAGE: u8 = 20;

/// `ReferenceKindMnemonic`, ported from `Constants.cpp` verbatim.
const REFERENCE_KIND_MNEMONIC: [&str; 10] = [
    "",
    "getField",
    "getStatic",
    "putField",
    "putStatic",
    "invokeVirtual",
    "invokeStatic",
    "invokeSpecial",
    "invokeInterface",
    "newInvokeSpecial",
];

#[derive(Clone, Debug)]
pub struct ConstantPoolTable {
    entries: Vec<ConstantPool>,
}

impl ConstantPoolTable {
    /// Reads entries from a big-endian byte sequence until the stream is exhausted,
    /// per §4.1's construction rule. Index 0 is always `Padding` (C1); a `Padding`
    /// entry is appended after every `Long`/`Double` so indices keep the on-wire
    /// numbering (C2).
    ///
    /// This is the shape the host adapter's `get_constant_pool_bytes` hands back
    /// (§6): a byte slice already trimmed to just the pool region.
    pub fn read_all(bytes: &[u8]) -> Result<ConstantPoolTable> {
        let mut cursor = Cursor::new(bytes);
        let mut entries = vec![ConstantPool::Padding];
        while (cursor.position() as usize) < bytes.len() {
            let entry = Self::read_entry(&mut cursor)?;
            let is_wide = matches!(entry, ConstantPool::Long(_) | ConstantPool::Double(_));
            entries.push(entry);
            if is_wide {
                entries.push(ConstantPool::Padding);
            }
        }
        Ok(ConstantPoolTable { entries })
    }

    /// Reads exactly `constant_pool_count - 1` logical entries from a shared cursor,
    /// advancing it past the pool region so the caller can keep reading the rest of
    /// the class file. Used by whole-`.class`-file loading (`class_file.rs`), where
    /// the pool's byte length isn't known up front the way it is in `read_all`'s
    /// already-sliced input.
    pub fn read_count(cursor: &mut Cursor<&[u8]>, constant_pool_count: u16) -> Result<ConstantPoolTable> {
        let mut entries = vec![ConstantPool::Padding];
        let mut index = 1u16;
        while index < constant_pool_count {
            let entry = Self::read_entry(cursor)?;
            let is_wide = matches!(entry, ConstantPool::Long(_) | ConstantPool::Double(_));
            entries.push(entry);
            index += 1;
            if is_wide {
                entries.push(ConstantPool::Padding);
                index += 1;
            }
        }
        Ok(ConstantPoolTable { entries })
    }

    /// Decodes one tagged entry starting at the cursor's current position, per §4.1's
    /// per-variant dispatch. Shared by `read_all` and `read_count`.
    fn read_entry(cursor: &mut Cursor<&[u8]>) -> Result<ConstantPool> {
        let tag = read_u8(cursor)?;
        Ok(match tag {
            TAG_UTF8 => {
                let len = read_u16(cursor)? as usize;
                let mut buf = vec![0u8; len];
                for b in buf.iter_mut() {
                    *b = read_u8(cursor)?;
                }
                let text = String::from_utf8_lossy(&buf).into_owned();
                ConstantPool::Utf8(text)
            }
            TAG_INTEGER => ConstantPool::Integer(read_u32(cursor)? as i32),
            TAG_FLOAT => ConstantPool::Float(f32::from_bits(read_u32(cursor)?)),
            TAG_LONG => {
                let hi = read_u32(cursor)? as u64;
                let lo = read_u32(cursor)? as u64;
                ConstantPool::Long(((hi << 32) | lo) as i64)
            }
            TAG_DOUBLE => {
                let hi = read_u32(cursor)? as u64;
                let lo = read_u32(cursor)? as u64;
                ConstantPool::Double(f64::from_bits((hi << 32) | lo))
            }
            TAG_CLASS => ConstantPool::Class { name_index: read_u16(cursor)? },
            TAG_STRING => ConstantPool::String { string_index: read_u16(cursor)? },
            TAG_FIELDREF => ConstantPool::FieldRef {
                class_index: read_u16(cursor)?,
                name_and_type_index: read_u16(cursor)?,
            },
            TAG_METHODREF => ConstantPool::MethodRef {
                class_index: read_u16(cursor)?,
                name_and_type_index: read_u16(cursor)?,
            },
            TAG_INTERFACE_METHODREF => ConstantPool::InterfaceMethodRef {
                class_index: read_u16(cursor)?,
                name_and_type_index: read_u16(cursor)?,
            },
            TAG_NAME_AND_TYPE => ConstantPool::NameAndType {
                name_index: read_u16(cursor)?,
                descriptor_index: read_u16(cursor)?,
            },
            TAG_METHOD_HANDLE => ConstantPool::MethodHandle {
                reference_kind: read_u8(cursor)?,
                reference_index: read_u16(cursor)?,
            },
            TAG_METHOD_TYPE => ConstantPool::MethodType { descriptor_index: read_u16(cursor)? },
            TAG_DYNAMIC => ConstantPool::Dynamic {
                bootstrap_method_attr_index: read_u16(cursor)?,
                name_and_type_index: read_u16(cursor)?,
            },
            TAG_INVOKE_DYNAMIC => ConstantPool::InvokeDynamic {
                bootstrap_method_attr_index: read_u16(cursor)?,
                name_and_type_index: read_u16(cursor)?,
            },
            TAG_MODULE => ConstantPool::Module { name_index: read_u16(cursor)? },
            TAG_PACKAGE => ConstantPool::Package { name_index: read_u16(cursor)? },
            other => {
                return Err(Error::MalformedConstantPool(format!(
                    "unknown constant pool tag {other} at byte offset {}",
                    cursor.position() - 1
                )))
            }
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: u16) -> Result<&ConstantPool> {
        self.entries
            .get(index as usize)
            .ok_or(Error::InvalidIndex(index))
    }

    fn utf8_at(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            ConstantPool::Utf8(text) => Ok(text.as_str()),
            other => Err(Error::MalformedConstantPool(format!(
                "index {index} expected Utf8, found {other:?}"
            ))),
        }
    }

    /// Recursively resolves indirect references into a human-readable form (§4.1).
    /// `tag_prefix` controls whether the top-level call prepends the entry's mnemonic;
    /// nested resolutions never do.
    pub fn entry_to_string(&self, index: u16, tag_prefix: bool) -> Result<String> {
        let entry = self.get(index)?;
        let (mnemonic, body) = match entry {
            ConstantPool::Utf8(text) => ("Utf8", text.clone()),
            ConstantPool::Integer(v) => ("Integer", v.to_string()),
            ConstantPool::Float(v) => ("Float", v.to_string()),
            ConstantPool::Long(v) => ("Long", v.to_string()),
            ConstantPool::Double(v) => ("Double", v.to_string()),
            ConstantPool::Class { name_index } => ("Class", self.utf8_at(*name_index)?.to_string()),
            ConstantPool::String { string_index } => {
                ("String", self.utf8_at(*string_index)?.to_string())
            }
            ConstantPool::NameAndType { name_index, descriptor_index } => (
                "NameAndType",
                format!(
                    "{}:{}",
                    self.utf8_at(*name_index)?,
                    self.utf8_at(*descriptor_index)?
                ),
            ),
            ConstantPool::FieldRef { class_index, name_and_type_index } => (
                "Fieldref",
                self.member_ref_to_string(*class_index, *name_and_type_index)?,
            ),
            ConstantPool::MethodRef { class_index, name_and_type_index } => (
                "Methodref",
                self.member_ref_to_string(*class_index, *name_and_type_index)?,
            ),
            ConstantPool::InterfaceMethodRef { class_index, name_and_type_index } => (
                "InterfaceMethodref",
                self.member_ref_to_string(*class_index, *name_and_type_index)?,
            ),
            ConstantPool::MethodHandle { reference_kind, reference_index } => {
                let kind = REFERENCE_KIND_MNEMONIC
                    .get(*reference_kind as usize)
                    .copied()
                    .unwrap_or("");
                (
                    "MethodHandle",
                    format!("{kind} {}", self.entry_to_string(*reference_index, false)?),
                )
            }
            ConstantPool::MethodType { descriptor_index } => {
                ("MethodType", self.utf8_at(*descriptor_index)?.to_string())
            }
            ConstantPool::InvokeDynamic { bootstrap_method_attr_index, name_and_type_index } => (
                "InvokeDynamic",
                format!(
                    "{bootstrap_method_attr_index} {}",
                    self.entry_to_string(*name_and_type_index, false)?
                ),
            ),
            ConstantPool::Dynamic { bootstrap_method_attr_index, name_and_type_index } => (
                "Dynamic",
                format!(
                    "{bootstrap_method_attr_index} {}",
                    self.entry_to_string(*name_and_type_index, false)?
                ),
            ),
            ConstantPool::Module { name_index } => {
                ("Module", self.utf8_at(*name_index)?.to_string())
            }
            ConstantPool::Package { name_index } => {
                ("Package", self.utf8_at(*name_index)?.to_string())
            }
            ConstantPool::Padding => {
                return Err(Error::MalformedConstantPool(format!(
                    "index {index} is a padding slot"
                )))
            }
        };
        Ok(if tag_prefix {
            format!("{mnemonic} {body}")
        } else {
            body
        })
    }

    fn member_ref_to_string(&self, class_index: u16, name_and_type_index: u16) -> Result<String> {
        Ok(format!(
            "{}.{}",
            self.entry_to_string(class_index, false)?,
            self.entry_to_string(name_and_type_index, false)?
        ))
    }
}

fn read_u8(cursor: &mut Cursor<&[u8]>) -> Result<u8> {
    cursor
        .read_u8()
        .map_err(|e| Error::MalformedConstantPool(e.to_string()))
}

fn read_u16(cursor: &mut Cursor<&[u8]>) -> Result<u16> {
    cursor
        .read_u16::<BE>()
        .map_err(|e| Error::MalformedConstantPool(e.to_string()))
}

fn read_u32(cursor: &mut Cursor<&[u8]>) -> Result<u32> {
    cursor
        .read_u32::<BE>()
        .map_err(|e| Error::MalformedConstantPool(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf8_bytes(tag: u8, s: &str) -> Vec<u8> {
        let mut out = vec![tag];
        out.extend_from_slice(&(s.len() as u16).to_be_bytes());
        out.extend_from_slice(s.as_bytes());
        out
    }

    #[test]
    fn index_zero_is_padding() {
        let table = ConstantPoolTable::read_all(&utf8_bytes(TAG_UTF8, "hi")).unwrap();
        assert_eq!(*table.get(0).unwrap(), ConstantPool::Padding);
        assert_eq!(*table.get(1).unwrap(), ConstantPool::Utf8("hi".into()));
    }

    #[test]
    fn long_is_followed_by_padding_and_reindexes() {
        let mut bytes = vec![TAG_LONG];
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&5u32.to_be_bytes());
        bytes.extend(utf8_bytes(TAG_UTF8, "after"));
        let table = ConstantPoolTable::read_all(&bytes).unwrap();
        assert_eq!(*table.get(1).unwrap(), ConstantPool::Long(5));
        assert_eq!(*table.get(2).unwrap(), ConstantPool::Padding);
        assert_eq!(*table.get(3).unwrap(), ConstantPool::Utf8("after".into()));
    }

    #[test]
    fn out_of_range_index_is_invalid_index() {
        let table = ConstantPoolTable::read_all(&utf8_bytes(TAG_UTF8, "hi")).unwrap();
        assert!(matches!(table.get(50), Err(Error::InvalidIndex(50))));
    }

    #[test]
    fn member_ref_formats_as_class_dot_name_and_type() {
        let mut bytes = Vec::new();
        bytes.extend(utf8_bytes(TAG_UTF8, "com/Foo")); // 1
        bytes.push(TAG_CLASS);
        bytes.extend_from_slice(&1u16.to_be_bytes()); // 2 -> Class(1)
        bytes.extend(utf8_bytes(TAG_UTF8, "bar")); // 3
        bytes.extend(utf8_bytes(TAG_UTF8, "Lcom/Baz;")); // 4
        bytes.push(TAG_NAME_AND_TYPE);
        bytes.extend_from_slice(&3u16.to_be_bytes());
        bytes.extend_from_slice(&4u16.to_be_bytes()); // 5 -> NameAndType(3, 4)
        bytes.push(TAG_FIELDREF);
        bytes.extend_from_slice(&2u16.to_be_bytes());
        bytes.extend_from_slice(&5u16.to_be_bytes()); // 6 -> FieldRef(2, 5)

        let table = ConstantPoolTable::read_all(&bytes).unwrap();
        assert_eq!(
            table.entry_to_string(6, false).unwrap(),
            "com/Foo.bar:Lcom/Baz;"
        );
        assert_eq!(
            table.entry_to_string(6, true).unwrap(),
            "Fieldref com/Foo.bar:Lcom/Baz;"
        );
    }
}
