//! Whole `.class` file loading (§3, §6): the constant pool, access flags, and the
//! field/method tables the CLI disassembles from and the mock host adapter serves
//! frames from.
//!
//! Grounded on `examples/SarahGreyWolf-JVM-rs/src/class_file.rs` for the top-level
//! on-wire shape (magic/version/pool/flags/this_class/super_class/interfaces/fields/
//! methods), trimmed per DESIGN.md to the four attribute kinds the analyzer and CLI
//! actually consult (`Code`, `LocalVariableTable`, `LineNumberTable`, `ConstantValue`);
//! everything else is skipped as opaque bytes rather than modeled individually.

use std::io::Cursor;

use byteorder::{ReadBytesExt, BE};

use crate::access_flags::{ClassAccessFlags, FieldAccessFlags, MethodAccessFlags};
use crate::attributes::ConstantValue;
use crate::code_attribute::CodeAttribute;
use crate::constants::ConstantPoolTable;
use crate::descriptors::{parameter_length, parse_method_signature, parse_type, to_java_class_name};
use crate::errors::{Error, Result};

#[derive(Clone, Debug)]
pub struct FieldInfo {
    pub access_flags: Vec<FieldAccessFlags>,
    pub name: String,
    pub descriptor: String,
    pub type_name: String,
    pub constant_value: Option<ConstantValue>,
}

#[derive(Clone, Debug)]
pub struct MethodInfo {
    pub access_flags: Vec<MethodAccessFlags>,
    pub name: String,
    pub descriptor: String,
    pub params: Vec<String>,
    pub return_type: String,
    pub parameter_length: u8,
    pub code: Option<CodeAttribute>,
}

impl MethodInfo {
    pub fn is_native(&self) -> bool {
        self.access_flags.contains(&MethodAccessFlags::AccNative)
    }

    pub fn is_static(&self) -> bool {
        self.access_flags.contains(&MethodAccessFlags::AccStatic)
    }
}

#[derive(Clone, Debug)]
pub struct ClassFile {
    pub magic: u32,
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPoolTable,
    pub access_flags: Vec<ClassAccessFlags>,
    pub this_class: String,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
}

impl ClassFile {
    pub fn from_bytes(bytes: &[u8]) -> Result<ClassFile> {
        let mut cursor = Cursor::new(bytes);
        let magic = read_u32(&mut cursor)?;
        if magic != 0xCAFE_BABE {
            return Err(Error::MalformedConstantPool(format!(
                "bad magic number {magic:#010x}, expected 0xCAFEBABE"
            )));
        }
        let minor_version = read_u16(&mut cursor)?;
        let major_version = read_u16(&mut cursor)?;

        let constant_pool_count = read_u16(&mut cursor)?;
        let constant_pool = ConstantPoolTable::read_count(&mut cursor, constant_pool_count)?;

        let access_flags = ClassAccessFlags::from_u16(read_u16(&mut cursor)?);
        let this_class_index = read_u16(&mut cursor)?;
        let this_class = class_name_at(&constant_pool, this_class_index)?;
        let super_class_index = read_u16(&mut cursor)?;
        let super_class = if super_class_index == 0 {
            None
        } else {
            Some(class_name_at(&constant_pool, super_class_index)?)
        };

        let interfaces_count = read_u16(&mut cursor)?;
        let mut interfaces = Vec::with_capacity(interfaces_count as usize);
        for _ in 0..interfaces_count {
            let index = read_u16(&mut cursor)?;
            interfaces.push(class_name_at(&constant_pool, index)?);
        }

        let fields_count = read_u16(&mut cursor)?;
        let mut fields = Vec::with_capacity(fields_count as usize);
        for _ in 0..fields_count {
            fields.push(read_field(&mut cursor, &constant_pool)?);
        }

        let methods_count = read_u16(&mut cursor)?;
        let mut methods = Vec::with_capacity(methods_count as usize);
        for _ in 0..methods_count {
            methods.push(read_method(&mut cursor, &constant_pool)?);
        }

        // Class-level attributes (SourceFile, InnerClasses, ...): none feed the
        // analyzer or the CLI disassembler, so they are skipped wholesale.
        let attributes_count = read_u16(&mut cursor)?;
        for _ in 0..attributes_count {
            let _name_index = read_u16(&mut cursor)?;
            let length = read_u32(&mut cursor)?;
            skip(&mut cursor, length as usize)?;
        }

        Ok(ClassFile {
            magic,
            minor_version,
            major_version,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
        })
    }

    pub fn find_method(&self, name: &str, descriptor: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| m.name == name && m.descriptor == descriptor)
    }
}

fn class_name_at(pool: &ConstantPoolTable, index: u16) -> Result<String> {
    Ok(to_java_class_name(&pool.entry_to_string(index, false)?))
}

fn read_field(cursor: &mut Cursor<&[u8]>, pool: &ConstantPoolTable) -> Result<FieldInfo> {
    let access_flags = FieldAccessFlags::from_u16(read_u16(cursor)?);
    let name_index = read_u16(cursor)?;
    let descriptor_index = read_u16(cursor)?;
    let name = pool.entry_to_string(name_index, false)?;
    let descriptor = pool.entry_to_string(descriptor_index, false)?;
    let (type_name, _) = parse_type(&descriptor, 0)?;

    let mut constant_value = None;
    let attributes_count = read_u16(cursor)?;
    for _ in 0..attributes_count {
        let attr_name_index = read_u16(cursor)?;
        let length = read_u32(cursor)?;
        let attr_name = pool.entry_to_string(attr_name_index, false)?;
        if attr_name == "ConstantValue" {
            constant_value = Some(ConstantValue::read(cursor)?);
        } else {
            skip(cursor, length as usize)?;
        }
    }

    Ok(FieldInfo { access_flags, name, descriptor, type_name, constant_value })
}

fn read_method(cursor: &mut Cursor<&[u8]>, pool: &ConstantPoolTable) -> Result<MethodInfo> {
    let access_flags = MethodAccessFlags::from_u16(read_u16(cursor)?);
    let name_index = read_u16(cursor)?;
    let descriptor_index = read_u16(cursor)?;
    let name = pool.entry_to_string(name_index, false)?;
    let descriptor = pool.entry_to_string(descriptor_index, false)?;
    let (params, return_type) = parse_method_signature(&descriptor)?;
    let parameter_length = parameter_length(&params)?;

    let mut code = None;
    let attributes_count = read_u16(cursor)?;
    for _ in 0..attributes_count {
        let attr_name_index = read_u16(cursor)?;
        let length = read_u32(cursor)?;
        let attr_name = pool.entry_to_string(attr_name_index, false)?;
        if attr_name == "Code" {
            code = Some(CodeAttribute::read(cursor, pool)?);
        } else {
            skip(cursor, length as usize)?;
        }
    }

    Ok(MethodInfo { access_flags, name, descriptor, params, return_type, parameter_length, code })
}

fn skip(cursor: &mut Cursor<&[u8]>, len: usize) -> Result<()> {
    for _ in 0..len {
        read_u8(cursor)?;
    }
    Ok(())
}

fn read_u8(cursor: &mut Cursor<&[u8]>) -> Result<u8> {
    cursor.read_u8().map_err(|e| Error::MalformedConstantPool(e.to_string()))
}

fn read_u16(cursor: &mut Cursor<&[u8]>) -> Result<u16> {
    cursor.read_u16::<BE>().map_err(|e| Error::MalformedConstantPool(e.to_string()))
}

fn read_u32(cursor: &mut Cursor<&[u8]>) -> Result<u32> {
    cursor.read_u32::<BE>().map_err(|e| Error::MalformedConstantPool(e.to_string()))
}
