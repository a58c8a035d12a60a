//! The host-runtime adapter boundary (§6): everything the core needs from a live JVMTI
//! agent environment, expressed as a trait over opaque handles rather than bound
//! directly to the host's native headers. Loading, event subscription, and the
//! native-FFI binding itself are out of scope (§1) — the production implementation of
//! this trait is a thin, largely-`unsafe` adapter that lives outside the core's
//! testable surface. [`MockHostAdapter`] is the second, in-memory implementation the
//! CLI harness and the test suite drive instead.
//!
//! Grounded on `examples/original_source/src/main/cpp/exceptionCallback.cpp`'s
//! `Jvmti::`/`Jni::` call sites, which enumerate exactly the operations below.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::access_flags::MethodAccessFlags;
use crate::class_file::ClassFile;
use crate::constants::ConstantPoolTable;
use crate::errors::{Error, Result};
use crate::local_variables::LocalVariableTable;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodId(pub u64);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ThreadId(pub u64);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClassId(pub u64);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectId(pub u64);

/// A value crossing the reflection bridge (§6): the JVM value kinds the exception
/// callback actually reads or writes. Not a general-purpose JNI value encoding — just
/// enough to carry a `detailMessage` string and the handful of primitives a descriptor
/// check needs to validate against.
#[derive(Clone, Debug, PartialEq)]
pub enum HostValue {
    Object(ObjectId),
    Str(String),
    Int(i32),
    Long(i64),
    Bool(bool),
    Void,
}

/// Whether `value` is a legal argument/return for a field or method typed `descriptor`.
/// The source validates this at compile time via template machinery (§9); this crate
/// takes the runtime option the spec offers and checks it here instead, at every call.
fn value_matches_descriptor(value: &HostValue, descriptor: &str) -> bool {
    match (value, descriptor) {
        (HostValue::Int(_), "I" | "S" | "B" | "C") => true,
        (HostValue::Long(_), "J") => true,
        (HostValue::Bool(_), "Z") => true,
        (HostValue::Str(_) | HostValue::Object(_), d) if d.starts_with('L') || d.starts_with('[') => true,
        (HostValue::Void, "V") => true,
        _ => false,
    }
}

/// The host-adapter boundary (§6). Every fallible operation a production JVMTI agent
/// needs; the exception callback is written entirely against this trait so it can run
/// against either a live host or [`MockHostAdapter`].
pub trait HostAdapter {
    fn is_method_native(&self, method: MethodId) -> Result<bool>;
    fn get_frame_location(&self, thread: ThreadId, depth: u32) -> Result<(MethodId, usize)>;
    fn get_frame_count(&self, thread: ThreadId) -> Result<u32>;
    fn get_method_declaring_class(&self, method: MethodId) -> Result<ClassId>;
    fn get_class_name(&self, class: ClassId) -> Result<String>;
    fn get_method_name_and_descriptor(&self, method: MethodId) -> Result<(String, String)>;
    fn get_method_modifiers(&self, method: MethodId) -> Result<Vec<MethodAccessFlags>>;
    fn get_method_arguments_size(&self, method: MethodId) -> Result<u8>;
    fn get_bytecodes(&self, method: MethodId) -> Result<Vec<u8>>;
    fn get_constant_pool(&self, class: ClassId) -> Result<ConstantPoolTable>;
    /// Returns an empty table if the class carries no debug info for this method,
    /// per §6 ("table | empty-if-absent").
    fn get_local_variable_table(&self, method: MethodId) -> Result<LocalVariableTable>;

    fn get_class_of(&self, object: ObjectId) -> Result<ClassId>;
    fn get_field(&self, object: ObjectId, field_name: &str, descriptor: &str) -> Result<HostValue>;
    fn put_field(&self, object: ObjectId, field_name: &str, descriptor: &str, value: HostValue) -> Result<()>;
    fn invoke_virtual(
        &self,
        object: ObjectId,
        method_name: &str,
        descriptor: &str,
        args: &[HostValue],
    ) -> Result<HostValue>;
    fn invoke_static(
        &self,
        class: ClassId,
        method_name: &str,
        descriptor: &str,
        args: &[HostValue],
    ) -> Result<HostValue>;
    fn invoke_special(
        &self,
        object: ObjectId,
        class: ClassId,
        method_name: &str,
        descriptor: &str,
        args: &[HostValue],
    ) -> Result<HostValue>;
}

#[derive(Clone, Debug)]
struct MockObject {
    class: ClassId,
    fields: HashMap<String, HostValue>,
}

/// An in-memory [`HostAdapter`] built directly from parsed [`ClassFile`]s, with frame
/// stacks and objects registered explicitly by the caller. Backs the CLI's offline
/// analysis harness and the integration tests; it is not a JVM, so `invoke_*` only
/// covers the identity-returning cases the exception callback itself needs.
#[derive(Default)]
pub struct MockHostAdapter {
    classes: Vec<ClassFile>,
    frames: RefCell<HashMap<u64, Vec<(MethodId, usize)>>>,
    objects: RefCell<HashMap<u64, MockObject>>,
    next_object_id: RefCell<u64>,
}

fn encode_method(class_index: usize, method_index: usize) -> u64 {
    ((class_index as u64) << 32) | (method_index as u64)
}

fn decode_method(id: u64) -> (usize, usize) {
    ((id >> 32) as usize, (id & 0xFFFF_FFFF) as usize)
}

impl MockHostAdapter {
    pub fn new() -> MockHostAdapter {
        MockHostAdapter::default()
    }

    pub fn register_class(&mut self, class: ClassFile) -> ClassId {
        self.classes.push(class);
        ClassId((self.classes.len() - 1) as u64)
    }

    pub fn method_id(&self, class: ClassId, name: &str, descriptor: &str) -> Result<MethodId> {
        let class_index = class.0 as usize;
        let class_file = self
            .classes
            .get(class_index)
            .ok_or_else(|| Error::InvalidArgument(format!("no class registered at {class_index}")))?;
        let method_index = class_file
            .methods
            .iter()
            .position(|m| m.name == name && m.descriptor == descriptor)
            .ok_or_else(|| Error::InvalidArgument(format!("no method {name}{descriptor} on registered class")))?;
        Ok(MethodId(encode_method(class_index, method_index)))
    }

    /// Sets thread `thread`'s call stack, frame 0 being the innermost (current) frame.
    /// Used to model the caller frame Phase A' retargets to (§4.5 scenario S6).
    pub fn set_frames(&self, thread: ThreadId, frames: Vec<(MethodId, usize)>) {
        self.frames.borrow_mut().insert(thread.0, frames);
    }

    pub fn register_object(&self, class: ClassId, fields: HashMap<String, HostValue>) -> ObjectId {
        let mut next = self.next_object_id.borrow_mut();
        let id = *next;
        *next += 1;
        self.objects.borrow_mut().insert(id, MockObject { class, fields });
        ObjectId(id)
    }

    fn class_at(&self, class: ClassId) -> Result<&ClassFile> {
        self.classes
            .get(class.0 as usize)
            .ok_or_else(|| Error::InvalidArgument(format!("no class registered at {}", class.0)))
    }

    fn method_at(&self, method: MethodId) -> Result<(&ClassFile, &crate::class_file::MethodInfo)> {
        let (class_index, method_index) = decode_method(method.0);
        let class_file = self
            .classes
            .get(class_index)
            .ok_or_else(|| Error::InvalidArgument(format!("no class registered at {class_index}")))?;
        let method_info = class_file
            .methods
            .get(method_index)
            .ok_or_else(|| Error::InvalidArgument(format!("no method at index {method_index}")))?;
        Ok((class_file, method_info))
    }
}

impl HostAdapter for MockHostAdapter {
    fn is_method_native(&self, method: MethodId) -> Result<bool> {
        Ok(self.method_at(method)?.1.is_native())
    }

    fn get_frame_location(&self, thread: ThreadId, depth: u32) -> Result<(MethodId, usize)> {
        self.frames
            .borrow()
            .get(&thread.0)
            .and_then(|frames| frames.get(depth as usize))
            .copied()
            .ok_or_else(|| Error::InvalidArgument(format!("thread {} has no frame at depth {depth}", thread.0)))
    }

    fn get_frame_count(&self, thread: ThreadId) -> Result<u32> {
        Ok(self.frames.borrow().get(&thread.0).map_or(0, |f| f.len() as u32))
    }

    fn get_method_declaring_class(&self, method: MethodId) -> Result<ClassId> {
        let (class_index, _) = decode_method(method.0);
        Ok(ClassId(class_index as u64))
    }

    fn get_class_name(&self, class: ClassId) -> Result<String> {
        Ok(self.class_at(class)?.this_class.clone())
    }

    fn get_method_name_and_descriptor(&self, method: MethodId) -> Result<(String, String)> {
        let (_, method_info) = self.method_at(method)?;
        Ok((method_info.name.clone(), method_info.descriptor.clone()))
    }

    fn get_method_modifiers(&self, method: MethodId) -> Result<Vec<MethodAccessFlags>> {
        Ok(self.method_at(method)?.1.access_flags.clone())
    }

    fn get_method_arguments_size(&self, method: MethodId) -> Result<u8> {
        let (_, method_info) = self.method_at(method)?;
        let implicit_this = if method_info.is_static() { 0 } else { 1 };
        Ok(method_info.parameter_length + implicit_this)
    }

    fn get_bytecodes(&self, method: MethodId) -> Result<Vec<u8>> {
        let (_, method_info) = self.method_at(method)?;
        method_info
            .code
            .as_ref()
            .map(|code| code.code.clone())
            .ok_or_else(|| Error::InvalidArgument(format!("method {} has no Code attribute", method_info.name)))
    }

    fn get_constant_pool(&self, class: ClassId) -> Result<ConstantPoolTable> {
        Ok(self.class_at(class)?.constant_pool.clone())
    }

    fn get_local_variable_table(&self, method: MethodId) -> Result<LocalVariableTable> {
        let (_, method_info) = self.method_at(method)?;
        Ok(method_info
            .code
            .as_ref()
            .map(|code| code.local_variables.clone())
            .unwrap_or_default())
    }

    fn get_class_of(&self, object: ObjectId) -> Result<ClassId> {
        self.objects
            .borrow()
            .get(&object.0)
            .map(|o| o.class)
            .ok_or_else(|| Error::InvalidArgument(format!("no object registered at {}", object.0)))
    }

    fn get_field(&self, object: ObjectId, field_name: &str, descriptor: &str) -> Result<HostValue> {
        let objects = self.objects.borrow();
        let object = objects
            .get(&object.0)
            .ok_or_else(|| Error::InvalidArgument(format!("no object registered at {}", object.0)))?;
        let value = object
            .fields
            .get(field_name)
            .cloned()
            .unwrap_or(HostValue::Str(String::new()));
        if !value_matches_descriptor(&value, descriptor) {
            return Err(Error::InvalidArgument(format!(
                "field {field_name} does not match descriptor {descriptor}"
            )));
        }
        Ok(value)
    }

    fn put_field(&self, object: ObjectId, field_name: &str, descriptor: &str, value: HostValue) -> Result<()> {
        if !value_matches_descriptor(&value, descriptor) {
            return Err(Error::InvalidArgument(format!(
                "value for field {field_name} does not match descriptor {descriptor}"
            )));
        }
        let mut objects = self.objects.borrow_mut();
        let object = objects
            .get_mut(&object.0)
            .ok_or_else(|| Error::InvalidArgument(format!("no object registered at {}", object.0)))?;
        object.fields.insert(field_name.to_string(), value);
        Ok(())
    }

    fn invoke_virtual(
        &self,
        _object: ObjectId,
        method_name: &str,
        _descriptor: &str,
        _args: &[HostValue],
    ) -> Result<HostValue> {
        Err(Error::HostCallbackError {
            class: "MockHostAdapter".into(),
            message: format!("no mock behavior registered for invoke_virtual {method_name}"),
        })
    }

    fn invoke_static(
        &self,
        _class: ClassId,
        method_name: &str,
        _descriptor: &str,
        _args: &[HostValue],
    ) -> Result<HostValue> {
        Err(Error::HostCallbackError {
            class: "MockHostAdapter".into(),
            message: format!("no mock behavior registered for invoke_static {method_name}"),
        })
    }

    fn invoke_special(
        &self,
        _object: ObjectId,
        _class: ClassId,
        method_name: &str,
        _descriptor: &str,
        _args: &[HostValue],
    ) -> Result<HostValue> {
        Err(Error::HostCallbackError {
            class: "MockHostAdapter".into(),
            message: format!("no mock behavior registered for invoke_special {method_name}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_method_class(name: &str, descriptor: &str, is_static: bool, code: Vec<u8>) -> ClassFile {
        use crate::class_file::MethodInfo;
        use crate::code_attribute::CodeAttribute;
        use crate::constants::ConstantPoolTable;
        use crate::descriptors::parse_method_signature;

        let mut flags = vec![MethodAccessFlags::AccPublic];
        if is_static {
            flags.push(MethodAccessFlags::AccStatic);
        }
        let (params, return_type) = parse_method_signature(descriptor).unwrap();
        let parameter_length = crate::descriptors::parameter_length(&params).unwrap();
        let method = MethodInfo {
            access_flags: flags,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            params,
            return_type,
            parameter_length,
            code: Some(CodeAttribute::from_parts(2, 2, code, LocalVariableTable::default()).unwrap()),
        };
        ClassFile {
            magic: 0xCAFEBABE,
            minor_version: 0,
            major_version: 61,
            constant_pool: ConstantPoolTable::read_all(&[]).unwrap(),
            access_flags: vec![],
            this_class: "com.Foo".to_string(),
            super_class: None,
            interfaces: vec![],
            fields: vec![],
            methods: vec![method],
        }
    }

    #[test]
    fn resolves_method_identity_through_registered_class() {
        let mut adapter = MockHostAdapter::new();
        let class = adapter.register_class(one_method_class("f", "()V", false, vec![0xb1]));
        let method = adapter.method_id(class, "f", "()V").unwrap();

        assert!(!adapter.is_method_native(method).unwrap());
        assert_eq!(adapter.get_bytecodes(method).unwrap(), vec![0xb1]);
        assert_eq!(adapter.get_method_arguments_size(method).unwrap(), 1);
        assert_eq!(adapter.get_class_name(class).unwrap(), "com.Foo");
    }

    #[test]
    fn frame_stack_models_caller_retarget() {
        let adapter = MockHostAdapter::new();
        let thread = ThreadId(1);
        adapter.set_frames(thread, vec![(MethodId(0), 5), (MethodId(1), 10)]);
        assert_eq!(adapter.get_frame_count(thread).unwrap(), 2);
        assert_eq!(adapter.get_frame_location(thread, 1).unwrap(), (MethodId(1), 10));
    }

    #[test]
    fn field_round_trip_validates_descriptor() {
        let adapter = MockHostAdapter::new();
        let class = ClassId(0);
        let object = adapter.register_object(class, HashMap::new());
        adapter
            .put_field(object, "detailMessage", "Ljava/lang/String;", HostValue::Str("hi".into()))
            .unwrap();
        assert_eq!(
            adapter.get_field(object, "detailMessage", "Ljava/lang/String;").unwrap(),
            HostValue::Str("hi".into())
        );
        let err = adapter.put_field(object, "detailMessage", "I", HostValue::Str("hi".into()));
        assert!(matches!(err, Err(Error::InvalidArgument(_))));
    }
}
