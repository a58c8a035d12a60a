//! The top-level `ExceptionRaised` callback (§5, §6): the agent's only entry point.
//! Validates the guard conditions, retargets past the `Objects.requireNonNull`
//! intrinsic (Phase A'), runs the NPE cause analyzer, and writes the result back
//! through the host adapter. All internal errors are caught here and swallowed.
//!
//! Grounded on `examples/original_source/src/main/cpp/exceptionCallback.cpp`'s
//! `exceptionCallback` function: the guard order, the requireNonNull retarget, and the
//! try/catch-log-swallow boundary are ported directly; `printBytecode`/
//! `printMethodParams`'s trace-level dumps became the `debug!`/`trace!` calls below.

use std::cell::Cell;

use crate::analyzer;
use crate::code_attribute::CodeAttribute;
use crate::errors::Result;
use crate::host::{HostAdapter, HostValue, MethodId, ObjectId, ThreadId};
use crate::method::CurrentMethod;

thread_local! {
    /// Recursive-entry guard (§5): the host may deliver a nested `ExceptionRaised`
    /// event on the same thread if the adapter's own host calls throw. Set on entry,
    /// checked before doing any work, cleared on every exit path.
    static IN_CALLBACK: Cell<bool> = const { Cell::new(false) };
}

/// The agent's `ExceptionRaised` entry point. Never panics and never propagates an
/// error to the host: every failure is logged under the `"ExceptionCallback"` target
/// and swallowed, leaving the exception's detail message exactly as the host set it.
pub fn exception_callback<H: HostAdapter>(
    host: &H,
    thread: ThreadId,
    method: MethodId,
    location: usize,
    exception: ObjectId,
) {
    let already_running = IN_CALLBACK.with(|flag| flag.replace(true));
    if already_running {
        log::debug!(target: "ExceptionCallback", "dropping recursive entry on this thread");
        return;
    }

    if let Err(err) = run(host, thread, method, location, exception) {
        log::error!(target: "ExceptionCallback", "failed to run exception callback: {err:?}");
    }

    IN_CALLBACK.with(|flag| flag.set(false));
}

fn run<H: HostAdapter>(
    host: &H,
    thread: ThreadId,
    method: MethodId,
    location: usize,
    exception: ObjectId,
) -> Result<()> {
    if host.is_method_native(method)? || location == 0 {
        return Ok(());
    }

    let exception_class = host.get_class_of(exception)?;
    let exception_class_name = host.get_class_name(exception_class)?;
    if exception_class_name != "java.lang.NullPointerException" {
        return Ok(());
    }

    // If the NPE already carries a message (e.g. it was thrown explicitly), leave it
    // alone: this agent only enriches the host's default, message-less NPEs.
    if let HostValue::Str(message) = host.get_field(exception, "detailMessage", "Ljava/lang/String;")? {
        if !message.is_empty() {
            return Ok(());
        }
    }

    let (mut fault_method, mut fault_location) = (method, location);
    let (mut name, mut descriptor) = host.get_method_name_and_descriptor(fault_method)?;
    let mut declaring_class_name = host.get_class_name(host.get_method_declaring_class(fault_method)?)?;

    // Phase A' (§4.5): JDK9+ compiles an implicit Objects.requireNonNull call ahead of
    // indy/inner-constructor use sites. Analyzing the intrinsic itself would only ever
    // say "null argument to requireNonNull"; retarget to the caller's frame so the
    // analyzer reasons about the real null-check call site instead.
    if declaring_class_name == "java.util.Objects" && name == "requireNonNull" {
        let (caller_method, caller_location) = host.get_frame_location(thread, 1)?;
        fault_method = caller_method;
        fault_location = caller_location;
        let (caller_name, caller_descriptor) = host.get_method_name_and_descriptor(fault_method)?;
        declaring_class_name = host.get_class_name(host.get_method_declaring_class(fault_method)?)?;
        name = caller_name;
        descriptor = caller_descriptor;
    }

    let modifiers = host.get_method_modifiers(fault_method)?;
    let current_method = CurrentMethod::new(declaring_class_name, name, descriptor, modifiers)?;

    let declaring_class = host.get_method_declaring_class(fault_method)?;
    let pool = host.get_constant_pool(declaring_class)?;
    let bytecodes = host.get_bytecodes(fault_method)?;
    let local_variables = host.get_local_variable_table(fault_method)?;
    let code = CodeAttribute::from_parts(0, 0, bytecodes, local_variables)?;

    log::debug!(
        target: "ExceptionCallback",
        "{exception_class_name}: at {}[{fault_location}]",
        current_method.label()
    );
    log::trace!(target: "Bytecode", "analyzing:\n{}", code.disassembly(&pool));

    let detail = analyzer::describe_npe(&current_method, &pool, &code, fault_location)?;
    host.put_field(exception, "detailMessage", "Ljava/lang/String;", HostValue::Str(detail))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::access_flags::MethodAccessFlags;
    use crate::class_file::{ClassFile, MethodInfo};
    use crate::constants::ConstantPoolTable;
    use crate::descriptors::{parameter_length, parse_method_signature};
    use crate::host::{ClassId, MockHostAdapter};
    use crate::instructions;
    use crate::local_variables::LocalVariableTable;

    fn empty_class(this_class: &str) -> ClassFile {
        ClassFile {
            magic: 0xCAFEBABE,
            minor_version: 0,
            major_version: 61,
            constant_pool: ConstantPoolTable::read_all(&[]).unwrap(),
            access_flags: vec![],
            this_class: this_class.to_string(),
            super_class: None,
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
        }
    }

    fn push_utf8(bytes: &mut Vec<u8>, s: &str) {
        bytes.push(1u8);
        bytes.extend_from_slice(&(s.len() as u16).to_be_bytes());
        bytes.extend_from_slice(s.as_bytes());
    }

    /// Builds `class com.Foo { void g(String s) { requireNonNull(s); } }`'s pool plus
    /// a `Methodref` index to `java/util/Objects.requireNonNull`.
    fn pool_with_require_non_null_ref() -> (ConstantPoolTable, u16) {
        let mut bytes = Vec::new();
        push_utf8(&mut bytes, "java/util/Objects"); // 1
        bytes.push(7);
        bytes.extend_from_slice(&1u16.to_be_bytes()); // 2 -> Class
        push_utf8(&mut bytes, "requireNonNull"); // 3
        push_utf8(&mut bytes, "(Ljava/lang/Object;)Ljava/lang/Object;"); // 4
        bytes.push(12);
        bytes.extend_from_slice(&3u16.to_be_bytes());
        bytes.extend_from_slice(&4u16.to_be_bytes()); // 5 -> NameAndType
        bytes.push(10); // Methodref
        bytes.extend_from_slice(&2u16.to_be_bytes());
        bytes.extend_from_slice(&5u16.to_be_bytes()); // 6
        (ConstantPoolTable::read_all(&bytes).unwrap(), 6)
    }

    fn method_info(name: &str, descriptor: &str, is_static: bool, code: Vec<u8>, locals: LocalVariableTable) -> MethodInfo {
        let mut flags = vec![MethodAccessFlags::AccPublic];
        if is_static {
            flags.push(MethodAccessFlags::AccStatic);
        }
        let (params, return_type) = parse_method_signature(descriptor).unwrap();
        let parameter_length = parameter_length(&params).unwrap();
        MethodInfo {
            access_flags: flags,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            params,
            return_type,
            parameter_length,
            code: Some(CodeAttribute::from_parts(2, 2, code, locals).unwrap()),
        }
    }

    struct PanicAdapter;
    macro_rules! unreachable_impl {
        ($($name:ident($($arg:ident: $ty:ty),*) -> $ret:ty;)*) => {
            impl HostAdapter for PanicAdapter {
                $(fn $name(&self, $($arg: $ty),*) -> Result<$ret> {
                    let _ = ($($arg),*,);
                    panic!("PanicAdapter::{} should not be called", stringify!($name));
                })*
            }
        };
    }
    unreachable_impl! {
        is_method_native(_m: MethodId) -> bool;
        get_frame_location(_t: ThreadId, _d: u32) -> (MethodId, usize);
        get_frame_count(_t: ThreadId) -> u32;
        get_method_declaring_class(_m: MethodId) -> ClassId;
        get_class_name(_c: ClassId) -> String;
        get_method_name_and_descriptor(_m: MethodId) -> (String, String);
        get_method_modifiers(_m: MethodId) -> Vec<MethodAccessFlags>;
        get_method_arguments_size(_m: MethodId) -> u8;
        get_bytecodes(_m: MethodId) -> Vec<u8>;
        get_constant_pool(_c: ClassId) -> ConstantPoolTable;
        get_local_variable_table(_m: MethodId) -> LocalVariableTable;
        get_class_of(_o: ObjectId) -> ClassId;
        get_field(_o: ObjectId, _n: &str, _d: &str) -> HostValue;
        put_field(_o: ObjectId, _n: &str, _d: &str, _v: HostValue) -> ();
        invoke_virtual(_o: ObjectId, _n: &str, _d: &str, _a: &[HostValue]) -> HostValue;
        invoke_static(_c: ClassId, _n: &str, _d: &str, _a: &[HostValue]) -> HostValue;
        invoke_special(_o: ObjectId, _c: ClassId, _n: &str, _d: &str, _a: &[HostValue]) -> HostValue;
    }

    #[test]
    fn recursive_entry_is_dropped_without_touching_the_host() {
        IN_CALLBACK.with(|flag| flag.set(true));
        exception_callback(&PanicAdapter, ThreadId(0), MethodId(0), 1, ObjectId(0));
        IN_CALLBACK.with(|flag| flag.set(false));
    }

    /// S6: the `Objects.requireNonNull` intrinsic frame retargets to its caller, `g`,
    /// whose fault is at the `invokestatic` that forwarded the null argument.
    #[test]
    fn retargets_past_require_non_null_to_the_caller_frame() {
        crate::init_test_logging();
        let mut adapter = MockHostAdapter::new();
        let require_non_null_class = {
            let mut stub = empty_class("java.util.Objects");
            stub.methods.push(method_info(
                "requireNonNull",
                "(Ljava/lang/Object;)Ljava/lang/Object;",
                true,
                vec![instructions::ARETURN],
                LocalVariableTable::default(),
            ));
            stub
        };
        let objects_class = adapter.register_class(require_non_null_class);
        let require_non_null_method = adapter
            .method_id(objects_class, "requireNonNull", "(Ljava/lang/Object;)Ljava/lang/Object;")
            .unwrap();

        let (pool, methodref) = pool_with_require_non_null_ref();
        let mut code = vec![instructions::ALOAD_0 + 1, instructions::INVOKESTATIC];
        code.extend_from_slice(&methodref.to_be_bytes());
        let fault_offset = 1usize;
        code.push(instructions::POP);
        code.push(instructions::RETURN);

        let mut locals = LocalVariableTable::default();
        locals.insert(0, code.len() as u16, "s", "Ljava/lang/String;", 1);

        let mut foo_class = ClassFile {
            magic: 0xCAFEBABE,
            minor_version: 0,
            major_version: 61,
            constant_pool: pool,
            access_flags: vec![],
            this_class: "com.Foo".to_string(),
            super_class: None,
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
        };
        foo_class
            .methods
            .push(method_info("g", "(Ljava/lang/String;)V", false, code, locals));
        let foo_class_id = adapter.register_class(foo_class);
        let g_method = adapter.method_id(foo_class_id, "g", "(Ljava/lang/String;)V").unwrap();

        let thread = ThreadId(1);
        adapter.set_frames(thread, vec![(require_non_null_method, 3), (g_method, fault_offset)]);

        let npe_class = adapter.register_class(empty_class("java.lang.NullPointerException"));
        let exception = adapter.register_object(npe_class, HashMap::new());

        exception_callback(&adapter, thread, require_non_null_method, 3, exception);

        let message = adapter
            .get_field(exception, "detailMessage", "Ljava/lang/String;")
            .unwrap();
        assert_eq!(
            message,
            HostValue::Str("Assertion Objects#requireNonNull failed for null method parameter s:java.lang.String".into())
        );
    }

    #[test]
    fn native_methods_are_skipped() {
        let mut adapter = MockHostAdapter::new();
        let mut native_holder = empty_class("com.Foo");
        native_holder
            .methods
            .push(MethodInfo {
                access_flags: vec![MethodAccessFlags::AccNative, MethodAccessFlags::AccPublic],
                name: "f".to_string(),
                descriptor: "()V".to_string(),
                params: vec![],
                return_type: "void".to_string(),
                parameter_length: 0,
                code: None,
            });
        let class = adapter.register_class(native_holder);
        let method = adapter.method_id(class, "f", "()V").unwrap();
        let npe_class = adapter.register_class(empty_class("java.lang.NullPointerException"));
        let exception = adapter.register_object(npe_class, HashMap::new());

        // Must return before ever writing a detail message.
        exception_callback(&adapter, ThreadId(0), method, 5, exception);
        assert_eq!(
            adapter.get_field(exception, "detailMessage", "Ljava/lang/String;").unwrap(),
            HostValue::Str(String::new())
        );
    }
}
