use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use clap::Parser;

use npe_trace::access_flags::{ClassAccessFlags, FieldAccessFlags, MethodAccessFlags};
use npe_trace::class_file::ClassFile;
use npe_trace::host::{HostAdapter, HostValue, MockHostAdapter, ThreadId};

/// A `.class` pretty-printer plus an offline harness for the NPE cause analyzer:
/// loads one class file, disassembles it, and — given `--fault-method` /
/// `--fault-offset` — runs the full exception-callback path against a
/// `MockHostAdapter` and prints the resulting detail message.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(value_name = "CLASS")]
    class_file: PathBuf,

    /// Disassemble each method's bytecode
    #[arg(short = 'c', long)]
    disassemble: bool,

    /// Dump the resolved constant pool
    #[arg(long)]
    constants: bool,

    /// Run the NPE analyzer as if an exception were raised at this bytecode offset
    #[arg(long, requires_all = ["fault_method", "fault_descriptor"])]
    fault_offset: Option<usize>,

    /// Name of the method the fault offset belongs to (used with --fault-offset)
    #[arg(long)]
    fault_method: Option<String>,

    /// Descriptor of the method the fault offset belongs to (used with --fault-offset)
    #[arg(long)]
    fault_descriptor: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.class_file.extension().and_then(|e| e.to_str()) != Some("class") {
        return Err("file provided was not a .class file".into());
    }
    let mut file = File::open(&args.class_file)?;
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)?;
    let class = ClassFile::from_bytes(&contents)?;

    if let Some(offset) = args.fault_offset {
        let method_name = args.fault_method.unwrap();
        let descriptor = args.fault_descriptor.unwrap();
        return run_fault_harness(class, &method_name, &descriptor, offset);
    }

    print_class(&class, &args);
    Ok(())
}

fn print_class(class: &ClassFile, args: &Args) {
    let access = class
        .access_flags
        .iter()
        .filter(|f| **f != ClassAccessFlags::AccSuper)
        .map(class_access_keyword)
        .collect::<Vec<_>>()
        .join(" ");
    let extends = class
        .super_class
        .as_deref()
        .filter(|s| *s != "java.lang.Object")
        .map(|s| format!(" extends {s}"))
        .unwrap_or_default();
    println!("{access} class {}{extends} {{", class.this_class);

    for field in &class.fields {
        let access = field.access_flags.iter().map(field_access_keyword).collect::<Vec<_>>().join(" ");
        match field.constant_value.as_ref().map(|cv| class.constant_pool.entry_to_string(cv.constant_value_index, false)) {
            Some(Ok(value)) => println!("\t{access} {} {} = {value};", field.type_name, field.name),
            _ => println!("\t{access} {} {};", field.type_name, field.name),
        }
    }
    if !class.fields.is_empty() {
        println!();
    }

    for method in &class.methods {
        let access = method.access_flags.iter().map(method_access_keyword).collect::<Vec<_>>().join(" ");
        let params = method.params.join(", ");
        if method.name == "<init>" {
            println!("\t{access} {}({params});", class.this_class);
        } else {
            println!("\t{access} {} {}({params});", method.return_type, method.name);
        }
        if args.disassemble {
            if let Some(code) = &method.code {
                println!("{}", indent(&code.disassembly(&class.constant_pool)));
            }
        }
        println!();
    }
    println!("}}");

    if args.constants {
        println!("Constant pool:");
        for index in 1..class.constant_pool.len() as u16 {
            if let Ok(entry) = class.constant_pool.entry_to_string(index, true) {
                println!("\t#{index} = {entry}");
            }
        }
    }
}

fn indent(disassembly: &str) -> String {
    disassembly.lines().map(|l| format!("\t\t{l}")).collect::<Vec<_>>().join("\n")
}

fn class_access_keyword(flag: &ClassAccessFlags) -> &'static str {
    match flag {
        ClassAccessFlags::AccPublic => "public",
        ClassAccessFlags::AccFinal => "final",
        ClassAccessFlags::AccInterface => "interface",
        ClassAccessFlags::AccAbstract => "abstract",
        _ => "",
    }
}

fn field_access_keyword(flag: &FieldAccessFlags) -> &'static str {
    match flag {
        FieldAccessFlags::AccPublic => "public",
        FieldAccessFlags::AccPrivate => "private",
        FieldAccessFlags::AccProtected => "protected",
        FieldAccessFlags::AccStatic => "static",
        FieldAccessFlags::AccFinal => "final",
        _ => "",
    }
}

fn method_access_keyword(flag: &MethodAccessFlags) -> &'static str {
    match flag {
        MethodAccessFlags::AccPublic => "public",
        MethodAccessFlags::AccPrivate => "private",
        MethodAccessFlags::AccProtected => "protected",
        MethodAccessFlags::AccStatic => "static",
        MethodAccessFlags::AccFinal => "final",
        MethodAccessFlags::AccNative => "native",
        MethodAccessFlags::AccAbstract => "abstract",
        _ => "",
    }
}

/// Registers `class` with a fresh `MockHostAdapter`, synthesizes a single-frame call
/// stack at `offset` in `method_name`/`descriptor`, raises a bare
/// `NullPointerException` at that frame, and prints the detail message the analyzer
/// would write back through the host.
fn run_fault_harness(
    class: ClassFile,
    method_name: &str,
    descriptor: &str,
    offset: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let method = class
        .find_method(method_name, descriptor)
        .ok_or_else(|| format!("no method {method_name}{descriptor} in {}", class.this_class))?
        .clone();
    if method.code.is_none() {
        return Err(format!("{method_name}{descriptor} has no Code attribute (native/abstract)").into());
    }

    let mut adapter = MockHostAdapter::new();
    let class_id = adapter.register_class(class);
    let method_id = adapter.method_id(class_id, method_name, descriptor)?;
    adapter.set_frames(ThreadId(0), vec![(method_id, offset)]);

    let npe_class = adapter.register_class(empty_class("java.lang.NullPointerException"));
    let exception = adapter.register_object(npe_class, HashMap::new());

    npe_trace::exception_callback::exception_callback(&adapter, ThreadId(0), method_id, offset, exception);

    match adapter.get_field(exception, "detailMessage", "Ljava/lang/String;")? {
        HostValue::Str(message) if !message.is_empty() => println!("{message}"),
        _ => println!("[no NPE cause determined]"),
    }
    Ok(())
}

fn empty_class(name: &str) -> ClassFile {
    ClassFile {
        magic: 0xCAFE_BABE,
        minor_version: 0,
        major_version: 61,
        constant_pool: npe_trace::constants::ConstantPoolTable::read_all(&[]).expect("empty pool"),
        access_flags: vec![ClassAccessFlags::AccPublic],
        this_class: name.to_string(),
        super_class: Some("java.lang.Exception".to_string()),
        interfaces: Vec::new(),
        fields: Vec::new(),
        methods: Vec::new(),
    }
}
