//! Field and method descriptor parsing (§4.2).
//!
//! Grounded on `examples/original_source/src/main/cpp/util.cpp`'s `toJavaClassName`,
//! `toJavaTypeName` and `parseMethodSignature`: a cursor-based parser that recognizes
//! one JVM type at a time (array dimensions, `L...;` object types, primitive letters)
//! and advances the cursor past what it consumed. Replaces the teacher's string-split
//! `FieldDescriptor`/`MethodDescriptor` enums, which could not express nested array and
//! object types robustly.

use crate::errors::{Error, Result};

/// `com/Foo` -> `com.Foo`. JVM-internal class names use `/` as the package separator;
/// everywhere else expects the usual dotted form.
pub fn to_java_class_name(internal_name: &str) -> String {
    internal_name.replace('/', ".")
}

fn primitive_name(letter: u8) -> Option<&'static str> {
    Some(match letter {
        b'B' => "byte",
        b'C' => "char",
        b'D' => "double",
        b'F' => "float",
        b'I' => "int",
        b'J' => "long",
        b'S' => "short",
        b'Z' => "bool",
        b'V' => "void",
        _ => return None,
    })
}

/// Parses exactly one type starting at `descriptor[pos]` and returns its readable Java
/// name together with the cursor position just past it. `[I` -> `("int[]", 2)`,
/// `Ljava/util/Map;` -> `("java.util.Map", 16)`, `I` -> `("int", 1)`.
pub fn parse_type(descriptor: &str, pos: usize) -> Result<(String, usize)> {
    let bytes = descriptor.as_bytes();
    let mut cursor = pos;
    let mut array_dims = 0usize;

    while bytes.get(cursor) == Some(&b'[') {
        array_dims += 1;
        cursor += 1;
    }

    let (base, next) = match bytes.get(cursor) {
        Some(b'L') => {
            let end = bytes[cursor..]
                .iter()
                .position(|&b| b == b';')
                .map(|rel| cursor + rel)
                .ok_or_else(|| {
                    Error::InvalidDescriptor(format!(
                        "unterminated object type in {descriptor:?} at {cursor}"
                    ))
                })?;
            let internal = &descriptor[cursor + 1..end];
            (to_java_class_name(internal), end + 1)
        }
        Some(&letter) => {
            let name = primitive_name(letter).ok_or_else(|| {
                Error::InvalidDescriptor(format!(
                    "unrecognized type letter '{}' in {descriptor:?} at {cursor}",
                    letter as char
                ))
            })?;
            (name.to_string(), cursor + 1)
        }
        None => {
            return Err(Error::InvalidDescriptor(format!(
                "descriptor {descriptor:?} ended while expecting a type at {cursor}"
            )))
        }
    };

    let suffix = "[]".repeat(array_dims);
    Ok((format!("{base}{suffix}"), next))
}

/// Parses a `(ParamType*)ReturnType` method descriptor into its parameter type list and
/// return type, both rendered as readable Java names.
pub fn parse_method_signature(descriptor: &str) -> Result<(Vec<String>, String)> {
    let bytes = descriptor.as_bytes();
    if bytes.first() != Some(&b'(') {
        return Err(Error::InvalidDescriptor(format!(
            "method descriptor {descriptor:?} must start with '('"
        )));
    }

    let mut params = Vec::new();
    let mut cursor = 1;
    while bytes.get(cursor) != Some(&b')') {
        let (ty, next) = parse_type(descriptor, cursor)?;
        params.push(ty);
        cursor = next;
        if cursor > bytes.len() {
            return Err(Error::InvalidDescriptor(format!(
                "method descriptor {descriptor:?} has no closing ')'"
            )));
        }
    }
    cursor += 1; // skip ')'

    let (return_type, _) = parse_type(descriptor, cursor)?;
    Ok((params, return_type))
}

/// Whether a readable Java type name denotes a category-2 (64-bit) value. Arrays are
/// references regardless of element type, so only the bare primitive names count.
fn is_wide(java_type_name: &str) -> bool {
    java_type_name == "long" || java_type_name == "double"
}

/// The number of local-variable/operand-stack slots a parameter list occupies (§4.2,
/// invariant C5): each `long`/`double` parameter counts for 2, everything else for 1.
/// `parameter_length` does not include an implicit leading `this` slot; callers add one
/// for non-static methods.
pub fn parameter_length(param_types: &[String]) -> Result<u8> {
    let mut total: u32 = 0;
    for ty in param_types {
        total += if is_wide(ty) { 2 } else { 1 };
    }
    u8::try_from(total).map_err(|_| {
        Error::InvalidDescriptor(format!(
            "parameter_length {total} exceeds the 255-slot limit (C5)"
        ))
    })
}
