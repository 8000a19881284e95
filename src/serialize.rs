//! Value → JavaScript source text
//!
//! The output of [`serialize`] is an expression that, evaluated in the page,
//! rebuilds an equivalent value. Functions are reproduced from their source
//! text, so equivalence for them is textual only.

use crate::error::SerializeError;
use crate::value::Value;

/// Deepest nesting accepted before giving up.
pub const MAX_DEPTH: usize = 256;

// ECMAScript Date time values are limited to ±100,000,000 days.
const MAX_DATE_MS: i64 = 8_640_000_000_000_000;

const REGEXP_FLAGS: &str = "dgimsuvy";

/// Render one value as a JavaScript expression.
pub fn serialize(value: &Value) -> Result<String, SerializeError> {
    let mut out = String::new();
    write_value(&mut out, value, 0)?;
    Ok(out)
}

/// Render an argument list, comma separated, ready to sit between call
/// parentheses.
pub fn serialize_args(args: &[Value]) -> Result<String, SerializeError> {
    let parts = args.iter().map(serialize).collect::<Result<Vec<_>, _>>()?;
    Ok(parts.join(", "))
}

/// JSON string literal, also a valid JavaScript string literal.
pub fn string_literal(s: &str) -> String {
    // Serializing a &str cannot fail.
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

fn write_value(out: &mut String, value: &Value, depth: usize) -> Result<(), SerializeError> {
    if depth > MAX_DEPTH {
        return Err(SerializeError::TooDeep(MAX_DEPTH));
    }

    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            if !n.is_finite() {
                return Err(SerializeError::NonFiniteNumber(*n));
            }
            out.push_str(&n.to_string());
        }
        Value::String(s) => out.push_str(&string_literal(s)),
        Value::Function(src) => {
            if src.trim().is_empty() {
                return Err(SerializeError::EmptyFunction);
            }
            out.push_str(src);
        }
        Value::Date(ms) => {
            if !(-MAX_DATE_MS..=MAX_DATE_MS).contains(ms) {
                return Err(SerializeError::DateOutOfRange(*ms));
            }
            out.push_str(&format!("new Date({})", ms));
        }
        Value::RegExp { source, flags } => {
            check_flags(flags)?;
            out.push_str("new RegExp(");
            out.push_str(&string_literal(source));
            if !flags.is_empty() {
                out.push(',');
                out.push_str(&string_literal(flags));
            }
            out.push(')');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item, depth + 1)?;
            }
            out.push(']');
        }
        Value::Object(fields) => {
            out.push('{');
            for (i, (key, item)) in fields.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // A literal `__proto__:` key sets the prototype; a computed one
                // defines an own property.
                if key == "__proto__" {
                    out.push('[');
                    out.push_str(&string_literal(key));
                    out.push(']');
                } else {
                    out.push_str(&string_literal(key));
                }
                out.push(':');
                write_value(out, item, depth + 1)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

fn check_flags(flags: &str) -> Result<(), SerializeError> {
    let mut seen = String::new();
    for c in flags.chars() {
        if !REGEXP_FLAGS.contains(c) || seen.contains(c) {
            return Err(SerializeError::InvalidRegExpFlags(flags.to_string()));
        }
        seen.push(c);
    }
    Ok(())
}
