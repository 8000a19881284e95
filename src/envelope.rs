//! Result envelope shared by the drivers
//!
//! A script body is wrapped so that whatever happens inside the page comes
//! back as one JSON string: `{"ok":true,"value":"<json>"}` or
//! `{"ok":false,"error":"<message>"}`. Thrown values are caught in the page,
//! which keeps their message intact whatever engine runs the script.

use crate::{Error, Result, ScriptResult};
use serde::Deserialize;

const TEMPLATE: &str = r#"(function () {
  try {
    var value = (function () {
__BODY__
    })();
    var json;
    try {
      json = JSON.stringify(value === undefined ? null : value);
    } catch (e) {
      json = JSON.stringify(String(value));
    }
    return JSON.stringify({ ok: true, value: json === undefined ? "null" : json });
  } catch (e) {
    return JSON.stringify({ ok: false, error: String(e && e.message !== undefined ? e.message : e) });
  }
})()"#;

#[derive(Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Wrap a function body into an expression evaluating to the envelope
pub fn wrap(body: &str) -> String {
    TEMPLATE.replace("__BODY__", body)
}

/// Decode what a wrapped script evaluated to
pub fn parse(raw: &str) -> Result<ScriptResult> {
    let envelope: Envelope = serde_json::from_str(raw)
        .map_err(|e| Error::ScriptError(format!("Malformed script result {:?}: {}", raw, e)))?;
    Ok(if envelope.ok {
        ScriptResult {
            value: envelope.value.unwrap_or_else(|| "null".to_string()),
            is_error: false,
        }
    } else {
        ScriptResult {
            value: envelope.error.unwrap_or_default(),
            is_error: true,
        }
    })
}
