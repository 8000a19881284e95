//! Declarative registration fixtures
//!
//! A fixture is a JSON document listing registrations, plus an optional
//! context:
//!
//! ```json
//! {
//!   "context": {"user": "ann"},
//!   "expectations": [
//!     {"verb": "whenGET", "args": [{"$regex": "/^\\/api\\/items/"}], "respond": [200, []]},
//!     {"verb": "whenGET", "args": ["/partials/nav.html"], "passThrough": true}
//!   ]
//! }
//! ```
//!
//! JSON has no literal for dates, regular expressions or functions, so three
//! single-key objects stand in for them: `{"$regex": "/pattern/flags"}`,
//! `{"$date": <epoch ms>}` and `{"$function": "<source>"}`.

use crate::builder::{Expectation, Selector, Verb};
use crate::channel::Dispatch;
use crate::proxy::HttpBackend;
use crate::script::{bootstrap_module, context_assignment, expectation_statement, injector_invoke, program};
use crate::value::Value;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawFixture {
    #[serde(default)]
    context: Option<serde_json::Value>,
    #[serde(default)]
    expectations: Vec<RawExpectation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawExpectation {
    verb: String,
    #[serde(default)]
    args: Vec<serde_json::Value>,
    #[serde(default)]
    respond: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pass_through: bool,
}

/// A parsed fixture
#[derive(Debug, Clone, PartialEq)]
pub struct Fixture {
    pub context: Option<Value>,
    pub expectations: Vec<Expectation>,
}

impl Fixture {
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawFixture = serde_json::from_str(text)?;
        let context = raw.context.map(decode_value).transpose()?;
        let expectations = raw
            .expectations
            .into_iter()
            .enumerate()
            .map(|(i, e)| decode_expectation(e).map_err(|err| Error::ConfigError(format!("expectation #{}: {}", i, err))))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { context, expectations })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    fn statements(&self, context_field: &str) -> Result<Vec<String>> {
        let mut statements = Vec::with_capacity(self.expectations.len() + 1);
        if let Some(context) = &self.context {
            statements.push(context_assignment(context_field, context)?);
        }
        for e in &self.expectations {
            statements.push(expectation_statement(e)?);
        }
        Ok(statements)
    }

    /// The angular module a navigation would install for these registrations
    pub fn render_bootstrap(&self, context_field: &str) -> Result<String> {
        Ok(bootstrap_module(&program(&self.statements(context_field)?)))
    }

    /// The script that would apply these registrations to a loaded page
    pub fn render_immediate(&self, context_field: &str, root_element: &str) -> Result<String> {
        Ok(injector_invoke(root_element, &program(&self.statements(context_field)?)))
    }

    /// Register every expectation, in order, with `backend`. The context is
    /// left to the caller.
    pub fn apply<B: HttpBackend>(&self, backend: &mut B) -> Result<Vec<Dispatch>> {
        self.expectations
            .iter()
            .cloned()
            .map(|e| backend.register(e))
            .collect()
    }
}

fn decode_expectation(raw: RawExpectation) -> Result<Expectation> {
    let verb = Verb::from_name(&raw.verb)
        .ok_or_else(|| Error::ConfigError(format!("unknown verb {:?}", raw.verb)))?;
    let args = raw.args.into_iter().map(decode_value).collect::<Result<Vec<_>>>()?;
    let selector = Selector::new(verb, args);
    match (raw.respond, raw.pass_through) {
        (Some(respond), false) => {
            let args = respond.into_iter().map(decode_value).collect::<Result<Vec<_>>>()?;
            Ok(selector.respond(args))
        }
        (None, true) => Ok(selector.pass_through()),
        (Some(_), true) => Err(Error::ConfigError("both respond and passThrough given".into())),
        (None, false) => Err(Error::ConfigError("one of respond or passThrough is required".into())),
    }
}

/// Turn fixture JSON into a [`Value`], expanding the `$regex`, `$date` and
/// `$function` forms.
pub fn decode_value(json: serde_json::Value) -> Result<Value> {
    use serde_json::Value as J;
    match json {
        J::Array(items) => Ok(Value::Array(items.into_iter().map(decode_value).collect::<Result<_>>()?)),
        J::Object(map) if map.len() == 1 => {
            let (key, inner) = map.into_iter().next().unwrap_or((String::new(), J::Null));
            match (key.as_str(), inner) {
                ("$regex", J::String(literal)) => Ok(Value::regex(&literal)?),
                ("$date", J::Number(n)) => n
                    .as_i64()
                    .map(Value::Date)
                    .ok_or_else(|| Error::ConfigError(format!("$date must be an integer, got {}", n))),
                ("$function", J::String(source)) => Ok(Value::function(source)),
                ("$regex" | "$date" | "$function", other) => {
                    Err(Error::ConfigError(format!("malformed {} value: {}", key, other)))
                }
                (_, inner) => Ok(Value::Object(vec![(key.clone(), decode_value(inner)?)])),
            }
        }
        J::Object(map) => Ok(Value::Object(
            map.into_iter()
                .map(|(k, v)| decode_value(v).map(|v| (k, v)))
                .collect::<Result<_>>()?,
        )),
        other => Ok(Value::from(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Family;

    const FIXTURE: &str = r#"{
        "context": {"user": "ann"},
        "expectations": [
            {"verb": "whenGET", "args": [{"$regex": "/^\\/api/i"}], "respond": [200, {"at": {"$date": 0}}]},
            {"verb": "expectPOST", "args": ["/save", {"id": 1}], "respond": [{"$function": "function () { return [201]; }"}]},
            {"verb": "when", "args": ["GET", "/partials/x.html"], "passThrough": true}
        ]
    }"#;

    #[test]
    fn test_decodes_special_values() {
        assert_eq!(
            decode_value(serde_json::json!({"$regex": "/a/g"})).unwrap(),
            Value::RegExp { source: "a".into(), flags: "g".into() }
        );
        assert_eq!(decode_value(serde_json::json!({"$date": 5})).unwrap(), Value::Date(5));
        assert_eq!(
            decode_value(serde_json::json!({"$function": "function(){}"})).unwrap(),
            Value::function("function(){}")
        );
        assert_eq!(
            decode_value(serde_json::json!({"plain": 1})).unwrap(),
            Value::Object(vec![("plain".into(), Value::Number(1.0))])
        );
        assert!(decode_value(serde_json::json!({"$date": "yesterday"})).is_err());
    }

    #[test]
    fn test_parses_a_fixture() {
        let f = Fixture::from_json(FIXTURE).unwrap();
        assert_eq!(f.expectations.len(), 3);
        assert_eq!(f.expectations[0].family(), Family::When);
        assert_eq!(f.expectations[1].selector().name, "expectPOST");
        assert_eq!(f.expectations[2].action().name, "passThrough");
        assert_eq!(f.context, Some(Value::Object(vec![("user".into(), Value::from("ann"))])));
    }

    #[test]
    fn test_renders_in_order_with_context_first() {
        let f = Fixture::from_json(FIXTURE).unwrap();
        let module = f.render_bootstrap("context").unwrap();
        assert!(module.starts_with(r#"angular.module("http-backend-proxy""#));
        let ctx = module.find(r#"$httpBackend["context"] = {"user":"ann"};"#).unwrap();
        let first = module.find(r#"new RegExp("^\\/api","i")"#).unwrap();
        let second = module.find(r#"$httpBackend.expectPOST("/save", {"id":1})"#).unwrap();
        assert!(ctx < first && first < second);
        assert!(module.contains(r#"{"at":new Date(0)}"#));

        let immediate = f.render_immediate("context", "[ng-app]").unwrap();
        assert!(immediate.contains(r#"(window, "[ng-app]", function ($httpBackend, registry)"#));
    }

    #[test]
    fn test_rejects_bad_entries() {
        let unknown = r#"{"expectations": [{"verb": "whenFETCH", "passThrough": true}]}"#;
        assert!(matches!(Fixture::from_json(unknown), Err(Error::ConfigError(_))));
        let both = r#"{"expectations": [{"verb": "whenGET", "respond": [200], "passThrough": true}]}"#;
        assert!(Fixture::from_json(both).is_err());
        let neither = r#"{"expectations": [{"verb": "whenGET"}]}"#;
        assert!(Fixture::from_json(neither).is_err());
    }
}
