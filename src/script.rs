//! Source generation for the page side
//!
//! Statements produced here assume two bindings: `$httpBackend` (the page's
//! mock backend) and `registry` (the fingerprint → handle map owned by the
//! adapter). The wrappers below provide both, either through the root
//! element's injector (immediate execution) or through an angular module run
//! block (bootstrap on navigation).

use crate::builder::Expectation;
use crate::error::SerializeError;
use crate::fingerprint::selector_source;
use crate::serialize::{serialize, serialize_args, string_literal};
use crate::value::Value;

/// Name of the angular module carrying bootstrap registrations
pub const BOOTSTRAP_MODULE: &str = "http-backend-proxy";

// The registry lives on the backend instance itself, so it dies with the
// page and every new page starts from an empty one.
const REGISTRY_EXPR: &str = "$httpBackend.$$proxyRegistry || Object.defineProperty($httpBackend, \"$$proxyRegistry\", { value: {} }).$$proxyRegistry";

const INJECTOR_TEMPLATE: &str = r#"return (function (window, rootSelector, run) {
  var root = window.document.querySelector(rootSelector);
  return window.angular.element(root).injector().invoke(["$httpBackend", function ($httpBackend) {
    return run($httpBackend, __REGISTRY__);
  }]);
})(window, __ROOT__, function ($httpBackend, registry) {
__BODY__
});"#;

const MODULE_TEMPLATE: &str = r#"angular.module(__MODULE__, ["ngMockE2E"]).run(["$httpBackend", function ($httpBackend) {
  var registry = __REGISTRY__;
__BODY__
}]);"#;

/// Methods on `$httpBackend` that are proxied one-to-one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCall {
    VerifyNoOutstandingExpectation,
    VerifyNoOutstandingRequest,
    /// `$httpBackend.flush()`: answer pending requests, throws when there are none
    Flush,
}

impl RemoteCall {
    pub fn method(self) -> &'static str {
        match self {
            RemoteCall::VerifyNoOutstandingExpectation => "verifyNoOutstandingExpectation",
            RemoteCall::VerifyNoOutstandingRequest => "verifyNoOutstandingRequest",
            RemoteCall::Flush => "flush",
        }
    }

    pub fn statement(self) -> String {
        format!("return $httpBackend.{}()", self.method())
    }
}

/// `<selector>.<action>(<args>)` for one registration
pub fn expectation_statement(expectation: &Expectation) -> Result<String, SerializeError> {
    let target = selector_source(expectation)?;
    let action = expectation.action();
    Ok(format!("{}.{}({})", target, action.name, serialize_args(&action.args)?))
}

/// `$httpBackend["<field>"] = <value>`
pub fn context_assignment(field: &str, value: &Value) -> Result<String, SerializeError> {
    Ok(format!("$httpBackend[{}] = {}", string_literal(field), serialize(value)?))
}

/// Join statements into a program body, preserving order.
pub fn program<S: AsRef<str>>(statements: &[S]) -> String {
    let mut body = statements
        .iter()
        .map(|s| s.as_ref())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(";\n");
    if !body.is_empty() {
        body.push(';');
    }
    body
}

/// Wrap a program body so it runs against the page's live `$httpBackend`,
/// looked up through the injector of `root_selector`.
pub fn injector_invoke(root_selector: &str, body: &str) -> String {
    INJECTOR_TEMPLATE
        .replace("__REGISTRY__", REGISTRY_EXPR)
        .replace("__ROOT__", &string_literal(root_selector))
        .replace("__BODY__", body)
}

/// Wrap a program body as the run block of the bootstrap module, so it runs
/// while the next page bootstraps and before any of its own code.
pub fn bootstrap_module(body: &str) -> String {
    MODULE_TEMPLATE
        .replace("__MODULE__", &string_literal(BOOTSTRAP_MODULE))
        .replace("__REGISTRY__", REGISTRY_EXPR)
        .replace("__BODY__", body)
}
