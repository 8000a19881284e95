//! Fingerprints for repeatable registrations
//!
//! A `when*` registration re-applied after a reload (or simply issued twice)
//! must not stack a second definition in the page. Each one is keyed by a
//! digest of its verb and serialized arguments; the page-side registry maps
//! that key to the handle returned by the first registration.

use crate::builder::Expectation;
use crate::error::SerializeError;
use crate::serialize::{serialize_args, string_literal};
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 over `verb|serialized args`
pub fn fingerprint(verb: &str, serialized_args: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verb.as_bytes());
    hasher.update(b"|");
    hasher.update(serialized_args.as_bytes());
    hex::encode(hasher.finalize())
}

/// Fingerprint of a registration's selector call
pub fn fingerprint_of(expectation: &Expectation) -> Result<String, SerializeError> {
    let selector = expectation.selector();
    Ok(fingerprint(&selector.name, &serialize_args(&selector.args)?))
}

/// Source text for the selector half of a registration, evaluating to the
/// handle that `.respond()` / `.passThrough()` is called on.
///
/// Repeatable registrations consult `registry` first and only call into
/// `$httpBackend` when their fingerprint is unknown. One-shot registrations
/// always call through.
pub fn selector_source(expectation: &Expectation) -> Result<String, SerializeError> {
    let selector = expectation.selector();
    let args = serialize_args(&selector.args)?;
    let call = format!("$httpBackend.{}({})", selector.name, args);

    if !expectation.is_repeatable() {
        return Ok(call);
    }

    let key = string_literal(&fingerprint(&selector.name, &args));
    Ok(format!(
        "(Object.prototype.hasOwnProperty.call(registry, {key}) ? registry[{key}] : (registry[{key}] = {call}))"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::builder::Selector;
    use serde_json::json;

    #[test]
    fn test_identical_calls_share_a_fingerprint() {
        let a = Selector::when_get(args!["/api", json!({"h": [1, 2]})]).respond(args![200]);
        let b = Selector::when_get(args!["/api", json!({"h": [1, 2]})]).pass_through();
        assert_eq!(fingerprint_of(&a).unwrap(), fingerprint_of(&b).unwrap());
        assert_eq!(fingerprint_of(&a).unwrap().len(), 64);
    }

    #[test]
    fn test_any_difference_changes_the_fingerprint() {
        let base = fingerprint_of(&Selector::when_get(args!["/api"]).pass_through()).unwrap();
        let other_arg = fingerprint_of(&Selector::when_get(args!["/api2"]).pass_through()).unwrap();
        let other_verb = fingerprint_of(&Selector::when_head(args!["/api"]).pass_through()).unwrap();
        let extra_arg = fingerprint_of(&Selector::when_get(args!["/api", json!({})]).pass_through()).unwrap();
        assert_ne!(base, other_arg);
        assert_ne!(base, other_verb);
        assert_ne!(base, extra_arg);
    }

    #[test]
    fn test_verb_and_args_are_separated() {
        // "whenGET" + "|" keeps ("when", "GET...") from colliding with ("whenGET", "...")
        assert_ne!(fingerprint("when", "\"GET\""), fingerprint("whenGET", ""));
    }

    #[test]
    fn test_one_shot_selectors_call_straight_through() {
        let e = Selector::expect_get(args!["/remote"]).respond(args![200]);
        assert_eq!(selector_source(&e).unwrap(), r#"$httpBackend.expectGET("/remote")"#);
    }

    #[test]
    fn test_repeatable_selectors_are_guarded_by_the_registry() {
        let e = Selector::when_get(args!["/remote"]).pass_through();
        let fp = fingerprint_of(&e).unwrap();
        let src = selector_source(&e).unwrap();
        assert!(src.starts_with("(Object.prototype.hasOwnProperty.call(registry, "));
        assert!(src.contains(&format!("registry[\"{}\"] = $httpBackend.whenGET(\"/remote\")", fp)));
    }
}
