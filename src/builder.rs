//! Call descriptions for `$httpBackend` registrations
//!
//! Every registration is a two-step chain in the page:
//! `$httpBackend.whenGET(url).respond(200, body)`. [`Selector`] captures the
//! first step and [`Expectation`] the completed chain.

use crate::value::Value;

/// HTTP methods supported by `$httpBackend`, plus the generic form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `when(method, url, [data], [headers])` / `expect(...)`
    Any,
    Get,
    Head,
    Delete,
    Post,
    Put,
    Patch,
    Jsonp,
}

/// One row of the verb table: method, name suffix and documented argument
/// shape. Shapes are informational; the page validates arguments.
#[derive(Debug, Clone, Copy)]
pub struct MethodSpec {
    pub method: Method,
    pub suffix: &'static str,
    pub shape: &'static str,
}

pub const METHODS: [MethodSpec; 8] = [
    MethodSpec { method: Method::Any, suffix: "", shape: "method, url, [data], [headers]" },
    MethodSpec { method: Method::Get, suffix: "GET", shape: "url, [headers]" },
    MethodSpec { method: Method::Head, suffix: "HEAD", shape: "url, [headers]" },
    MethodSpec { method: Method::Delete, suffix: "DELETE", shape: "url, [headers]" },
    MethodSpec { method: Method::Post, suffix: "POST", shape: "url, [data], [headers]" },
    MethodSpec { method: Method::Put, suffix: "PUT", shape: "url, [data], [headers]" },
    MethodSpec { method: Method::Patch, suffix: "PATCH", shape: "url, [data], [headers]" },
    MethodSpec { method: Method::Jsonp, suffix: "JSONP", shape: "url, [headers]" },
];

impl Method {
    pub fn spec(self) -> &'static MethodSpec {
        // METHODS has one row per variant, in declaration order.
        &METHODS[self as usize]
    }

    pub fn suffix(self) -> &'static str {
        self.spec().suffix
    }
}

/// Registration family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// `when*`: a repeatable stub, matched any number of times and
    /// deduplicated by fingerprint.
    When,
    /// `expect*`: a one-shot expectation, never deduplicated.
    Expect,
}

impl Family {
    pub fn prefix(self) -> &'static str {
        match self {
            Family::When => "when",
            Family::Expect => "expect",
        }
    }
}

/// A `$httpBackend` registration method such as `whenGET`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Verb {
    pub family: Family,
    pub method: Method,
}

impl Verb {
    pub const fn new(family: Family, method: Method) -> Self {
        Self { family, method }
    }

    /// Method name on `$httpBackend`, e.g. `expectPOST`
    pub fn name(&self) -> String {
        format!("{}{}", self.family.prefix(), self.method.suffix())
    }

    /// Parse a method name such as `whenGET` or `expect`
    pub fn from_name(name: &str) -> Option<Self> {
        let (family, rest) = if let Some(rest) = name.strip_prefix("when") {
            (Family::When, rest)
        } else if let Some(rest) = name.strip_prefix("expect") {
            (Family::Expect, rest)
        } else {
            return None;
        };
        METHODS
            .iter()
            .find(|m| m.suffix == rest)
            .map(|m| Verb::new(family, m.method))
    }

    pub fn is_repeatable(&self) -> bool {
        self.family == Family::When
    }
}

/// The declarative verb table: every `(family, method)` pair and the Rust
/// method name it is exposed under. `$callback` receives the whole table and
/// expands it into concrete methods.
macro_rules! verb_table {
    ($callback:ident) => {
        $callback! {
            when => When Any,
            when_get => When Get,
            when_head => When Head,
            when_delete => When Delete,
            when_post => When Post,
            when_put => When Put,
            when_patch => When Patch,
            when_jsonp => When Jsonp,
            expect => Expect Any,
            expect_get => Expect Get,
            expect_head => Expect Head,
            expect_delete => Expect Delete,
            expect_post => Expect Post,
            expect_put => Expect Put,
            expect_patch => Expect Patch,
            expect_jsonp => Expect Jsonp,
        }
    };
}

pub(crate) use verb_table;

/// A method name with its arguments
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub name: String,
    pub args: Vec<Value>,
}

impl MethodCall {
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self { name: name.into(), args }
    }
}

/// The terminal step of a registration chain
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Respond(Vec<Value>),
    PassThrough,
}

impl Action {
    pub fn into_call(self) -> MethodCall {
        match self {
            Action::Respond(args) => MethodCall::new("respond", args),
            Action::PassThrough => MethodCall::new("passThrough", Vec::new()),
        }
    }
}

/// First half of a registration: verb plus arguments, awaiting its action.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    verb: Verb,
    args: Vec<Value>,
}

macro_rules! selector_constructors {
    ($($name:ident => $family:ident $method:ident),* $(,)?) => {
        $(
            pub fn $name(args: Vec<Value>) -> Self {
                Self::new(Verb::new(Family::$family, Method::$method), args)
            }
        )*
    };
}

impl Selector {
    pub fn new(verb: Verb, args: Vec<Value>) -> Self {
        Self { verb, args }
    }

    verb_table!(selector_constructors);

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Complete the chain with `.respond(args...)`
    pub fn respond(self, args: Vec<Value>) -> Expectation {
        self.complete(Action::Respond(args))
    }

    /// Complete the chain with `.passThrough()`
    pub fn pass_through(self) -> Expectation {
        self.complete(Action::PassThrough)
    }

    pub fn complete(self, action: Action) -> Expectation {
        Expectation {
            verb: self.verb,
            selector: MethodCall::new(self.verb.name(), self.args),
            action: action.into_call(),
        }
    }
}

/// A complete registration: selector call plus action call
#[derive(Debug, Clone, PartialEq)]
pub struct Expectation {
    verb: Verb,
    selector: MethodCall,
    action: MethodCall,
}

impl Expectation {
    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn family(&self) -> Family {
        self.verb.family
    }

    pub fn is_repeatable(&self) -> bool {
        self.verb.is_repeatable()
    }

    pub fn selector(&self) -> &MethodCall {
        &self.selector
    }

    pub fn action(&self) -> &MethodCall {
        &self.action
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;

    #[test]
    fn test_verb_table_covers_every_method_in_order() {
        for (i, spec) in METHODS.iter().enumerate() {
            assert_eq!(spec.method as usize, i);
        }
        assert_eq!(Method::Jsonp.suffix(), "JSONP");
        assert_eq!(Method::Any.suffix(), "");
    }

    #[test]
    fn test_verb_names() {
        assert_eq!(Verb::new(Family::When, Method::Get).name(), "whenGET");
        assert_eq!(Verb::new(Family::Expect, Method::Any).name(), "expect");
        assert_eq!(Verb::new(Family::Expect, Method::Patch).name(), "expectPATCH");
    }

    #[test]
    fn test_verb_names_parse_back() {
        for family in [Family::When, Family::Expect] {
            for spec in METHODS.iter() {
                let verb = Verb::new(family, spec.method);
                assert_eq!(Verb::from_name(&verb.name()), Some(verb));
            }
        }
        assert_eq!(Verb::from_name("whenget"), None);
        assert_eq!(Verb::from_name("respond"), None);
    }

    #[test]
    fn test_generated_constructors_pick_the_right_verb() {
        assert_eq!(Selector::when_jsonp(args![]).verb().name(), "whenJSONP");
        assert_eq!(Selector::expect_delete(args![]).verb().name(), "expectDELETE");
        assert_eq!(Selector::when(args!["GET"]).verb().name(), "when");
    }

    #[test]
    fn test_respond_and_pass_through_complete_the_chain() {
        let e = Selector::expect_get(args!["/remote"]).respond(args![200, "ok"]);
        assert_eq!(e.family(), Family::Expect);
        assert!(!e.is_repeatable());
        assert_eq!(e.selector(), &MethodCall::new("expectGET", args!["/remote"]));
        assert_eq!(e.action(), &MethodCall::new("respond", args![200, "ok"]));

        let p = Selector::when_post(args!["/x", "data"]).pass_through();
        assert!(p.is_repeatable());
        assert_eq!(p.action(), &MethodCall::new("passThrough", vec![]));
    }
}
