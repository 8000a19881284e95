//! backend-proxy
//!
//! Drive an AngularJS `ngMockE2E` `$httpBackend` living inside a browser page
//! from Rust test code. The page can only be reached through "run this
//! script", so every registration is turned into JavaScript source and
//! shipped across.
//!
//! # Features
//!
//! - **Value serialization**: JSON data, dates, regular expressions and
//!   function source become page-side expressions
//! - **Idempotent stubs**: `when*` registrations are fingerprinted and applied
//!   once per page, no matter how often they are re-sent
//! - **Buffering**: collect registrations and send them in one round trip, or
//!   install them as a bootstrap module that runs before the next page's code
//! - **Shared context**: a value mirrored onto `$httpBackend` for use by
//!   response functions
//!
//! # Example
//!
//! ```no_run
//! use backend_proxy::{args, HttpBackend, Proxy, ProxyConfig, Session};
//! use backend_proxy::sandbox::{SandboxConfig, SandboxDriver};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Session::new(SandboxDriver::new(SandboxConfig::default())?);
//! session.navigate("http://app.local/")?;
//!
//! let mut proxy = Proxy::new(session, ProxyConfig::default())?;
//! proxy
//!     .expect_get(args!["/remote"])
//!     .respond(args![200, serde_json::json!({"msg": "You called /remote"})])?;
//! proxy.verify_no_outstanding_expectation().unwrap_err();
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{Error, Result, SerializeError};

pub mod builder;
pub mod channel;
pub mod context;
pub mod envelope;
pub mod fingerprint;
pub mod fixture;
pub mod proxy;
pub mod recording;
pub mod script;
pub mod serialize;
pub mod session;
pub mod value;

// Async facade: a proxy owned by a worker thread
pub mod async_api;

// In-process page backed by Boa, with a miniature angular + ngMockE2E
#[cfg(feature = "sandbox")]
pub mod sandbox;

#[cfg(feature = "cdp")]
pub mod cdp;

pub use async_api::AsyncProxy;
pub use builder::{Expectation, Family, Method, Selector, Verb};
pub use channel::Dispatch;
pub use proxy::{HttpBackend, OnLoadProxy, Pending, Proxy};
pub use serialize::serialize;
pub use session::Session;
pub use value::Value;

/// Configuration for a proxy
///
/// The defaults match a page whose angular app is bootstrapped on `<body>`:
/// - statements execute immediately (no buffering)
/// - the context is mirrored onto `$httpBackend.context`
/// - the context is re-sent ahead of every call
///
/// # Examples
///
/// ```
/// let cfg = backend_proxy::ProxyConfig::default();
/// assert_eq!(cfg.context_field, "context");
/// assert!(cfg.context_auto_sync);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProxyConfig {
    /// Queue statements until `flush()` instead of sending each one
    pub buffer: bool,
    /// Field on `$httpBackend` that receives the context
    pub context_field: String,
    /// Push the context ahead of every generated program
    pub context_auto_sync: bool,
    /// CSS selector of the element carrying the angular app's injector
    pub root_element: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            buffer: false,
            context_field: "context".to_string(),
            context_auto_sync: true,
            root_element: "body".to_string(),
        }
    }
}

impl ProxyConfig {
    /// Parse a JSON configuration object.
    ///
    /// Also accepts the legacy `"contextField": false`, which meant "do not
    /// sync the context automatically". A `null` field name falls back to the
    /// default.
    pub fn from_json(text: &str) -> Result<Self> {
        let mut raw: serde_json::Value = serde_json::from_str(text)?;
        let mut legacy_no_sync = false;
        if let Some(obj) = raw.as_object_mut() {
            match obj.get("contextField") {
                Some(serde_json::Value::Bool(false)) => {
                    log::warn!("Setting contextField: false is deprecated. Set contextAutoSync: false instead.");
                    obj.remove("contextField");
                    legacy_no_sync = true;
                }
                Some(serde_json::Value::Null) => {
                    obj.remove("contextField");
                }
                _ => {}
            }
        }
        let mut config: ProxyConfig = serde_json::from_value(raw)?;
        if legacy_no_sync {
            config.context_auto_sync = false;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.context_field.is_empty() {
            return Err(Error::ConfigError("contextField must not be empty".into()));
        }
        if self.root_element.trim().is_empty() {
            return Err(Error::ConfigError("rootElement must not be empty".into()));
        }
        Ok(())
    }
}

/// Result of running a script in the page
///
/// `value` is the JSON rendering of what the script returned (`null` when
/// nothing was returned). When `is_error` is set, `value` holds the message
/// of whatever the page threw.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptResult {
    pub value: String,
    pub is_error: bool,
}

/// The remote driver: whatever can run scripts in, and navigate, the page
/// under test
pub trait Driver {
    /// Run a function body in the page (it may `return` a value). Exceptions
    /// thrown by the page come back as `ScriptResult { is_error: true, .. }`;
    /// `Err` is reserved for failures to reach the page at all.
    fn execute_script(&mut self, script: &str) -> Result<ScriptResult>;

    /// Load a URL and wait for the page to be ready
    fn navigate(&mut self, url: &str) -> Result<()>;

    /// Register a script to run before page content on every following
    /// navigation. Registering the same name again replaces the script.
    fn add_bootstrap_script(&mut self, name: &str, script: &str) -> Result<()>;

    /// Forget a bootstrap script. Unknown names are ignored.
    fn remove_bootstrap_script(&mut self, name: &str) -> Result<()>;
}
