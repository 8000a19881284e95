//! In-process page sandbox backed by Boa
//!
//! Each navigation builds a fresh Boa context and loads, in order: the page
//! harness (a miniature angular with an `ngMockE2E`-style `$httpBackend`),
//! every registered bootstrap script, the page's own script and finally
//! `angular.bootstrap()`, which runs all module run blocks in registration
//! order. Generated proxy code therefore executes for real, without a
//! browser.
//!
//! Boa contexts are not `Send`, so the context lives on a worker thread and
//! jobs are sent to it over a channel.

use crate::serialize::string_literal;
use crate::{envelope, Driver, Error, Result, ScriptResult};
use std::collections::HashMap;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

const HARNESS: &str = include_str!("sandbox_page.js");
const BOOTSTRAP_APP: &str = "angular.bootstrap(document.querySelector(\"body\"));";

/// Limits applied to every page context
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// How long to wait for a script (or a page load) before giving up
    pub script_timeout_ms: u64,
    /// Maximum loop iterations before Boa throws (0 => disabled)
    pub script_loop_iteration_limit: u64,
    /// Maximum recursion depth before Boa throws (usize::MAX => disabled)
    pub script_recursion_limit: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            script_timeout_ms: 5000,
            script_loop_iteration_limit: 1_000_000,
            script_recursion_limit: 1024,
        }
    }
}

enum Job {
    /// Replace the page with a fresh context running `scripts` in order
    Load {
        scripts: Vec<String>,
        loop_limit: u64,
        recursion_limit: usize,
        resp: mpsc::Sender<std::result::Result<(), String>>,
    },
    /// Evaluate an enveloped script in the current page
    Eval {
        code: String,
        resp: mpsc::Sender<ScriptResult>,
    },
}

// Thrown error objects report their message; other thrown values their display form
fn error_message(e: &boa_engine::JsError, ctx: &mut boa_engine::Context) -> String {
    match e.try_native(ctx) {
        Ok(native) => native.message().to_string(),
        Err(_) => e.to_string(),
    }
}

fn spawn_page_worker() -> Result<(mpsc::Sender<Job>, std::thread::JoinHandle<()>)> {
    let (tx, rx) = mpsc::channel::<Job>();
    let handle = std::thread::Builder::new()
        .name("backend-proxy-sandbox".into())
        .spawn(move || {
            let mut page: Option<boa_engine::Context> = None;

            while let Ok(job) = rx.recv() {
                match job {
                    Job::Load { scripts, loop_limit, recursion_limit, resp } => {
                        let mut ctx = boa_engine::Context::default();
                        if loop_limit > 0 {
                            ctx.runtime_limits_mut().set_loop_iteration_limit(loop_limit);
                        }
                        if recursion_limit < usize::MAX {
                            ctx.runtime_limits_mut().set_recursion_limit(recursion_limit);
                        }
                        let mut outcome = Ok(());
                        for (i, script) in scripts.iter().enumerate() {
                            if let Err(e) = ctx.eval(boa_engine::Source::from_bytes(script.as_bytes())) {
                                outcome = Err(format!("page script #{} threw: {}", i, error_message(&e, &mut ctx)));
                                break;
                            }
                        }
                        page = Some(ctx);
                        let _ = resp.send(outcome);
                    }
                    Job::Eval { code, resp } => {
                        let result = match page.as_mut() {
                            None => ScriptResult {
                                value: "No document loaded".to_string(),
                                is_error: true,
                            },
                            Some(ctx) => match ctx.eval(boa_engine::Source::from_bytes(code.as_bytes())) {
                                Ok(val) => match val.as_string() {
                                    Some(s) => envelope::parse(&s.to_std_string_escaped()).unwrap_or_else(|e| {
                                        ScriptResult { value: e.to_string(), is_error: true }
                                    }),
                                    None => ScriptResult {
                                        value: format!("Unexpected script result: {}", val.display()),
                                        is_error: true,
                                    },
                                },
                                // Syntax errors and runtime-limit errors escape the envelope
                                Err(e) => ScriptResult { value: error_message(&e, ctx), is_error: true },
                            },
                        };
                        let _ = resp.send(result);
                    }
                }
            }
        })?;
    Ok((tx, handle))
}

/// A [`Driver`] whose page is a Boa context
pub struct SandboxDriver {
    config: SandboxConfig,
    worker_tx: Option<mpsc::Sender<Job>>,
    worker_handle: Option<std::thread::JoinHandle<()>>,
    pages: HashMap<String, String>,
    bootstrap: Vec<(String, String)>,
    current_url: Option<String>,
}

impl SandboxDriver {
    pub fn new(config: SandboxConfig) -> Result<Self> {
        let (tx, handle) = spawn_page_worker()?;
        Ok(Self {
            config,
            worker_tx: Some(tx),
            worker_handle: Some(handle),
            pages: HashMap::new(),
            bootstrap: Vec::new(),
            current_url: None,
        })
    }

    /// Serve `script` as the application code of `url`. Unknown URLs load an
    /// empty application.
    pub fn add_page(&mut self, url: impl Into<String>, script: impl Into<String>) {
        self.pages.insert(url.into(), script.into());
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    /// Evaluate an expression in the page and return its JSON rendering
    pub fn evaluate(&mut self, expression: &str) -> Result<ScriptResult> {
        self.execute_script(&format!("return ({});", expression))
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.script_timeout_ms)
    }

    fn sender(&self) -> Result<&mpsc::Sender<Job>> {
        self.worker_tx
            .as_ref()
            .ok_or_else(|| Error::Other("sandbox worker is shut down".into()))
    }

    /// Stop the worker thread and wait for it
    pub fn close(mut self) -> Result<()> {
        self.worker_tx.take();
        if let Some(handle) = self.worker_handle.take() {
            handle
                .join()
                .map_err(|_| Error::Other("sandbox worker panicked".into()))?;
        }
        Ok(())
    }
}

impl Driver for SandboxDriver {
    fn execute_script(&mut self, script: &str) -> Result<ScriptResult> {
        let (resp_tx, resp_rx) = mpsc::channel();
        self.sender()?
            .send(Job::Eval { code: envelope::wrap(script), resp: resp_tx })
            .map_err(|e| Error::ScriptError(format!("Failed to queue script job: {}", e)))?;
        match resp_rx.recv_timeout(self.timeout()) {
            Ok(r) => Ok(r),
            Err(RecvTimeoutError::Timeout) => Err(Error::Timeout(self.config.script_timeout_ms)),
            Err(e) => Err(Error::ScriptError(format!("Script execution failed to receive result: {}", e))),
        }
    }

    fn navigate(&mut self, url: &str) -> Result<()> {
        let mut scripts = Vec::with_capacity(self.bootstrap.len() + 3);
        scripts.push(HARNESS.replace("__URL__", &string_literal(url)));
        scripts.extend(self.bootstrap.iter().map(|(_, s)| s.clone()));
        scripts.push(self.pages.get(url).cloned().unwrap_or_default());
        scripts.push(BOOTSTRAP_APP.to_string());
        log::debug!("sandbox: loading {} ({} bootstrap script(s))", url, self.bootstrap.len());

        let (resp_tx, resp_rx) = mpsc::channel();
        self.sender()?
            .send(Job::Load {
                scripts,
                loop_limit: self.config.script_loop_iteration_limit,
                recursion_limit: self.config.script_recursion_limit,
                resp: resp_tx,
            })
            .map_err(|e| Error::LoadError(format!("Failed to queue page load: {}", e)))?;
        match resp_rx.recv_timeout(self.timeout()) {
            Ok(Ok(())) => {
                self.current_url = Some(url.to_string());
                Ok(())
            }
            Ok(Err(msg)) => Err(Error::LoadError(format!("{}: {}", url, msg))),
            Err(RecvTimeoutError::Timeout) => Err(Error::Timeout(self.config.script_timeout_ms)),
            Err(e) => Err(Error::LoadError(format!("{}: {}", url, e))),
        }
    }

    fn add_bootstrap_script(&mut self, name: &str, script: &str) -> Result<()> {
        match self.bootstrap.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = script.to_string(),
            None => self.bootstrap.push((name.to_string(), script.to_string())),
        }
        Ok(())
    }

    fn remove_bootstrap_script(&mut self, name: &str) -> Result<()> {
        self.bootstrap.retain(|(n, _)| n != name);
        Ok(())
    }
}

impl Drop for SandboxDriver {
    fn drop(&mut self) {
        // Disconnecting the channel ends the worker loop. Not joined here: a
        // runaway script would block the drop.
        self.worker_tx.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded() -> SandboxDriver {
        let mut d = SandboxDriver::new(SandboxConfig::default()).expect("sandbox");
        d.navigate("http://app.local/").expect("navigate");
        d
    }

    #[test]
    fn test_scripts_need_a_page() {
        let mut d = SandboxDriver::new(SandboxConfig::default()).unwrap();
        let r = d.execute_script("return 1;").unwrap();
        assert!(r.is_error);
        assert_eq!(r.value, "No document loaded");
    }

    #[test]
    fn test_returns_json_and_page_errors() {
        let mut d = loaded();
        assert_eq!(d.execute_script("return {a: [1, 'x']};").unwrap().value, r#"{"a":[1,"x"]}"#);
        assert_eq!(d.execute_script("var x = 1;").unwrap().value, "null");
        let err = d.execute_script("throw new Error('nope');").unwrap();
        assert!(err.is_error);
        assert_eq!(err.value, "nope");
        assert_eq!(d.evaluate("window.location.href").unwrap().value, r#""http://app.local/""#);
        assert_eq!(d.current_url(), Some("http://app.local/"));
    }

    #[test]
    fn test_backend_is_reachable_through_the_injector() {
        let mut d = loaded();
        let r = d
            .execute_script(
                "return typeof angular.element(document.querySelector('body')).injector().get('$httpBackend').whenGET;",
            )
            .unwrap();
        assert_eq!(r.value, r#""function""#);
    }

    #[test]
    fn test_bootstrap_scripts_run_before_page_code() {
        let mut d = SandboxDriver::new(SandboxConfig::default()).unwrap();
        d.add_page(
            "http://app.local/",
            "angular.module('app', []).run(['$httpBackend', function (b) { window.order = (window.order || []).concat('page'); }]);",
        );
        d.add_bootstrap_script(
            "mock",
            "angular.module('mock', []).run(['$httpBackend', function (b) { window.order = (window.order || []).concat('mock'); }]);",
        )
        .unwrap();
        d.navigate("http://app.local/").unwrap();
        assert_eq!(d.evaluate("window.order").unwrap().value, r#"["mock","page"]"#);

        d.remove_bootstrap_script("mock").unwrap();
        d.navigate("http://app.local/").unwrap();
        assert_eq!(d.evaluate("window.order").unwrap().value, r#"["page"]"#);
    }

    #[test]
    fn test_failing_page_script_is_a_load_error() {
        let mut d = SandboxDriver::new(SandboxConfig::default()).unwrap();
        d.add_page("http://bad/", "throw new Error('broken page');");
        assert!(matches!(d.navigate("http://bad/"), Err(Error::LoadError(_))));
    }

    #[test]
    fn test_runaway_loops_are_stopped() {
        let mut d = SandboxDriver::new(SandboxConfig {
            script_loop_iteration_limit: 100,
            ..SandboxConfig::default()
        })
        .unwrap();
        d.navigate("http://app.local/").unwrap();
        let r = d.execute_script("var i = 0; while (true) { i++; }").unwrap();
        assert!(r.is_error);
    }
}
