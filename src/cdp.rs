//! Chrome DevTools Protocol driver

use crate::serialize::string_literal;
use crate::{envelope, Driver, Error, Result, ScriptResult};
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};
use std::sync::Arc;
use std::time::Duration;

// Defers angular's automatic bootstrap, then resumes it with the mock modules
// added once they are defined.
const LOADER_TEMPLATE: &str = r#"(function () {
  var PREFIX = "NG_DEFER_BOOTSTRAP!";
  if (window.name.indexOf(PREFIX) !== 0) {
    window.name = PREFIX + window.name;
  }
  function resume() {
    if (!window.angular || !window.angular.resumeBootstrap) {
      setTimeout(resume, 10);
      return;
    }
__MODULES__
    window.angular.resumeBootstrap(__NAMES__);
  }
  document.addEventListener("DOMContentLoaded", resume);
})();"#;

/// Launch settings for [`CdpDriver`]
#[derive(Debug, Clone)]
pub struct CdpConfig {
    pub headless: bool,
    pub window_size: (u32, u32),
    /// Default timeout for navigation and evaluation, in milliseconds
    pub timeout_ms: u64,
}

impl Default for CdpConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_size: (1280, 720),
            timeout_ms: 30000,
        }
    }
}

/// A [`Driver`] over a headless Chrome tab
///
/// Bootstrap scripts are combined into one loader registered with
/// `Page.addScriptToEvaluateOnNewDocument`; the loader is replaced whenever
/// the set of scripts changes.
pub struct CdpDriver {
    _browser: Browser,
    tab: Arc<Tab>,
    modules: Vec<(String, String)>,
    loader_id: Option<String>,
}

impl CdpDriver {
    pub fn new(config: CdpConfig) -> Result<Self> {
        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .window_size(Some(config.window_size))
            .build()
            .map_err(|e| Error::CdpError(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::CdpError(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::CdpError(format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(Duration::from_millis(config.timeout_ms));

        Ok(Self {
            _browser: browser,
            tab,
            modules: Vec::new(),
            loader_id: None,
        })
    }

    fn loader_script(&self) -> String {
        let modules = self
            .modules
            .iter()
            .map(|(_, script)| format!("    try {{\n{}\n    }} catch (e) {{ console.error(e); }}", script))
            .collect::<Vec<_>>()
            .join("\n");
        let names = format!(
            "[{}]",
            self.modules
                .iter()
                .map(|(name, _)| string_literal(name))
                .collect::<Vec<_>>()
                .join(", ")
        );
        LOADER_TEMPLATE
            .replace("__MODULES__", &modules)
            .replace("__NAMES__", &names)
    }

    fn reinstall_loader(&mut self) -> Result<()> {
        if let Some(identifier) = self.loader_id.take() {
            self.tab
                .call_method(Page::RemoveScriptToEvaluateOnNewDocument { identifier })
                .map_err(|e| Error::CdpError(format!("Failed to remove bootstrap loader: {}", e)))?;
        }
        if self.modules.is_empty() {
            return Ok(());
        }
        let added = self
            .tab
            .call_method(Page::AddScriptToEvaluateOnNewDocument {
                source: self.loader_script(),
                world_name: None,
                include_command_line_api: None,
                run_immediately: None,
            })
            .map_err(|e| Error::CdpError(format!("Failed to add bootstrap loader: {}", e)))?;
        self.loader_id = Some(added.identifier);
        Ok(())
    }
}

impl Driver for CdpDriver {
    fn execute_script(&mut self, script: &str) -> Result<ScriptResult> {
        let result = self
            .tab
            .evaluate(&envelope::wrap(script), false)
            .map_err(|e| Error::ScriptError(format!("Evaluation failed: {}", e)))?;

        match result.value {
            Some(serde_json::Value::String(raw)) => envelope::parse(&raw),
            other => Err(Error::ScriptError(format!("Unexpected evaluation result: {:?}", other))),
        }
    }

    fn navigate(&mut self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| Error::LoadError(format!("Navigation failed: {}", e)))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| Error::LoadError(format!("Wait for navigation failed: {}", e)))?;
        Ok(())
    }

    fn add_bootstrap_script(&mut self, name: &str, script: &str) -> Result<()> {
        match self.modules.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = script.to_string(),
            None => self.modules.push((name.to_string(), script.to_string())),
        }
        self.reinstall_loader()
    }

    fn remove_bootstrap_script(&mut self, name: &str) -> Result<()> {
        let before = self.modules.len();
        self.modules.retain(|(n, _)| n != name);
        if self.modules.len() == before {
            return Ok(());
        }
        self.reinstall_loader()
    }
}
