//! Shared handle on a driver
//!
//! Root proxies and their on-load children talk to the same page through one
//! `Session`. The session also owns the navigation hooks: each buffered child
//! installs one, and every `navigate` first combines what the hooks produce
//! into a single bootstrap module.

use crate::script::{bootstrap_module, BOOTSTRAP_MODULE};
use crate::{Driver, Error, Result, ScriptResult};
use std::cell::RefCell;
use std::rc::Rc;

/// Produces a program body for the next page, or `None` when there is
/// nothing to install.
pub type NavigationHook = Rc<dyn Fn() -> Result<Option<String>>>;

/// Identifies one installed navigation hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookId(u64);

struct SessionState<D> {
    driver: D,
    // Run in installation order
    hooks: Vec<(HookId, NavigationHook)>,
    next_hook: u64,
    // Whether the bootstrap module is currently registered with the driver
    bootstrap_added: bool,
}

/// A cloneable, single-threaded handle on a [`Driver`]
pub struct Session<D: Driver> {
    state: Rc<RefCell<SessionState<D>>>,
}

impl<D: Driver> Clone for Session<D> {
    fn clone(&self) -> Self {
        Self { state: Rc::clone(&self.state) }
    }
}

impl<D: Driver> Session<D> {
    pub fn new(driver: D) -> Self {
        Self {
            state: Rc::new(RefCell::new(SessionState {
                driver,
                hooks: Vec::new(),
                next_hook: 0,
                bootstrap_added: false,
            })),
        }
    }

    /// Run a script and return what it produced. A page-side exception
    /// becomes `Error::Remote` carrying the page's message unchanged.
    pub fn execute(&self, script: &str) -> Result<ScriptResult> {
        log::trace!("executing script:\n{}", script);
        let result = self.state.borrow_mut().driver.execute_script(script)?;
        if result.is_error {
            log::debug!("page threw: {}", result.value);
            return Err(Error::Remote(result.value));
        }
        Ok(result)
    }

    /// Navigate, first replacing the bootstrap module with what the
    /// installed hooks currently produce. With nothing produced, a module
    /// left over from an earlier navigation is removed.
    pub fn navigate(&self, url: &str) -> Result<()> {
        // Clone the hooks out so they run without the session borrowed.
        let hooks: Vec<NavigationHook> = self
            .state
            .borrow()
            .hooks
            .iter()
            .map(|(_, hook)| Rc::clone(hook))
            .collect();
        let mut bodies = Vec::with_capacity(hooks.len());
        for hook in hooks {
            bodies.extend(hook()?);
        }

        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        if state.bootstrap_added {
            if let Err(e) = state.driver.remove_bootstrap_script(BOOTSTRAP_MODULE) {
                log::warn!("failed to remove stale bootstrap module: {}", e);
            }
            state.bootstrap_added = false;
        }
        if !bodies.is_empty() {
            let script = bootstrap_module(&bodies.join("\n"));
            log::debug!("installing bootstrap module before navigating to {}", url);
            log::trace!("bootstrap module:\n{}", script);
            state.driver.add_bootstrap_script(BOOTSTRAP_MODULE, &script)?;
            state.bootstrap_added = true;
        }
        state.driver.navigate(url)
    }

    /// Install `hook` to run ahead of every following navigation
    pub fn install_navigation_hook(&self, hook: NavigationHook) -> HookId {
        let mut state = self.state.borrow_mut();
        let id = HookId(state.next_hook);
        state.next_hook += 1;
        state.hooks.push((id, hook));
        id
    }

    /// Uninstall one hook. Other hooks keep contributing to the bootstrap
    /// module, which is rebuilt on the next navigation. Returns whether the
    /// hook was installed.
    pub fn restore_navigation(&self, id: HookId) -> bool {
        let mut state = self.state.borrow_mut();
        let before = state.hooks.len();
        state.hooks.retain(|(hook_id, _)| *hook_id != id);
        state.hooks.len() != before
    }

    pub fn has_navigation_hook(&self) -> bool {
        !self.state.borrow().hooks.is_empty()
    }

    /// Borrow the driver mutably, e.g. to read back page state in tests.
    ///
    /// Panics if called re-entrantly from inside a navigation hook.
    pub fn with_driver<R>(&self, f: impl FnOnce(&mut D) -> R) -> R {
        f(&mut self.state.borrow_mut().driver)
    }
}
