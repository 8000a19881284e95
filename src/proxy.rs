//! The proxy: `$httpBackend`'s registration API, driven from Rust
//!
//! ```no_run
//! # use backend_proxy::{args, HttpBackend, Proxy, ProxyConfig, Session, Value};
//! # fn demo<D: backend_proxy::Driver>(session: Session<D>) -> backend_proxy::Result<()> {
//! let mut proxy = Proxy::new(session, ProxyConfig::default())?;
//! proxy.when_get(args!["/api/items"]).respond(args![200, serde_json::json!([])])?;
//! proxy.when_get(args![Value::regex("/^\\/partials\\//")?]).pass_through()?;
//!
//! // Installed while the next page bootstraps, before its code runs
//! proxy.on_load().when_get(args!["/api/user"]).respond(args![200, serde_json::json!({"id": 1})])?;
//! proxy.navigate("http://localhost:8000/")?;
//! # Ok(())
//! # }
//! ```

use crate::builder::{verb_table, Expectation, Selector};
use crate::channel::{Channel, Dispatch, Mode};
use crate::context::SharedContext;
use crate::script::{bootstrap_module, expectation_statement, program, RemoteCall};
use crate::session::{HookId, NavigationHook, Session};
use crate::value::Value;
use crate::{Driver, ProxyConfig, Result, ScriptResult};
use std::rc::Rc;

macro_rules! backend_methods {
    ($($name:ident => $family:ident $method:ident),* $(,)?) => {
        $(
            #[doc = concat!("Start a `", stringify!($name), "` registration; finish it with `respond` or `pass_through`.")]
            fn $name(&mut self, args: Vec<Value>) -> Pending<'_, Self>
            where
                Self: Sized,
            {
                Pending::new(self, Selector::$name(args))
            }
        )*
    };
}

/// Anything that accepts `$httpBackend` registrations
///
/// Implementors only provide [`register`](HttpBackend::register); the verb
/// methods (`when`, `when_get`, ..., `expect_jsonp`) come for free.
pub trait HttpBackend {
    /// Deliver one complete registration
    fn register(&mut self, expectation: Expectation) -> Result<Dispatch>;

    verb_table!(backend_methods);
}

/// A verb call awaiting `.respond(...)` or `.pass_through()`
#[must_use = "nothing is registered until respond or pass_through is called"]
pub struct Pending<'a, B: HttpBackend> {
    backend: &'a mut B,
    selector: Selector,
}

impl<'a, B: HttpBackend> Pending<'a, B> {
    pub fn new(backend: &'a mut B, selector: Selector) -> Self {
        Self { backend, selector }
    }

    pub fn respond(self, args: Vec<Value>) -> Result<Dispatch> {
        self.backend.register(self.selector.respond(args))
    }

    pub fn pass_through(self) -> Result<Dispatch> {
        self.backend.register(self.selector.pass_through())
    }
}

/// The root proxy
pub struct Proxy<D: Driver> {
    config: ProxyConfig,
    channel: Channel<D>,
    context: SharedContext,
    on_load: Option<OnLoadProxy<D>>,
}

impl<D: Driver> Proxy<D> {
    pub fn new(session: Session<D>, config: ProxyConfig) -> Result<Self> {
        config.validate()?;
        let mode = if config.buffer { Mode::Buffered } else { Mode::Immediate };
        Ok(Self {
            channel: Channel::new(session, mode, config.root_element.clone()),
            context: SharedContext::new(config.context_field.clone()),
            on_load: None,
            config,
        })
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn session(&self) -> &Session<D> {
        self.channel.session()
    }

    /// Context statement that leads generated programs
    fn prefix(&self) -> Result<Option<String>> {
        if !self.config.context_auto_sync {
            return Ok(None);
        }
        Ok(self.context.assignment()?)
    }

    /// Send buffered statements as one program. With nothing buffered this is
    /// `Dispatch::Empty` and the page is not contacted.
    pub fn flush(&mut self) -> Result<Dispatch> {
        if self.channel.is_empty() {
            return self.channel.flush(None);
        }
        let prefix = self.prefix()?;
        self.channel.flush(prefix)
    }

    /// Update the local context and push it to the page.
    ///
    /// `None` pushes the current value (an empty object when there is none).
    /// When both the current value and `update` are objects the update is
    /// merged in shallowly; otherwise it replaces the current value. In
    /// buffered mode the push waits for `flush`.
    pub fn sync_context(&mut self, update: Option<Value>) -> Result<Dispatch> {
        let statement = self.context.sync(update)?;
        self.channel.submit(statement, None)
    }

    /// Replace the local context without pushing it. Returns the old value.
    pub fn set_context(&mut self, value: Option<Value>) -> Option<Value> {
        self.context.replace(value)
    }

    pub fn context(&self) -> Option<Value> {
        self.context.get()
    }

    /// The child proxy whose registrations are installed on every following
    /// navigation. Created on first use; it shares this proxy's context.
    pub fn on_load(&mut self) -> &mut OnLoadProxy<D> {
        let (session, context, root) = (
            self.channel.session(),
            &self.context,
            &self.config.root_element,
        );
        self.on_load
            .get_or_insert_with(|| OnLoadProxy::new(session.clone(), context.clone(), root.clone()))
    }

    pub fn navigate(&self, url: &str) -> Result<()> {
        self.channel.session().navigate(url)
    }

    /// `$httpBackend.verifyNoOutstandingExpectation()`, always immediate
    pub fn verify_no_outstanding_expectation(&self) -> Result<ScriptResult> {
        self.remote(RemoteCall::VerifyNoOutstandingExpectation)
    }

    /// `$httpBackend.verifyNoOutstandingRequest()`, always immediate
    pub fn verify_no_outstanding_request(&self) -> Result<ScriptResult> {
        self.remote(RemoteCall::VerifyNoOutstandingRequest)
    }

    /// `$httpBackend.flush()`: answer the page's pending requests. Unrelated
    /// to [`flush`](Proxy::flush); the page throws when nothing is pending.
    pub fn flush_pending(&self) -> Result<ScriptResult> {
        self.remote(RemoteCall::Flush)
    }

    pub fn remote(&self, call: RemoteCall) -> Result<ScriptResult> {
        log::debug!("calling $httpBackend.{}()", call.method());
        self.channel.execute(&[call.statement()])
    }

    /// Statements waiting for `flush`
    pub fn pending(&self) -> Vec<String> {
        self.channel.pending()
    }
}

impl<D: Driver> HttpBackend for Proxy<D> {
    fn register(&mut self, expectation: Expectation) -> Result<Dispatch> {
        let statement = expectation_statement(&expectation)?;
        let prefix = match self.channel.mode() {
            Mode::Immediate => self.prefix()?,
            Mode::Buffered => None,
        };
        self.channel.submit(statement, prefix)
    }
}

/// Registrations installed on every following navigation
///
/// Always buffered. Its queue is turned into an angular module (run block
/// included) that the page loads before its own code, preceded by the
/// parent's context as it stands at navigation time.
pub struct OnLoadProxy<D: Driver> {
    channel: Channel<D>,
    hook: NavigationHook,
    installed: Option<HookId>,
}

impl<D: Driver> OnLoadProxy<D> {
    fn new(session: Session<D>, context: SharedContext, root_element: String) -> Self {
        let channel = Channel::new(session, Mode::Buffered, root_element);
        let queue = channel.queue();
        let hook: NavigationHook = Rc::new(move || -> Result<Option<String>> {
            let queued = queue.borrow();
            if queued.is_empty() {
                return Ok(None);
            }
            let mut statements = Vec::with_capacity(queued.len() + 1);
            statements.extend(context.assignment()?);
            statements.extend(queued.iter().cloned());
            Ok(Some(program(&statements)))
        });
        Self { channel, hook, installed: None }
    }

    /// Drop everything queued and stop installing the bootstrap module
    pub fn reset(&mut self) -> Result<()> {
        self.channel.clear();
        if let Some(id) = self.installed.take() {
            self.channel.session().restore_navigation(id);
            log::debug!("on-load registrations reset");
        }
        Ok(())
    }

    pub fn pending(&self) -> Vec<String> {
        self.channel.pending()
    }

    /// The bootstrap module the next navigation would install, if any
    pub fn bootstrap_script(&self) -> Result<Option<String>> {
        Ok((self.hook)()?.map(|body| bootstrap_module(&body)))
    }
}

impl<D: Driver> HttpBackend for OnLoadProxy<D> {
    fn register(&mut self, expectation: Expectation) -> Result<Dispatch> {
        let statement = expectation_statement(&expectation)?;
        let dispatch = self.channel.submit(statement, None)?;
        if self.installed.is_none() {
            self.installed = Some(self.channel.session().install_navigation_hook(Rc::clone(&self.hook)));
            log::debug!("navigation hook installed for on-load registrations");
        }
        Ok(dispatch)
    }
}

impl<D: Driver> Drop for OnLoadProxy<D> {
    fn drop(&mut self) {
        if let Some(id) = self.installed.take() {
            self.channel.session().restore_navigation(id);
        }
    }
}
