//! Async facade over a [`Proxy`]
//!
//! `Proxy` and `Session` are single-threaded. `AsyncProxy` moves them onto a
//! dedicated worker thread that also creates (and owns) the driver; async
//! callers send commands and await the replies.

use crate::builder::Expectation;
use crate::channel::Dispatch;
use crate::proxy::{HttpBackend, Proxy};
use crate::script::RemoteCall;
use crate::session::Session;
use crate::value::Value;
use crate::{Driver, Error, ProxyConfig, Result, ScriptResult};
use std::sync::mpsc::{self, Sender};
use std::thread;
use tokio::sync::oneshot;

enum Command {
    Register(Expectation, oneshot::Sender<Result<Dispatch>>),
    RegisterOnLoad(Expectation, oneshot::Sender<Result<Dispatch>>),
    ResetOnLoad(oneshot::Sender<Result<()>>),
    Flush(oneshot::Sender<Result<Dispatch>>),
    SyncContext(Option<Value>, oneshot::Sender<Result<Dispatch>>),
    SetContext(Option<Value>, oneshot::Sender<Result<Option<Value>>>),
    Context(oneshot::Sender<Result<Option<Value>>>),
    Pending(oneshot::Sender<Result<Vec<String>>>),
    Remote(RemoteCall, oneshot::Sender<Result<ScriptResult>>),
    Navigate(String, oneshot::Sender<Result<()>>),
    Close(oneshot::Sender<Result<()>>),
}

/// A proxy driven from async code, backed by a worker thread.
///
/// Cloning is cheap; clones talk to the same proxy. Registrations are built
/// with [`Selector`](crate::Selector):
///
/// ```no_run
/// # use backend_proxy::{args, AsyncProxy, ProxyConfig, Selector};
/// # use backend_proxy::sandbox::{SandboxConfig, SandboxDriver};
/// # async fn demo() -> backend_proxy::Result<()> {
/// let proxy = AsyncProxy::spawn(|| SandboxDriver::new(SandboxConfig::default()), ProxyConfig::default()).await?;
/// proxy.navigate("http://app.local/").await?;
/// proxy.register(Selector::when_get(args!["/api"]).respond(args![200])).await?;
/// proxy.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AsyncProxy {
    cmd_tx: Sender<Command>,
}

impl AsyncProxy {
    /// Start the worker. `factory` runs on the worker thread, so the driver
    /// itself does not need to be `Send`.
    pub async fn spawn<D, F>(factory: F, config: ProxyConfig) -> Result<Self>
    where
        D: Driver + 'static,
        F: FnOnce() -> Result<D> + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx) = oneshot::channel::<Result<()>>();

        thread::Builder::new()
            .name("backend-proxy".into())
            .spawn(move || {
                let mut proxy = match factory().and_then(|d| Proxy::new(Session::new(d), config)) {
                    Ok(p) => p,
                    Err(err) => {
                        let _ = init_tx.send(Err(err));
                        return;
                    }
                };
                let _ = init_tx.send(Ok(()));

                while let Ok(cmd) = cmd_rx.recv() {
                    match cmd {
                        Command::Register(e, resp) => {
                            let _ = resp.send(proxy.register(e));
                        }
                        Command::RegisterOnLoad(e, resp) => {
                            let _ = resp.send(proxy.on_load().register(e));
                        }
                        Command::ResetOnLoad(resp) => {
                            let _ = resp.send(proxy.on_load().reset());
                        }
                        Command::Flush(resp) => {
                            let _ = resp.send(proxy.flush());
                        }
                        Command::SyncContext(update, resp) => {
                            let _ = resp.send(proxy.sync_context(update));
                        }
                        Command::SetContext(value, resp) => {
                            let _ = resp.send(Ok(proxy.set_context(value)));
                        }
                        Command::Context(resp) => {
                            let _ = resp.send(Ok(proxy.context()));
                        }
                        Command::Pending(resp) => {
                            let _ = resp.send(Ok(proxy.pending()));
                        }
                        Command::Remote(call, resp) => {
                            let _ = resp.send(proxy.remote(call));
                        }
                        Command::Navigate(url, resp) => {
                            let _ = resp.send(proxy.navigate(&url));
                        }
                        Command::Close(resp) => {
                            let _ = resp.send(Ok(()));
                            break;
                        }
                    }
                }
            })?;

        init_rx
            .await
            .map_err(|e| Error::Other(format!("Worker init canceled: {}", e)))??;

        Ok(Self { cmd_tx })
    }

    async fn request<T>(
        &self,
        what: &str,
        command: impl FnOnce(oneshot::Sender<Result<T>>) -> Command,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(command(tx))
            .map_err(|_| Error::Other(format!("{} failed: proxy worker is gone", what)))?;
        rx.await
            .map_err(|e| Error::Other(format!("{} canceled: {}", what, e)))?
    }

    pub async fn register(&self, expectation: Expectation) -> Result<Dispatch> {
        self.request("Register", |tx| Command::Register(expectation, tx)).await
    }

    /// Register on the on-load child
    pub async fn register_on_load(&self, expectation: Expectation) -> Result<Dispatch> {
        self.request("RegisterOnLoad", |tx| Command::RegisterOnLoad(expectation, tx)).await
    }

    pub async fn reset_on_load(&self) -> Result<()> {
        self.request("ResetOnLoad", Command::ResetOnLoad).await
    }

    pub async fn flush(&self) -> Result<Dispatch> {
        self.request("Flush", Command::Flush).await
    }

    pub async fn sync_context(&self, update: Option<Value>) -> Result<Dispatch> {
        self.request("SyncContext", |tx| Command::SyncContext(update, tx)).await
    }

    pub async fn set_context(&self, value: Option<Value>) -> Result<Option<Value>> {
        self.request("SetContext", |tx| Command::SetContext(value, tx)).await
    }

    pub async fn context(&self) -> Result<Option<Value>> {
        self.request("Context", Command::Context).await
    }

    pub async fn pending(&self) -> Result<Vec<String>> {
        self.request("Pending", Command::Pending).await
    }

    pub async fn navigate(&self, url: &str) -> Result<()> {
        let url = url.to_string();
        self.request("Navigate", |tx| Command::Navigate(url, tx)).await
    }

    pub async fn verify_no_outstanding_expectation(&self) -> Result<ScriptResult> {
        self.request("Remote", |tx| Command::Remote(RemoteCall::VerifyNoOutstandingExpectation, tx))
            .await
    }

    pub async fn verify_no_outstanding_request(&self) -> Result<ScriptResult> {
        self.request("Remote", |tx| Command::Remote(RemoteCall::VerifyNoOutstandingRequest, tx))
            .await
    }

    pub async fn flush_pending(&self) -> Result<ScriptResult> {
        self.request("Remote", |tx| Command::Remote(RemoteCall::Flush, tx)).await
    }

    /// Stop the worker. The driver is dropped on the worker thread.
    pub async fn close(self) -> Result<()> {
        self.request("Close", Command::Close).await
    }
}
