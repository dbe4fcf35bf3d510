//! Attaching a dev server to the host's request-forwarding layer.
//!
//! [`attach`] validates the options, registers a [`ProxyTargetProvider`] with
//! the host and returns a [`DevServerAttachment`]. Nothing is spawned until
//! the first call to `target_uri()`. That call starts the launch on its own
//! task; every later or concurrent call shares the same outcome, success or
//! failure, and each call is separately bounded by the startup timeout.

use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use spadev_core::{
    DevServerError, DevServerOptions, DevServerResult, LAUNCH_HOST, OutputLogSinkPort,
    ProxyTargetProvider, ProxyTargetRegistrar,
};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use crate::process::{ScriptProcess, TracingLogSink};
use crate::readiness::ReadinessDetector;
use crate::timeout::with_timeout;

type LaunchFuture = Shared<BoxFuture<'static, DevServerResult<Url>>>;

/// Validate `options` and register a lazily-started dev server with `registrar`.
///
/// Child output is forwarded to `tracing` when `options.forward_output` is set.
/// Fails synchronously with [`DevServerError::InvalidArgument`] before
/// anything is allocated or spawned.
pub fn attach(
    options: DevServerOptions,
    registrar: &dyn ProxyTargetRegistrar,
) -> DevServerResult<DevServerAttachment> {
    let sink: Option<Arc<dyn OutputLogSinkPort>> = if options.forward_output {
        Some(Arc::new(TracingLogSink))
    } else {
        None
    };
    attach_with_sink(options, registrar, sink)
}

/// Like [`attach`], with an explicit sink for child output.
pub fn attach_with_sink(
    options: DevServerOptions,
    registrar: &dyn ProxyTargetRegistrar,
    log_sink: Option<Arc<dyn OutputLogSinkPort>>,
) -> DevServerResult<DevServerAttachment> {
    let attachment = DevServerAttachment::new(options, log_sink)?;
    registrar.register(Arc::new(attachment.clone()));
    Ok(attachment)
}

/// Build the address requests are forwarded to.
pub fn target_url(port: u16) -> DevServerResult<Url> {
    Url::parse(&format!("http://{LAUNCH_HOST}:{port}")).map_err(DevServerError::internal)
}

/// A registered, lazily-started dev server.
///
/// Cloning is cheap; clones share the launch and the child process.
#[derive(Clone)]
pub struct DevServerAttachment {
    inner: Arc<AttachmentInner>,
}

struct AttachmentInner {
    options: DevServerOptions,
    log_sink: Option<Arc<dyn OutputLogSinkPort>>,
    launch: OnceLock<LaunchFuture>,
    process: Arc<Mutex<Option<ScriptProcess>>>,
    teardown: CancellationToken,
}

impl DevServerAttachment {
    /// Create an attachment without registering it anywhere.
    pub fn new(
        options: DevServerOptions,
        log_sink: Option<Arc<dyn OutputLogSinkPort>>,
    ) -> DevServerResult<Self> {
        options.validate()?;
        Ok(Self {
            inner: Arc::new(AttachmentInner {
                options,
                log_sink,
                launch: OnceLock::new(),
                process: Arc::new(Mutex::new(None)),
                teardown: CancellationToken::new(),
            }),
        })
    }

    /// Options this attachment was created with.
    pub fn options(&self) -> &DevServerOptions {
        &self.inner.options
    }

    /// Resolve the dev server address, starting the server on first use.
    ///
    /// Fails with [`DevServerError::Timeout`] if the server is not ready
    /// within the startup timeout. The launch itself keeps waiting, so a
    /// later call succeeds once the server is up.
    pub async fn target_uri(&self) -> DevServerResult<Url> {
        with_timeout(self.launch(), self.inner.options.startup_timeout).await
    }

    /// Whether the launch has been triggered.
    pub fn is_started(&self) -> bool {
        self.inner.launch.get().is_some()
    }

    /// PID of the running dev server, once it is ready.
    pub fn pid(&self) -> Option<u32> {
        self.lock_process().as_ref().and_then(ScriptProcess::pid)
    }

    /// Stop the dev server if it was started.
    ///
    /// A launch still waiting for its readiness line is abandoned and its
    /// process stopped before this returns; that launch then resolves to an
    /// error for every caller.
    pub async fn shutdown(&self) {
        let process = {
            let mut slot = self.lock_process();
            self.inner.teardown.cancel();
            slot.take()
        };

        if let Some(launch) = self.inner.launch.get().cloned() {
            // Resolves once an in-flight launch has released its process
            let _ = launch.await;
        }

        if let Some(process) = process {
            info!(pid = ?process.pid(), "Stopping dev server");
            let status = process.shutdown().await;
            debug!(status = ?status, "Dev server stopped");
        }
    }

    fn launch(&self) -> LaunchFuture {
        self.inner
            .launch
            .get_or_init(|| {
                let detector = ReadinessDetector::new(self.inner.options.clone())
                    .with_log_sink(self.inner.log_sink.clone());
                let slot = Arc::clone(&self.inner.process);
                let teardown = self.inner.teardown.clone();

                let task = tokio::spawn(launch_dev_server(detector, slot, teardown));
                async move {
                    task.await.unwrap_or_else(|e| {
                        Err(DevServerError::Internal(format!(
                            "dev server launch task failed: {e}"
                        )))
                    })
                }
                .boxed()
                .shared()
            })
            .clone()
    }

    fn lock_process(&self) -> std::sync::MutexGuard<'_, Option<ScriptProcess>> {
        self.inner
            .process
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ProxyTargetProvider for DevServerAttachment {
    async fn target_uri(&self) -> DevServerResult<Url> {
        Self::target_uri(self).await
    }
}

async fn launch_dev_server(
    detector: ReadinessDetector,
    slot: Arc<Mutex<Option<ScriptProcess>>>,
    teardown: CancellationToken,
) -> DevServerResult<Url> {
    let (port, process) = detector.spawn()?;

    let ready = tokio::select! {
        result = detector.wait_until_ready(port, &process) => Some(result),
        () = teardown.cancelled() => None,
    };

    match ready {
        Some(Ok(())) => {}
        Some(Err(e)) => return Err(e),
        None => {
            debug!(pid = ?process.pid(), "Dev server shut down while starting");
            process.shutdown().await;
            return Err(shut_down_while_starting());
        }
    }

    let url = target_url(port)?;
    if let Some(process) = adopt_process(&slot, &teardown, process) {
        process.shutdown().await;
        return Err(shut_down_while_starting());
    }
    Ok(url)
}

/// Store `process` in `slot` unless teardown has begun.
///
/// Returns the process back if it was refused. The check and the store
/// happen under the slot lock, which `shutdown` also holds while cancelling.
fn adopt_process(
    slot: &Mutex<Option<ScriptProcess>>,
    teardown: &CancellationToken,
    process: ScriptProcess,
) -> Option<ScriptProcess> {
    let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
    if teardown.is_cancelled() {
        return Some(process);
    }
    *slot = Some(process);
    None
}

fn shut_down_while_starting() -> DevServerError {
    DevServerError::Internal("dev server was shut down while starting".to_string())
}
