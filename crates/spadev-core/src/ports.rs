//! Port definitions (trait abstractions) for external collaborators.
//!
//! The host web server owns request forwarding; spadev only produces the
//! address to forward to. These traits are the seam between the two.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use url::Url;

use crate::error::DevServerResult;

/// Supplies the address requests should be forwarded to.
///
/// Called on demand, once per incoming request. Implementations must make
/// repeated calls cheap: the first call may start the dev server, later
/// calls reuse that outcome.
#[async_trait]
pub trait ProxyTargetProvider: Send + Sync {
    /// Resolve the dev server address, e.g. `http://localhost:5173/`.
    async fn target_uri(&self) -> DevServerResult<Url>;
}

/// Accepts a target provider from spadev.
///
/// Implemented by the host's request-forwarding layer.
pub trait ProxyTargetRegistrar: Send + Sync {
    /// Register the provider that resolves the forward target.
    fn register(&self, provider: Arc<dyn ProxyTargetProvider>);
}

/// Which output stream of the child a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    /// Lowercase stream name, as used in log fields.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Port for appending dev server output lines to a sink.
///
/// Implementations should be thread-safe and non-blocking where possible.
pub trait OutputLogSinkPort: Send + Sync {
    /// Append a line of child output.
    ///
    /// # Arguments
    ///
    /// * `port` - Port the dev server was launched on (used for grouping)
    /// * `stream` - Stream the line was read from
    /// * `line` - The line content, without trailing newline or colour codes
    fn append(&self, port: u16, stream: OutputStream, line: String);
}
