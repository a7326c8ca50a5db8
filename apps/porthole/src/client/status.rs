use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Transport phases surfaced to the embedder for activity indication.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewerStatus {
    Sending,
    Sent,
    Receiving,
    Received,
}

impl ViewerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewerStatus::Sending => "SENDING",
            ViewerStatus::Sent => "SENT",
            ViewerStatus::Receiving => "RECEIVING",
            ViewerStatus::Received => "RECEIVED",
        }
    }
}

impl fmt::Display for ViewerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type StatusCallback = Arc<dyn Fn(ViewerStatus) + Send + Sync>;

/// Single overridable status callback. Installing a new callback replaces the
/// previous one.
#[derive(Clone, Default)]
pub struct StatusNotifier {
    callback: Arc<RwLock<Option<StatusCallback>>>,
}

impl fmt::Debug for StatusNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusNotifier")
            .field("installed", &self.callback.read().is_some())
            .finish()
    }
}

impl StatusNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_callback<F>(&self, callback: F)
    where
        F: Fn(ViewerStatus) + Send + Sync + 'static,
    {
        *self.callback.write() = Some(Arc::new(callback));
    }

    pub fn clear_callback(&self) {
        *self.callback.write() = None;
    }

    pub fn notify(&self, status: ViewerStatus) {
        trace!(target: "porthole::viewer", status = %status, "status");
        let callback = self.callback.read().clone();
        if let Some(callback) = callback {
            callback(status);
        }
    }
}

/// Embedder callbacks. Every method has a no-op default.
pub trait HostHooks: Send + Sync {
    /// A flush, poll or image fetch failed.
    fn on_client_error(&self, _error: &(dyn std::error::Error + Send + Sync)) {}

    /// The tile grid was rebuilt for a new framebuffer size.
    fn on_canvas_size_change(&self, _width: u32, _height: u32) {}

    /// The console host ended the session and sent this document instead of
    /// an update.
    fn on_session_end(&self, _document: &str) {}
}

/// Hooks that ignore everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHooks;

impl HostHooks for NoopHooks {}
