use super::{ConsoleTransport, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, mpsc};
use url::Url;

type Scripted = Result<String, TransportError>;

/// In-memory console host.
///
/// Poll responses are scripted through [`MockHost::push_update`]; a poll
/// waits until one is available, like a long poll against an idle console.
/// Flush payloads are recorded and can be made to fail.
#[derive(Clone)]
pub struct MockTransport {
    state: Arc<MockState>,
    updates: Arc<AsyncMutex<mpsc::UnboundedReceiver<Scripted>>>,
}

/// Test-side handle of a [`MockTransport`].
#[derive(Clone)]
pub struct MockHost {
    state: Arc<MockState>,
    updates: mpsc::UnboundedSender<Scripted>,
}

#[derive(Default)]
struct MockState {
    send_gate: Arc<AsyncMutex<()>>,
    send_attempts: Mutex<usize>,
    sent: Mutex<Vec<String>>,
    send_failures: Mutex<VecDeque<String>>,
    images: Mutex<HashMap<String, Bytes>>,
    image_requests: Mutex<Vec<Url>>,
    polls: Mutex<usize>,
}

impl MockTransport {
    pub fn pair() -> (Self, MockHost) {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(MockState::default());
        (
            Self {
                state: state.clone(),
                updates: Arc::new(AsyncMutex::new(rx)),
            },
            MockHost { state, updates: tx },
        )
    }
}

impl MockHost {
    pub fn push_update(&self, body: impl Into<String>) {
        let _ = self.updates.send(Ok(body.into()));
    }

    pub fn push_poll_error(&self, message: impl Into<String>) {
        let _ = self
            .updates
            .send(Err(TransportError::Other(message.into())));
    }

    /// Blocks every `send_events` call until the returned guard is dropped.
    pub async fn hold_sends(&self) -> OwnedMutexGuard<()> {
        self.state.send_gate.clone().lock_owned().await
    }

    /// Number of `send_events` calls, including failed and held ones.
    pub fn send_attempts(&self) -> usize {
        *self.state.send_attempts.lock()
    }

    /// The next `send_events` call fails with `message`.
    pub fn fail_next_send(&self, message: impl Into<String>) {
        self.state.send_failures.lock().push_back(message.into());
    }

    pub fn set_image(&self, url: &str, bytes: impl Into<Bytes>) {
        self.state
            .images
            .lock()
            .insert(url.to_string(), bytes.into());
    }

    /// Payloads of every successful flush, oldest first.
    pub fn sent(&self) -> Vec<String> {
        self.state.sent.lock().clone()
    }

    pub fn image_requests(&self) -> Vec<Url> {
        self.state.image_requests.lock().clone()
    }

    pub fn poll_count(&self) -> usize {
        *self.state.polls.lock()
    }
}

#[async_trait]
impl ConsoleTransport for MockTransport {
    async fn send_events(&self, payload: &str) -> Result<(), TransportError> {
        *self.state.send_attempts.lock() += 1;
        let _gate = self.state.send_gate.lock().await;
        if let Some(message) = self.state.send_failures.lock().pop_front() {
            return Err(TransportError::Other(message));
        }
        self.state.sent.lock().push(payload.to_string());
        Ok(())
    }

    async fn poll_update(&self) -> Result<String, TransportError> {
        *self.state.polls.lock() += 1;
        let mut updates = self.updates.lock().await;
        updates.recv().await.unwrap_or(Err(TransportError::Closed))
    }

    async fn fetch_image(&self, url: &Url) -> Result<Bytes, TransportError> {
        self.state.image_requests.lock().push(url.clone());
        // Unknown images resolve to an empty sheet.
        Ok(self
            .state
            .images
            .lock()
            .get(url.as_str())
            .cloned()
            .unwrap_or_default())
    }
}
