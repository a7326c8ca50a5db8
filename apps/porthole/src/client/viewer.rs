//! The transport loop.
//!
//! A heartbeat task flushes queued input and kicks the update chain. Flushes
//! are gated so only one is ever in flight; the update chain is self-limiting
//! because painting clears the dirty flag before each poll is issued and only
//! the poll's own continuation sets it again.

use super::event_queue::EventQueue;
use super::keyboard::KeyboardTranslator;
use super::status::{HostHooks, StatusNotifier, ViewerStatus};
use super::tile_canvas::{CanvasGeometry, SurfaceError, TileCanvas, TileSurface};
use crate::config::ViewerConfig;
use crate::protocol::{
    KeyEvent, Modifiers, MouseButton, MouseEvent, MouseEventKind, PollOutcome, QueuedEvent,
    UpdateDirective, UpdateError, classify_poll_response, encode_event_bag,
};
use crate::telemetry::record_events;
use crate::transport::{ConsoleTransport, TransportError, resolve_image_url};
use parking_lot::Mutex;
use porthole_keymaps::keysym::js;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Update(#[from] UpdateError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error("viewer must be started from within a tokio runtime")]
    NoRuntime,
}

/// Exponential retry delay.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Option<Duration>,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
            current: None,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = match self.current {
            None => self.initial,
            Some(current) => current.saturating_mul(2).min(self.max),
        };
        self.current = Some(delay);
        delay
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}

/// Point-in-time view of the loop flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerState {
    pub dirty: bool,
    pub image_loaded: bool,
    pub sending_in_progress: bool,
    pub running: bool,
    pub session_ended: bool,
}

#[derive(Debug)]
struct LoopState {
    image_loaded: bool,
    sending_in_progress: bool,
    running: bool,
    session_ended: bool,
    send_backoff: Backoff,
    poll_backoff: Backoff,
    cancel: Option<CancellationToken>,
    runtime: Option<Handle>,
}

#[derive(Debug)]
struct InputState {
    queue: EventQueue,
    keyboard: KeyboardTranslator,
}

// Lock order: canvas, then state, then input.
struct Inner {
    config: ViewerConfig,
    transport: Arc<dyn ConsoleTransport>,
    hooks: Arc<dyn HostHooks>,
    status: StatusNotifier,
    canvas: Mutex<TileCanvas>,
    state: Mutex<LoopState>,
    input: Mutex<InputState>,
}

/// A console viewer attached to one session. Cheap to clone.
#[derive(Clone)]
pub struct ConsoleViewer {
    inner: Arc<Inner>,
}

impl ConsoleViewer {
    pub fn new(
        config: ViewerConfig,
        transport: Arc<dyn ConsoleTransport>,
        surface: Box<dyn TileSurface>,
        hooks: Arc<dyn HostHooks>,
    ) -> Result<Self, ViewerError> {
        let canvas = TileCanvas::new(surface, config.canvas_geometry())?;
        let keyboard =
            KeyboardTranslator::new(config.layout, config.keyboard_env, config.raw_keyboard);
        let timing = config.timing;
        let state = LoopState {
            image_loaded: false,
            sending_in_progress: false,
            running: false,
            session_ended: false,
            send_backoff: Backoff::new(timing.backoff_initial, timing.backoff_max),
            poll_backoff: Backoff::new(timing.backoff_initial, timing.backoff_max),
            cancel: None,
            runtime: None,
        };
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                transport,
                hooks,
                status: StatusNotifier::new(),
                canvas: Mutex::new(canvas),
                state: Mutex::new(state),
                input: Mutex::new(InputState {
                    queue: EventQueue::new(),
                    keyboard,
                }),
            }),
        })
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.inner.config
    }

    pub fn status(&self) -> &StatusNotifier {
        &self.inner.status
    }

    pub fn state(&self) -> ViewerState {
        let canvas = self.inner.canvas.lock();
        let state = self.inner.state.lock();
        ViewerState {
            dirty: canvas.is_dirty(),
            image_loaded: state.image_loaded,
            sending_in_progress: state.sending_in_progress,
            running: state.running,
            session_ended: state.session_ended,
        }
    }

    pub fn with_canvas<R>(&self, f: impl FnOnce(&TileCanvas) -> R) -> R {
        f(&self.inner.canvas.lock())
    }

    pub fn queued_events(&self) -> Vec<QueuedEvent> {
        self.inner.input.lock().queue.events().copied().collect()
    }

    /// Starts the heartbeat and, on first start, loads the initial sprite
    /// sheet. Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<(), ViewerError> {
        let runtime = Handle::try_current().map_err(|_| ViewerError::NoRuntime)?;
        let token = CancellationToken::new();
        let load_initial_image = {
            let mut state = self.inner.state.lock();
            if state.running {
                return Ok(());
            }
            state.running = true;
            state.session_ended = false;
            state.send_backoff.reset();
            state.poll_backoff.reset();
            state.cancel = Some(token.clone());
            state.runtime = Some(runtime.clone());
            !state.image_loaded
        };
        {
            let mut input = self.inner.input.lock();
            input.queue.clear();
            input.keyboard.reset();
        }

        info!(
            target: "porthole::viewer",
            panel = %self.inner.config.panel_id,
            update_url = %self.inner.config.update_url,
            "viewer started"
        );

        if load_initial_image {
            let inner = self.inner.clone();
            let token = token.clone();
            runtime.spawn(async move { inner.load_initial_image(token).await });
        } else {
            // Results of the previous run's poll are discarded; re-arm.
            self.inner.canvas.lock().mark_dirty();
        }

        let inner = self.inner.clone();
        let heartbeat = self.inner.config.timing.heartbeat;
        runtime.spawn(async move {
            let mut ticker = tokio::time::interval(heartbeat);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        inner.check_event_queue();
                        inner.check_update();
                    }
                }
            }
            trace!(target: "porthole::viewer", "heartbeat stopped");
        });
        Ok(())
    }

    /// Cancels the heartbeat and clears pending input. Requests already in
    /// flight complete, but their results are ignored; an outstanding flush
    /// keeps the send gate closed until its request finishes.
    pub fn stop(&self) {
        self.inner.stop();
    }

    pub fn check_event_queue(&self) {
        self.inner.check_event_queue();
    }

    pub fn check_update(&self) {
        self.inner.check_update();
    }

    /// Moves the grid after the host window changed size.
    pub fn reposition(&self, origin: (i32, i32)) {
        if !self.inner.is_running() {
            return;
        }
        let result = self.inner.canvas.lock().reposition(origin);
        if let Err(err) = result {
            self.inner.report_error(&ViewerError::from(err));
        }
    }

    pub fn mouse_move(&self, x: i32, y: i32, button: MouseButton, modifiers: Modifiers) {
        self.send_mouse(MouseEventKind::Move, x, y, button, modifiers);
    }

    pub fn mouse_down(&self, x: i32, y: i32, button: MouseButton, modifiers: Modifiers) {
        self.send_mouse(MouseEventKind::Down, x, y, button, modifiers);
    }

    pub fn mouse_up(&self, x: i32, y: i32, button: MouseButton, modifiers: Modifiers) {
        if !self.inner.is_running() {
            return;
        }
        let now = Instant::now().into_std();
        self.inner
            .input
            .lock()
            .queue
            .send_mouse_up(x, y, button, modifiers, now);
    }

    fn send_mouse(
        &self,
        kind: MouseEventKind,
        x: i32,
        y: i32,
        button: MouseButton,
        modifiers: Modifiers,
    ) {
        if !self.inner.is_running() {
            return;
        }
        self.inner.input.lock().queue.send_mouse_event(MouseEvent {
            kind,
            x,
            y,
            button,
            modifiers,
        });
    }

    pub fn key_down(&self, code: u32, modifiers: Modifiers) {
        self.submit_keys([KeyEvent::down(code, modifiers)]);
    }

    pub fn key_up(&self, code: u32, modifiers: Modifiers) {
        self.submit_keys([KeyEvent::up(code, modifiers)]);
    }

    pub fn key_press(&self, char_code: u32, modifiers: Modifiers) {
        self.submit_keys([KeyEvent::press(char_code, modifiers)]);
    }

    /// Types `text` as a series of key presses. Newlines become Enter.
    pub fn type_text(&self, text: &str) {
        let mut events = Vec::with_capacity(text.len());
        for ch in text.chars() {
            match ch {
                '\r' => {}
                '\n' => {
                    events.push(KeyEvent::down(js::ENTER, Modifiers::NONE));
                    events.push(KeyEvent::up(js::ENTER, Modifiers::NONE));
                }
                ch => events.push(KeyEvent::press(ch as u32, Modifiers::NONE)),
            }
        }
        self.submit_keys(events);
    }

    fn submit_keys(&self, events: impl IntoIterator<Item = KeyEvent>) {
        if !self.inner.is_running() {
            return;
        }
        let raw = {
            let mut input = self.inner.input.lock();
            let InputState { queue, keyboard } = &mut *input;
            for event in events {
                keyboard.submit(event, queue);
            }
            keyboard.is_raw()
        };
        if !raw {
            self.inner.check_event_queue();
        }
    }
}

impl Inner {
    fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// The token and runtime of the current run, if the viewer is running.
    fn current_run(&self) -> Option<(CancellationToken, Handle)> {
        let state = self.state.lock();
        if !state.running {
            return None;
        }
        Some((state.cancel.clone()?, state.runtime.clone()?))
    }

    fn report_error(&self, err: &ViewerError) {
        warn!(target: "porthole::viewer", error = %err, "console client error");
        self.hooks.on_client_error(err);
    }

    fn stop(&self) {
        let token = {
            let mut state = self.state.lock();
            if !state.running {
                return;
            }
            state.running = false;
            state.runtime = None;
            state.cancel.take()
        };
        if let Some(token) = token {
            token.cancel();
        }
        {
            let mut input = self.input.lock();
            input.queue.clear();
            input.keyboard.reset();
        }
        info!(target: "porthole::viewer", "viewer stopped");
    }

    fn check_event_queue(self: &Arc<Self>) {
        let Some((token, runtime)) = self.current_run() else {
            return;
        };
        let batch = {
            let mut state = self.state.lock();
            if state.sending_in_progress {
                return;
            }
            let mut input = self.input.lock();
            if input.queue.is_empty() {
                return;
            }
            state.sending_in_progress = true;
            input.queue.take_batch()
        };
        record_events("flush_events", batch.len());
        let inner = self.clone();
        runtime.spawn(async move { inner.flush(batch, token).await });
    }

    async fn flush(self: Arc<Self>, batch: Vec<QueuedEvent>, token: CancellationToken) {
        let payload = encode_event_bag(&batch);
        debug!(
            target: "porthole::viewer",
            events = batch.len(),
            payload = %payload,
            "flushing event bag"
        );
        self.status.notify(ViewerStatus::Sending);
        let result = self.transport.send_events(&payload).await;
        if token.is_cancelled() {
            // The request is over; a restarted viewer may flush again.
            self.state.lock().sending_in_progress = false;
            return;
        }
        match result {
            Ok(()) => {
                self.status.notify(ViewerStatus::Sent);
                {
                    let mut state = self.state.lock();
                    state.sending_in_progress = false;
                    state.send_backoff.reset();
                }
                self.check_update();
            }
            Err(err) => {
                self.report_error(&ViewerError::from(err));
                let delay = {
                    let delay = self.state.lock().send_backoff.next_delay();
                    self.input.lock().queue.requeue_front(batch);
                    delay
                };
                debug!(
                    target: "porthole::viewer",
                    delay_ms = delay.as_millis() as u64,
                    "flush failed; holding queue"
                );
                sleep_or_cancel(&token, delay).await;
                self.state.lock().sending_in_progress = false;
            }
        }
    }

    fn check_update(self: &Arc<Self>) {
        let Some((token, runtime)) = self.current_run() else {
            return;
        };
        let paint_result = {
            let mut canvas = self.canvas.lock();
            let state = self.state.lock();
            if !(canvas.is_dirty() && state.image_loaded && state.running) {
                return;
            }
            drop(state);
            canvas.update_tile()
        };
        match paint_result {
            Ok(painted) => trace!(target: "porthole::viewer", painted, "tiles painted"),
            Err(err) => self.report_error(&ViewerError::from(err)),
        }
        let inner = self.clone();
        runtime.spawn(async move { inner.poll(token).await });
    }

    async fn poll(self: Arc<Self>, token: CancellationToken) {
        self.status.notify(ViewerStatus::Receiving);
        let result = self.transport.poll_update().await;
        if token.is_cancelled() {
            return;
        }
        let outcome = match result {
            Ok(body) => classify_poll_response(&body).map_err(ViewerError::from),
            Err(err) => Err(err.into()),
        };
        let outcome = match outcome {
            Ok(PollOutcome::SessionEnded(document)) => {
                self.status.notify(ViewerStatus::Received);
                self.end_session(&document);
                return;
            }
            Ok(PollOutcome::Update(directive)) => {
                self.status.notify(ViewerStatus::Received);
                self.apply_directive(directive, &token).await
            }
            Err(err) => Err(err),
        };
        if token.is_cancelled() {
            return;
        }
        match outcome {
            Ok(()) => {
                self.state.lock().poll_backoff.reset();
                self.check_update();
            }
            Err(err) => self.recover_poll(err, &token).await,
        }
    }

    async fn recover_poll(self: &Arc<Self>, err: ViewerError, token: &CancellationToken) {
        self.report_error(&err);
        let delay = self.state.lock().poll_backoff.next_delay();
        debug!(
            target: "porthole::viewer",
            delay_ms = delay.as_millis() as u64,
            "update poll failed; re-arming after backoff"
        );
        if !sleep_or_cancel(token, delay).await {
            return;
        }
        self.canvas.lock().mark_dirty();
        self.check_update();
    }

    async fn apply_directive(
        &self,
        directive: UpdateDirective,
        token: &CancellationToken,
    ) -> Result<(), ViewerError> {
        match directive {
            UpdateDirective::Idle => {
                record_events("update_idle", 0);
                self.canvas.lock().mark_dirty();
                Ok(())
            }
            UpdateDirective::Refresh {
                image_url,
                tile_map,
                full_image,
            } => {
                record_events("update_refresh_tiles", tile_map.len());
                self.reload_image(&image_url, tile_map, full_image, token)
                    .await
            }
            UpdateDirective::Resize {
                width,
                height,
                tile_width,
                tile_height,
                image_url,
                tile_map,
                full_image,
            } => {
                record_events("update_resize_tiles", tile_map.len());
                self.canvas.lock().resize(CanvasGeometry {
                    width,
                    height,
                    tile_width,
                    tile_height,
                })?;
                info!(
                    target: "porthole::viewer",
                    width,
                    height,
                    tile_width,
                    tile_height,
                    "console resized"
                );
                self.hooks.on_canvas_size_change(width, height);
                self.reload_image(&image_url, tile_map, full_image, token)
                    .await
            }
        }
    }

    async fn reload_image(
        &self,
        image_url: &str,
        tile_map: Vec<crate::protocol::TilePos>,
        full_image: bool,
        token: &CancellationToken,
    ) -> Result<(), ViewerError> {
        let url = resolve_image_url(&self.config.update_url, image_url)?;
        self.state.lock().image_loaded = false;
        let fetched = self.transport.fetch_image(&url).await;
        if token.is_cancelled() {
            return Ok(());
        }
        let mut canvas = self.canvas.lock();
        let result = fetched
            .map_err(ViewerError::from)
            .and_then(|bytes| {
                canvas
                    .refresh(url.as_str(), &bytes, tile_map, full_image)
                    .map_err(ViewerError::from)
            });
        // A failed reload keeps painting from the previous sheet.
        self.state.lock().image_loaded = canvas.image().is_some();
        result
    }

    async fn load_initial_image(self: Arc<Self>, token: CancellationToken) {
        let url = match resolve_image_url(&self.config.update_url, &self.config.image_url) {
            Ok(url) => url,
            Err(err) => {
                self.report_error(&ViewerError::from(err));
                return;
            }
        };
        loop {
            let fetched = self.transport.fetch_image(&url).await;
            if token.is_cancelled() {
                return;
            }
            let result = fetched.map_err(ViewerError::from).and_then(|bytes| {
                let mut canvas = self.canvas.lock();
                canvas
                    .refresh(
                        url.as_str(),
                        &bytes,
                        self.config.tile_map.clone(),
                        self.config.full_image,
                    )
                    .map_err(ViewerError::from)
            });
            match result {
                Ok(()) => {
                    let mut state = self.state.lock();
                    state.image_loaded = true;
                    state.poll_backoff.reset();
                    debug!(target: "porthole::viewer", url = %url, "initial image loaded");
                    return;
                }
                Err(err) => {
                    self.report_error(&err);
                    let delay = self.state.lock().poll_backoff.next_delay();
                    if !sleep_or_cancel(&token, delay).await {
                        return;
                    }
                }
            }
        }
    }

    fn end_session(&self, document: &str) {
        info!(target: "porthole::viewer", "console session ended by host");
        self.stop();
        self.state.lock().session_ended = true;
        self.hooks.on_session_end(document);
    }
}

/// Sleeps for `delay`; returns `false` if `token` was cancelled first.
async fn sleep_or_cancel(token: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
