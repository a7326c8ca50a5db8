use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use porthole_core::client::{
    ConsoleViewer, HostHooks, RecordingSurface, SurfaceCall, ViewerStatus,
};
use porthole_core::config::ViewerConfig;
use porthole_core::protocol::{Modifiers, MouseButton, TilePos};
use porthole_core::transport::{MockHost, MockTransport};
use tokio::time::Instant;
use url::Url;

const UPDATE_URL: &str = "http://console.local/console/ajax?token=abc";
const MOUSE_DOWN: &str = "1|1|2|10|20|0|0|";

#[derive(Default)]
struct RecordingHooks {
    errors: Mutex<Vec<String>>,
    sizes: Mutex<Vec<(u32, u32)>>,
    session_end: Mutex<Option<String>>,
}

impl HostHooks for RecordingHooks {
    fn on_client_error(&self, error: &(dyn std::error::Error + Send + Sync)) {
        self.errors.lock().push(error.to_string());
    }

    fn on_canvas_size_change(&self, width: u32, height: u32) {
        self.sizes.lock().push((width, height));
    }

    fn on_session_end(&self, document: &str) {
        *self.session_end.lock() = Some(document.to_string());
    }
}

struct Harness {
    viewer: ConsoleViewer,
    host: MockHost,
    surface: RecordingSurface,
    hooks: Arc<RecordingHooks>,
}

fn harness() -> Harness {
    harness_with(|_| {})
}

fn harness_with(configure: impl FnOnce(&mut ViewerConfig)) -> Harness {
    let mut config = ViewerConfig::new(Url::parse(UPDATE_URL).unwrap(), "image", 128, 64);
    config.tile_map = vec![TilePos::new(0, 0), TilePos::new(0, 1)];
    configure(&mut config);
    let (transport, host) = MockTransport::pair();
    let surface = RecordingSurface::new();
    let hooks = Arc::new(RecordingHooks::default());
    let viewer = ConsoleViewer::new(
        config,
        Arc::new(transport),
        Box::new(surface.clone()),
        hooks.clone(),
    )
    .expect("viewer");
    Harness {
        viewer,
        host,
        surface,
        hooks,
    }
}

async fn wait_until(what: &str, mut done: impl FnMut() -> bool) {
    for _ in 0..500 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

/// Starts the viewer and waits for the first poll to be parked on the host.
async fn started() -> Harness {
    start(harness()).await
}

async fn start(h: Harness) -> Harness {
    h.viewer.start().expect("start");
    let host = h.host.clone();
    wait_until("first poll", || host.poll_count() >= 1).await;
    h
}

#[tokio::test(start_paused = true)]
async fn loads_initial_image_then_polls() {
    let h = started().await;

    assert!(h.viewer.state().image_loaded);
    assert_eq!(
        h.host
            .image_requests()
            .iter()
            .map(Url::as_str)
            .collect::<Vec<_>>(),
        vec!["http://console.local/console/image"]
    );
    let swaps = h
        .surface
        .calls()
        .into_iter()
        .filter(|call| matches!(call, SurfaceCall::SwapBuffer { .. }))
        .count();
    assert_eq!(swaps, 2);

    // An idle answer re-arms the chain without repainting anything new.
    h.host.push_update(r#"{"type":"idle"}"#);
    let host = h.host.clone();
    wait_until("second poll", || host.poll_count() >= 2).await;
    assert!(h.hooks.errors.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn heartbeat_flushes_queued_mouse_events() {
    let h = started().await;

    h.viewer.mouse_down(10, 20, MouseButton::Left, Modifiers::NONE);
    assert_eq!(h.viewer.queued_events().len(), 1);

    let host = h.host.clone();
    wait_until("flush", || !host.sent().is_empty()).await;
    assert_eq!(h.host.sent(), vec![MOUSE_DOWN.to_string()]);
    assert!(h.viewer.queued_events().is_empty());
    assert!(!h.viewer.state().sending_in_progress);
}

#[tokio::test(start_paused = true)]
async fn only_one_flush_in_flight() {
    let h = started().await;
    let gate = h.host.hold_sends().await;

    h.viewer.mouse_down(10, 20, MouseButton::Left, Modifiers::NONE);
    let host = h.host.clone();
    wait_until("first send attempt", || host.send_attempts() == 1).await;

    h.viewer.mouse_up(10, 20, MouseButton::Left, Modifiers::NONE);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(h.host.send_attempts(), 1);
    assert!(h.viewer.state().sending_in_progress);
    assert_eq!(h.viewer.queued_events().len(), 1);

    drop(gate);
    wait_until("second flush", || host.sent().len() == 2).await;
    assert_eq!(
        h.host.sent(),
        vec![MOUSE_DOWN.to_string(), "1|1|3|10|20|0|0|".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn failed_flush_requeues_ahead_of_new_input() {
    let h = started().await;
    h.host.fail_next_send("connection reset");

    h.viewer.mouse_down(10, 20, MouseButton::Left, Modifiers::NONE);
    let hooks = h.hooks.clone();
    wait_until("flush failure", || !hooks.errors.lock().is_empty()).await;
    assert_eq!(*h.hooks.errors.lock(), vec!["connection reset".to_string()]);
    assert!(h.viewer.state().sending_in_progress);

    // Queued during the backoff; goes out after the failed batch.
    h.viewer.mouse_up(10, 20, MouseButton::Left, Modifiers::NONE);

    let host = h.host.clone();
    wait_until("retry", || !host.sent().is_empty()).await;
    assert_eq!(
        h.host.sent(),
        vec![format!("2|{}1|3|10|20|0|0|", &MOUSE_DOWN[2..])]
    );
    assert_eq!(h.host.send_attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn html_response_ends_the_session() {
    let h = started().await;
    let document = "<html><body>Console session expired</body></html>";

    h.host.push_update(document);
    let viewer = h.viewer.clone();
    wait_until("session end", || viewer.state().session_ended).await;

    let state = h.viewer.state();
    assert!(!state.running);
    assert_eq!(h.hooks.session_end.lock().as_deref(), Some(document));

    // Input after the session ended is dropped.
    h.viewer.mouse_down(1, 1, MouseButton::Left, Modifiers::NONE);
    h.viewer.key_press('a' as u32, Modifiers::NONE);
    assert!(h.viewer.queued_events().is_empty());
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(h.host.sent().is_empty());
    assert_eq!(h.host.poll_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn refresh_reloads_sheet_and_paints_tiles() {
    let h = started().await;
    h.surface.clear();

    h.host
        .push_update(r#"{"type":"refresh","image_url":"image?t=2","tile_map":[[0,1]]}"#);
    let host = h.host.clone();
    wait_until("refresh poll", || host.poll_count() >= 2).await;

    assert_eq!(
        h.host.image_requests().last().map(Url::as_str),
        Some("http://console.local/console/image?t=2")
    );
    let calls = h.surface.calls();
    assert!(matches!(
        &calls[0],
        SurfaceCall::LoadImage { url, generation: 2, .. }
            if url == "http://console.local/console/image?t=2"
    ));
    assert!(calls.iter().any(|call| matches!(
        call,
        SurfaceCall::SwapBuffer { row: 0, col: 1, .. }
    )));
    let state = h.viewer.state();
    assert!(state.image_loaded);
    assert!(!state.dirty);
}

#[tokio::test(start_paused = true)]
async fn resize_rebuilds_grid_and_notifies_host() {
    let h = started().await;
    h.surface.clear();

    h.host.push_update(
        r#"{"type":"resize","width":256,"height":128,"tile_width":64,"tile_height":64,
            "image_url":"image?t=3","tile_map":[[1,3]]}"#,
    );
    let host = h.host.clone();
    wait_until("resize poll", || host.poll_count() >= 2).await;

    assert_eq!(*h.hooks.sizes.lock(), vec![(256, 128)]);
    assert_eq!(
        h.surface.calls().first(),
        Some(&SurfaceCall::CreateGrid {
            width: 256,
            height: 128,
            cells: 8,
        })
    );
    h.viewer.with_canvas(|canvas| {
        assert_eq!((canvas.cols(), canvas.rows()), (4, 2));
        assert!(canvas.tile(1, 3).and_then(|tile| tile.background.as_ref()).is_some());
    });
}

#[tokio::test(start_paused = true)]
async fn poll_errors_back_off_and_rearm() {
    let h = started().await;

    h.host.push_poll_error("gateway timeout");
    let hooks = h.hooks.clone();
    wait_until("poll error", || !hooks.errors.lock().is_empty()).await;
    assert_eq!(h.host.poll_count(), 1);

    let host = h.host.clone();
    wait_until("re-armed poll", || host.poll_count() >= 2).await;

    // Garbage is reported the same way and the chain survives it.
    h.host.push_update("{not json");
    wait_until("malformed update", || hooks.errors.lock().len() == 2).await;
    wait_until("third poll", || host.poll_count() >= 3).await;
    assert!(h.viewer.state().running);
}

#[tokio::test(start_paused = true)]
async fn status_callback_sees_each_phase_in_order() {
    let h = started().await;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    h.viewer
        .status()
        .set_callback(move |status| sink.lock().push(status));

    h.viewer.mouse_down(10, 20, MouseButton::Left, Modifiers::NONE);
    let host = h.host.clone();
    wait_until("flush", || !host.sent().is_empty()).await;
    h.host.push_update(r#"{"type":"idle"}"#);
    wait_until("second poll", || host.poll_count() >= 2).await;

    assert_eq!(
        *seen.lock(),
        vec![
            ViewerStatus::Sending,
            ViewerStatus::Sent,
            ViewerStatus::Received,
            ViewerStatus::Receiving,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn stop_discards_in_flight_results() {
    let h = started().await;
    let gate = h.host.hold_sends().await;

    h.viewer.mouse_down(10, 20, MouseButton::Left, Modifiers::NONE);
    let host = h.host.clone();
    wait_until("send attempt", || host.send_attempts() == 1).await;

    h.viewer.stop();
    drop(gate);
    tokio::time::sleep(Duration::from_millis(500)).await;

    let state = h.viewer.state();
    assert!(!state.running);
    assert!(!state.sending_in_progress);
    assert!(!state.session_ended);
    assert_eq!(h.host.send_attempts(), 1);
    assert!(h.viewer.queued_events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn reposition_moves_the_grid() {
    let h = started().await;
    h.surface.clear();

    h.viewer.reposition((12, -4));
    h.viewer.reposition((12, -4));
    assert_eq!(h.surface.calls(), vec![SurfaceCall::Reposition { dx: 12, dy: -4 }]);
    h.viewer.with_canvas(|canvas| {
        assert_eq!(canvas.origin(), (12, -4));
        let tile = canvas.tile(0, 1).expect("tile");
        assert_eq!((tile.geometry.left, tile.geometry.top), (76, -4));
    });
}

#[test]
fn start_outside_a_runtime_fails() {
    let h = harness();
    assert!(h.viewer.start().is_err());
    assert!(!h.viewer.state().running);
}

#[tokio::test(start_paused = true)]
async fn oversized_resize_is_reported_and_polling_continues() {
    let h = started().await;
    h.surface.clear();

    h.host.push_update(
        r#"{"type":"resize","width":65536,"height":65537,"tile_width":1,"tile_height":1,
            "image_url":"image?t=4","tile_map":[[0,0]]}"#,
    );
    let hooks = h.hooks.clone();
    wait_until("resize error", || !hooks.errors.lock().is_empty()).await;
    assert!(h.hooks.errors.lock()[0].contains("invalid canvas geometry"));
    assert!(h.hooks.sizes.lock().is_empty());

    let host = h.host.clone();
    wait_until("re-armed poll", || host.poll_count() >= 2).await;
    assert!(h.viewer.state().running);
    h.viewer.with_canvas(|canvas| {
        assert_eq!((canvas.cols(), canvas.rows()), (2, 1));
    });
    assert!(
        !h.surface
            .calls()
            .iter()
            .any(|call| matches!(call, SurfaceCall::CreateGrid { .. }))
    );
}

#[tokio::test(start_paused = true)]
async fn restart_waits_for_flush_from_previous_run() {
    let h = started().await;
    let gate = h.host.hold_sends().await;

    h.viewer.mouse_down(10, 20, MouseButton::Left, Modifiers::NONE);
    let host = h.host.clone();
    wait_until("first send attempt", || host.send_attempts() == 1).await;

    h.viewer.stop();
    h.viewer.start().expect("restart");
    h.viewer.mouse_down(10, 20, MouseButton::Left, Modifiers::NONE);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(h.host.send_attempts(), 1);
    assert!(h.viewer.state().sending_in_progress);
    assert_eq!(h.viewer.queued_events().len(), 1);

    drop(gate);
    wait_until("second flush", || host.sent().len() == 2).await;
    assert_eq!(h.host.send_attempts(), 2);
    assert_eq!(
        h.host.sent(),
        vec![MOUSE_DOWN.to_string(), MOUSE_DOWN.to_string()]
    );
}

/// Lets spawned tasks run without moving the paused clock.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn cooked_key_press_flushes_immediately() {
    let h = started().await;
    let before = Instant::now();

    h.viewer.key_press('a' as u32, Modifiers::NONE);
    settle().await;

    assert_eq!(Instant::now(), before);
    assert_eq!(h.host.sent(), vec!["2|2|5|65|0|2|4|97|0|".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn raw_key_press_waits_for_heartbeat() {
    let h = start(harness_with(|config| config.raw_keyboard = true)).await;
    let before = Instant::now();

    h.viewer.key_press('a' as u32, Modifiers::NONE);
    settle().await;
    assert!(h.host.sent().is_empty());
    assert_eq!(h.viewer.queued_events().len(), 2);

    let host = h.host.clone();
    wait_until("heartbeat flush", || !host.sent().is_empty()).await;
    assert!(Instant::now() > before);
    assert_eq!(h.host.sent(), vec!["2|2|5|65|0|2|4|97|0|".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn type_text_posts_shift_press_and_enter() {
    let h = started().await;

    h.viewer.type_text("A\n");
    settle().await;

    // SHIFT+A down, the press, then Enter translated to XK_Return.
    assert_eq!(
        h.host.sent(),
        vec!["4|2|5|65|64|2|4|65|0|2|5|65293|0|2|6|65293|0|".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn zero_code_key_down_is_repaired_before_posting() {
    let h = started().await;
    let gate = h.host.hold_sends().await;

    h.viewer.mouse_down(10, 20, MouseButton::Left, Modifiers::NONE);
    let host = h.host.clone();
    wait_until("first send attempt", || host.send_attempts() == 1).await;

    // Queued behind the held flush, so the press can repair the down.
    h.viewer.key_down(0, Modifiers::SHIFT);
    h.viewer.key_press('_' as u32, Modifiers::SHIFT);

    drop(gate);
    wait_until("key flush", || host.sent().len() == 2).await;
    assert_eq!(h.host.sent()[1], "2|2|5|109|64|2|4|95|64|");
}
