//! Pending input.
//!
//! Mouse and keyboard events wait here between flushes. Runs of mouse moves
//! collapse to the latest position when a batch is taken.

use crate::protocol::{KeyEvent, Modifiers, MouseButton, MouseEvent, MouseEventKind, QueuedEvent};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Two mouse-ups on the same point closer together than this form a double
/// click.
pub const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(300);

/// Input waiting for the next flush, in submission order.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<QueuedEvent>,
    last_click: Option<ClickRecord>,
}

#[derive(Clone, Copy, Debug)]
struct ClickRecord {
    x: i32,
    y: i32,
    button: MouseButton,
    at: Instant,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> impl Iterator<Item = &QueuedEvent> {
        self.events.iter()
    }

    pub fn send_mouse_event(&mut self, event: MouseEvent) {
        self.events.push_back(QueuedEvent::Mouse(event));
    }

    pub fn send_keyboard_event(&mut self, event: KeyEvent) {
        self.events.push_back(QueuedEvent::Key(event));
    }

    /// Queues a mouse-up and, when it completes a double click, the
    /// MOUSE_DBLCLK that follows it. Returns whether a double click was
    /// synthesized.
    pub fn send_mouse_up(
        &mut self,
        x: i32,
        y: i32,
        button: MouseButton,
        modifiers: Modifiers,
        at: Instant,
    ) -> bool {
        let up = MouseEvent {
            kind: MouseEventKind::Up,
            x,
            y,
            button,
            modifiers,
        };
        self.send_mouse_event(up);

        let is_double = self.last_click.is_some_and(|prev| {
            prev.x == x
                && prev.y == y
                && prev.button == button
                && at.saturating_duration_since(prev.at) < DOUBLE_CLICK_WINDOW
        });
        if is_double {
            self.send_mouse_event(MouseEvent {
                kind: MouseEventKind::DoubleClick,
                ..up
            });
            // A third click starts a new pair.
            self.last_click = None;
        } else {
            self.last_click = Some(ClickRecord { x, y, button, at });
        }
        is_double
    }

    /// The most recently queued event if it is a keyboard event.
    pub fn last_key_mut(&mut self) -> Option<&mut KeyEvent> {
        self.events.back_mut().and_then(QueuedEvent::as_key_mut)
    }

    /// Collapses every run of consecutive MOUSE_MOVE entries into its latest
    /// entry. All other events keep their relative order.
    pub fn aggregate_events(&mut self) {
        let mut merged: VecDeque<QueuedEvent> = VecDeque::with_capacity(self.events.len());
        for event in self.events.drain(..) {
            if event.is_mouse_move() && merged.back().is_some_and(QueuedEvent::is_mouse_move) {
                merged.pop_back();
            }
            merged.push_back(event);
        }
        self.events = merged;
    }

    /// Aggregates and drains the queue into a batch ready to be encoded.
    pub fn take_batch(&mut self) -> Vec<QueuedEvent> {
        self.aggregate_events();
        self.events.drain(..).collect()
    }

    /// Puts a batch that failed to send back in front of anything queued
    /// since.
    pub fn requeue_front(&mut self, batch: Vec<QueuedEvent>) {
        for event in batch.into_iter().rev() {
            self.events.push_front(event);
        }
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.last_click = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::KeyEventKind;

    fn mouse(kind: MouseEventKind, x: i32, y: i32) -> MouseEvent {
        MouseEvent {
            kind,
            x,
            y,
            button: MouseButton::Left,
            modifiers: Modifiers::NONE,
        }
    }

    #[test]
    fn consecutive_moves_collapse_to_latest_position() {
        let mut queue = EventQueue::new();
        queue.send_mouse_event(mouse(MouseEventKind::Move, 1, 1));
        queue.send_mouse_event(mouse(MouseEventKind::Move, 2, 2));
        queue.send_mouse_event(mouse(MouseEventKind::Move, 3, 3));
        queue.send_keyboard_event(KeyEvent::down(65, Modifiers::NONE));
        queue.send_mouse_event(mouse(MouseEventKind::Move, 4, 4));
        queue.send_mouse_event(mouse(MouseEventKind::Down, 4, 4));
        queue.send_mouse_event(mouse(MouseEventKind::Move, 5, 5));
        queue.send_mouse_event(mouse(MouseEventKind::Move, 6, 6));

        let batch = queue.take_batch();
        assert_eq!(
            batch,
            vec![
                QueuedEvent::Mouse(mouse(MouseEventKind::Move, 3, 3)),
                QueuedEvent::Key(KeyEvent::down(65, Modifiers::NONE)),
                QueuedEvent::Mouse(mouse(MouseEventKind::Move, 4, 4)),
                QueuedEvent::Mouse(mouse(MouseEventKind::Down, 4, 4)),
                QueuedEvent::Mouse(mouse(MouseEventKind::Move, 6, 6)),
            ]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn quick_second_click_adds_double_click() {
        let mut queue = EventQueue::new();
        let start = Instant::now();
        assert!(!queue.send_mouse_up(5, 5, MouseButton::Left, Modifiers::NONE, start));
        assert!(queue.send_mouse_up(
            5,
            5,
            MouseButton::Left,
            Modifiers::NONE,
            start + Duration::from_millis(120)
        ));
        let kinds: Vec<_> = queue
            .events()
            .map(|event| match event {
                QueuedEvent::Mouse(mouse) => mouse.kind,
                QueuedEvent::Key(_) => panic!("unexpected key event"),
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                MouseEventKind::Up,
                MouseEventKind::Up,
                MouseEventKind::DoubleClick
            ]
        );
    }

    #[test]
    fn slow_or_moved_clicks_do_not_double() {
        let mut queue = EventQueue::new();
        let start = Instant::now();
        queue.send_mouse_up(5, 5, MouseButton::Left, Modifiers::NONE, start);
        assert!(!queue.send_mouse_up(
            5,
            5,
            MouseButton::Left,
            Modifiers::NONE,
            start + DOUBLE_CLICK_WINDOW
        ));
        assert!(!queue.send_mouse_up(
            6,
            5,
            MouseButton::Left,
            Modifiers::NONE,
            start + DOUBLE_CLICK_WINDOW + Duration::from_millis(10)
        ));
        assert!(!queue.send_mouse_up(
            6,
            5,
            MouseButton::Right,
            Modifiers::NONE,
            start + DOUBLE_CLICK_WINDOW + Duration::from_millis(20)
        ));
        assert_eq!(queue.len(), 4);
    }

    #[test]
    fn third_click_starts_a_new_pair() {
        let mut queue = EventQueue::new();
        let start = Instant::now();
        let at = |ms| start + Duration::from_millis(ms);
        queue.send_mouse_up(1, 1, MouseButton::Left, Modifiers::NONE, at(0));
        assert!(queue.send_mouse_up(1, 1, MouseButton::Left, Modifiers::NONE, at(100)));
        assert!(!queue.send_mouse_up(1, 1, MouseButton::Left, Modifiers::NONE, at(200)));
        assert!(queue.send_mouse_up(1, 1, MouseButton::Left, Modifiers::NONE, at(250)));
    }

    #[test]
    fn requeued_batch_goes_before_newer_events() {
        let mut queue = EventQueue::new();
        queue.send_keyboard_event(KeyEvent::down(1, Modifiers::NONE));
        let batch = queue.take_batch();
        queue.send_keyboard_event(KeyEvent::down(2, Modifiers::NONE));
        queue.requeue_front(batch);
        let codes: Vec<_> = queue
            .events()
            .filter_map(QueuedEvent::as_key)
            .map(|key| (key.kind, key.code))
            .collect();
        assert_eq!(codes, vec![(KeyEventKind::Down, 1), (KeyEventKind::Down, 2)]);
    }
}
