//! Append-only message log
//!
//! The log is the ordered record of every frame a session exchanged.
//! Insertion order is display order. Frames are shared as `Arc<Frame>` and
//! never change after they are appended; the only way to remove them is
//! [`MessageLog::clear`], which drops everything at once.

use std::sync::Arc;
use tracing::trace;

use crate::types::{Direction, Frame, FrameDraft, FrameId, FrameKind};

/// Ordered, append-only frame record
#[derive(Debug, Default)]
pub struct MessageLog {
    frames: Vec<Arc<Frame>>,

    /// Next identifier; survives `clear` so ids are never reused
    next_id: u64,

    /// Latest timestamp handed out, keeps capture times non-decreasing
    last_ms: i64,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame, assigning its id and (if absent) its capture time
    ///
    /// Capture times never go backwards: a draft stamped earlier than the
    /// previous frame takes the previous frame's time.
    pub fn append(&mut self, draft: FrameDraft, now_ms: i64) -> Arc<Frame> {
        let created_at_ms = draft.created_at_ms.unwrap_or(now_ms).max(self.last_ms);
        self.last_ms = created_at_ms;

        let id = FrameId(self.next_id);
        self.next_id += 1;

        let frame = Arc::new(Frame {
            id,
            kind: draft.kind,
            payload: draft.payload,
            direction: draft.direction,
            created_at_ms,
        });
        trace!(id = %frame.id, kind = %frame.kind, "frame appended");

        self.frames.push(Arc::clone(&frame));
        frame
    }

    /// All frames in insertion order
    pub fn frames(&self) -> &[Arc<Frame>] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Derived view of the frames matching `predicate`
    pub fn filter<P>(&self, mut predicate: P) -> Vec<Arc<Frame>>
    where
        P: FnMut(&Frame) -> bool,
    {
        self.frames.iter().filter(|frame| predicate(frame)).cloned().collect()
    }

    /// Derived view of the frames matching `query`
    pub fn search(&self, query: &LogQuery) -> Vec<Arc<Frame>> {
        self.filter(|frame| query.matches(frame))
    }

    /// Drop every frame; returns how many were removed
    pub fn clear(&mut self) -> usize {
        let removed = self.frames.len();
        self.frames.clear();
        removed
    }
}

/// Filter over frame content and classification
///
/// Text matching is case-insensitive and hits either the payload or the
/// kind label, so searching `ping` finds heartbeat frames.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogQuery {
    text: Option<String>,
    kinds: Vec<FrameKind>,
    direction: Option<Direction>,
}

impl LogQuery {
    /// Query that matches everything
    pub fn all() -> Self {
        Self::default()
    }

    /// Case-insensitive text match on payload or kind label
    pub fn text(text: impl AsRef<str>) -> Self {
        Self::default().with_text(text)
    }

    pub fn with_text(mut self, text: impl AsRef<str>) -> Self {
        let text = text.as_ref();
        self.text = if text.is_empty() { None } else { Some(text.to_lowercase()) };
        self
    }

    /// Restrict to these kinds (empty = any kind)
    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = FrameKind>) -> Self {
        self.kinds = kinds.into_iter().collect();
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn matches(&self, frame: &Frame) -> bool {
        if !self.kinds.is_empty() && !self.kinds.contains(&frame.kind) {
            return false;
        }
        if self.direction.is_some_and(|direction| direction != frame.direction) {
            return false;
        }
        match &self.text {
            None => true,
            Some(needle) => {
                frame.payload.to_lowercase().contains(needle)
                    || frame.kind.label().to_lowercase().contains(needle)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_log() -> MessageLog {
        let mut log = MessageLog::new();
        log.append(FrameDraft::outbound(FrameKind::System, "Attempting connection"), 10);
        log.append(FrameDraft::inbound(FrameKind::Json, r#"{"type":"MESSAGE"}"#), 11);
        log.append(FrameDraft::outbound(FrameKind::HeartbeatPing, r#"{"type":"PING"}"#), 12);
        log.append(FrameDraft::inbound(FrameKind::HeartbeatPong, "ack"), 13);
        log
    }

    #[test]
    fn ids_are_unique_and_survive_clear() {
        let mut log = sample_log();
        let before: Vec<_> = log.frames().iter().map(|f| f.id).collect();
        log.clear();
        let next = log.append(FrameDraft::inbound(FrameKind::Text, "after"), 20);
        assert!(before.iter().all(|id| *id < next.id));
    }

    #[test]
    fn explicit_capture_time_is_kept() {
        let mut log = MessageLog::new();
        let frame = log.append(FrameDraft::inbound(FrameKind::Text, "x").captured_at(42), 99);
        assert_eq!(frame.created_at_ms, 42);
    }

    #[test]
    fn timestamps_never_go_backwards() {
        let mut log = MessageLog::new();
        log.append(FrameDraft::inbound(FrameKind::Text, "a"), 500);
        let late = log.append(FrameDraft::inbound(FrameKind::Text, "b"), 400);
        assert_eq!(late.created_at_ms, 500);
    }

    #[test]
    fn search_matches_payload_and_kind_label() {
        let log = sample_log();
        let pings = log.search(&LogQuery::text("PiNg"));
        assert_eq!(pings.len(), 1);
        assert_eq!(pings[0].kind, FrameKind::HeartbeatPing);

        let pongs = log.search(&LogQuery::text("pong"));
        assert_eq!(pongs.len(), 1);
        assert_eq!(pongs[0].payload, "ack");

        assert_eq!(log.search(&LogQuery::all()).len(), log.len());
        assert_eq!(log.search(&LogQuery::text("")).len(), log.len());
    }

    #[test]
    fn search_combines_kind_and_direction() {
        let log = sample_log();
        let inbound_json = log.search(
            &LogQuery::all().with_kinds([FrameKind::Json]).with_direction(Direction::Inbound),
        );
        assert_eq!(inbound_json.len(), 1);

        let outbound_json = log.search(
            &LogQuery::all().with_kinds([FrameKind::Json]).with_direction(Direction::Outbound),
        );
        assert!(outbound_json.is_empty());
    }

    #[test]
    fn filtering_does_not_mutate_the_log() {
        let log = sample_log();
        let _ = log.filter(|frame| frame.kind == FrameKind::Json);
        assert_eq!(log.len(), 4);
    }

    #[test]
    fn clearing_twice_equals_clearing_once() {
        let mut log = sample_log();
        assert_eq!(log.clear(), 4);
        assert_eq!(log.clear(), 0);
        assert!(log.is_empty());
    }

    proptest! {
        #[test]
        fn appends_keep_order_and_monotonic_time(
            stamps in prop::collection::vec(0i64..10_000, 1..50)
        ) {
            let mut log = MessageLog::new();
            for (i, now) in stamps.iter().enumerate() {
                log.append(FrameDraft::outbound(FrameKind::Text, i.to_string()), *now);
            }

            let frames = log.frames();
            prop_assert_eq!(frames.len(), stamps.len());
            for (i, pair) in frames.windows(2).enumerate() {
                prop_assert!(pair[0].id < pair[1].id);
                prop_assert!(pair[0].created_at_ms <= pair[1].created_at_ms);
                prop_assert_eq!(&pair[0].payload, &i.to_string());
            }
        }
    }
}
