//! Speaker attribution timeline
//!
//! Ordered, non-overlapping speaker segments keyed to elapsed recording
//! time. The timeline is clock-free: callers compute offsets against the
//! recording's actual start instant and the timeline enforces ordering.

use serde::{Deserialize, Serialize};

/// One contiguous interval of the recording attributed to a speaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerSegment {
    pub speaker_id: String,

    /// Seconds since the recording actually started.
    pub start_offset_seconds: f64,

    /// None while the segment is open; set exactly once on close.
    pub end_offset_seconds: Option<f64>,
}

impl SpeakerSegment {
    pub fn is_open(&self) -> bool {
        self.end_offset_seconds.is_none()
    }

    pub fn duration_seconds(&self) -> Option<f64> {
        self.end_offset_seconds
            .map(|end| end - self.start_offset_seconds)
    }
}

/// Maintains the speaker segment list for one recording session.
///
/// Invariants, enforced at insertion:
/// - segments are in non-decreasing start order;
/// - at most one segment is open at any time;
/// - a closed segment never overlaps its successor (gaps are allowed only
///   before the first `set_speaker`).
#[derive(Debug, Default)]
pub struct SpeakerTimeline {
    segments: Vec<SpeakerSegment>,
}

impl SpeakerTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Designate `speaker_id` as the current speaker at `offset_seconds`.
    ///
    /// Negative offsets clamp to zero; offsets earlier than the open
    /// segment's start clamp forward so ordering holds regardless of caller
    /// clock jitter. Re-designating the current speaker is a no-op. When
    /// two calls carry the same offset, the later call wins: the earlier
    /// segment closes at zero width.
    pub fn set_speaker(&mut self, speaker_id: impl Into<String>, offset_seconds: f64) {
        let speaker_id = speaker_id.into();
        let offset = self.clamp_offset(offset_seconds);

        if let Some(open) = self.open_segment() {
            if open.speaker_id == speaker_id {
                return;
            }
        }

        self.close_open_segment(offset);

        tracing::debug!(speaker = %speaker_id, offset, "speaker changed");
        self.segments.push(SpeakerSegment {
            speaker_id,
            start_offset_seconds: offset,
            end_offset_seconds: None,
        });
    }

    /// Close the open segment, if any, at `offset_seconds`. Called by the
    /// controller on every terminal transition so no segment outlives the
    /// recording unclosed.
    pub fn close_open_segment(&mut self, offset_seconds: f64) {
        let offset = self.clamp_offset(offset_seconds);
        if let Some(open) = self.segments.iter_mut().find(|s| s.is_open()) {
            open.end_offset_seconds = Some(offset.max(open.start_offset_seconds));
        }
    }

    /// The segment list in start order.
    pub fn segments(&self) -> &[SpeakerSegment] {
        &self.segments
    }

    /// Speaker of the open segment, if one exists.
    pub fn current_speaker(&self) -> Option<&str> {
        self.open_segment().map(|s| s.speaker_id.as_str())
    }

    /// Discard all segments. A new recording session must start from an
    /// empty timeline.
    pub fn reset(&mut self) {
        self.segments.clear();
    }

    fn open_segment(&self) -> Option<&SpeakerSegment> {
        self.segments.iter().find(|s| s.is_open())
    }

    /// Clamp to >= 0 and to the monotone frontier of already-stored
    /// segments, so ordering is guaranteed by the clamp rather than by
    /// event arrival order.
    fn clamp_offset(&self, offset_seconds: f64) -> f64 {
        let floor = self
            .segments
            .last()
            .map(|s| s.end_offset_seconds.unwrap_or(s.start_offset_seconds))
            .unwrap_or(0.0);
        offset_seconds.max(0.0).max(floor)
    }
}
