//! Codec negotiation
//!
//! Resolves the recording encoding once per session by probing an ordered
//! candidate list against the recorder's support table. First supported
//! candidate wins.

use super::state::{CodecCandidate, CodecChoice, Diagnostic};

/// Support probe for a MIME/codec string. Implemented by the recorder
/// factory; kept separate so negotiation is testable without a recorder.
pub trait SupportsMime {
    fn supports_mime(&self, mime_type: &str) -> bool;
}

impl<F: Fn(&str) -> bool> SupportsMime for F {
    fn supports_mime(&self, mime_type: &str) -> bool {
        self(mime_type)
    }
}

/// Pick the first supported candidate from `preferences`.
///
/// Never fails: when no candidate probes as supported, the last entry (the
/// generic container) is assumed acceptable. That assumption holds for the
/// recording facilities we target, which accept a container with no codec
/// hint; it is not a universal guarantee.
///
/// Returns a `CodecFallback` diagnostic whenever the choice is not the
/// first preference.
pub fn negotiate(
    probe: &dyn SupportsMime,
    preferences: &[CodecCandidate],
) -> (CodecChoice, Option<Diagnostic>) {
    if preferences.is_empty() {
        // Misconfigured host; fall through to the generic container.
        let choice = CodecChoice {
            mime_type: "video/webm".to_string(),
            label: "webm".to_string(),
        };
        tracing::warn!("empty codec preference list, assuming generic container");
        let diagnostic = Diagnostic::CodecFallback {
            chosen: choice.mime_type.clone(),
        };
        return (choice, Some(diagnostic));
    }

    let position = preferences
        .iter()
        .position(|candidate| probe.supports_mime(&candidate.mime_type))
        .unwrap_or(preferences.len() - 1);

    let choice = CodecChoice::from(&preferences[position]);

    if position == 0 {
        tracing::debug!(codec = %choice.label, "codec negotiated");
        (choice, None)
    } else {
        tracing::debug!(codec = %choice.label, skipped = position, "codec fallback");
        let diagnostic = Diagnostic::CodecFallback {
            chosen: choice.mime_type.clone(),
        };
        (choice, Some(diagnostic))
    }
}
