// SPDX-License-Identifier: GPL-3.0-only

//! Suppression of repeated detections
//!
//! A code held in front of the camera is decoded on every frame. Only the
//! first decode is published. The payloads seen on the last frame that showed
//! any code form the "in view" set; a payload in that set stays suppressed
//! until it leaves the view or the detection is reset. Frames without codes
//! leave the set untouched, so a code that briefly drops out is not reported
//! again.

/// Remembers the payloads currently in view
#[derive(Debug, Default)]
pub struct Deduplicator {
    in_view: Vec<Vec<u8>>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `payload` was in view on the last frame with codes
    pub fn is_repeat(&self, payload: &[u8]) -> bool {
        self.in_view.iter().any(|seen| seen == payload)
    }

    /// Replace the in-view set with the payloads of the current frame
    ///
    /// An empty frame keeps the previous set.
    pub fn update_view(&mut self, payloads: Vec<Vec<u8>>) {
        if !payloads.is_empty() {
            self.in_view = payloads;
        }
    }

    /// Forget everything so the next decode publishes again
    pub fn reset(&mut self) {
        self.in_view.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feed frames in order and count how many payloads would publish
    fn publishes(dedup: &mut Deduplicator, frames: &[&[&[u8]]]) -> usize {
        let mut count = 0;
        for frame in frames {
            let mut published: Vec<&[u8]> = Vec::new();
            for payload in frame.iter() {
                if !dedup.is_repeat(payload) && !published.contains(payload) {
                    published.push(*payload);
                    count += 1;
                }
            }
            dedup.update_view(frame.iter().map(|p| p.to_vec()).collect());
        }
        count
    }

    #[test]
    fn test_identical_payloads_publish_once() {
        let mut dedup = Deduplicator::new();
        assert_eq!(publishes(&mut dedup, &[&[b"A"], &[b"A"]]), 1);
    }

    #[test]
    fn test_new_payload_publishes() {
        let mut dedup = Deduplicator::new();
        assert_eq!(publishes(&mut dedup, &[&[b"A"], &[b"A"], &[b"B"]]), 2);
        // Going back to A is a change too
        assert_eq!(publishes(&mut dedup, &[&[b"A"]]), 1);
    }

    #[test]
    fn test_reset_allows_republish() {
        let mut dedup = Deduplicator::new();
        assert_eq!(publishes(&mut dedup, &[&[b"A"]]), 1);
        dedup.reset();
        assert_eq!(publishes(&mut dedup, &[&[b"A"]]), 1);
    }

    #[test]
    fn test_two_codes_in_view_publish_once_each() {
        let mut dedup = Deduplicator::new();
        let both: &[&[u8]] = &[b"A", b"B"];
        assert_eq!(publishes(&mut dedup, &[both; 50]), 2);
    }

    #[test]
    fn test_empty_frames_keep_view() {
        let mut dedup = Deduplicator::new();
        assert_eq!(publishes(&mut dedup, &[&[b"A"], &[], &[], &[b"A"]]), 1);
    }

    #[test]
    fn test_code_leaving_view_publishes_on_return() {
        let mut dedup = Deduplicator::new();
        let frames: &[&[&[u8]]] = &[&[b"A", b"B"], &[b"A"], &[b"A", b"B"]];
        assert_eq!(publishes(&mut dedup, frames), 3);
    }

    #[test]
    fn test_same_code_twice_in_one_frame_publishes_once() {
        let mut dedup = Deduplicator::new();
        assert_eq!(publishes(&mut dedup, &[&[b"A", b"A"]]), 1);
    }
}
