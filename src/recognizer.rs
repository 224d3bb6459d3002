//! Video-mode adapter over an inference [`Pipeline`].
//!
//! Enforces the streaming contract: non-decreasing timestamps, no result
//! for undecodable frames, and at most `max_hands` hands per result.

use tracing::trace;

use crate::error::{GestureError, Result};
use crate::pipeline::Pipeline;
use crate::types::{Frame, RecognitionResult, MAX_HANDS};

pub struct GestureRecognizer<P: Pipeline> {
    pipeline: P,
    max_hands: usize,
    last_timestamp_ms: Option<u64>,
}

impl<P: Pipeline> GestureRecognizer<P> {
    pub fn new(pipeline: P, max_hands: usize) -> Self {
        Self {
            pipeline,
            max_hands: max_hands.clamp(1, MAX_HANDS),
            last_timestamp_ms: None,
        }
    }

    pub fn name(&self) -> String {
        self.pipeline.name()
    }

    pub fn max_hands(&self) -> usize {
        self.max_hands
    }

    /// Recognize hands in `frame` captured at `timestamp_ms`.
    ///
    /// Returns `Ok(None)` when the frame has no pixels yet. Engine errors
    /// come back as [`GestureError::RecognitionTransientFailure`].
    pub fn recognize(&mut self, frame: &Frame, timestamp_ms: u64) -> Result<Option<RecognitionResult>> {
        if let Some(previous_ms) = self.last_timestamp_ms {
            if timestamp_ms < previous_ms {
                return Err(GestureError::NonMonotonicTimestamp {
                    previous_ms,
                    timestamp_ms,
                });
            }
        }

        if frame.width() == 0 || frame.height() == 0 {
            return Ok(None);
        }

        self.last_timestamp_ms = Some(timestamp_ms);

        let detections = self
            .pipeline
            .process(frame)
            .map_err(|e| GestureError::transient(format!("{e:#}")))?;

        let result = RecognitionResult::from_detections(detections, self.max_hands);
        trace!(hands = result.hands().len(), timestamp_ms, "recognized");
        Ok(Some(result))
    }
}
