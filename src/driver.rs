//! The per-frame loop as an explicit state machine.
//!
//! ```text
//! Idle -> WaitingForLoad -> WaitingForCamera -> Running -> Stopped
//!              \                   \
//!               +-------------------+--> Failed (model or camera)
//! ```
//!
//! A [`Driver`] only knows what one tick does; when ticks happen is up to
//! a [`Scheduler`] (or the caller invoking [`Driver::tick`] directly).

use image::RgbaImage;
use tracing::{debug, error, info, trace, warn};

use crate::camera::{CaptureStatus, FrameSource};
use crate::config::InteractionConfig;
use crate::error::GestureError;
use crate::interaction::{Activation, InteractionDetector, RegionProvider};
use crate::loader::{LoadStatus, ModelLoader};
use crate::overlay::{self, HandLabel, OverlayStyle, Surface};
use crate::pipeline::Pipeline;
use crate::recognizer::GestureRecognizer;
use crate::scheduler::Scheduler;
use crate::types::{Frame, RecognitionResult, NO_GESTURE};

#[derive(Debug, Clone, PartialEq)]
pub enum DriverState {
    Idle,
    WaitingForLoad,
    WaitingForCamera,
    Running,
    Stopped,
    /// Terminal for this session; no retry.
    Failed(GestureError),
}

/// Receives the driver's output events.
pub trait EventSink {
    /// Called every running tick with the top gesture of the first hand,
    /// or `"None"`.
    fn on_gesture_detected(&mut self, category: &str);

    fn on_activate(&mut self, region_id: &str);
}

/// Sink that ignores everything.
pub struct NullSink;

impl EventSink for NullSink {
    fn on_gesture_detected(&mut self, _category: &str) {}
    fn on_activate(&mut self, _region_id: &str) {}
}

pub struct Driver<S: FrameSource, P: Pipeline + Send + 'static> {
    state: DriverState,
    source: S,
    loader: Option<ModelLoader<P>>,
    recognizer: Option<GestureRecognizer<P>>,
    max_hands: usize,
    detector: InteractionDetector,
    style: OverlayStyle,
    surface: Surface,
    last_result: Option<RecognitionResult>,
    last_timestamp_ms: u64,
}

impl<S: FrameSource, P: Pipeline + Send + 'static> Driver<S, P> {
    pub fn new(source: S, loader: ModelLoader<P>, max_hands: usize, interaction: InteractionConfig, style: OverlayStyle) -> Self {
        Self {
            state: DriverState::Idle,
            source,
            loader: Some(loader),
            recognizer: None,
            max_hands,
            detector: InteractionDetector::new(interaction),
            style,
            surface: Surface::new(),
            last_result: None,
            last_timestamp_ms: 0,
        }
    }

    pub fn state(&self) -> &DriverState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == DriverState::Running
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn last_result(&self) -> Option<&RecognitionResult> {
        self.last_result.as_ref()
    }

    pub fn detector(&self) -> &InteractionDetector {
        &self.detector
    }

    pub fn recognizer_name(&self) -> Option<String> {
        self.recognizer.as_ref().map(|r| r.name())
    }

    /// Latest camera frame (only while running) and the overlay drawn for
    /// the last result.
    pub fn display(&mut self) -> (Option<&Frame>, &RgbaImage) {
        let frame = match self.state {
            DriverState::Running => self.source.current_frame(),
            _ => None,
        };
        (frame, self.surface.image())
    }

    /// Gesture captions for the last result.
    pub fn labels(&self) -> Vec<HandLabel> {
        self.last_result
            .as_ref()
            .map(|r| overlay::hand_labels(r, self.detector.config().mirrored))
            .unwrap_or_default()
    }

    fn transition(&mut self, next: DriverState) {
        if self.state != next {
            info!("driver: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    fn fail(&mut self, err: GestureError) {
        error!("driver failed: {}", err);
        self.loader = None;
        self.source.release();
        self.transition(DriverState::Failed(err));
    }

    /// Kick off model loading and camera acquisition side by side.
    pub fn start(&mut self) {
        if self.state != DriverState::Idle {
            return;
        }
        if let Some(loader) = self.loader.as_mut() {
            loader.start();
        }
        self.source.acquire();
        self.transition(DriverState::WaitingForLoad);
    }

    fn poll_startup(&mut self) {
        if let Some(loader) = self.loader.as_mut() {
            match loader.poll() {
                LoadStatus::Loaded(pipeline) => {
                    info!("Model loaded: {}", pipeline.name());
                    self.recognizer = Some(GestureRecognizer::new(pipeline, self.max_hands));
                    self.loader = None;
                }
                LoadStatus::Failed(err) => {
                    self.fail(err);
                    return;
                }
                LoadStatus::Pending => {}
            }
        }

        match self.source.status() {
            CaptureStatus::Denied(message) => self.fail(GestureError::device(message)),
            CaptureStatus::Ready if self.recognizer.is_some() => self.transition(DriverState::Running),
            _ if self.recognizer.is_some() => self.transition(DriverState::WaitingForCamera),
            _ => {}
        }
    }

    /// Run one tick at `now_ms`. Returns the press detected on this tick.
    pub fn tick(&mut self, now_ms: u64, regions: &dyn RegionProvider, sink: &mut dyn EventSink) -> Option<Activation> {
        match self.state {
            DriverState::Idle | DriverState::Stopped | DriverState::Failed(_) => return None,
            DriverState::WaitingForLoad | DriverState::WaitingForCamera => {
                self.poll_startup();
                if self.state != DriverState::Running {
                    return None;
                }
            }
            DriverState::Running => {}
        }
        self.run_frame(now_ms, regions, sink)
    }

    fn run_frame(&mut self, now_ms: u64, regions: &dyn RegionProvider, sink: &mut dyn EventSink) -> Option<Activation> {
        // The recognizer requires non-decreasing timestamps.
        let timestamp = now_ms.max(self.last_timestamp_ms);
        self.last_timestamp_ms = timestamp;

        let recognizer = self.recognizer.as_mut()?;
        let outcome = match self.source.current_frame() {
            Some(frame) if frame.width() > 0 && frame.height() > 0 => {
                Some((frame.dimensions(), recognizer.recognize(frame, timestamp)))
            }
            _ => None,
        };

        let Some(((width, height), recognized)) = outcome else {
            trace!("frame not ready; skipping recognition");
            sink.on_gesture_detected(NO_GESTURE);
            return None;
        };

        let result = match recognized {
            Ok(result) => result,
            Err(err) if err.is_terminal() => {
                self.fail(err);
                return None;
            }
            Err(err) => {
                warn!("{}", err);
                None
            }
        };

        let Some(result) = result else {
            sink.on_gesture_detected(NO_GESTURE);
            return None;
        };

        overlay::draw(&mut self.surface, width, height, &result, &self.style);

        let container = regions.container();
        let hit_regions = regions.regions();
        let activation = self.detector.update(&result, &container, &hit_regions, timestamp);

        sink.on_gesture_detected(result.top_category());
        if let Some(activation) = &activation {
            debug!("activate {} (delta {:.3})", activation.region_id, activation.depth_delta);
            sink.on_activate(&activation.region_id);
        }

        self.last_result = Some(result);
        activation
    }

    /// Tear down from any state: drop a pending load and release the
    /// camera. Idempotent.
    pub fn stop(&mut self) {
        if self.state == DriverState::Stopped {
            return;
        }
        self.loader = None;
        self.source.release();
        self.transition(DriverState::Stopped);
    }

    /// Tick until the scheduler is cancelled, then stop.
    pub fn run(&mut self, scheduler: &mut dyn Scheduler, regions: &dyn RegionProvider, sink: &mut dyn EventSink) {
        self.start();
        while let Some(now_ms) = scheduler.next_tick() {
            self.tick(now_ms, regions, sink);
            if self.state == DriverState::Stopped {
                break;
            }
        }
        self.stop();
    }
}

impl<S: FrameSource, P: Pipeline + Send + 'static> Drop for Driver<S, P> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HandDetection, HitRegion, Rect};
    use std::cell::Cell;
    use std::rc::Rc;

    struct StubSource {
        status: CaptureStatus,
        frame: Option<Frame>,
        released: Rc<Cell<u32>>,
    }

    impl FrameSource for StubSource {
        fn acquire(&mut self) {}
        fn status(&mut self) -> CaptureStatus {
            self.status.clone()
        }
        fn current_frame(&mut self) -> Option<&Frame> {
            self.frame.as_ref()
        }
        fn release(&mut self) {
            self.released.set(self.released.get() + 1);
        }
    }

    struct EmptyPipeline;

    impl Pipeline for EmptyPipeline {
        fn name(&self) -> String {
            "empty".to_string()
        }
        fn process(&mut self, _frame: &Frame) -> anyhow::Result<Vec<HandDetection>> {
            Ok(Vec::new())
        }
    }

    struct NoRegions;

    impl RegionProvider for NoRegions {
        fn container(&self) -> Rect {
            Rect::new(0.0, 0.0, 64.0, 48.0)
        }
        fn regions(&self) -> Vec<HitRegion> {
            Vec::new()
        }
    }

    #[derive(Default)]
    struct Recorder {
        gestures: Vec<String>,
    }

    impl EventSink for Recorder {
        fn on_gesture_detected(&mut self, category: &str) {
            self.gestures.push(category.to_string());
        }
        fn on_activate(&mut self, _region_id: &str) {}
    }

    fn driver(status: CaptureStatus, loader: ModelLoader<EmptyPipeline>) -> (Driver<StubSource, EmptyPipeline>, Rc<Cell<u32>>) {
        let released = Rc::new(Cell::new(0));
        let source = StubSource {
            status,
            frame: Some(Frame::new(64, 48)),
            released: Rc::clone(&released),
        };
        let d = Driver::new(source, loader, 2, InteractionConfig::default(), OverlayStyle::default());
        (d, released)
    }

    #[test]
    fn test_idle_until_started() {
        let (mut d, _) = driver(CaptureStatus::Ready, ModelLoader::ready(EmptyPipeline));
        let mut sink = Recorder::default();
        assert_eq!(d.tick(0, &NoRegions, &mut sink), None);
        assert_eq!(d.state(), &DriverState::Idle);
        assert!(sink.gestures.is_empty());
    }

    #[test]
    fn test_runs_once_model_and_camera_ready() {
        let (mut d, _) = driver(CaptureStatus::Ready, ModelLoader::ready(EmptyPipeline));
        let mut sink = Recorder::default();
        d.start();
        assert_eq!(d.state(), &DriverState::WaitingForLoad);
        d.tick(0, &NoRegions, &mut sink);
        assert!(d.is_running());
        assert_eq!(sink.gestures, vec!["None"]);
        assert_eq!(d.recognizer_name().as_deref(), Some("empty"));
    }

    #[test]
    fn test_waits_for_camera() {
        let (mut d, _) = driver(CaptureStatus::Pending, ModelLoader::ready(EmptyPipeline));
        let mut sink = Recorder::default();
        d.start();
        d.tick(0, &NoRegions, &mut sink);
        assert_eq!(d.state(), &DriverState::WaitingForCamera);
        assert!(sink.gestures.is_empty());
        assert!(d.display().0.is_none());
    }

    #[test]
    fn test_camera_denied_is_terminal() {
        let (mut d, released) = driver(CaptureStatus::Denied("permission".into()), ModelLoader::ready(EmptyPipeline));
        d.start();
        d.tick(0, &NoRegions, &mut NullSink);
        assert_eq!(d.state(), &DriverState::Failed(GestureError::device("permission")));
        assert_eq!(released.get(), 1);
        // Further ticks do nothing.
        assert_eq!(d.tick(16, &NoRegions, &mut NullSink), None);
        assert!(matches!(d.state(), DriverState::Failed(_)));
    }

    #[test]
    fn test_stop_releases_once() {
        let (mut d, released) = driver(CaptureStatus::Ready, ModelLoader::ready(EmptyPipeline));
        d.start();
        d.tick(0, &NoRegions, &mut NullSink);
        d.stop();
        d.stop();
        assert_eq!(d.state(), &DriverState::Stopped);
        assert_eq!(released.get(), 1);
        drop(d);
        assert_eq!(released.get(), 1);
    }

    #[test]
    fn test_drop_releases_camera() {
        let (d, released) = driver(CaptureStatus::Pending, ModelLoader::new(|| Ok(EmptyPipeline)));
        drop(d);
        assert_eq!(released.get(), 1);
    }
}
