use anyhow::{anyhow, Context, Result};
use nokhwa::{
    pixel_format::RgbFormat,
    utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution},
    Camera,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::types::Frame;

/// Readiness of a frame source as seen by the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureStatus {
    /// Acquisition not started or still in progress.
    Pending,
    /// The device is open and at least one frame has arrived.
    Ready,
    /// The device could not be opened. Terminal.
    Denied(String),
}

/// Something that can produce the current camera frame.
pub trait FrameSource {
    /// Begin acquiring the device. Must not block on the device.
    fn acquire(&mut self);

    fn status(&mut self) -> CaptureStatus;

    /// Latest decoded frame, if any has arrived.
    fn current_frame(&mut self) -> Option<&Frame>;

    /// Stop capture and release the device. Idempotent.
    fn release(&mut self);
}

/// Direct wrapper over a nokhwa camera. Lives on the capture thread.
pub struct CameraSource {
    camera: Camera,
}

impl CameraSource {
    pub fn new(index: u32, width: u32, height: u32) -> Result<Self> {
        let cam_index = CameraIndex::Index(index);
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
            CameraFormat::new(Resolution::new(width, height), FrameFormat::MJPEG, 30),
        ));
        let mut camera = Camera::new(cam_index, requested).context("Failed to create camera instance")?;

        camera
            .open_stream()
            .map_err(|e| anyhow!(e))
            .context("Failed to open camera stream")?;

        info!("Opened camera: {} ({})", camera.info().human_name(), camera.camera_format());

        Ok(Self { camera })
    }

    pub fn capture(&mut self) -> Result<Frame> {
        let frame = self.camera.frame().map_err(|e| anyhow!(e)).context("Failed to get frame")?;
        let decoded = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| anyhow!(e))
            .context("Failed to decode frame")?;
        Ok(decoded)
    }

    pub fn name(&self) -> String {
        self.camera.info().human_name()
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            warn!("Failed to stop camera stream: {}", e);
        }
    }
}

enum CaptureEvent {
    Opened(String),
    Failed(String),
}

/// Camera owned by a dedicated capture thread. Frames are handed over
/// through a channel of capacity one, so the driver always sees the
/// latest frame and the capture thread never queues a backlog.
pub struct ThreadedCamera {
    index: u32,
    width: u32,
    height: u32,
    alive: Arc<AtomicBool>,
    events: Option<Receiver<CaptureEvent>>,
    frames: Option<Receiver<Frame>>,
    worker: Option<JoinHandle<()>>,
    opened: bool,
    denied: Option<String>,
    latest: Option<Frame>,
}

impl ThreadedCamera {
    pub fn new(index: u32, width: u32, height: u32) -> Self {
        Self {
            index,
            width,
            height,
            alive: Arc::new(AtomicBool::new(false)),
            events: None,
            frames: None,
            worker: None,
            opened: false,
            denied: None,
            latest: None,
        }
    }

    fn drain_events(&mut self) {
        let Some(events) = &self.events else { return };
        let mut disconnected = false;
        loop {
            match events.try_recv() {
                Ok(CaptureEvent::Opened(name)) => {
                    debug!("capture thread opened {}", name);
                    self.opened = true;
                }
                Ok(CaptureEvent::Failed(message)) => {
                    self.denied = Some(message);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    // Thread gone before it opened anything.
                    if !self.opened && self.denied.is_none() && self.alive.load(Ordering::Acquire) {
                        self.denied = Some("capture thread exited".to_string());
                    }
                    disconnected = true;
                    break;
                }
            }
        }
        if disconnected {
            self.events = None;
        }
    }

    fn drain_frames(&mut self) {
        let Some(frames) = &self.frames else { return };
        while let Ok(frame) = frames.try_recv() {
            self.latest = Some(frame);
        }
    }
}

impl FrameSource for ThreadedCamera {
    fn acquire(&mut self) {
        if self.worker.is_some() {
            return;
        }

        let (event_tx, event_rx) = mpsc::channel();
        let (frame_tx, frame_rx) = mpsc::sync_channel::<Frame>(1);
        let alive = Arc::clone(&self.alive);
        alive.store(true, Ordering::Release);
        let (index, width, height) = (self.index, self.width, self.height);

        let spawned = thread::Builder::new()
            .name("capture".to_string())
            .spawn(move || {
                let mut camera = match CameraSource::new(index, width, height) {
                    Ok(camera) => camera,
                    Err(e) => {
                        let _ = event_tx.send(CaptureEvent::Failed(format!("{e:#}")));
                        return;
                    }
                };
                let _ = event_tx.send(CaptureEvent::Opened(camera.name()));

                while alive.load(Ordering::Acquire) {
                    match camera.capture() {
                        Ok(frame) => match frame_tx.try_send(frame) {
                            Ok(()) | Err(TrySendError::Full(_)) => {}
                            Err(TrySendError::Disconnected(_)) => break,
                        },
                        Err(e) => {
                            debug!("capture failed: {:#}", e);
                            thread::sleep(Duration::from_millis(5));
                        }
                    }
                }
                // Dropping the camera stops the stream.
            });

        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                self.events = Some(event_rx);
                self.frames = Some(frame_rx);
            }
            Err(e) => {
                self.alive.store(false, Ordering::Release);
                self.denied = Some(format!("failed to start capture thread: {e}"));
            }
        }
    }

    fn status(&mut self) -> CaptureStatus {
        self.drain_events();
        if let Some(message) = &self.denied {
            return CaptureStatus::Denied(message.clone());
        }
        if self.opened {
            self.drain_frames();
            if self.latest.is_some() {
                return CaptureStatus::Ready;
            }
        }
        CaptureStatus::Pending
    }

    fn current_frame(&mut self) -> Option<&Frame> {
        self.drain_frames();
        self.latest.as_ref()
    }

    /// Joins the capture thread. If the device open is still in progress
    /// (for example blocked on an OS permission prompt), teardown waits
    /// for it to finish before returning.
    fn release(&mut self) {
        self.alive.store(false, Ordering::Release);
        // Dropping the receiver unblocks a sender waiting on a full channel.
        self.frames = None;
        self.events = None;
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("capture thread panicked");
            }
            info!("Camera released");
        }
        self.latest = None;
    }
}

impl Drop for ThreadedCamera {
    fn drop(&mut self) {
        self.release();
    }
}
