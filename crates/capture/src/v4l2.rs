//! V4L2 camera source (feature `v4l2`).
//!
//! Negotiates MJPEG with the device so every captured buffer is already a
//! JPEG still; no decode or re-encode happens on this path. Capture runs
//! on a dedicated thread because the mmap stream read blocks; frames cross
//! into async land over a bounded channel.

use std::thread::{self, JoinHandle};

use tokio::sync::mpsc;
use v4l::buffer::Type;
use v4l::io::mmap::Stream as MmapStream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, Format, FourCC};

use framecast_common::error::{FramecastError, FramecastResult};

use crate::{CaptureConfig, FrameSample, FrameSource};

type RawFrame = FramecastResult<Vec<u8>>;

/// V4L2 camera implementation delivering MJPEG stills.
pub struct V4lSource {
    config: CaptureConfig,
    device: Option<Device>,
    receiver: Option<mpsc::Receiver<RawFrame>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for V4lSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("V4lSource")
            .field("config", &self.config)
            .field("device", &"<v4l::Device>")
            .field("receiver", &self.receiver.is_some())
            .field("thread_handle", &self.thread_handle.is_some())
            .finish()
    }
}

impl V4lSource {
    /// Open the device at `config.device()`, set MJPEG format at the
    /// requested resolution, and configure the frame rate.
    ///
    /// # Errors
    ///
    /// Returns `FramecastError::Capture` if the device cannot be opened,
    /// refuses MJPEG, or rejects the format/parameters.
    pub fn new(config: CaptureConfig) -> FramecastResult<Self> {
        let device = Device::with_path(config.device())
            .map_err(|e| FramecastError::capture(format!("Failed to open device: {e}")))?;

        let mut format = Format::new(config.width(), config.height(), FourCC::new(b"MJPG"));
        format = Capture::set_format(&device, &format)
            .map_err(|e| FramecastError::capture(format!("Failed to set format: {e}")))?;

        // The driver may silently substitute another format
        if format.fourcc != FourCC::new(b"MJPG") {
            return Err(FramecastError::capture(
                "MJPEG format not supported by device",
            ));
        }

        let params = v4l::video::capture::Parameters::with_fps(config.fps());
        Capture::set_params(&device, &params)
            .map_err(|e| FramecastError::capture(format!("Failed to set frame rate: {e}")))?;

        Ok(Self {
            config,
            device: Some(device),
            receiver: None,
            thread_handle: None,
        })
    }

    /// Start the capture thread if not already running.
    ///
    /// Called automatically on the first `grab()`.
    fn ensure_started(&mut self) -> FramecastResult<()> {
        if self.receiver.is_some() {
            return Ok(());
        }

        let device = self.device.take().ok_or(FramecastError::DeviceNotReady)?;

        let buffer_count = self.config.buffer_count() as usize;
        let (tx, rx) = mpsc::channel(buffer_count.max(1));

        let handle = thread::spawn(move || {
            if let Err(e) = Self::capture_loop(device, tx, buffer_count) {
                tracing::warn!(error = %e, "V4L2 capture thread exited with error");
            }
        });

        self.receiver = Some(rx);
        self.thread_handle = Some(handle);

        Ok(())
    }

    /// Background thread capture loop: reads MJPEG buffers from the mmap
    /// stream and forwards them untouched.
    fn capture_loop(
        device: Device,
        tx: mpsc::Sender<RawFrame>,
        buffer_count: usize,
    ) -> FramecastResult<()> {
        let mut stream = MmapStream::with_buffers(&device, Type::VideoCapture, buffer_count as u32)
            .map_err(|e| FramecastError::capture(format!("Failed to start stream: {e}")))?;

        loop {
            let (frame_data, _metadata) = match CaptureStream::next(&mut stream) {
                Ok(frame) => frame,
                Err(e) => {
                    let err = FramecastError::capture(format!("Stream read failed: {e}"));
                    let _ = tx.blocking_send(Err(err));
                    break;
                }
            };

            // Buffer is only valid until the next stream read
            let frame_vec = frame_data.to_vec();

            if tx.blocking_send(Ok(frame_vec)).is_err() {
                // Receiver dropped - exit thread
                break;
            }
        }

        Ok(())
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl FrameSource for V4lSource {
    async fn grab(&mut self) -> FramecastResult<FrameSample> {
        self.ensure_started()?;

        let receiver = self
            .receiver
            .as_mut()
            .ok_or(FramecastError::DeviceNotReady)?;

        match receiver.recv().await {
            Some(Ok(data)) => Ok(FrameSample::new(data)),
            Some(Err(e)) => Err(e),
            // Capture thread ended; the device stopped delivering
            None => Err(FramecastError::DeviceNotReady),
        }
    }

    fn name(&self) -> &'static str {
        "v4l2"
    }
}

impl Drop for V4lSource {
    fn drop(&mut self) {
        // Drop the receiver to signal the thread to stop
        drop(self.receiver.take());

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}
