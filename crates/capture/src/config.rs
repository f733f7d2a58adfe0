/// Configuration for camera capture.
#[derive(Clone, Debug)]
pub struct CaptureConfig {
    device: String,
    width: u32,
    height: u32,
    quality: u8,
    fps: u32,
    buffer_count: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            width: 640,
            height: 480,
            quality: 30,
            fps: 30,
            buffer_count: 4,
        }
    }
}

impl CaptureConfig {
    /// Set the device path (e.g., "/dev/video0").
    pub fn with_device(mut self, device: String) -> Self {
        self.device = device;
        self
    }

    /// Set the capture width in pixels.
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width.max(1);
        self
    }

    /// Set the capture height in pixels.
    pub fn with_height(mut self, height: u32) -> Self {
        self.height = height.max(1);
        self
    }

    /// Set the JPEG quality [1, 100]. Fixed for the life of a session;
    /// the scheduler never adjusts it dynamically.
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    /// Set the device frame rate (V4L2 stream negotiation only).
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    /// Set the buffer count for the capture stream.
    pub fn with_buffer_count(mut self, buffer_count: u32) -> Self {
        self.buffer_count = buffer_count;
        self
    }

    // Getters
    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn buffer_count(&self) -> u32 {
        self.buffer_count
    }
}
