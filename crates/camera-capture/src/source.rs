//! Capture buffers and capture sources

use std::cell::Cell;
use std::fmt;

use tracing::{debug, info};

use crate::frame::PixelFormat;
use crate::{CameraConfig, CameraError};

/// A camera buffer borrowed from the capture source for one callback.
///
/// The source may refill the buffer once it has been released. Release
/// happens exactly once, either explicitly or when the buffer is dropped,
/// so every delivered frame is acknowledged whatever the pipeline does
/// with it.
pub struct CaptureBuffer<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    format: PixelFormat,
    on_release: Option<Box<dyn FnOnce() + 'a>>,
}

impl<'a> CaptureBuffer<'a> {
    /// Wrap a raw camera buffer
    pub fn new(
        data: &'a [u8],
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Self, CameraError> {
        if width == 0 || height == 0 {
            return Err(CameraError::Dimensions { width, height });
        }
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(CameraError::Buffer {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            format,
            on_release: None,
        })
    }

    /// Attach the reuse acknowledgment for this buffer
    pub fn with_release(mut self, on_release: impl FnOnce() + 'a) -> Self {
        self.on_release = Some(Box::new(on_release));
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw pixel bytes in `format()` layout
    pub fn data(&self) -> &[u8] {
        self.data
    }

    /// Copy the pixels into `dst` as tightly packed RGB24
    pub fn copy_rgb_into(&self, dst: &mut Vec<u8>) {
        dst.clear();
        match self.format {
            PixelFormat::Rgb24 => dst.extend_from_slice(self.data),
            PixelFormat::Rgba32 => {
                dst.reserve(self.width as usize * self.height as usize * 3);
                for px in self.data.chunks_exact(4) {
                    dst.extend_from_slice(&px[..3]);
                }
            }
        }
    }

    /// Hand the buffer back to the capture source
    pub fn release(mut self) {
        self.fire_release();
    }

    fn fire_release(&mut self) {
        if let Some(on_release) = self.on_release.take() {
            on_release();
        }
    }
}

impl Drop for CaptureBuffer<'_> {
    fn drop(&mut self) {
        self.fire_release();
    }
}

impl fmt::Debug for CaptureBuffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("released", &self.on_release.is_none())
            .finish()
    }
}

/// A camera that delivers frames one callback at a time
pub trait CaptureSource {
    /// Active preview configuration
    fn config(&self) -> &CameraConfig;

    /// Block until the next frame is available
    fn capture(&mut self) -> Result<CaptureBuffer<'_>, CameraError>;
}

/// Synthetic road camera
///
/// Renders a dark road with a bright block that sweeps across the frame,
/// reusing a single preview buffer the way a real camera HAL does.
pub struct SyntheticCamera {
    config: CameraConfig,
    buffer: Vec<u8>,
    frames: u64,
    released: Cell<u64>,
}

impl SyntheticCamera {
    pub fn new(config: CameraConfig) -> Result<Self, CameraError> {
        if config.width == 0 || config.height == 0 {
            return Err(CameraError::Dimensions {
                width: config.width,
                height: config.height,
            });
        }
        info!(
            "Opening synthetic camera {}x{} @ {}fps",
            config.width, config.height, config.fps
        );
        Ok(Self {
            buffer: vec![0; config.frame_len()],
            config,
            frames: 0,
            released: Cell::new(0),
        })
    }

    /// Frames delivered so far
    pub fn frames_delivered(&self) -> u64 {
        self.frames
    }

    /// Buffers acknowledged by the consumer
    pub fn frames_released(&self) -> u64 {
        self.released.get()
    }

    fn render(&mut self) {
        let width = self.config.width as usize;
        let height = self.config.height as usize;
        let block = (width / 4).max(1);
        let offset = (self.frames as usize * 8) % width;

        for (y, row) in self.buffer.chunks_exact_mut(width * 3).enumerate() {
            for (x, px) in row.chunks_exact_mut(3).enumerate() {
                let in_block = y > height / 4
                    && y < height / 2
                    && (x + width - offset) % width < block;
                let value = if in_block { 220 } else { 40 };
                px.copy_from_slice(&[value, value, value]);
            }
        }
    }
}

impl CaptureSource for SyntheticCamera {
    fn config(&self) -> &CameraConfig {
        &self.config
    }

    fn capture(&mut self) -> Result<CaptureBuffer<'_>, CameraError> {
        self.render();
        self.frames += 1;
        debug!("Synthetic frame {} rendered", self.frames);

        let released = &self.released;
        let buffer = CaptureBuffer::new(
            &self.buffer,
            self.config.width,
            self.config.height,
            PixelFormat::Rgb24,
        )?;
        Ok(buffer.with_release(move || released.set(released.get() + 1)))
    }
}
