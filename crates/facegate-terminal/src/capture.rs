//! Probe sources.
//!
//! The camera itself is outside the terminal. Whatever drives it hands over
//! its most recent frame through [`CaptureSource`], and the frame is then
//! passed by value into a decision attempt.

use crate::error::CaptureError;
use image::RgbImage;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Supplies the most recent captured frame on demand.
pub trait CaptureSource: Send {
    fn latest(&mut self) -> Result<RgbImage, CaptureError>;
}

/// Reads a still image that an external grabber keeps overwriting.
#[derive(Debug, Clone)]
pub struct FileCapture {
    path: PathBuf,
}

impl FileCapture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CaptureSource for FileCapture {
    fn latest(&mut self) -> Result<RgbImage, CaptureError> {
        let image = image::open(&self.path).map_err(|e| match e {
            image::ImageError::IoError(io) if io.kind() == ErrorKind::NotFound => {
                CaptureError::Missing(self.path.clone())
            }
            other => CaptureError::Decode {
                path: self.path.clone(),
                message: other.to_string(),
            },
        })?;

        debug!(
            "Captured {}x{} frame from {}",
            image.width(),
            image.height(),
            self.path.display()
        );
        Ok(image.to_rgb8())
    }
}

/// Serves a fixed frame, or nothing.
#[derive(Debug, Clone, Default)]
pub struct StaticCapture {
    frame: Option<RgbImage>,
}

impl StaticCapture {
    pub fn new(frame: RgbImage) -> Self {
        Self { frame: Some(frame) }
    }

    /// A source that never has a frame.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn set(&mut self, frame: Option<RgbImage>) {
        self.frame = frame;
    }
}

impl CaptureSource for StaticCapture {
    fn latest(&mut self) -> Result<RgbImage, CaptureError> {
        self.frame.clone().ok_or(CaptureError::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use tempfile::TempDir;

    #[test]
    fn test_file_capture_reads_image() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("capture.png");
        RgbImage::from_pixel(5, 3, Rgb([1, 2, 3])).save(&path).unwrap();

        let frame = FileCapture::new(&path).latest().unwrap();
        assert_eq!(frame.dimensions(), (5, 3));
        assert_eq!(frame.get_pixel(0, 0), &Rgb([1, 2, 3]));
    }

    #[test]
    fn test_file_capture_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("capture.jpg");
        assert_eq!(
            FileCapture::new(&path).latest(),
            Err(CaptureError::Missing(path))
        );
    }

    #[test]
    fn test_file_capture_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("capture.jpg");
        std::fs::write(&path, b"not a jpeg").unwrap();
        assert!(matches!(
            FileCapture::new(&path).latest(),
            Err(CaptureError::Decode { .. })
        ));
    }

    #[test]
    fn test_static_capture() {
        let mut source = StaticCapture::empty();
        assert_eq!(source.latest(), Err(CaptureError::Empty));

        source.set(Some(RgbImage::new(2, 2)));
        assert_eq!(source.latest().unwrap().dimensions(), (2, 2));
    }
}
