//! Frame sources for continuous capture

use crate::error::VisionError;
use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::info;

const FRAME_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "bmp", "webp", "tif", "tiff"];

/// A camera-like producer of RGB frames
pub trait FrameSource: Send {
    /// Acquire the device. Failure here aborts capture before it starts.
    fn open(&mut self) -> Result<(), VisionError>;

    /// Read the next frame.
    ///
    /// `Ok(None)` means the source is exhausted. An `Err` is a single failed
    /// read; callers may keep reading.
    fn read_frame(&mut self) -> Result<Option<RgbImage>, VisionError>;

    /// Release the device
    fn release(&mut self);

    fn describe(&self) -> String;
}

/// Replays the image files of a directory, sorted by file name, as a camera
pub struct DirectoryFrameSource {
    dir: PathBuf,
    camera_id: Option<u32>,
    frames: Vec<PathBuf>,
    cursor: usize,
    opened: bool,
}

impl DirectoryFrameSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            camera_id: None,
            frames: Vec::new(),
            cursor: 0,
            opened: false,
        }
    }

    /// Report frames as coming from camera `id`
    pub fn with_camera_id(mut self, id: u32) -> Self {
        self.camera_id = Some(id);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of frames found by `open`
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
}

impl FrameSource for DirectoryFrameSource {
    fn open(&mut self) -> Result<(), VisionError> {
        if self.opened {
            return Ok(());
        }

        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            VisionError::Camera(format!("Failed to open frame directory {}: {}", self.dir.display(), e))
        })?;

        let mut frames: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_frame_file(path))
            .collect();
        frames.sort();

        if frames.is_empty() {
            return Err(VisionError::Camera(format!(
                "No image frames found in {}",
                self.dir.display()
            )));
        }

        info!("Frame source {} opened with {} frames", self.dir.display(), frames.len());
        self.frames = frames;
        self.cursor = 0;
        self.opened = true;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<RgbImage>, VisionError> {
        if !self.opened {
            return Err(VisionError::Camera("Frame source not opened".to_string()));
        }

        let Some(path) = self.frames.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;

        let frame = image::open(path)
            .map_err(|e| VisionError::Camera(format!("Failed to read frame {}: {}", path.display(), e)))?;
        Ok(Some(frame.to_rgb8()))
    }

    fn release(&mut self) {
        self.frames.clear();
        self.cursor = 0;
        self.opened = false;
    }

    fn describe(&self) -> String {
        match self.camera_id {
            Some(id) => format!("camera {} (directory {})", id, self.dir.display()),
            None => format!("directory {}", self.dir.display()),
        }
    }
}
