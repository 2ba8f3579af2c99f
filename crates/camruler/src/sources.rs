//! File-backed frame source and headless display sink.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use camruler_core::Frame;
use log::debug;

use crate::error::SessionError;
use crate::input::InputEvent;
use crate::io::{load_frame, save_frame};
use crate::session::{DisplaySink, FrameSource};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// Frames read from the image files of a directory, in file-name order.
pub struct ImageSequenceSource {
    paths: VecDeque<PathBuf>,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path) -> Result<Self, SessionError> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(SessionError::io(dir))? {
            let path = entry.map_err(SessionError::io(dir))?.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if path.is_file() && is_image {
                paths.push(path);
            }
        }
        if paths.is_empty() {
            return Err(SessionError::EmptySequence(dir.to_path_buf()));
        }
        paths.sort();
        debug!("{} frames in {}", paths.len(), dir.display());
        Ok(Self::from_paths(paths))
    }

    pub fn from_paths(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            paths: paths.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SessionError> {
        match self.paths.pop_front() {
            Some(path) => load_frame(&path).map(Some),
            None => Ok(None),
        }
    }
}

/// Writes every presented frame as `frame_NNNNN.png` and never reports input.
pub struct ImageDirSink {
    dir: PathBuf,
    written: usize,
}

impl ImageDirSink {
    pub fn create(dir: &Path) -> Result<Self, SessionError> {
        fs::create_dir_all(dir).map_err(SessionError::io(dir))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            written: 0,
        })
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

impl DisplaySink for ImageDirSink {
    fn present(&mut self, frame: &Frame) -> Result<Vec<InputEvent>, SessionError> {
        let path = self.dir.join(format!("frame_{:05}.png", self.written));
        save_frame(&path, frame)?;
        self.written += 1;
        Ok(Vec::new())
    }
}
