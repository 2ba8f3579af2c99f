//! File helpers: frames, calibration files and JSON configs.

use std::fs;
use std::path::Path;

use camruler_calib::CalibrationState;
use camruler_core::Frame;
use log::info;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::SessionConfig;
use crate::error::SessionError;

pub fn load_frame(path: &Path) -> Result<Frame, SessionError> {
    let img = image::open(path).map_err(SessionError::image(path))?;
    Ok(img.to_rgb8())
}

/// Save a frame; the format follows the file extension.
pub fn save_frame(path: &Path, frame: &Frame) -> Result<(), SessionError> {
    frame.save(path).map_err(SessionError::image(path))
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, SessionError> {
    let data = fs::read_to_string(path).map_err(SessionError::io(path))?;
    serde_json::from_str(&data).map_err(SessionError::json(path))
}

pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SessionError> {
    let json = serde_json::to_string_pretty(value).map_err(SessionError::json(path))?;
    fs::write(path, json).map_err(SessionError::io(path))
}

pub fn load_config(path: &Path) -> Result<SessionConfig, SessionError> {
    load_json(path)
}

pub fn load_calibration(path: &Path) -> Result<CalibrationState, SessionError> {
    let state: CalibrationState = load_json(path)?;
    info!(
        "loaded calibration from {} (ratio {:?})",
        path.display(),
        state.pixel_to_cm
    );
    Ok(state)
}

pub fn save_calibration(path: &Path, state: &CalibrationState) -> Result<(), SessionError> {
    save_json(path, state)?;
    info!("saved calibration to {}", path.display());
    Ok(())
}
