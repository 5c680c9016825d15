//! Viewer configuration.
//!
//! Values can come from defaults, a TOML file, and environment variables, in
//! that order of precedence (later wins).

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

/// Layout reservations, zoom limits and overlay sizes for the page viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Padding kept free around the page on every side, in pixels.
    pub padding_px: f32,
    /// Vertical space taken by the toolbar above the page, in pixels.
    pub toolbar_height_px: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Zoom multiplier change per zoom in/out step.
    pub zoom_step: f32,
    /// Edge length of the note marker, in viewport pixels at any scale.
    pub note_marker_px: f32,
    pub stamp_min_width_px: f32,
    pub stamp_min_height_px: f32,
    /// Thickness of underline and strikethrough lines.
    pub markup_line_px: f32,
    pub arrow_head_length_px: f32,
    pub arrow_head_width_px: f32,
    /// Fill opacity for highlight rectangles, 0.0..=1.0.
    pub highlight_fill_alpha: f32,
    pub undo_capacity: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            padding_px: 32.0,
            toolbar_height_px: 76.0,
            min_zoom: 0.25,
            max_zoom: 2.0,
            zoom_step: 0.2,
            note_marker_px: 24.0,
            stamp_min_width_px: 60.0,
            stamp_min_height_px: 24.0,
            markup_line_px: 2.0,
            arrow_head_length_px: 10.0,
            arrow_head_width_px: 7.0,
            highlight_fill_alpha: 0.4,
            undo_capacity: doc_model::DEFAULT_UNDO_CAPACITY,
        }
    }
}

pub const ENV_MIN_ZOOM: &str = "PDFMARK_MIN_ZOOM";
pub const ENV_MAX_ZOOM: &str = "PDFMARK_MAX_ZOOM";
pub const ENV_ZOOM_STEP: &str = "PDFMARK_ZOOM_STEP";
pub const ENV_UNDO_CAPACITY: &str = "PDFMARK_UNDO_CAPACITY";

impl ViewerConfig {
    /// Loads configuration from a TOML file. Missing keys keep their defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Defaults overridden from the process environment.
    ///
    /// Environment variables:
    /// - `PDFMARK_MIN_ZOOM`
    /// - `PDFMARK_MAX_ZOOM`
    /// - `PDFMARK_ZOOM_STEP`
    /// - `PDFMARK_UNDO_CAPACITY`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Override fields from `lookup`, then validate.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        fn parse<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
            value.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue(name.to_owned()))
        }

        if let Some(value) = lookup(ENV_MIN_ZOOM) {
            self.min_zoom = parse(ENV_MIN_ZOOM, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_ZOOM) {
            self.max_zoom = parse(ENV_MAX_ZOOM, &value)?;
        }
        if let Some(value) = lookup(ENV_ZOOM_STEP) {
            self.zoom_step = parse(ENV_ZOOM_STEP, &value)?;
        }
        if let Some(value) = lookup(ENV_UNDO_CAPACITY) {
            self.undo_capacity = parse(ENV_UNDO_CAPACITY, &value)?;
        }

        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite_non_negative = [
            ("padding_px", self.padding_px),
            ("toolbar_height_px", self.toolbar_height_px),
            ("note_marker_px", self.note_marker_px),
            ("stamp_min_width_px", self.stamp_min_width_px),
            ("stamp_min_height_px", self.stamp_min_height_px),
            ("markup_line_px", self.markup_line_px),
            ("arrow_head_length_px", self.arrow_head_length_px),
            ("arrow_head_width_px", self.arrow_head_width_px),
        ];
        for (key, value) in finite_non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::InvalidValue(key.to_owned()));
            }
        }

        if !(self.min_zoom.is_finite() && self.min_zoom > 0.0) {
            return Err(ConfigError::InvalidValue("min_zoom".to_owned()));
        }
        if !(self.max_zoom.is_finite() && self.max_zoom >= self.min_zoom) {
            return Err(ConfigError::InvalidValue("max_zoom".to_owned()));
        }
        if !(self.zoom_step.is_finite() && self.zoom_step > 0.0) {
            return Err(ConfigError::InvalidValue("zoom_step".to_owned()));
        }
        if !(0.0..=1.0).contains(&self.highlight_fill_alpha) {
            return Err(ConfigError::InvalidValue("highlight_fill_alpha".to_owned()));
        }
        if self.undo_capacity == 0 {
            return Err(ConfigError::InvalidValue("undo_capacity".to_owned()));
        }

        Ok(())
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to write TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}
