//! Fit-to-viewport scale and user zoom.

use crate::config::ViewerConfig;
use serde::{Deserialize, Serialize};

/// Smallest base scale handed out, so a collapsed viewport never yields zero.
pub const MIN_BASE_SCALE: f32 = 0.01;

/// Render scale between document space and page space.
///
/// Always finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct Scale(f32);

impl Scale {
    pub const ONE: Scale = Scale(1.0);

    pub fn new(value: f32) -> Option<Self> {
        (value.is_finite() && value > 0.0).then_some(Self(value))
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl Default for Scale {
    fn default() -> Self {
        Scale::ONE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("scale must be finite and greater than zero")]
pub struct InvalidScale;

impl TryFrom<f32> for Scale {
    type Error = InvalidScale;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Scale::new(value).ok_or(InvalidScale)
    }
}

impl From<Scale> for f32 {
    fn from(scale: Scale) -> Self {
        scale.0
    }
}

/// Native page size in document units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageDimensions {
    pub width: f32,
    pub height: f32,
}

impl PageDimensions {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Client size of the window hosting the viewer, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportBounds {
    pub width: f32,
    pub height: f32,
}

impl ViewportBounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Zoom state for one page view.
///
/// `effective_scale = base_scale * zoom`, where `base_scale` fits the page
/// into the viewport minus padding and toolbar without upscaling past 1.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleContext {
    page: PageDimensions,
    viewport: ViewportBounds,
    padding_px: f32,
    toolbar_height_px: f32,
    zoom: f32,
    min_zoom: f32,
    max_zoom: f32,
    zoom_step: f32,
}

impl ScaleContext {
    pub fn new(page: PageDimensions, viewport: ViewportBounds, config: &ViewerConfig) -> Self {
        let mut context = Self {
            page,
            viewport,
            padding_px: config.padding_px,
            toolbar_height_px: config.toolbar_height_px,
            zoom: 1.0,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom.max(config.min_zoom),
            zoom_step: config.zoom_step,
        };
        context.set_zoom(1.0);
        context
    }

    pub fn page(&self) -> PageDimensions {
        self.page
    }

    pub fn viewport(&self) -> ViewportBounds {
        self.viewport
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn set_page(&mut self, page: PageDimensions) {
        self.page = page;
    }

    pub fn set_viewport(&mut self, viewport: ViewportBounds) {
        self.viewport = viewport;
    }

    /// Set the zoom multiplier, clamped into the configured range.
    ///
    /// Non-finite input resets to 1.0 before clamping.
    pub fn set_zoom(&mut self, zoom: f32) {
        let zoom = if zoom.is_finite() { zoom } else { 1.0 };
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom + self.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom - self.zoom_step);
    }

    pub fn can_zoom_in(&self) -> bool {
        self.zoom < self.max_zoom
    }

    pub fn can_zoom_out(&self) -> bool {
        self.zoom > self.min_zoom
    }

    /// Scale that fits the page into the available area, capped at 1.
    pub fn base_scale(&self) -> f32 {
        if !self.page.is_usable() {
            return 1.0;
        }

        let available_width = self.viewport.width - self.padding_px * 2.0;
        let available_height =
            self.viewport.height - self.toolbar_height_px - self.padding_px * 2.0;

        let fit = (available_width / self.page.width)
            .min(available_height / self.page.height)
            .min(1.0);

        if fit.is_finite() {
            fit.max(MIN_BASE_SCALE)
        } else {
            MIN_BASE_SCALE
        }
    }

    pub fn effective_scale(&self) -> Scale {
        Scale::new(self.base_scale() * self.zoom).unwrap_or(Scale(MIN_BASE_SCALE))
    }

    pub fn zoom_percent(&self) -> u32 {
        (self.effective_scale().get() * 100.0).round() as u32
    }

    /// Page size in page-space pixels at the effective scale.
    pub fn rendered_size(&self) -> (f32, f32) {
        let scale = self.effective_scale().get();
        (self.page.width * scale, self.page.height * scale)
    }
}
