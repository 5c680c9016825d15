//! Rectangles, points and colors tagged with the coordinate frame they live in.
//!
//! Three frames are in play and are kept apart at the type level:
//!
//! - [`DocumentSpace`]: native page units, top-left origin, scale = 1.
//!   Everything stored on an annotation lives here.
//! - [`PageSpace`]: document space multiplied by the current render scale,
//!   top-left origin of the rendered page surface.
//! - [`ViewportSpace`]: client pixels of the whole viewport, as reported by
//!   pointer events and selection client rects.
//!
//! Moving a value between frames always goes through a named conversion in
//! `viewer-core`; nothing here converts implicitly.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

/// Native page units (PDF points), top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DocumentSpace;

/// Pixels on the rendered page surface after applying the render scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PageSpace;

/// Client pixels of the viewport hosting the page surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ViewportSpace;

/// Axis-aligned rectangle in frame `S`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Rect<S> {
    pub top: f32,
    pub left: f32,
    pub width: f32,
    pub height: f32,
    #[serde(skip)]
    space: PhantomData<S>,
}

pub type DocRect = Rect<DocumentSpace>;
pub type PageRect = Rect<PageSpace>;
pub type ViewportRect = Rect<ViewportSpace>;

impl<S> Rect<S> {
    pub const fn new(top: f32, left: f32, width: f32, height: f32) -> Self {
        Self { top, left, width, height, space: PhantomData }
    }

    /// Rectangle spanning two arbitrary corners.
    pub fn from_corners(a: Point<S>, b: Point<S>) -> Self {
        let left = a.x.min(b.x);
        let top = a.y.min(b.y);
        Self::new(top, left, (a.x - b.x).abs(), (a.y - b.y).abs())
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    pub fn top_left(&self) -> Point<S> {
        Point::new(self.left, self.top)
    }

    pub fn center(&self) -> Point<S> {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// True when the rectangle covers no area or carries non-finite values.
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
            || !self.top.is_finite()
            || !self.left.is_finite()
            || !self.width.is_finite()
            || !self.height.is_finite()
    }

    pub fn contains(&self, point: Point<S>, tolerance: f32) -> bool {
        point.x >= self.left - tolerance
            && point.x <= self.right() + tolerance
            && point.y >= self.top - tolerance
            && point.y <= self.bottom() + tolerance
    }

    /// Intersection with `other`, or `None` if they do not overlap with positive area.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right > left && bottom > top {
            Some(Self::new(top, left, right - left, bottom - top))
        } else {
            None
        }
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.top + dy, self.left + dx, self.width, self.height)
    }

    /// Multiply every component by `factor`.
    ///
    /// Frame-preserving; the frame-changing variants live in `viewer-core`.
    pub fn scaled(&self, factor: f32) -> Self {
        Self::new(self.top * factor, self.left * factor, self.width * factor, self.height * factor)
    }

    /// Reinterpret the components in another frame.
    ///
    /// Only coordinate transforms should call this.
    pub fn cast<T>(self) -> Rect<T> {
        Rect::new(self.top, self.left, self.width, self.height)
    }

    pub fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        (self.top - other.top).abs() <= epsilon
            && (self.left - other.left).abs() <= epsilon
            && (self.width - other.width).abs() <= epsilon
            && (self.height - other.height).abs() <= epsilon
    }
}

/// Point in frame `S`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Point<S> {
    pub x: f32,
    pub y: f32,
    #[serde(skip)]
    space: PhantomData<S>,
}

pub type DocPoint = Point<DocumentSpace>;
pub type PagePoint = Point<PageSpace>;
pub type ViewportPoint = Point<ViewportSpace>;

impl<S> Point<S> {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y, space: PhantomData }
    }

    pub fn distance_to(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn scaled(&self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    pub fn cast<T>(self) -> Point<T> {
        Point::new(self.x, self.y)
    }
}

/// Distance check from `point` to the segment `start..end`.
pub fn point_near_segment<S>(
    point: &Point<S>,
    start: &Point<S>,
    end: &Point<S>,
    tolerance: f32,
) -> bool {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let length_sq = dx * dx + dy * dy;

    if length_sq < 1e-6 {
        return point.distance_to(start) <= tolerance;
    }

    let t = (((point.x - start.x) * dx + (point.y - start.y) * dy) / length_sq).clamp(0.0, 1.0);
    let closest = Point::new(start.x + t * dx, start.y + t * dy);
    point.distance_to(&closest) <= tolerance
}

/// Order rectangles by visual reading order: lines top-to-bottom, then
/// left-to-right within a line.
///
/// Two rectangles share a line when the vertical center of one falls inside
/// the vertical extent of the line's first rectangle.
pub fn sort_reading_order<S>(rects: &mut Vec<Rect<S>>) {
    rects.sort_by(|a, b| a.top.total_cmp(&b.top).then(a.left.total_cmp(&b.left)));

    let mut lines: Vec<Vec<Rect<S>>> = Vec::new();
    for rect in rects.drain(..) {
        let center_y = rect.top + rect.height / 2.0;
        let same_line = lines
            .last()
            .and_then(|line| line.first())
            .is_some_and(|anchor| center_y >= anchor.top && center_y <= anchor.bottom());

        match lines.last_mut() {
            Some(line) if same_line => line.push(rect),
            _ => lines.push(vec![rect]),
        }
    }

    for mut line in lines {
        line.sort_by(|a, b| a.left.total_cmp(&b.left));
        rects.extend(line);
    }
}

/// RGBA color, serialized as `#RRGGBB` or `#RRGGBBAA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const YELLOW: Color = Color { r: 255, g: 255, b: 0, a: 255 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0, a: 255 };
    pub const BLUE: Color = Color { r: 0, g: 0, b: 255, a: 255 };
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Same color with alpha taken from a 0.0..=1.0 opacity.
    pub fn with_opacity(self, opacity: f32) -> Self {
        let a = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self { a, ..self }
    }

    /// Normalized (r, g, b, a) in 0.0..=1.0.
    pub fn to_normalized(&self) -> (f32, f32, f32, f32) {
        (
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        )
    }

    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::YELLOW
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color {0:?}, expected #RRGGBB or #RRGGBBAA")]
pub struct ParseColorError(pub String);

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let hex = value.trim().trim_start_matches('#');
        let invalid = || ParseColorError(value.to_owned());

        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return Err(invalid());
        }

        let channel =
            |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).map_err(|_| invalid());

        let r = channel(0..2)?;
        let g = channel(2..4)?;
        let b = channel(4..6)?;
        let a = if hex.len() == 8 { channel(6..8)? } else { 255 };

        Ok(Self { r, g, b, a })
    }
}

impl TryFrom<String> for Color {
    type Error = ParseColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_corners_normalizes_any_drag_direction() {
        let rect = DocRect::from_corners(DocPoint::new(50.0, 80.0), DocPoint::new(10.0, 20.0));
        assert_eq!(rect, DocRect::new(20.0, 10.0, 40.0, 60.0));
    }

    #[test]
    fn degenerate_rects_are_detected() {
        assert!(PageRect::new(0.0, 0.0, 0.0, 10.0).is_degenerate());
        assert!(PageRect::new(0.0, 0.0, 10.0, -1.0).is_degenerate());
        assert!(PageRect::new(f32::NAN, 0.0, 10.0, 10.0).is_degenerate());
        assert!(!PageRect::new(0.0, 0.0, 10.0, 10.0).is_degenerate());
    }

    #[test]
    fn intersect_clips_to_overlap() {
        let surface = ViewportRect::new(0.0, 0.0, 100.0, 100.0);
        let partial = ViewportRect::new(90.0, -10.0, 30.0, 20.0);
        assert_eq!(partial.intersect(&surface), Some(ViewportRect::new(90.0, 0.0, 20.0, 10.0)));

        let outside = ViewportRect::new(200.0, 200.0, 5.0, 5.0);
        assert_eq!(outside.intersect(&surface), None);
    }

    #[test]
    fn reading_order_groups_lines_then_sorts_left_to_right() {
        let mut rects = vec![
            DocRect::new(40.0, 10.0, 100.0, 12.0),
            DocRect::new(11.0, 200.0, 50.0, 12.0),
            DocRect::new(10.0, 20.0, 150.0, 12.0),
        ];
        sort_reading_order(&mut rects);

        assert_eq!(rects[0].left, 20.0);
        assert_eq!(rects[1].left, 200.0);
        assert_eq!(rects[2].top, 40.0);
    }

    #[test]
    fn point_near_segment_handles_degenerate_segment() {
        let p = DocPoint::new(3.0, 4.0);
        let origin = DocPoint::new(0.0, 0.0);
        assert!(point_near_segment(&p, &origin, &origin, 5.0));
        assert!(!point_near_segment(&p, &origin, &origin, 4.9));
    }

    #[test]
    fn color_parses_and_formats_hex() {
        let color: Color = "#ff8000".parse().expect("valid hex");
        assert_eq!(color, Color::rgb(255, 128, 0));
        assert_eq!(color.to_hex(), "#FF8000");

        let translucent: Color = "FFFF0066".parse().expect("valid hex with alpha");
        assert_eq!(translucent.a, 0x66);
        assert_eq!(translucent.to_hex(), "#FFFF0066");

        assert!("#12345".parse::<Color>().is_err());
        assert!("#GGGGGG".parse::<Color>().is_err());
    }

    #[test]
    fn color_serializes_as_hex_string() {
        let json = serde_json::to_string(&Color::YELLOW).expect("serialize");
        assert_eq!(json, "\"#FFFF00\"");

        let back: Color = serde_json::from_str("\"#0000ff\"").expect("deserialize");
        assert_eq!(back, Color::BLUE);
    }

    #[test]
    fn rect_serializes_without_frame_marker() {
        let json = serde_json::to_value(DocRect::new(1.0, 2.0, 3.0, 4.0)).expect("serialize");
        assert_eq!(json, serde_json::json!({"top": 1.0, "left": 2.0, "width": 3.0, "height": 4.0}));
    }
}
