//! Minimal software painter for overlay primitives on a rendered page.
//!
//! Fills are alpha-blended. Ellipses, note markers and stamps are drawn as
//! their bounding boxes; text is not rasterized.

use doc_model::{Color, ViewportPoint, ViewportRect};
use image::Rgba;
use pdf_engine::RgbaImage;
use viewer_core::DrawPrimitive;

const NOTE_FILL: Color = Color::rgb(255, 235, 59);
const SELECTION_STROKE: Color = Color::rgb(33, 150, 243);

pub(crate) fn paint(image: &mut RgbaImage, primitives: &[DrawPrimitive]) {
    for primitive in primitives {
        match primitive {
            DrawPrimitive::FillRect { rect, color } => fill_rect(image, *rect, *color),
            DrawPrimitive::Line { from, to, color, width } => line(image, *from, *to, *color, *width),
            DrawPrimitive::StrokeRect { rect, stroke, fill, width }
            | DrawPrimitive::Ellipse { bounds: rect, stroke, fill, width } => {
                if let Some(fill) = fill {
                    fill_rect(image, *rect, *fill);
                }
                stroke_rect(image, *rect, *stroke, *width);
            }
            DrawPrimitive::Polygon { points, fill } => {
                for (index, from) in points.iter().enumerate() {
                    let to = points[(index + 1) % points.len()];
                    line(image, *from, to, *fill, 1.0);
                }
            }
            DrawPrimitive::NoteMarker { rect, .. } => {
                fill_rect(image, *rect, NOTE_FILL);
                stroke_rect(image, *rect, Color::BLACK, 1.0);
            }
            DrawPrimitive::StampLabel { rect, fill, border, .. } => {
                fill_rect(image, *rect, *fill);
                stroke_rect(image, *rect, *border, 2.0);
            }
            DrawPrimitive::SelectionOutline { rect } => stroke_rect(image, *rect, SELECTION_STROKE, 1.0),
        }
    }
}

fn blend(image: &mut RgbaImage, x: i64, y: i64, color: Color) {
    if x < 0 || y < 0 || x >= i64::from(image.width()) || y >= i64::from(image.height()) {
        return;
    }

    let alpha = f32::from(color.a) / 255.0;
    let pixel = image.get_pixel_mut(x as u32, y as u32);
    let Rgba([r, g, b, a]) = *pixel;
    let mix = |under: u8, over: u8| (f32::from(under) * (1.0 - alpha) + f32::from(over) * alpha).round() as u8;
    *pixel = Rgba([mix(r, color.r), mix(g, color.g), mix(b, color.b), a.max(color.a)]);
}

fn fill_rect(image: &mut RgbaImage, rect: ViewportRect, color: Color) {
    if rect.is_degenerate() {
        return;
    }

    let (x0, x1) = (rect.left.floor() as i64, rect.right().ceil() as i64);
    let (y0, y1) = (rect.top.floor() as i64, rect.bottom().ceil() as i64);
    let x0 = x0.max(0);
    let y0 = y0.max(0);
    let x1 = x1.min(i64::from(image.width()));
    let y1 = y1.min(i64::from(image.height()));

    for y in y0..y1 {
        for x in x0..x1 {
            blend(image, x, y, color);
        }
    }
}

fn stroke_rect(image: &mut RgbaImage, rect: ViewportRect, color: Color, width: f32) {
    let corners = [
        ViewportPoint::new(rect.left, rect.top),
        ViewportPoint::new(rect.right(), rect.top),
        ViewportPoint::new(rect.right(), rect.bottom()),
        ViewportPoint::new(rect.left, rect.bottom()),
    ];
    for index in 0..corners.len() {
        line(image, corners[index], corners[(index + 1) % corners.len()], color, width);
    }
}

/// Sampled line; each sample paints a square brush of `width` pixels.
fn line(image: &mut RgbaImage, from: ViewportPoint, to: ViewportPoint, color: Color, width: f32) {
    if !from.is_finite() || !to.is_finite() {
        return;
    }

    let length = from.distance_to(&to);
    let steps = length.ceil().max(1.0) as usize;
    let radius = (width.max(1.0) / 2.0).floor() as i64;
    let mut last: Option<(i64, i64)> = None;

    for step in 0..=steps {
        let t = step as f32 / steps as f32;
        let x = (from.x + (to.x - from.x) * t).round() as i64;
        let y = (from.y + (to.y - from.y) * t).round() as i64;
        if last == Some((x, y)) {
            continue;
        }
        last = Some((x, y));

        for dy in -radius..=radius {
            for dx in -radius..=radius {
                blend(image, x + dx, y + dy, color);
            }
        }
    }
}
