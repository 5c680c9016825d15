//! Drawable overlay primitives for stored annotations.
//!
//! Geometry is re-derived from document space on every call; nothing here
//! keeps pre-scaled values around between scale changes.

use crate::config::ViewerConfig;
use crate::scale::Scale;
use crate::transform::{document_to_viewport, point_page_to_viewport, point_to_page_space};
use doc_model::{
    Annotation, AnnotationBody, AnnotationStore, Color, DocPoint, Shape, Stamp, StampKind,
    TextSpan, ViewState, ViewportPoint, ViewportRect,
};
use serde::Serialize;

/// Scale and surface placement used to project document geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub scale: Scale,
    /// Top-left of the rendered page surface in the viewport.
    pub surface_origin: ViewportPoint,
}

impl Projection {
    pub fn new(scale: Scale, surface_origin: ViewportPoint) -> Self {
        Self { scale, surface_origin }
    }

    /// Projection onto a surface placed at the viewport origin.
    pub fn at_scale(scale: Scale) -> Self {
        Self::new(scale, ViewportPoint::new(0.0, 0.0))
    }

    pub fn rect(&self, rect: doc_model::DocRect) -> ViewportRect {
        document_to_viewport(rect, self.scale, self.surface_origin)
    }

    pub fn point(&self, point: DocPoint) -> ViewportPoint {
        point_page_to_viewport(point_to_page_space(point, self.scale), self.surface_origin)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "primitive", rename_all = "snake_case")]
pub enum DrawPrimitive {
    FillRect {
        rect: ViewportRect,
        color: Color,
    },
    Line {
        from: ViewportPoint,
        to: ViewportPoint,
        color: Color,
        width: f32,
    },
    StrokeRect {
        rect: ViewportRect,
        stroke: Color,
        fill: Option<Color>,
        width: f32,
    },
    Ellipse {
        bounds: ViewportRect,
        stroke: Color,
        fill: Option<Color>,
        width: f32,
    },
    Polygon {
        points: Vec<ViewportPoint>,
        fill: Color,
    },
    NoteMarker {
        rect: ViewportRect,
        open: bool,
        content: String,
    },
    StampLabel {
        rect: ViewportRect,
        rotation: f32,
        label: String,
        fill: Color,
        border: Color,
    },
    SelectionOutline {
        rect: ViewportRect,
    },
}

/// Produces primitives for annotations at a given projection.
#[derive(Debug, Clone, Default)]
pub struct OverlayRenderer {
    config: ViewerConfig,
}

impl OverlayRenderer {
    pub fn new(config: ViewerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn render(
        &self,
        annotation: &Annotation,
        projection: &Projection,
        view_state: &ViewState,
    ) -> Vec<DrawPrimitive> {
        let mut primitives = match annotation.body() {
            AnnotationBody::Highlight(span) => self.highlight(span, projection),
            AnnotationBody::Underline(span) => self.markup_lines(span, projection, 1.0),
            AnnotationBody::Strikethrough(span) => self.markup_lines(span, projection, 0.5),
            AnnotationBody::Note(note) => {
                let center = projection.point(note.anchor);
                vec![DrawPrimitive::NoteMarker {
                    rect: centered(center, self.config.note_marker_px, self.config.note_marker_px),
                    open: view_state.is_note_open(annotation.id()),
                    content: note.content.clone(),
                }]
            }
            AnnotationBody::Rectangle(shape) => {
                vec![DrawPrimitive::StrokeRect {
                    rect: projection.rect(shape.bounds()),
                    stroke: shape.stroke_color,
                    fill: shape.fill_color,
                    width: shape.stroke_width,
                }]
            }
            AnnotationBody::Circle(shape) => {
                vec![DrawPrimitive::Ellipse {
                    bounds: projection.rect(shape.bounds()),
                    stroke: shape.stroke_color,
                    fill: shape.fill_color,
                    width: shape.stroke_width,
                }]
            }
            AnnotationBody::Arrow(shape) => self.arrow(shape, projection),
            AnnotationBody::Stamp(stamp) => vec![self.stamp(stamp, projection)],
        };

        if view_state.is_selected(annotation.id()) {
            primitives.push(DrawPrimitive::SelectionOutline {
                rect: projection.rect(annotation.body().bounds()),
            });
        }

        primitives
    }

    /// All annotations on `page_number`, bottom to top.
    pub fn render_page(
        &self,
        store: &AnnotationStore,
        page_number: u32,
        projection: &Projection,
        view_state: &ViewState,
    ) -> Vec<DrawPrimitive> {
        store
            .list_by_page(page_number)
            .into_iter()
            .flat_map(|annotation| self.render(annotation, projection, view_state))
            .collect()
    }

    fn highlight(&self, span: &TextSpan, projection: &Projection) -> Vec<DrawPrimitive> {
        let color = if span.color.a == u8::MAX {
            span.color.with_opacity(self.config.highlight_fill_alpha)
        } else {
            span.color
        };

        span.rects
            .iter()
            .map(|rect| DrawPrimitive::FillRect { rect: projection.rect(*rect), color })
            .collect()
    }

    /// One line per rect at `fraction` of its height (1.0 = bottom edge).
    fn markup_lines(&self, span: &TextSpan, projection: &Projection, fraction: f32) -> Vec<DrawPrimitive> {
        let width = self.config.markup_line_px;
        span.rects
            .iter()
            .map(|rect| {
                let rect = projection.rect(*rect);
                let mut y = rect.top + rect.height * fraction;
                if fraction >= 1.0 {
                    y -= width / 2.0;
                }
                DrawPrimitive::Line {
                    from: ViewportPoint::new(rect.left, y),
                    to: ViewportPoint::new(rect.right(), y),
                    color: span.color,
                    width,
                }
            })
            .collect()
    }

    fn arrow(&self, shape: &Shape, projection: &Projection) -> Vec<DrawPrimitive> {
        let from = projection.point(shape.start());
        let to = projection.point(shape.end());

        let mut primitives =
            vec![DrawPrimitive::Line { from, to, color: shape.stroke_color, width: shape.stroke_width }];
        if let Some(head) =
            arrowhead(from, to, self.config.arrow_head_length_px, self.config.arrow_head_width_px)
        {
            primitives.push(DrawPrimitive::Polygon { points: head.to_vec(), fill: shape.stroke_color });
        }
        primitives
    }

    fn stamp(&self, stamp: &Stamp, projection: &Projection) -> DrawPrimitive {
        let scale = projection.scale.get();
        let width = (stamp.width * scale).max(self.config.stamp_min_width_px);
        let height = (stamp.height * scale).max(self.config.stamp_min_height_px);
        let (fill, border) = stamp_palette(&stamp.kind);

        DrawPrimitive::StampLabel {
            rect: centered(projection.point(stamp.anchor), width, height),
            rotation: stamp.rotation,
            label: stamp.kind.label().to_owned(),
            fill,
            border,
        }
    }
}

/// Triangle with its tip at `end`, pointing away from `start`.
///
/// Returns `None` for zero-length segments, which have no direction.
pub fn arrowhead(start: ViewportPoint, end: ViewportPoint, length: f32, width: f32) -> Option<[ViewportPoint; 3]> {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let distance = (dx * dx + dy * dy).sqrt();
    if !(distance > f32::EPSILON) {
        return None;
    }

    let (ux, uy) = (dx / distance, dy / distance);
    let base = ViewportPoint::new(end.x - ux * length, end.y - uy * length);
    let half = width / 2.0;

    Some([
        end,
        ViewportPoint::new(base.x - uy * half, base.y + ux * half),
        ViewportPoint::new(base.x + uy * half, base.y - ux * half),
    ])
}

/// Light fill and strong border for each stamp kind.
pub fn stamp_palette(kind: &StampKind) -> (Color, Color) {
    match kind {
        StampKind::Approved => (Color::rgb(220, 252, 231), Color::rgb(22, 163, 74)),
        StampKind::Rejected => (Color::rgb(254, 226, 226), Color::rgb(220, 38, 38)),
        StampKind::Reviewed => (Color::rgb(219, 234, 254), Color::rgb(37, 99, 235)),
        StampKind::Confidential => (Color::rgb(255, 237, 213), Color::rgb(234, 88, 12)),
        StampKind::Custom(_) => (Color::rgb(243, 232, 255), Color::rgb(147, 51, 234)),
    }
}

fn centered(center: ViewportPoint, width: f32, height: f32) -> ViewportRect {
    ViewportRect::new(center.y - height / 2.0, center.x - width / 2.0, width, height)
}
