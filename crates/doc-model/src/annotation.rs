//! Annotation data model
//!
//! An annotation is a small header (id, page, timestamps, author) plus a
//! closed tagged union of variant bodies. All geometry carried by a body is
//! in document space so that a stored record can be redrawn at any zoom.
//!
//! On the wire an annotation is a single flat record: the header fields and
//! the body fields side by side, discriminated by `type`.

use crate::geometry::{point_near_segment, Color, DocPoint, DocRect};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for an annotation.
///
/// Assigned once at creation and never changed afterwards.
pub type AnnotationId = uuid::Uuid;

/// Half-size, in document units, of the square a note anchor answers to in hit tests.
pub const NOTE_HIT_RADIUS: f32 = 12.0;

/// Discriminant of [`AnnotationBody`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationType {
    Highlight,
    Underline,
    Strikethrough,
    Note,
    Rectangle,
    Circle,
    Arrow,
    Stamp,
}

/// Variant families that share rendering and validation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationFamily {
    Highlight,
    TextMarkup,
    Note,
    Shape,
    Stamp,
}

impl AnnotationType {
    pub fn family(self) -> AnnotationFamily {
        match self {
            AnnotationType::Highlight => AnnotationFamily::Highlight,
            AnnotationType::Underline | AnnotationType::Strikethrough => {
                AnnotationFamily::TextMarkup
            }
            AnnotationType::Note => AnnotationFamily::Note,
            AnnotationType::Rectangle | AnnotationType::Circle | AnnotationType::Arrow => {
                AnnotationFamily::Shape
            }
            AnnotationType::Stamp => AnnotationFamily::Stamp,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnnotationType::Highlight => "highlight",
            AnnotationType::Underline => "underline",
            AnnotationType::Strikethrough => "strikethrough",
            AnnotationType::Note => "note",
            AnnotationType::Rectangle => "rectangle",
            AnnotationType::Circle => "circle",
            AnnotationType::Arrow => "arrow",
            AnnotationType::Stamp => "stamp",
        }
    }
}

impl std::fmt::Display for AnnotationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A run of selected text: one rectangle per visual line fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    /// Non-empty, in reading order.
    pub rects: Vec<DocRect>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub color: Color,
}

/// Sticky note anchored at a point.
///
/// Whether the note is expanded is view state, see [`crate::ViewState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(flatten)]
    pub anchor: DocPoint,
    #[serde(default)]
    pub content: String,
}

/// Box-like shape spanned by a drag from `start` to `end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    pub start_x: f32,
    pub start_y: f32,
    pub end_x: f32,
    pub end_y: f32,
    pub stroke_color: Color,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<Color>,
    pub stroke_width: f32,
}

impl Shape {
    pub fn new(start: DocPoint, end: DocPoint, stroke_color: Color, stroke_width: f32) -> Self {
        Self {
            start_x: start.x,
            start_y: start.y,
            end_x: end.x,
            end_y: end.y,
            stroke_color,
            fill_color: None,
            stroke_width,
        }
    }

    pub fn start(&self) -> DocPoint {
        DocPoint::new(self.start_x, self.start_y)
    }

    pub fn end(&self) -> DocPoint {
        DocPoint::new(self.end_x, self.end_y)
    }

    pub fn bounds(&self) -> DocRect {
        DocRect::from_corners(self.start(), self.end())
    }
}

/// Stamp vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StampKind {
    Approved,
    Rejected,
    Reviewed,
    Confidential,
    Custom(String),
}

impl StampKind {
    pub fn label(&self) -> &str {
        match self {
            StampKind::Approved => "APPROVED",
            StampKind::Rejected => "REJECTED",
            StampKind::Reviewed => "REVIEWED",
            StampKind::Confidential => "CONFIDENTIAL",
            StampKind::Custom(text) if !text.trim().is_empty() => text,
            StampKind::Custom(_) => "CUSTOM",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stamp {
    /// Center of the stamp.
    #[serde(flatten)]
    pub anchor: DocPoint,
    pub width: f32,
    pub height: f32,
    /// Degrees, normalized into `[0, 360)` on create and update.
    #[serde(default)]
    pub rotation: f32,
    #[serde(rename = "stampType")]
    pub kind: StampKind,
}

impl Stamp {
    pub fn bounds(&self) -> DocRect {
        DocRect::new(
            self.anchor.y - self.height / 2.0,
            self.anchor.x - self.width / 2.0,
            self.width,
            self.height,
        )
    }
}

/// Variant bodies, discriminated by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnnotationBody {
    Highlight(TextSpan),
    Underline(TextSpan),
    Strikethrough(TextSpan),
    Note(Note),
    Rectangle(Shape),
    Circle(Shape),
    Arrow(Shape),
    Stamp(Stamp),
}

impl AnnotationBody {
    pub fn kind(&self) -> AnnotationType {
        match self {
            AnnotationBody::Highlight(_) => AnnotationType::Highlight,
            AnnotationBody::Underline(_) => AnnotationType::Underline,
            AnnotationBody::Strikethrough(_) => AnnotationType::Strikethrough,
            AnnotationBody::Note(_) => AnnotationType::Note,
            AnnotationBody::Rectangle(_) => AnnotationType::Rectangle,
            AnnotationBody::Circle(_) => AnnotationType::Circle,
            AnnotationBody::Arrow(_) => AnnotationType::Arrow,
            AnnotationBody::Stamp(_) => AnnotationType::Stamp,
        }
    }

    /// Text span for highlight and markup variants.
    pub fn text_span(&self) -> Option<&TextSpan> {
        match self {
            AnnotationBody::Highlight(span)
            | AnnotationBody::Underline(span)
            | AnnotationBody::Strikethrough(span) => Some(span),
            _ => None,
        }
    }

    pub(crate) fn text_span_mut(&mut self) -> Option<&mut TextSpan> {
        match self {
            AnnotationBody::Highlight(span)
            | AnnotationBody::Underline(span)
            | AnnotationBody::Strikethrough(span) => Some(span),
            _ => None,
        }
    }

    pub fn shape(&self) -> Option<&Shape> {
        match self {
            AnnotationBody::Rectangle(shape)
            | AnnotationBody::Circle(shape)
            | AnnotationBody::Arrow(shape) => Some(shape),
            _ => None,
        }
    }

    pub(crate) fn shape_mut(&mut self) -> Option<&mut Shape> {
        match self {
            AnnotationBody::Rectangle(shape)
            | AnnotationBody::Circle(shape)
            | AnnotationBody::Arrow(shape) => Some(shape),
            _ => None,
        }
    }

    /// Document-space bounding box of the body.
    pub fn bounds(&self) -> DocRect {
        match self {
            AnnotationBody::Highlight(span)
            | AnnotationBody::Underline(span)
            | AnnotationBody::Strikethrough(span) => {
                let mut iter = span.rects.iter();
                let Some(first) = iter.next() else {
                    return DocRect::new(0.0, 0.0, 0.0, 0.0);
                };
                let (mut left, mut top, mut right, mut bottom) =
                    (first.left, first.top, first.right(), first.bottom());
                for rect in iter {
                    left = left.min(rect.left);
                    top = top.min(rect.top);
                    right = right.max(rect.right());
                    bottom = bottom.max(rect.bottom());
                }
                DocRect::new(top, left, right - left, bottom - top)
            }
            AnnotationBody::Note(note) => DocRect::new(
                note.anchor.y - NOTE_HIT_RADIUS,
                note.anchor.x - NOTE_HIT_RADIUS,
                NOTE_HIT_RADIUS * 2.0,
                NOTE_HIT_RADIUS * 2.0,
            ),
            AnnotationBody::Rectangle(shape)
            | AnnotationBody::Circle(shape)
            | AnnotationBody::Arrow(shape) => shape.bounds(),
            AnnotationBody::Stamp(stamp) => stamp.bounds(),
        }
    }

    /// Whether `point` (document space) hits this body.
    pub fn contains_point(&self, point: &DocPoint, tolerance: f32) -> bool {
        match self {
            AnnotationBody::Highlight(span)
            | AnnotationBody::Underline(span)
            | AnnotationBody::Strikethrough(span) => {
                span.rects.iter().any(|rect| rect.contains(*point, tolerance))
            }
            AnnotationBody::Note(_) | AnnotationBody::Stamp(_) | AnnotationBody::Rectangle(_) => {
                self.bounds().contains(*point, tolerance)
            }
            AnnotationBody::Circle(shape) => {
                let bounds = shape.bounds();
                let rx = bounds.width / 2.0 + tolerance;
                let ry = bounds.height / 2.0 + tolerance;
                if rx <= 0.0 || ry <= 0.0 {
                    return false;
                }
                let center = bounds.center();
                let dx = (point.x - center.x) / rx;
                let dy = (point.y - center.y) / ry;
                dx * dx + dy * dy <= 1.0
            }
            AnnotationBody::Arrow(shape) => {
                let reach = tolerance + shape.stroke_width / 2.0;
                point_near_segment(point, &shape.start(), &shape.end(), reach)
            }
        }
    }
}

/// A stored annotation.
///
/// `id`, `page_number` and the body's type are fixed for the lifetime of the
/// record; the store only hands out shared references, and edits go through
/// [`crate::AnnotationStore::update`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    id: AnnotationId,
    page_number: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    author: Option<String>,
    #[serde(flatten)]
    body: AnnotationBody,
}

impl Annotation {
    pub(crate) fn new(page_number: u32, author: Option<String>, body: AnnotationBody) -> Self {
        let now = Utc::now();
        Self { id: AnnotationId::new_v4(), page_number, created_at: now, updated_at: now, author, body }
    }

    pub fn id(&self) -> AnnotationId {
        self.id
    }

    /// 1-based page number.
    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn kind(&self) -> AnnotationType {
        self.body.kind()
    }

    pub fn body(&self) -> &AnnotationBody {
        &self.body
    }

    pub(crate) fn body_mut(&mut self) -> &mut AnnotationBody {
        &mut self.body
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub(crate) fn set_author(&mut self, author: Option<String>) {
        self.author = author;
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Bump `updated_at` to now, never moving it backwards.
    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.updated_at).max(self.created_at);
    }

    /// Hit test in document space.
    pub fn hit_test(&self, point: &DocPoint, tolerance: f32) -> bool {
        self.body.contains_point(point, tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn highlight() -> Annotation {
        Annotation::new(
            2,
            Some("ana".to_owned()),
            AnnotationBody::Highlight(TextSpan {
                rects: vec![DocRect::new(200.0, 100.0, 400.0, 40.0)],
                text: "hello".to_owned(),
                color: Color::YELLOW,
            }),
        )
    }

    #[test]
    fn highlight_serializes_as_flat_record() {
        let annotation = highlight();
        let value = serde_json::to_value(&annotation).expect("serialize");

        assert_eq!(value["type"], "highlight");
        assert_eq!(value["pageNumber"], 2);
        assert_eq!(value["author"], "ana");
        assert_eq!(value["color"], "#FFFF00");
        assert_eq!(value["rects"][0], json!({"top": 200.0, "left": 100.0, "width": 400.0, "height": 40.0}));
        assert!(value.get("body").is_none());

        let back: Annotation = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, annotation);
    }

    #[test]
    fn shape_and_stamp_use_flat_coordinate_fields() {
        let mut shape = Shape::new(DocPoint::new(1.0, 2.0), DocPoint::new(3.0, 4.0), Color::RED, 2.0);
        shape.fill_color = Some(Color::BLUE);
        let arrow = Annotation::new(1, None, AnnotationBody::Arrow(shape));
        let value = serde_json::to_value(&arrow).expect("serialize");
        assert_eq!(value["type"], "arrow");
        assert_eq!(value["startX"], 1.0);
        assert_eq!(value["endY"], 4.0);
        assert_eq!(value["strokeColor"], "#FF0000");
        assert_eq!(value["fillColor"], "#0000FF");
        assert_eq!(value["strokeWidth"], 2.0);

        let stamp = Annotation::new(
            1,
            None,
            AnnotationBody::Stamp(Stamp {
                anchor: DocPoint::new(50.0, 60.0),
                width: 120.0,
                height: 40.0,
                rotation: 15.0,
                kind: StampKind::Custom("DRAFT".to_owned()),
            }),
        );
        let value = serde_json::to_value(&stamp).expect("serialize");
        assert_eq!(value["x"], 50.0);
        assert_eq!(value["y"], 60.0);
        assert_eq!(value["stampType"], json!({"custom": "DRAFT"}));
    }

    #[test]
    fn note_record_has_no_open_flag() {
        let note = Annotation::new(
            3,
            None,
            AnnotationBody::Note(Note { anchor: DocPoint::new(10.0, 20.0), content: "todo".to_owned() }),
        );
        let value = serde_json::to_value(&note).expect("serialize");
        assert_eq!(value["x"], 10.0);
        assert_eq!(value["content"], "todo");
        assert!(value.get("isOpen").is_none());
    }

    #[test]
    fn stamp_labels_fall_back_for_empty_custom_text() {
        assert_eq!(StampKind::Approved.label(), "APPROVED");
        assert_eq!(StampKind::Custom("Paid".to_owned()).label(), "Paid");
        assert_eq!(StampKind::Custom("  ".to_owned()).label(), "CUSTOM");
    }

    #[test]
    fn families_group_variants() {
        assert_eq!(AnnotationType::Strikethrough.family(), AnnotationFamily::TextMarkup);
        assert_eq!(AnnotationType::Circle.family(), AnnotationFamily::Shape);
        assert_eq!(AnnotationType::Highlight.family(), AnnotationFamily::Highlight);
    }

    #[test]
    fn hit_testing_follows_variant_geometry() {
        let annotation = highlight();
        assert!(annotation.hit_test(&DocPoint::new(150.0, 210.0), 0.0));
        assert!(!annotation.hit_test(&DocPoint::new(50.0, 210.0), 0.0));

        let circle = AnnotationBody::Circle(Shape::new(
            DocPoint::new(0.0, 0.0),
            DocPoint::new(100.0, 50.0),
            Color::RED,
            1.0,
        ));
        assert!(circle.contains_point(&DocPoint::new(50.0, 25.0), 0.0));
        assert!(!circle.contains_point(&DocPoint::new(2.0, 2.0), 0.0));

        let arrow = AnnotationBody::Arrow(Shape::new(
            DocPoint::new(0.0, 0.0),
            DocPoint::new(100.0, 0.0),
            Color::RED,
            2.0,
        ));
        assert!(arrow.contains_point(&DocPoint::new(50.0, 2.0), 1.5));
        assert!(!arrow.contains_point(&DocPoint::new(50.0, 10.0), 1.5));
    }

    #[test]
    fn multi_rect_bounds_cover_every_line() {
        let body = AnnotationBody::Underline(TextSpan {
            rects: vec![DocRect::new(10.0, 50.0, 100.0, 10.0), DocRect::new(22.0, 5.0, 40.0, 10.0)],
            text: String::new(),
            color: Color::BLUE,
        });
        assert_eq!(body.bounds(), DocRect::new(10.0, 5.0, 145.0, 22.0));
    }
}
