mod annotation;
mod geometry;
mod store;
mod undo;
mod view_state;

pub use annotation::{
    Annotation, AnnotationBody, AnnotationFamily, AnnotationId, AnnotationType, Note, Shape,
    Stamp, StampKind, TextSpan, NOTE_HIT_RADIUS,
};
pub use geometry::{
    point_near_segment, sort_reading_order, Color, DocPoint, DocRect, DocumentSpace, PagePoint,
    PageRect, PageSpace, ParseColorError, Point, Rect, ViewportPoint, ViewportRect, ViewportSpace,
};
pub use store::{
    AnnotationPatch, AnnotationStore, DeleteOutcome, ModelError, ModelResult, NewAnnotation,
};
pub use undo::{UndoLog, DEFAULT_UNDO_CAPACITY};
pub use view_state::{apply_view_action, ViewAction, ViewState};
