//! Annotation store for one open document.
//!
//! Single-writer by contract: the editor session owns the store and
//! serializes every mutation, so there is no locking here.

use crate::annotation::{
    Annotation, AnnotationBody, AnnotationFamily, AnnotationId, AnnotationType, Note, StampKind,
    TextSpan,
};
use crate::geometry::{sort_reading_order, Color, DocPoint, DocRect};
use crate::undo::{UndoLog, DEFAULT_UNDO_CAPACITY};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("annotation {0} not found")]
    NotFound(AnnotationId),
    #[error("page numbers are 1-based, got {0}")]
    InvalidPage(u32),
    #[error("{0} annotation needs at least one non-empty rectangle")]
    EmptyGeometry(AnnotationType),
    #[error("invalid {kind} geometry: {reason}")]
    InvalidGeometry { kind: AnnotationType, reason: &'static str },
    #[error("field `{field}` does not apply to {kind} annotations")]
    FieldNotApplicable { field: &'static str, kind: AnnotationType },
    #[error("duplicate annotation id {0}")]
    DuplicateId(AnnotationId),
}

pub type ModelResult<T> = Result<T, ModelError>;

/// Outcome of [`AnnotationStore::delete`].
///
/// Deleting an id that is not present is a normal, repeatable outcome.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum DeleteOutcome {
    Deleted(Annotation),
    NotFound,
}

impl DeleteOutcome {
    pub fn is_deleted(&self) -> bool {
        matches!(self, DeleteOutcome::Deleted(_))
    }
}

/// Input for [`AnnotationStore::create`]. Geometry must already be in document space.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAnnotation {
    pub page_number: u32,
    pub author: Option<String>,
    pub body: AnnotationBody,
}

impl NewAnnotation {
    pub fn new(page_number: u32, body: AnnotationBody) -> Self {
        Self { page_number, author: None, body }
    }

    pub fn highlight(page_number: u32, rects: Vec<DocRect>, text: impl Into<String>, color: Color) -> Self {
        Self::new(page_number, AnnotationBody::Highlight(TextSpan { rects, text: text.into(), color }))
    }

    pub fn note(page_number: u32, anchor: DocPoint, content: impl Into<String>) -> Self {
        Self::new(page_number, AnnotationBody::Note(Note { anchor, content: content.into() }))
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }
}

/// Partial update. Absent fields are left untouched.
///
/// `id`, `pageNumber` and `type` are not patchable; records carrying them
/// are rejected at deserialization.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AnnotationPatch {
    pub author: Option<String>,
    pub color: Option<Color>,
    pub text: Option<String>,
    pub rects: Option<Vec<DocRect>>,
    pub content: Option<String>,
    pub start: Option<DocPoint>,
    pub end: Option<DocPoint>,
    pub stroke_color: Option<Color>,
    pub fill_color: Option<Color>,
    pub stroke_width: Option<f32>,
    pub anchor: Option<DocPoint>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub rotation: Option<f32>,
    pub stamp_kind: Option<StampKind>,
}

impl AnnotationPatch {
    fn apply_to(self, body: &mut AnnotationBody) -> ModelResult<()> {
        let kind = body.kind();
        let not_applicable = |field: &'static str| ModelError::FieldNotApplicable { field, kind };

        if self.color.is_some() || self.text.is_some() || self.rects.is_some() {
            let span = body.text_span_mut().ok_or_else(|| {
                not_applicable(if self.color.is_some() {
                    "color"
                } else if self.text.is_some() {
                    "text"
                } else {
                    "rects"
                })
            })?;
            if let Some(color) = self.color {
                span.color = color;
            }
            if let Some(text) = self.text {
                span.text = text;
            }
            if let Some(rects) = self.rects {
                span.rects = rects;
            }
        }

        if self.start.is_some()
            || self.end.is_some()
            || self.stroke_color.is_some()
            || self.fill_color.is_some()
            || self.stroke_width.is_some()
        {
            let shape = body.shape_mut().ok_or_else(|| not_applicable("stroke"))?;
            if let Some(start) = self.start {
                shape.start_x = start.x;
                shape.start_y = start.y;
            }
            if let Some(end) = self.end {
                shape.end_x = end.x;
                shape.end_y = end.y;
            }
            if let Some(color) = self.stroke_color {
                shape.stroke_color = color;
            }
            if let Some(fill) = self.fill_color {
                shape.fill_color = Some(fill);
            }
            if let Some(width) = self.stroke_width {
                shape.stroke_width = width;
            }
        }

        if let Some(content) = self.content {
            match body {
                AnnotationBody::Note(note) => note.content = content,
                _ => return Err(not_applicable("content")),
            }
        }

        if let Some(anchor) = self.anchor {
            match body {
                AnnotationBody::Note(note) => note.anchor = anchor,
                AnnotationBody::Stamp(stamp) => stamp.anchor = anchor,
                _ => return Err(not_applicable("anchor")),
            }
        }

        if self.width.is_some()
            || self.height.is_some()
            || self.rotation.is_some()
            || self.stamp_kind.is_some()
        {
            let AnnotationBody::Stamp(stamp) = body else {
                return Err(not_applicable("stamp"));
            };
            if let Some(width) = self.width {
                stamp.width = width;
            }
            if let Some(height) = self.height {
                stamp.height = height;
            }
            if let Some(rotation) = self.rotation {
                stamp.rotation = rotation;
            }
            if let Some(stamp_kind) = self.stamp_kind {
                stamp.kind = stamp_kind;
            }
        }

        Ok(())
    }
}

/// Check and normalize a body before it is stored.
fn normalize_body(body: &mut AnnotationBody) -> ModelResult<()> {
    let kind = body.kind();
    let invalid = |reason| ModelError::InvalidGeometry { kind, reason };

    match body {
        AnnotationBody::Highlight(span)
        | AnnotationBody::Underline(span)
        | AnnotationBody::Strikethrough(span) => {
            if span.rects.is_empty() || span.rects.iter().any(DocRect::is_degenerate) {
                return Err(ModelError::EmptyGeometry(kind));
            }
            sort_reading_order(&mut span.rects);
        }
        AnnotationBody::Note(note) => {
            if !note.anchor.is_finite() {
                return Err(invalid("note anchor is not finite"));
            }
        }
        AnnotationBody::Rectangle(shape)
        | AnnotationBody::Circle(shape)
        | AnnotationBody::Arrow(shape) => {
            if !shape.start().is_finite() || !shape.end().is_finite() {
                return Err(invalid("shape corners are not finite"));
            }
            if !(shape.stroke_width.is_finite() && shape.stroke_width > 0.0) {
                return Err(invalid("stroke width must be positive"));
            }
        }
        AnnotationBody::Stamp(stamp) => {
            if !stamp.anchor.is_finite() {
                return Err(invalid("stamp anchor is not finite"));
            }
            if !(stamp.width > 0.0 && stamp.height > 0.0) {
                return Err(invalid("stamp size must be positive"));
            }
            if !stamp.rotation.is_finite() {
                return Err(invalid("stamp rotation is not finite"));
            }
            stamp.rotation = stamp.rotation.rem_euclid(360.0);
        }
    }

    Ok(())
}

/// All annotations of one document, indexed by id and by page.
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    annotations: HashMap<AnnotationId, Annotation>,
    /// Creation order per page.
    by_page: BTreeMap<u32, Vec<AnnotationId>>,
    undo: UndoLog,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::with_undo_capacity(DEFAULT_UNDO_CAPACITY)
    }

    pub fn with_undo_capacity(capacity: usize) -> Self {
        Self { annotations: HashMap::new(), by_page: BTreeMap::new(), undo: UndoLog::new(capacity) }
    }

    /// Validate, assign an id and timestamps, and store.
    pub fn create(&mut self, new: NewAnnotation) -> ModelResult<Annotation> {
        if new.page_number == 0 {
            return Err(ModelError::InvalidPage(new.page_number));
        }

        let mut body = new.body;
        normalize_body(&mut body)?;

        let annotation = Annotation::new(new.page_number, new.author, body);
        let id = annotation.id();
        tracing::debug!(%id, kind = %annotation.kind(), page = annotation.page_number(), "annotation created");

        self.by_page.entry(annotation.page_number()).or_default().push(id);
        self.undo.push(id);
        self.annotations.insert(id, annotation.clone());

        Ok(annotation)
    }

    /// Apply a partial update. On error the stored record is unchanged.
    pub fn update(&mut self, id: AnnotationId, patch: AnnotationPatch) -> ModelResult<Annotation> {
        let annotation = self.annotations.get_mut(&id).ok_or(ModelError::NotFound(id))?;

        let mut body = annotation.body().clone();
        let author = patch.author.clone();
        patch.apply_to(&mut body)?;
        normalize_body(&mut body)?;

        *annotation.body_mut() = body;
        if author.is_some() {
            annotation.set_author(author);
        }
        annotation.touch();
        tracing::debug!(%id, "annotation updated");

        Ok(annotation.clone())
    }

    /// Remove one record. Removing an absent id returns [`DeleteOutcome::NotFound`].
    pub fn delete(&mut self, id: AnnotationId) -> DeleteOutcome {
        let Some(annotation) = self.annotations.remove(&id) else {
            return DeleteOutcome::NotFound;
        };

        self.detach(&annotation);
        self.undo.forget(id);
        tracing::debug!(%id, "annotation deleted");

        DeleteOutcome::Deleted(annotation)
    }

    /// Remove the most recently created annotation accepted by `predicate`.
    ///
    /// No-op returning `None` when nothing in the undo log matches.
    pub fn undo_last(&mut self, predicate: impl Fn(&Annotation) -> bool) -> Option<Annotation> {
        let annotations = &self.annotations;
        let id = self
            .undo
            .pop_last_matching(|id| annotations.get(&id).is_some_and(|annotation| predicate(annotation)))?;

        let annotation = self.annotations.remove(&id)?;
        self.detach(&annotation);
        tracing::debug!(%id, kind = %annotation.kind(), "annotation undone");

        Some(annotation)
    }

    /// Undo the newest highlight, the toolbar's "undo last highlight".
    pub fn undo_last_highlight(&mut self) -> Option<Annotation> {
        self.undo_last(|annotation| annotation.kind() == AnnotationType::Highlight)
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.get(&id)
    }

    /// Annotations on `page_number` in creation order.
    pub fn list_by_page(&self, page_number: u32) -> Vec<&Annotation> {
        self.by_page
            .get(&page_number)
            .map(|ids| ids.iter().filter_map(|id| self.annotations.get(id)).collect())
            .unwrap_or_default()
    }

    /// Every annotation, ordered by page then creation.
    pub fn iter(&self) -> impl Iterator<Item = &Annotation> + '_ {
        self.by_page.values().flatten().filter_map(|id| self.annotations.get(id))
    }

    /// Every annotation of a variant family, ordered by page then creation.
    pub fn list_family(&self, family: AnnotationFamily) -> Vec<&Annotation> {
        self.iter().filter(|annotation| annotation.kind().family() == family).collect()
    }

    /// Annotations under `point`, topmost (newest) first.
    pub fn hit_test(&self, page_number: u32, point: &DocPoint, tolerance: f32) -> Vec<&Annotation> {
        let mut hits: Vec<&Annotation> = self
            .list_by_page(page_number)
            .into_iter()
            .filter(|annotation| annotation.hit_test(point, tolerance))
            .collect();
        hits.reverse();
        hits
    }

    /// Replace everything with records loaded from persistence.
    ///
    /// Records are ordered by `createdAt`; the undo log starts empty.
    pub fn replace_all(&mut self, records: Vec<Annotation>) -> ModelResult<()> {
        let mut records = records;
        records.sort_by_key(Annotation::created_at);

        let mut annotations = HashMap::with_capacity(records.len());
        let mut by_page: BTreeMap<u32, Vec<AnnotationId>> = BTreeMap::new();

        for mut record in records {
            if record.page_number() == 0 {
                return Err(ModelError::InvalidPage(0));
            }
            normalize_body(record.body_mut())?;

            let id = record.id();
            by_page.entry(record.page_number()).or_default().push(id);
            if annotations.insert(id, record).is_some() {
                return Err(ModelError::DuplicateId(id));
            }
        }

        tracing::debug!(count = annotations.len(), "annotation store replaced");
        self.annotations = annotations;
        self.by_page = by_page;
        self.undo.clear();
        Ok(())
    }

    /// Records grouped by page, in creation order, ready for persistence.
    pub fn to_page_map(&self) -> BTreeMap<u32, Vec<Annotation>> {
        self.by_page
            .iter()
            .map(|(page, ids)| {
                (*page, ids.iter().filter_map(|id| self.annotations.get(id)).cloned().collect())
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    fn detach(&mut self, annotation: &Annotation) {
        let page = annotation.page_number();
        if let Some(ids) = self.by_page.get_mut(&page) {
            ids.retain(|id| *id != annotation.id());
            if ids.is_empty() {
                self.by_page.remove(&page);
            }
        }
    }
}

impl Default for AnnotationStore {
    fn default() -> Self {
        Self::new()
    }
}
