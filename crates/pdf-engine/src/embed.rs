//! Burning highlight rectangles into a copy of a PDF.
//!
//! Marks are written as filled rectangles in each page's content stream.
//! They become part of the page drawing and are NOT PDF annotation objects:
//! a viewer opening the output cannot select, edit or remove them.
//!
//! Only highlight annotations are embedded. Other variants are skipped.

use crate::page;
use doc_model::{Annotation, AnnotationBody, Color, DocRect};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use pdfmark_scheduler::{Cancelled, CancellationToken};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use viewer_core::document_rect_to_pdf_space;

/// Graphics state resource name used for the highlight alpha.
const GRAPHICS_STATE_NAME: &str = "PdfmarkHighlight";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedOptions {
    /// Fill color for every embedded highlight.
    pub color: Color,
    /// Fill opacity, 0.0..=1.0.
    pub opacity: f32,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self { color: Color::YELLOW, opacity: 0.4 }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("source is not a valid PDF: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("encrypted PDFs cannot be exported")]
    Encrypted,
    #[error("source PDF has no pages")]
    NoPages,
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("failed to encode page content: {0}")]
    Encode(String),
    #[error("failed to write PDF: {0}")]
    Write(String),
    #[error("export cancelled")]
    Cancelled,
    #[error("export worker failed: {0}")]
    Worker(#[from] pdfmark_scheduler::TaskError),
}

impl From<Cancelled> for EmbedError {
    fn from(_: Cancelled) -> Self {
        EmbedError::Cancelled
    }
}

/// Embed highlights into a new copy of `source`.
///
/// `source` is only read. Fails without partial output when the bytes do not
/// parse or any highlight targets a page the document does not have.
pub fn embed(source: &[u8], annotations: &[Annotation], options: &EmbedOptions) -> Result<Vec<u8>, EmbedError> {
    embed_cancellable(source, annotations, options, &CancellationToken::new())
}

/// [`embed`] with cancellation checked between pages and before writing.
pub fn embed_cancellable(
    source: &[u8],
    annotations: &[Annotation],
    options: &EmbedOptions,
    token: &CancellationToken,
) -> Result<Vec<u8>, EmbedError> {
    if page::is_encrypted(source) {
        return Err(EmbedError::Encrypted);
    }

    let mut doc = Document::load_mem(source)?;
    let pages = doc.get_pages();
    if pages.is_empty() {
        return Err(EmbedError::NoPages);
    }
    let page_count = pages.len() as u32;

    let by_page = highlight_rects_by_page(annotations);
    if let Some((&page, _)) = by_page.iter().find(|(page, _)| **page == 0 || **page > page_count) {
        return Err(EmbedError::PageOutOfRange { page, page_count });
    }

    tracing::info!(pages = by_page.len(), page_count, "embedding highlights");

    for (page_number, rects) in &by_page {
        token.check()?;
        let Some(&page_id) = pages.get(page_number) else {
            return Err(EmbedError::PageOutOfRange { page: *page_number, page_count });
        };
        draw_rects(&mut doc, page_id, rects, options)?;
        tracing::debug!(page = page_number, rects = rects.len(), "page highlights embedded");
    }

    token.check()?;
    let mut output = Vec::new();
    doc.save_to(&mut output).map_err(|err| EmbedError::Write(err.to_string()))?;
    Ok(output)
}

fn highlight_rects_by_page(annotations: &[Annotation]) -> BTreeMap<u32, Vec<DocRect>> {
    let mut by_page: BTreeMap<u32, Vec<DocRect>> = BTreeMap::new();
    for annotation in annotations {
        if let AnnotationBody::Highlight(span) = annotation.body() {
            by_page.entry(annotation.page_number()).or_default().extend(span.rects.iter().copied());
        }
    }
    by_page
}

fn real(value: f32) -> Object {
    Object::Real(value.into())
}

fn draw_rects(doc: &mut Document, page_id: ObjectId, rects: &[DocRect], options: &EmbedOptions) -> Result<(), EmbedError> {
    let media_box = page::media_box(doc, page_id);
    let (r, g, b, _) = options.color.to_normalized();

    let mut operations = vec![
        Operation::new("Q", vec![]),
        Operation::new("q", vec![]),
        Operation::new("gs", vec![Object::Name(GRAPHICS_STATE_NAME.as_bytes().to_vec())]),
        Operation::new("rg", vec![real(r), real(g), real(b)]),
    ];
    for rect in rects {
        let pdf = document_rect_to_pdf_space(rect, media_box.height);
        operations.push(Operation::new(
            "re",
            vec![real(pdf.x + media_box.x0), real(pdf.y + media_box.y0), real(pdf.width), real(pdf.height)],
        ));
    }
    operations.push(Operation::new("f", vec![]));
    operations.push(Operation::new("Q", vec![]));

    let overlay = Content { operations }.encode().map_err(|err| EmbedError::Encode(err.to_string()))?;

    // Existing drawing is wrapped in q/Q; the overlay starts from the default state.
    let existing: Vec<Object> = doc.get_page_contents(page_id).into_iter().map(Object::Reference).collect();
    let prefix_id = doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
    let overlay_id = doc.add_object(Stream::new(dictionary! {}, overlay));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(prefix_id));
    contents.extend(existing);
    contents.push(Object::Reference(overlay_id));

    let resources = with_highlight_state(doc, page_id, options.opacity);

    let page = doc.get_object_mut(page_id).and_then(Object::as_dict_mut)?;
    page.set("Contents", Object::Array(contents));
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Page resources with the highlight graphics state added.
///
/// Shared or inherited resource objects are copied, never edited in place.
fn with_highlight_state(doc: &Document, page_id: ObjectId, opacity: f32) -> lopdf::Dictionary {
    let mut resources = page::resources(doc, page_id);

    let mut states = match resources.get(b"ExtGState") {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        Ok(Object::Reference(id)) => doc.get_dictionary(*id).cloned().unwrap_or_else(|_| lopdf::Dictionary::new()),
        _ => lopdf::Dictionary::new(),
    };

    let opacity = if opacity.is_finite() { opacity.clamp(0.0, 1.0) } else { 1.0 };
    states.set(
        GRAPHICS_STATE_NAME,
        dictionary! {
            "Type" => "ExtGState",
            "ca" => real(opacity),
            "CA" => real(opacity),
        },
    );
    resources.set("ExtGState", Object::Dictionary(states));
    resources
}
