//! Page tree lookups shared by the engine and the embedder.

use lopdf::{Dictionary, Document, Object, ObjectId};

/// US Letter, used when neither the page nor its ancestors carry a MediaBox.
pub(crate) const DEFAULT_MEDIA_BOX: MediaBox = MediaBox { x0: 0.0, y0: 0.0, width: 612.0, height: 792.0 };

/// Lower-left origin and extent of a page's MediaBox.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MediaBox {
    pub x0: f32,
    pub y0: f32,
    pub width: f32,
    pub height: f32,
}

pub(crate) fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}

/// Look `key` up on the page, then on each ancestor in the page tree.
pub(crate) fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = Some(page_id);
    // Page trees are shallow; the bound only guards against Parent cycles.
    for _ in 0..64 {
        let dict = doc.get_dictionary(current?).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(resolve(doc, value));
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

pub(crate) fn media_box(doc: &Document, page_id: ObjectId) -> MediaBox {
    inherited(doc, page_id, b"MediaBox")
        .and_then(|object| object.as_array().ok())
        .and_then(|array| {
            let [x0, y0, x1, y1] = array.as_slice() else {
                return None;
            };
            let (x0, y0, x1, y1) = (number(x0)?, number(y0)?, number(x1)?, number(y1)?);
            Some(MediaBox {
                x0: x0.min(x1),
                y0: y0.min(y1),
                width: (x1 - x0).abs(),
                height: (y1 - y0).abs(),
            })
        })
        .filter(|media_box| media_box.width > 0.0 && media_box.height > 0.0)
        .unwrap_or(DEFAULT_MEDIA_BOX)
}

/// Effective resources of a page as an owned dictionary.
pub(crate) fn resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    inherited(doc, page_id, b"Resources")
        .and_then(|object| object.as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new)
}

pub(crate) fn is_encrypted(bytes: &[u8]) -> bool {
    bytes.windows(b"/Encrypt".len()).any(|window| window == b"/Encrypt")
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_box_is_inherited_from_page_tree() {
        let doc = Document::load_mem(&fixtures::pdf_with_inherited_box()).expect("load");
        let page_id = *doc.get_pages().get(&1).expect("page 1");

        assert_eq!(media_box(&doc, page_id), MediaBox { x0: 0.0, y0: 100.0, width: 595.0, height: 842.0 });
        assert!(resources(&doc, page_id).has(b"ExtGState"));
    }

    #[test]
    fn missing_media_box_falls_back_to_letter() {
        let doc = Document::with_version("1.5");
        assert_eq!(media_box(&doc, (99, 0)), DEFAULT_MEDIA_BOX);
    }

    #[test]
    fn encrypt_marker_is_detected() {
        assert!(is_encrypted(b"trailer << /Encrypt 5 0 R >>"));
        assert!(!is_encrypted(&fixtures::pdf_with_pages(&[(612, 792)])));
    }
}
