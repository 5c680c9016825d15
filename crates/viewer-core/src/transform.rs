//! Named conversions between coordinate frames.
//!
//! Document space and page space differ only by the render scale. Viewport
//! space differs from page space by the origin of the rendered page surface.
//! PDF space is document space with the vertical axis flipped to a
//! bottom-left origin, and is only used when writing into a PDF.

use crate::scale::Scale;
use doc_model::{DocPoint, DocRect, PagePoint, PageRect, ViewportPoint, ViewportRect};
use serde::{Deserialize, Serialize};

pub fn to_document_space(rect: PageRect, scale: Scale) -> DocRect {
    rect.scaled(1.0 / scale.get()).cast()
}

pub fn to_page_space(rect: DocRect, scale: Scale) -> PageRect {
    rect.scaled(scale.get()).cast()
}

pub fn point_to_document_space(point: PagePoint, scale: Scale) -> DocPoint {
    point.scaled(1.0 / scale.get()).cast()
}

pub fn point_to_page_space(point: DocPoint, scale: Scale) -> PagePoint {
    point.scaled(scale.get()).cast()
}

/// Place a page-space rect on the viewport given where the page surface starts.
pub fn page_to_viewport(rect: PageRect, surface_origin: ViewportPoint) -> ViewportRect {
    rect.translate(surface_origin.x, surface_origin.y).cast()
}

/// Express a viewport rect relative to the page surface's top-left corner.
pub fn viewport_to_page(rect: ViewportRect, surface_origin: ViewportPoint) -> PageRect {
    rect.translate(-surface_origin.x, -surface_origin.y).cast()
}

pub fn point_page_to_viewport(point: PagePoint, surface_origin: ViewportPoint) -> ViewportPoint {
    ViewportPoint::new(point.x + surface_origin.x, point.y + surface_origin.y)
}

pub fn point_viewport_to_page(point: ViewportPoint, surface_origin: ViewportPoint) -> PagePoint {
    PagePoint::new(point.x - surface_origin.x, point.y - surface_origin.y)
}

/// Document rect straight to viewport pixels at `scale`.
pub fn document_to_viewport(rect: DocRect, scale: Scale, surface_origin: ViewportPoint) -> ViewportRect {
    page_to_viewport(to_page_space(rect, scale), surface_origin)
}

/// Rectangle with a bottom-left origin, in PDF user space units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PdfRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Flip a top-left origin rect onto a page of native height `page_height`.
pub fn document_rect_to_pdf_space(rect: &DocRect, page_height: f32) -> PdfRect {
    PdfRect {
        x: rect.left,
        y: page_height - rect.top - rect.height,
        width: rect.width,
        height: rect.height,
    }
}

pub fn pdf_rect_to_document_space(rect: &PdfRect, page_height: f32) -> DocRect {
    DocRect::new(page_height - rect.y - rect.height, rect.x, rect.width, rect.height)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale(value: f32) -> Scale {
        Scale::new(value).expect("positive scale")
    }

    #[test]
    fn half_scale_capture_doubles_into_document_space() {
        let captured = PageRect::new(100.0, 50.0, 200.0, 20.0);
        let stored = to_document_space(captured, scale(0.5));
        assert_eq!(stored, DocRect::new(200.0, 100.0, 400.0, 40.0));
    }

    #[test]
    fn page_and_document_space_are_inverses() {
        let rect = PageRect::new(13.7, 91.3, 240.25, 17.5);
        for value in [0.1, 0.25, 0.5, 0.75, 1.0, 1.3, 2.0, 3.7] {
            let s = scale(value);
            let back = to_page_space(to_document_space(rect, s), s);
            assert!(back.approx_eq(&rect, 1e-3), "scale {value}: {back:?}");

            let doc = DocRect::new(rect.top, rect.left, rect.width, rect.height);
            let back = to_document_space(to_page_space(doc, s), s);
            assert!(back.approx_eq(&doc, 1e-3), "scale {value}: {back:?}");
        }
    }

    #[test]
    fn pdf_flip_places_highlight_at_560_on_800_page() {
        let rect = DocRect::new(200.0, 100.0, 400.0, 40.0);
        let pdf = document_rect_to_pdf_space(&rect, 800.0);
        assert_eq!(pdf, PdfRect { x: 100.0, y: 560.0, width: 400.0, height: 40.0 });
    }

    #[test]
    fn pdf_flip_is_an_involution() {
        let rect = DocRect::new(12.0, 30.0, 55.0, 9.0);
        for height in [100.0, 792.0, 1008.0] {
            let pdf = document_rect_to_pdf_space(&rect, height);
            assert_eq!(pdf_rect_to_document_space(&pdf, height), rect);
            assert_eq!(height - pdf.y - pdf.height, rect.top);
        }
    }

    #[test]
    fn viewport_translation_round_trips() {
        let origin = ViewportPoint::new(40.0, 108.0);
        let rect = ViewportRect::new(120.0, 60.0, 30.0, 10.0);
        let on_page = viewport_to_page(rect, origin);
        assert_eq!(on_page, PageRect::new(12.0, 20.0, 30.0, 10.0));
        assert_eq!(page_to_viewport(on_page, origin), rect);

        let point = point_viewport_to_page(ViewportPoint::new(45.0, 110.0), origin);
        assert_eq!(point, PagePoint::new(5.0, 2.0));
        assert_eq!(point_page_to_viewport(point, origin), ViewportPoint::new(45.0, 110.0));
    }

    #[test]
    fn document_to_viewport_composes_scale_and_origin() {
        let rect = document_to_viewport(DocRect::new(10.0, 20.0, 30.0, 40.0), scale(2.0), ViewportPoint::new(5.0, 7.0));
        assert_eq!(rect, ViewportRect::new(27.0, 45.0, 60.0, 80.0));
    }
}
