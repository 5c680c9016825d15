mod config;
mod overlay;
mod scale;
mod selection;
mod transform;

pub use config::{
    ConfigError, ViewerConfig, ENV_MAX_ZOOM, ENV_MIN_ZOOM, ENV_UNDO_CAPACITY, ENV_ZOOM_STEP,
};
pub use overlay::{arrowhead, stamp_palette, DrawPrimitive, OverlayRenderer, Projection};
pub use scale::{InvalidScale, PageDimensions, Scale, ScaleContext, ViewportBounds, MIN_BASE_SCALE};
pub use selection::{
    capture, capture_drag, capture_point, CapturedDrag, CapturedSelection, PageSurface,
    RecordedSelection, SelectionSource, MIN_DRAG_PX,
};
pub use transform::{
    document_rect_to_pdf_space, document_to_viewport, page_to_viewport, pdf_rect_to_document_space,
    point_page_to_viewport, point_to_document_space, point_to_page_space, point_viewport_to_page,
    to_document_space, to_page_space, viewport_to_page, PdfRect,
};
