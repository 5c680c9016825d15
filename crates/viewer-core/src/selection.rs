//! Turning live selection and pointer input into page-space geometry.
//!
//! Every result is relative to the rendered page surface (the canvas
//! itself), never to a padded container around it.

use crate::scale::Scale;
use crate::transform::{point_viewport_to_page, to_document_space, viewport_to_page};
use doc_model::{DocRect, PagePoint, PageRect, ViewportPoint, ViewportRect};

/// Drags shorter than this in both axes are treated as clicks.
pub const MIN_DRAG_PX: f32 = 2.0;

/// A text selection as exposed by the host UI.
pub trait SelectionSource {
    fn is_collapsed(&self) -> bool;

    fn text(&self) -> String;

    /// One rect per visual line fragment, in viewport pixels, in the order
    /// the host reports them.
    fn client_rects(&self) -> Vec<ViewportRect>;

    fn clear(&mut self);
}

/// Selection recorded ahead of time, for hosts without a live selection API.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordedSelection {
    pub text: String,
    pub rects: Vec<ViewportRect>,
    cleared: bool,
}

impl RecordedSelection {
    pub fn new(text: impl Into<String>, rects: Vec<ViewportRect>) -> Self {
        Self { text: text.into(), rects, cleared: false }
    }

    pub fn is_cleared(&self) -> bool {
        self.cleared
    }
}

impl SelectionSource for RecordedSelection {
    fn is_collapsed(&self) -> bool {
        self.cleared || self.rects.is_empty()
    }

    fn text(&self) -> String {
        if self.cleared {
            String::new()
        } else {
            self.text.clone()
        }
    }

    fn client_rects(&self) -> Vec<ViewportRect> {
        if self.cleared {
            Vec::new()
        } else {
            self.rects.clone()
        }
    }

    fn clear(&mut self) {
        self.cleared = true;
        self.rects.clear();
        self.text.clear();
    }
}

/// Where the rendered page sits in the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSurface {
    bounds: ViewportRect,
}

impl PageSurface {
    pub fn new(bounds: ViewportRect) -> Self {
        Self { bounds }
    }

    /// Surface of `width` x `height` pixels placed at the viewport origin.
    pub fn at_origin(width: f32, height: f32) -> Self {
        Self::new(ViewportRect::new(0.0, 0.0, width, height))
    }

    pub fn bounds(&self) -> ViewportRect {
        self.bounds
    }

    pub fn origin(&self) -> ViewportPoint {
        self.bounds.top_left()
    }

    fn clamp(&self, point: ViewportPoint) -> ViewportPoint {
        ViewportPoint::new(
            point.x.clamp(self.bounds.left, self.bounds.right()),
            point.y.clamp(self.bounds.top, self.bounds.bottom()),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapturedSelection {
    pub text: String,
    /// Page-space rects clipped to the surface, in host order.
    pub rects: Vec<PageRect>,
}

impl CapturedSelection {
    pub fn to_document_space(&self, scale: Scale) -> Vec<DocRect> {
        self.rects.iter().map(|rect| to_document_space(*rect, scale)).collect()
    }
}

/// Read the current selection against `surface`.
///
/// Returns `None` for collapsed or empty selections and for selections that
/// lie entirely off the surface. The source is cleared only when something
/// was captured.
pub fn capture<S>(source: &mut S, surface: &PageSurface) -> Option<CapturedSelection>
where
    S: SelectionSource + ?Sized,
{
    if source.is_collapsed() {
        return None;
    }

    let text = source.text();
    if text.trim().is_empty() {
        return None;
    }

    let mut rects: Vec<PageRect> = Vec::new();
    let mut previous: Option<ViewportRect> = None;
    for client in source.client_rects() {
        if previous == Some(client) {
            continue;
        }
        previous = Some(client);

        let Some(clipped) = client.intersect(&surface.bounds) else {
            continue;
        };
        if clipped.is_degenerate() {
            continue;
        }
        rects.push(viewport_to_page(clipped, surface.origin()));
    }

    if rects.is_empty() {
        tracing::debug!("selection produced no on-page rectangles");
        return None;
    }

    source.clear();
    Some(CapturedSelection { text, rects })
}

/// Pointer drag between two page-space points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapturedDrag {
    pub start: PagePoint,
    pub end: PagePoint,
}

impl CapturedDrag {
    pub fn bounds(&self) -> PageRect {
        PageRect::from_corners(self.start, self.end)
    }
}

/// Capture a drag gesture. The drag must start on the surface; the end point
/// is clamped to it.
pub fn capture_drag(start: ViewportPoint, end: ViewportPoint, surface: &PageSurface) -> Option<CapturedDrag> {
    if !start.is_finite() || !end.is_finite() || !surface.bounds.contains(start, 0.0) {
        return None;
    }

    let end = surface.clamp(end);
    if (end.x - start.x).abs() < MIN_DRAG_PX && (end.y - start.y).abs() < MIN_DRAG_PX {
        return None;
    }

    let origin = surface.origin();
    Some(CapturedDrag {
        start: point_viewport_to_page(start, origin),
        end: point_viewport_to_page(end, origin),
    })
}

/// Capture a single click. Clicks off the surface are ignored.
pub fn capture_point(point: ViewportPoint, surface: &PageSurface) -> Option<PagePoint> {
    (point.is_finite() && surface.bounds.contains(point, 0.0))
        .then(|| point_viewport_to_page(point, surface.origin()))
}
