use tracing::debug;

use crate::{
    input::pointer::{ButtonEvent, GrabAction, GrabStartData, MotionEvent, PointerGrab, PointerInnerHandle},
    shell::{SurfaceId, SurfaceMap},
    utils::{Logical, Size},
};

use super::{releases_grab, ResizeEdge};

/// Grab proposing new sizes to a client while the pointer drags some of its edges
///
/// The window is never resized here. Each motion sends a configure event with the
/// proposed size, and the client decides what it commits.
#[derive(Debug)]
pub struct ResizeSurfaceGrab {
    start_data: GrabStartData,
    surface: SurfaceId,
    edges: ResizeEdge,
    initial_size: Size<i32, Logical>,
    last_size: Size<i32, Logical>,
    min_size: Size<i32, Logical>,
}

impl ResizeSurfaceGrab {
    pub(crate) fn new(
        start_data: GrabStartData,
        surface: SurfaceId,
        edges: ResizeEdge,
        initial_size: Size<i32, Logical>,
        min_size: Size<i32, Logical>,
    ) -> Self {
        ResizeSurfaceGrab {
            start_data,
            surface,
            edges,
            initial_size,
            last_size: initial_size,
            min_size,
        }
    }
}

impl PointerGrab<SurfaceMap> for ResizeSurfaceGrab {
    fn motion(
        &mut self,
        surfaces: &mut SurfaceMap,
        handle: &PointerInnerHandle<'_>,
        _event: &MotionEvent,
    ) -> GrabAction {
        let Some(surface) = surfaces.get(self.surface) else {
            return GrabAction::Release;
        };

        // dragging an edge away from the window grows it
        let (dx, dy) = (self.start_data.location - handle.current_location()).into();

        let mut width = self.initial_size.w as f64;
        if self.edges.contains(ResizeEdge::LEFT) {
            width += dx;
        } else if self.edges.contains(ResizeEdge::RIGHT) {
            width -= dx;
        }

        let mut height = self.initial_size.h as f64;
        if self.edges.contains(ResizeEdge::TOP) {
            height += dy;
        } else if self.edges.contains(ResizeEdge::BOTTOM) {
            height -= dy;
        }

        let width = (width.round() as i32).max(self.min_size.w).max(1);
        let height = (height.round() as i32).max(self.min_size.h).max(1);
        self.last_size = (width, height).into();

        surface.resource.configure(self.edges, self.last_size);
        GrabAction::Continue
    }

    fn button(
        &mut self,
        surfaces: &mut SurfaceMap,
        _handle: &PointerInnerHandle<'_>,
        event: &ButtonEvent,
    ) -> GrabAction {
        if !surfaces.contains(self.surface) || releases_grab(&self.start_data, event) {
            GrabAction::Release
        } else {
            GrabAction::Continue
        }
    }

    fn start_data(&self) -> &GrabStartData {
        &self.start_data
    }

    fn unset(&mut self, surfaces: &mut SurfaceMap) {
        if let Some(surface) = surfaces.get_mut(self.surface) {
            debug!(surface = ?self.surface, size = ?self.last_size, "Resize finished");
            surface.active_grab = None;
            surface.window.resize_finished();
        }
    }
}
