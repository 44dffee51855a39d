use tracing::debug;

use crate::{
    input::pointer::{ButtonEvent, GrabAction, GrabStartData, MotionEvent, PointerGrab, PointerInnerHandle},
    shell::{SurfaceId, SurfaceMap},
    utils::{Logical, Point},
};

use super::releases_grab;

/// Grab moving a surface along with the pointer
///
/// The offset between the pointer and the window is taken on the first motion
/// event rather than when the grab starts, so the window does not jump if the
/// pointer moved while the request was in flight.
#[derive(Debug)]
pub struct MoveSurfaceGrab {
    start_data: GrabStartData,
    surface: SurfaceId,
    initial_offset: Option<Point<f64, Logical>>,
}

impl MoveSurfaceGrab {
    pub(crate) fn new(start_data: GrabStartData, surface: SurfaceId) -> Self {
        MoveSurfaceGrab {
            start_data,
            surface,
            initial_offset: None,
        }
    }
}

impl PointerGrab<SurfaceMap> for MoveSurfaceGrab {
    fn motion(
        &mut self,
        surfaces: &mut SurfaceMap,
        handle: &PointerInnerHandle<'_>,
        _event: &MotionEvent,
    ) -> GrabAction {
        let Some(surface) = surfaces.get_mut(self.surface) else {
            return GrabAction::Release;
        };

        let pointer = handle.current_location();
        match self.initial_offset {
            None => {
                self.initial_offset = Some(pointer - surface.window.geometry().loc.to_f64());
            }
            Some(offset) => {
                surface.window.set_position((pointer - offset).to_i32_round());
            }
        }
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
            debug!(surface = ?self.surface, "Move finished");
            surface.active_grab = None;
            surface.window.motion_finished();
        }
    }
}
