//! Interactive move and resize grabs
//!
//! Both grabs hold the [`SurfaceId`](super::SurfaceId) of the surface they operate
//! on and look it up in the [`SurfaceMap`](super::SurfaceMap) on every event. A
//! grab whose surface is gone releases the device on the next event.
//!
//! Unsetting a grab, whether it completed or was cancelled, clears the surface's
//! active grab and sends the matching finish notification to its window.

use crate::{
    input::{
        pointer::{ButtonEvent, GrabStartData},
        ButtonState,
    },
    shell::ShellError,
};

mod move_grab;
mod resize_grab;

pub use self::move_grab::MoveSurfaceGrab;
pub use self::resize_grab::ResizeSurfaceGrab;

bitflags::bitflags! {
    /// Edges of a surface, as used by resize requests and configure events
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ResizeEdge: u32 {
        /// No edge
        const NONE = 0;
        /// Top edge
        const TOP = 1;
        /// Bottom edge
        const BOTTOM = 2;
        /// Left edge
        const LEFT = 4;
        /// Top left corner
        const TOP_LEFT = 5;
        /// Bottom left corner
        const BOTTOM_LEFT = 6;
        /// Right edge
        const RIGHT = 8;
        /// Top right corner
        const TOP_RIGHT = 9;
        /// Bottom right corner
        const BOTTOM_RIGHT = 10;
    }
}

impl ResizeEdge {
    /// Validate the edges of a resize request
    ///
    /// At least one edge must be set, no unknown bit may be set, and opposite
    /// edges cannot be combined.
    pub fn from_request(bits: u32) -> Result<ResizeEdge, ShellError> {
        let edges = ResizeEdge::from_bits(bits).ok_or(ShellError::InvalidResizeEdges(bits))?;
        if edges.is_empty()
            || edges.contains(ResizeEdge::TOP | ResizeEdge::BOTTOM)
            || edges.contains(ResizeEdge::LEFT | ResizeEdge::RIGHT)
        {
            return Err(ShellError::InvalidResizeEdges(bits));
        }
        Ok(edges)
    }
}

/// Whether a button event ends a move or resize grab
fn releases_grab(start_data: &GrabStartData, event: &ButtonEvent) -> bool {
    event.state == ButtonState::Released && start_data.button.map_or(true, |button| button == event.button)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Serial;

    #[test]
    fn valid_edges() {
        for edges in [
            ResizeEdge::TOP,
            ResizeEdge::BOTTOM,
            ResizeEdge::LEFT,
            ResizeEdge::RIGHT,
            ResizeEdge::TOP_LEFT,
            ResizeEdge::TOP_RIGHT,
            ResizeEdge::BOTTOM_LEFT,
            ResizeEdge::BOTTOM_RIGHT,
        ] {
            assert_eq!(ResizeEdge::from_request(edges.bits()), Ok(edges));
        }
    }

    #[test]
    fn invalid_edges() {
        // none, opposite edges, and bits outside of the mask
        for bits in [0, 3, 12, 15, 7, 16, 0x11] {
            assert_eq!(
                ResizeEdge::from_request(bits),
                Err(ShellError::InvalidResizeEdges(bits)),
                "{bits:#x} was accepted"
            );
        }
    }

    #[test]
    fn release_of_start_button() {
        let start_data = GrabStartData {
            button: Some(0x110),
            location: (0.0, 0.0).into(),
            serial: Serial::from(1),
        };
        let mut event = ButtonEvent {
            serial: Serial::from(2),
            time: 0,
            button: 0x111,
            state: ButtonState::Released,
        };
        assert!(!releases_grab(&start_data, &event));
        event.button = 0x110;
        assert!(releases_grab(&start_data, &event));
        event.state = ButtonState::Pressed;
        assert!(!releases_grab(&start_data, &event));

        let any_button = GrabStartData {
            button: None,
            ..start_data
        };
        event.state = ButtonState::Released;
        event.button = 0x112;
        assert!(releases_grab(&any_button, &event));
    }
}
