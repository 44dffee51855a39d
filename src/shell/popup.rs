use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::{input::DeviceId, utils::Serial};

use super::{ClientId, ShellError, SurfaceId, SurfaceMap};

/// Stack of the popups opened through one input device
///
/// A popup joins the stack only if the serial it was opened with equals the serial
/// of the last button press on the device, the press that implicitly grabbed it.
/// A popup opened with an older serial is dismissed on its own, the rest of the
/// stack is left untouched.
///
/// The grabber is created the first time a popup is opened through its device and
/// lives as long as the device. Only its contents are transient.
#[derive(Debug)]
pub struct PopupGrabber {
    device: DeviceId,
    grab_serial: Option<Serial>,
    active_popups: SmallVec<[SurfaceId; 4]>,
    owning_client: Option<ClientId>,
}

impl PopupGrabber {
    /// Create an empty grabber for a device
    pub fn new(device: DeviceId, grab_serial: Option<Serial>) -> Self {
        PopupGrabber {
            device,
            grab_serial,
            active_popups: SmallVec::new(),
            owning_client: None,
        }
    }

    /// Device this grabber belongs to
    pub fn device(&self) -> DeviceId {
        self.device
    }

    /// Serial of the event that currently grants the grab
    pub fn grab_serial(&self) -> Option<Serial> {
        self.grab_serial
    }

    /// Client owning the popups of the stack
    pub fn owning_client(&self) -> Option<ClientId> {
        self.owning_client
    }

    /// The open popups, most recently opened last
    pub fn popups(&self) -> &[SurfaceId] {
        &self.active_popups
    }

    /// Whether any popup is open
    pub fn is_active(&self) -> bool {
        !self.active_popups.is_empty()
    }

    /// Whether the surface is part of the stack
    pub fn contains(&self, surface: SurfaceId) -> bool {
        self.active_popups.contains(&surface)
    }

    /// Record a new implicit grab serial
    pub fn set_grab_serial(&mut self, serial: Serial) {
        self.grab_serial = Some(serial);
    }

    /// Add a popup to the stack
    ///
    /// If `serial` is not the current grab serial the popup is sent `popup_done`
    /// and does not join. A popup of another client replaces the whole stack.
    pub fn add_popup(
        &mut self,
        surfaces: &SurfaceMap,
        surface: SurfaceId,
        serial: Serial,
    ) -> Result<(), ShellError> {
        let data = surfaces.get(surface).ok_or(ShellError::DeadSurface)?;

        if self.grab_serial != Some(serial) {
            debug!(
                ?surface,
                ?serial,
                grab_serial = ?self.grab_serial,
                "Dismissing popup opened with a stale serial"
            );
            data.resource.popup_done();
            return Err(ShellError::StalePopupSerial {
                serial,
                grab_serial: self.grab_serial,
            });
        }

        if self.owning_client.is_some_and(|client| client != data.client()) {
            warn!(
                owner = ?self.owning_client,
                client = ?data.client(),
                "Popup of another client, dismissing current stack"
            );
            self.dismiss(surfaces);
        }

        if !self.contains(surface) {
            self.active_popups.push(surface);
        }
        self.owning_client = Some(data.client());
        Ok(())
    }

    /// Remove a single popup, leaving the rest of the stack alone
    ///
    /// Returns whether the popup was part of the stack.
    pub fn remove_popup(&mut self, surface: SurfaceId) -> bool {
        let len = self.active_popups.len();
        self.active_popups.retain(|popup| *popup != surface);
        if self.active_popups.is_empty() {
            self.owning_client = None;
        }
        self.active_popups.len() != len
    }

    /// Close every popup of the stack
    ///
    /// Each popup still alive receives exactly one `popup_done`. Returns the number
    /// of popups that were open.
    pub fn dismiss(&mut self, surfaces: &SurfaceMap) -> usize {
        let popups = std::mem::take(&mut self.active_popups);
        self.owning_client = None;
        debug!(device = ?self.device, count = popups.len(), "Dismissing popups");
        for popup in &popups {
            if let Some(data) = surfaces.get(*popup) {
                data.resource.popup_done();
            }
        }
        popups.len()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::{
        output::Output,
        shell::{grabs::ResizeEdge, surface::ShellSurfaceData, ShellSurfaceResource, WlSurfaceId},
        utils::{Logical, Point, Rectangle, Size},
        window::Window,
    };

    #[derive(Debug, Default)]
    struct PopupDone(Rc<RefCell<usize>>);

    impl ShellSurfaceResource for PopupDone {
        fn ping(&self, _serial: Serial) {}
        fn configure(&self, _edges: ResizeEdge, _size: Size<i32, Logical>) {}
        fn popup_done(&self) {
            *self.0.borrow_mut() += 1;
        }
    }

    #[derive(Debug)]
    struct NullWindow;

    impl Window for NullWindow {
        fn geometry(&self) -> Rectangle<i32, Logical> {
            Rectangle::zero()
        }
        fn set_position(&mut self, _position: Point<i32, Logical>) {}
        fn set_size(&mut self, _size: Size<i32, Logical>) {}
        fn maximize(&mut self, _output: &Output) {}
        fn unmaximize(&mut self) {}
        fn set_fullscreen(&mut self, _fullscreen: bool) {}
    }

    fn popup(surfaces: &mut SurfaceMap, client: u32) -> (SurfaceId, Rc<RefCell<usize>>) {
        let done = Rc::new(RefCell::new(0));
        let id = surfaces.insert(ShellSurfaceData::new(
            ClientId(client),
            WlSurfaceId(surfaces.len() as u32),
            Box::new(PopupDone(done.clone())),
            Box::new(NullWindow),
        ));
        (id, done)
    }

    #[test]
    fn stale_serial_dismisses_only_that_popup() {
        let mut surfaces = SurfaceMap::default();
        let mut grabber = PopupGrabber::new(DeviceId(0), Some(Serial::from(5)));
        let (first, first_done) = popup(&mut surfaces, 1);
        let (second, second_done) = popup(&mut surfaces, 1);

        grabber.add_popup(&surfaces, first, Serial::from(5)).unwrap();
        assert_eq!(
            grabber.add_popup(&surfaces, second, Serial::from(4)),
            Err(ShellError::StalePopupSerial {
                serial: Serial::from(4),
                grab_serial: Some(Serial::from(5)),
            })
        );

        assert_eq!(grabber.popups(), &[first]);
        assert_eq!(*first_done.borrow(), 0);
        assert_eq!(*second_done.borrow(), 1);
        assert_eq!(grabber.owning_client(), Some(ClientId(1)));
    }

    #[test]
    fn remove_keeps_rest_of_stack() {
        let mut surfaces = SurfaceMap::default();
        let mut grabber = PopupGrabber::new(DeviceId(0), Some(Serial::from(1)));
        let (a, _) = popup(&mut surfaces, 1);
        let (b, _) = popup(&mut surfaces, 1);
        grabber.add_popup(&surfaces, a, Serial::from(1)).unwrap();
        grabber.add_popup(&surfaces, b, Serial::from(1)).unwrap();

        assert!(grabber.remove_popup(a));
        assert!(!grabber.remove_popup(a));
        assert_eq!(grabber.popups(), &[b]);
        assert_eq!(grabber.owning_client(), Some(ClientId(1)));

        assert!(grabber.remove_popup(b));
        assert!(!grabber.is_active());
        assert_eq!(grabber.owning_client(), None);
    }

    #[test]
    fn other_client_replaces_stack() {
        let mut surfaces = SurfaceMap::default();
        let mut grabber = PopupGrabber::new(DeviceId(0), Some(Serial::from(1)));
        let (a, a_done) = popup(&mut surfaces, 1);
        let (b, b_done) = popup(&mut surfaces, 2);
        grabber.add_popup(&surfaces, a, Serial::from(1)).unwrap();
        grabber.add_popup(&surfaces, b, Serial::from(1)).unwrap();

        assert_eq!(grabber.popups(), &[b]);
        assert_eq!(grabber.owning_client(), Some(ClientId(2)));
        assert_eq!(*a_done.borrow(), 1);
        assert_eq!(*b_done.borrow(), 0);
    }

    #[test]
    fn dismiss_skips_dead_surfaces() {
        let mut surfaces = SurfaceMap::default();
        let mut grabber = PopupGrabber::new(DeviceId(0), Some(Serial::from(1)));
        let (a, a_done) = popup(&mut surfaces, 1);
        let (b, b_done) = popup(&mut surfaces, 1);
        grabber.add_popup(&surfaces, a, Serial::from(1)).unwrap();
        grabber.add_popup(&surfaces, b, Serial::from(1)).unwrap();
        surfaces.remove(a);

        assert_eq!(grabber.dismiss(&surfaces), 2);
        assert_eq!(*a_done.borrow(), 0);
        assert_eq!(*b_done.borrow(), 1);
        assert!(!grabber.is_active());
        assert_eq!(grabber.owning_client(), None);
        assert_eq!(grabber.dismiss(&surfaces), 0);
    }
}
