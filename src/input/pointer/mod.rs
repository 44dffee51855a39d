//! Pointer devices and their exclusive grab slot

use std::fmt;

use tracing::{error, info_span, instrument, trace};

use crate::utils::{Logical, Point, Serial};

use super::{ButtonState, DeviceId};

mod grab;

use self::grab::GrabStatus;
pub use grab::{GrabAction, GrabStartData, PointerGrab};

/// Pointer motion event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionEvent {
    /// Location of the pointer in compositor space
    pub location: Point<f64, Logical>,
    /// Serial of the event
    pub serial: Serial,
    /// Timestamp of the event, with millisecond granularity
    pub time: u32,
}

/// Pointer button event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    /// Serial of the event
    pub serial: Serial,
    /// Timestamp of the event, with millisecond granularity
    pub time: u32,
    /// Button that produced the event
    pub button: u32,
    /// State of the button
    pub state: ButtonState,
}

/// A pointer device as seen by the shell
///
/// It tracks the pointer location and pressed buttons, and owns the exclusive
/// grab slot of the device. At most one [`PointerGrab`] is installed at any time.
pub struct PointerDevice<D> {
    id: DeviceId,
    location: Point<f64, Logical>,
    pressed_buttons: Vec<u32>,
    last_press: Option<Serial>,
    grab: GrabStatus<D>,
    span: tracing::Span,
}

impl<D> fmt::Debug for PointerDevice<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointerDevice")
            .field("id", &self.id)
            .field("location", &self.location)
            .field("pressed_buttons", &self.pressed_buttons)
            .field("last_press", &self.last_press)
            .field("grab", &self.grab)
            .finish()
    }
}

/// Read access to the pointer state given to grabs while they handle an event
#[derive(Debug)]
pub struct PointerInnerHandle<'a> {
    location: Point<f64, Logical>,
    pressed: &'a [u32],
}

impl<'a> PointerInnerHandle<'a> {
    /// Access the current location of this pointer in the global space
    pub fn current_location(&self) -> Point<f64, Logical> {
        self.location
    }

    /// A list of the currently physically pressed buttons
    pub fn current_pressed(&self) -> &[u32] {
        self.pressed
    }
}

impl<D> PointerDevice<D> {
    /// Create a new pointer device at the origin of the compositor space
    pub fn new(id: DeviceId) -> Self {
        PointerDevice {
            id,
            location: (0.0, 0.0).into(),
            pressed_buttons: Vec::new(),
            last_press: None,
            grab: GrabStatus::None,
            span: info_span!("input_pointer", device = id.0),
        }
    }

    /// Identifier of this device
    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Access the current location of this pointer in the global space
    pub fn current_location(&self) -> Point<f64, Logical> {
        self.location
    }

    /// A list of the currently physically pressed buttons
    pub fn current_pressed(&self) -> &[u32] {
        &self.pressed_buttons
    }

    /// Serial of the last button press on this device
    pub fn last_press_serial(&self) -> Option<Serial> {
        self.last_press
    }

    /// Check if this pointer is currently being grabbed
    pub fn is_grabbed(&self) -> bool {
        !matches!(self.grab, GrabStatus::None)
    }

    /// Check if this pointer is currently grabbed with this serial
    pub fn has_grab(&self, serial: Serial) -> bool {
        match self.grab {
            GrabStatus::Active(s, _) => s == serial,
            GrabStatus::None => false,
        }
    }

    /// Returns the start data for the grab, if any.
    pub fn grab_start_data(&self) -> Option<GrabStartData> {
        match &self.grab {
            GrabStatus::Active(_, g) => Some(*g.start_data()),
            GrabStatus::None => None,
        }
    }

    /// Install a grab on this pointer
    ///
    /// The slot must be free. Claiming an occupied slot is a programming error:
    /// it asserts in debug builds, and otherwise both grabs are unset and the
    /// slot is left free.
    #[instrument(level = "debug", parent = &self.span, skip(self, data, grab))]
    pub fn set_grab<G: PointerGrab<D> + 'static>(&mut self, data: &mut D, serial: Serial, mut grab: G) {
        debug_assert!(!self.is_grabbed(), "grab slot of {:?} claimed twice", self.id);
        if let GrabStatus::Active(old_serial, _) = self.grab {
            error!(?old_serial, "Grab slot claimed while occupied, resetting it");
            self.unset_grab(data);
            grab.unset(data);
            return;
        }
        self.grab = GrabStatus::Active(serial, Box::new(grab));
    }

    /// Remove any current grab on this pointer, resetting it to the default behavior
    #[instrument(level = "debug", parent = &self.span, skip(self, data))]
    pub fn unset_grab(&mut self, data: &mut D) {
        if let GrabStatus::Active(_, mut grab) = std::mem::replace(&mut self.grab, GrabStatus::None) {
            grab.unset(data);
        }
    }

    /// Notify that the pointer moved
    ///
    /// Returns whether the event was consumed by a grab.
    #[instrument(level = "trace", parent = &self.span, skip(self, data))]
    pub fn motion(&mut self, data: &mut D, event: &MotionEvent) -> bool {
        self.location = event.location;
        let action = match &mut self.grab {
            GrabStatus::Active(_, grab) => {
                let handle = PointerInnerHandle {
                    location: self.location,
                    pressed: &self.pressed_buttons,
                };
                grab.motion(data, &handle, event)
            }
            GrabStatus::None => return false,
        };
        if action == GrabAction::Release {
            self.unset_grab(data);
        }
        true
    }

    /// Notify that a button was pressed or released
    ///
    /// Returns whether the event was consumed by a grab.
    #[instrument(level = "trace", parent = &self.span, skip(self, data))]
    pub fn button(&mut self, data: &mut D, event: &ButtonEvent) -> bool {
        match event.state {
            ButtonState::Pressed => {
                if !self.pressed_buttons.contains(&event.button) {
                    self.pressed_buttons.push(event.button);
                }
                self.last_press = Some(event.serial);
            }
            ButtonState::Released => {
                self.pressed_buttons.retain(|b| *b != event.button);
            }
        }
        let action = match &mut self.grab {
            GrabStatus::Active(_, grab) => {
                let handle = PointerInnerHandle {
                    location: self.location,
                    pressed: &self.pressed_buttons,
                };
                grab.button(data, &handle, event)
            }
            GrabStatus::None => return false,
        };
        if action == GrabAction::Release {
            trace!(button = event.button, "Grab released by button event");
            self.unset_grab(data);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Log {
        motions: usize,
        unsets: usize,
    }

    #[derive(Debug)]
    struct CountingGrab {
        start_data: GrabStartData,
    }

    impl CountingGrab {
        fn new(button: Option<u32>) -> Self {
            CountingGrab {
                start_data: GrabStartData {
                    button,
                    location: (0.0, 0.0).into(),
                    serial: Serial::from(1),
                },
            }
        }
    }

    impl PointerGrab<Log> for CountingGrab {
        fn motion(&mut self, data: &mut Log, _: &PointerInnerHandle<'_>, _: &MotionEvent) -> GrabAction {
            data.motions += 1;
            GrabAction::Continue
        }

        fn button(
            &mut self,
            _: &mut Log,
            handle: &PointerInnerHandle<'_>,
            event: &ButtonEvent,
        ) -> GrabAction {
            if event.state == ButtonState::Released && handle.current_pressed().is_empty() {
                GrabAction::Release
            } else {
                GrabAction::Continue
            }
        }

        fn start_data(&self) -> &GrabStartData {
            &self.start_data
        }

        fn unset(&mut self, data: &mut Log) {
            data.unsets += 1;
        }
    }

    fn button(serial: u32, state: ButtonState) -> ButtonEvent {
        ButtonEvent {
            serial: Serial::from(serial),
            time: 0,
            button: 0x110,
            state,
        }
    }

    #[test]
    fn grab_consumes_until_release() {
        let mut log = Log::default();
        let mut pointer = PointerDevice::new(DeviceId(0));

        assert!(!pointer.button(&mut log, &button(1, ButtonState::Pressed)));
        assert_eq!(pointer.last_press_serial(), Some(Serial::from(1)));

        pointer.set_grab(&mut log, Serial::from(2), CountingGrab::new(Some(0x110)));
        assert!(pointer.is_grabbed());
        assert!(pointer.has_grab(Serial::from(2)));

        let motion = MotionEvent {
            location: (10.0, 20.0).into(),
            serial: Serial::from(3),
            time: 0,
        };
        assert!(pointer.motion(&mut log, &motion));
        assert_eq!(pointer.current_location(), Point::from((10.0, 20.0)));
        assert_eq!(log.motions, 1);

        assert!(pointer.button(&mut log, &button(4, ButtonState::Released)));
        assert!(!pointer.is_grabbed());
        assert_eq!(log.unsets, 1);

        // no grab anymore, events flow through
        assert!(!pointer.motion(&mut log, &motion));
        assert_eq!(log.motions, 1);
    }

    #[test]
    fn unset_grab_is_balanced() {
        let mut log = Log::default();
        let mut pointer = PointerDevice::new(DeviceId(0));
        pointer.set_grab(&mut log, Serial::from(1), CountingGrab::new(None));
        assert_eq!(pointer.grab_start_data().map(|d| d.button), Some(None));

        pointer.unset_grab(&mut log);
        pointer.unset_grab(&mut log);
        assert_eq!(log.unsets, 1);
        assert_eq!(pointer.grab_start_data(), None);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn double_claim_resets_slot() {
        let mut log = Log::default();
        let mut pointer = PointerDevice::new(DeviceId(0));
        pointer.set_grab(&mut log, Serial::from(1), CountingGrab::new(None));
        pointer.set_grab(&mut log, Serial::from(2), CountingGrab::new(None));
        assert!(!pointer.is_grabbed());
        assert_eq!(log.unsets, 2);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "claimed twice")]
    fn double_claim_asserts() {
        let mut log = Log::default();
        let mut pointer = PointerDevice::new(DeviceId(0));
        pointer.set_grab(&mut log, Serial::from(1), CountingGrab::new(None));
        pointer.set_grab(&mut log, Serial::from(2), CountingGrab::new(None));
    }
}
