use std::fmt;

use crate::utils::{Logical, Point, Serial};

use super::{ButtonEvent, MotionEvent, PointerInnerHandle};

/// A trait to implement a pointer grab
///
/// In some context, it is necessary to temporarily change the behavior of the pointer. This is
/// typically known as a pointer grab. A typical example would be, during an interactive move,
/// the underlying surfaces will no longer receive classic pointer event, but the window follows
/// the pointer instead.
///
/// This trait is the interface to intercept regular pointer events. Its methods return a
/// [`GrabAction`] telling the [`PointerDevice`](super::PointerDevice) whether the grab should
/// stay installed.
///
/// When your grab ends (either as you requested it or if it was forcefully cancelled by the
/// server), [`PointerGrab::unset`] is invoked exactly once before the grab is dropped. Put
/// the clean-up logic there.
pub trait PointerGrab<D>: fmt::Debug {
    /// A motion was reported
    ///
    /// The location of the pointer has already been updated when this is invoked.
    fn motion(&mut self, data: &mut D, handle: &PointerInnerHandle<'_>, event: &MotionEvent) -> GrabAction;
    /// A button press or release was reported
    ///
    /// The set of pressed buttons has already been updated when this is invoked.
    fn button(&mut self, data: &mut D, handle: &PointerInnerHandle<'_>, event: &ButtonEvent) -> GrabAction;
    /// The data about the event that started the grab.
    fn start_data(&self) -> &GrabStartData;
    /// The grab is being removed from the device
    fn unset(&mut self, data: &mut D);
}

/// Data about the event that started the grab.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrabStartData {
    /// The button that initiated the grab, if it is still held.
    ///
    /// Releasing this button ends move and resize grabs. With `None` any
    /// release does.
    pub button: Option<u32>,
    /// The location of the pointer when the grab started, in the global compositor space.
    pub location: Point<f64, Logical>,
    /// The serial of the request that started the grab.
    pub serial: Serial,
}

/// What a grab wants to happen after handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabAction {
    /// Keep the grab installed
    Continue,
    /// Release the grab slot
    Release,
}

pub(super) enum GrabStatus<D> {
    None,
    Active(Serial, Box<dyn PointerGrab<D>>),
}

impl<D> fmt::Debug for GrabStatus<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrabStatus::None => f.write_str("None"),
            GrabStatus::Active(serial, grab) => f.debug_tuple("Active").field(serial).field(grab).finish(),
        }
    }
}
