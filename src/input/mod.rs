//! Input devices as seen by the shell
//!
//! The shell does not talk to input hardware. The compositor forwards the
//! already processed events of each device (identified by a [`DeviceId`]) and
//! the shell keeps the state it needs for interactive operations in a
//! [`pointer::PointerDevice`]: current location, pressed buttons, the serial
//! of the last press and the exclusive grab slot.

pub mod pointer;

/// Identifier of an input device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub u32);

/// State of a button on a pointer device, like mouse or tablet tool. Either pressed or released
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonState {
    /// Button is released
    Released,
    /// Button is pressed
    Pressed,
}
