//! Various utilities functions and types

pub mod arena;
mod geometry;
mod serial;

pub use self::geometry::{Coordinate, Logical, Point, Rectangle, Size};
pub use self::serial::{Serial, SerialCounter, SERIAL_COUNTER};
