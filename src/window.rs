//! The window management side of a shell surface
//!
//! The shell does not own window placement or presentation. Every shell surface is
//! paired with a [`Window`], the projection of the surface the window manager works
//! with, and the shell drives it through this trait: it moves it during interactive
//! moves, restores its geometry, toggles its maximized and fullscreen flags and
//! forwards metadata.
//!
//! Start and finish notifications of interactive operations are always balanced:
//! every [`Window::motion_started`] is followed by exactly one
//! [`Window::motion_finished`], even if the surface is destroyed mid-grab, and
//! likewise for resizes.

use std::fmt;

use crate::{
    output::Output,
    shell::SurfaceId,
    utils::{Logical, Point, Rectangle, Size},
};

/// Window manager view of a shell surface
pub trait Window: fmt::Debug {
    /// Current geometry of the window in the global compositor space
    ///
    /// An empty rectangle means the window has no valid geometry yet.
    fn geometry(&self) -> Rectangle<i32, Logical>;
    /// Move the window
    fn set_position(&mut self, position: Point<i32, Logical>);
    /// Resize the window
    fn set_size(&mut self, size: Size<i32, Logical>);
    /// Maximize the window on the given output
    fn maximize(&mut self, output: &Output);
    /// Clear the maximized flag
    fn unmaximize(&mut self);
    /// Set or clear the fullscreen flag
    fn set_fullscreen(&mut self, fullscreen: bool);

    /// The client changed the title of the surface
    fn set_title(&mut self, _title: &str) {}
    /// The client changed the class of the surface
    fn set_app_id(&mut self, _app_id: &str) {}
    /// The surface became a toplevel
    fn set_toplevel(&mut self) {}
    /// The surface became a transient of `parent`
    ///
    /// When `inactive` is false the window may be given focus.
    fn set_transient(&mut self, _parent: SurfaceId, _offset: Point<i32, Logical>, _inactive: bool) {}
    /// The surface became a popup of `parent`
    fn set_popup(&mut self, _parent: SurfaceId, _offset: Point<i32, Logical>) {}
    /// An interactive move started
    fn motion_started(&mut self) {}
    /// An interactive move ended
    fn motion_finished(&mut self) {}
    /// An interactive resize started
    fn resize_started(&mut self) {}
    /// An interactive resize ended
    fn resize_finished(&mut self) {}
    /// The client stopped (or resumed) answering pings
    fn set_unresponsive(&mut self, _unresponsive: bool) {}
}
