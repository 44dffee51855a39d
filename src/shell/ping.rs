//! Liveness checks of shell clients
//!
//! Every ping carries a fresh serial taken from [`SERIAL_COUNTER`], stored in the
//! surface's pending set until the client answers with a matching pong. The
//! heartbeat pings every surface periodically and flags a surface unresponsive
//! once [`ShellConfig::max_pending_pings`](super::ShellConfig::max_pending_pings)
//! pings are left unanswered. Any valid pong clears the flag again.
//!
//! ```no_run
//! # extern crate wlshell;
//! use std::time::Duration;
//! use wlshell::reexports::calloop::EventLoop;
//! use wlshell::shell::{ping::insert_heartbeat, ShellConfig, ShellState};
//!
//! let mut event_loop: EventLoop<ShellState> = EventLoop::try_new().unwrap();
//! let mut state = ShellState::new(ShellConfig::default());
//! insert_heartbeat(&event_loop.handle(), Duration::from_secs(5), |state| state).unwrap();
//! event_loop.dispatch(Some(Duration::from_secs(6)), &mut state).unwrap();
//! ```

use std::time::Duration;

use calloop::{
    timer::{TimeoutAction, Timer},
    InsertError, LoopHandle, RegistrationToken,
};
use thiserror::Error;
use tracing::{instrument, trace, warn};

use crate::utils::{Serial, SERIAL_COUNTER};

use super::{surface::ShellSurfaceData, ShellState, SurfaceId};

/// Represents the possible errors returned from
/// a surface ping
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PingError {
    /// The operation failed because the underlying surface has been destroyed
    #[error("the ping failed cause the underlying surface has been destroyed")]
    DeadSurface,
    /// Too many pings are pending already
    #[error("{0} pings are already pending")]
    TooManyPending(usize),
}

impl ShellSurfaceData {
    fn ping(&mut self, max_pending: usize) -> Result<Serial, PingError> {
        if self.pending_pings.len() >= max_pending {
            return Err(PingError::TooManyPending(self.pending_pings.len()));
        }
        let serial = SERIAL_COUNTER.next_serial();
        self.pending_pings.insert(serial);
        self.resource.ping(serial);
        Ok(serial)
    }
}

impl ShellState {
    /// Send a ping to a surface
    ///
    /// Returns the serial the client has to answer with.
    #[instrument(level = "trace", parent = &self.span, skip(self))]
    pub fn send_ping(&mut self, surface: SurfaceId) -> Result<Serial, PingError> {
        let max_pending = self.config.max_pending_pings;
        self.surfaces
            .get_mut(surface)
            .ok_or(PingError::DeadSurface)?
            .ping(max_pending)
    }

    /// Ping every surface
    ///
    /// Surfaces whose client left too many pings unanswered are not pinged again
    /// but flagged unresponsive.
    #[instrument(level = "trace", parent = &self.span, skip(self))]
    pub fn heartbeat(&mut self) {
        let max_pending = self.config.max_pending_pings;
        for (id, surface) in self.surfaces.iter_mut() {
            match surface.ping(max_pending) {
                Ok(serial) => trace!(surface = ?id, ?serial, "Ping sent"),
                Err(err) => {
                    if !surface.unresponsive {
                        warn!(surface = ?id, client = ?surface.client, %err, "Client is unresponsive");
                        surface.unresponsive = true;
                        surface.window.set_unresponsive(true);
                    }
                }
            }
        }
    }
}

/// Insert a timer into the event loop running the [`ShellState::heartbeat`]
///
/// `accessor` gives access to the shell state from the event loop data.
pub fn insert_heartbeat<'l, D, F>(
    handle: &LoopHandle<'l, D>,
    interval: Duration,
    mut accessor: F,
) -> Result<RegistrationToken, InsertError<Timer>>
where
    D: 'l,
    F: FnMut(&mut D) -> &mut ShellState + 'l,
{
    handle.insert_source(Timer::from_duration(interval), move |_, _, data| {
        accessor(data).heartbeat();
        TimeoutAction::ToDuration(interval)
    })
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::{
        output::Output,
        shell::{grabs::ResizeEdge, ClientId, ShellConfig, ShellSurfaceResource, WlSurfaceId},
        utils::{Logical, Point, Rectangle, Size},
        window::Window,
    };

    #[derive(Debug)]
    struct Pings(Rc<RefCell<Vec<Serial>>>);

    impl ShellSurfaceResource for Pings {
        fn ping(&self, serial: Serial) {
            self.0.borrow_mut().push(serial);
        }
        fn configure(&self, _edges: ResizeEdge, _size: Size<i32, Logical>) {}
        fn popup_done(&self) {}
    }

    #[derive(Debug)]
    struct Responsiveness(Rc<RefCell<Vec<bool>>>);

    impl Window for Responsiveness {
        fn geometry(&self) -> Rectangle<i32, Logical> {
            Rectangle::zero()
        }
        fn set_position(&mut self, _position: Point<i32, Logical>) {}
        fn set_size(&mut self, _size: Size<i32, Logical>) {}
        fn maximize(&mut self, _output: &Output) {}
        fn unmaximize(&mut self) {}
        fn set_fullscreen(&mut self, _fullscreen: bool) {}
        fn set_unresponsive(&mut self, unresponsive: bool) {
            self.0.borrow_mut().push(unresponsive);
        }
    }

    struct Fixture {
        state: ShellState,
        surface: SurfaceId,
        pings: Rc<RefCell<Vec<Serial>>>,
        responsiveness: Rc<RefCell<Vec<bool>>>,
    }

    fn fixture(max_pending_pings: usize) -> Fixture {
        let mut state = ShellState::new(ShellConfig {
            max_pending_pings,
            ..Default::default()
        });
        let pings = Rc::new(RefCell::new(Vec::new()));
        let responsiveness = Rc::new(RefCell::new(Vec::new()));
        state.bind(ClientId(1));
        let surface = state
            .get_shell_surface(
                ClientId(1),
                WlSurfaceId(1),
                Pings(pings.clone()),
                Responsiveness(responsiveness.clone()),
            )
            .unwrap();
        Fixture {
            state,
            surface,
            pings,
            responsiveness,
        }
    }

    #[test]
    fn pending_pings_are_bounded() {
        let mut f = fixture(2);
        let first = f.state.send_ping(f.surface).unwrap();
        let second = f.state.send_ping(f.surface).unwrap();
        assert!(first < second);
        assert_eq!(f.state.send_ping(f.surface), Err(PingError::TooManyPending(2)));
        assert_eq!(*f.pings.borrow(), vec![first, second]);

        f.state.pong(f.surface, first).unwrap();
        assert!(f.state.send_ping(f.surface).is_ok());
    }

    #[test]
    fn ping_dead_surface() {
        let mut f = fixture(1);
        f.state.destroy_surface(f.surface).unwrap();
        assert_eq!(f.state.send_ping(f.surface), Err(PingError::DeadSurface));
    }

    #[test]
    fn heartbeat_flags_unresponsive_clients() {
        let mut f = fixture(2);
        f.state.heartbeat();
        f.state.heartbeat();
        assert_eq!(f.pings.borrow().len(), 2);
        assert!(f.responsiveness.borrow().is_empty());

        f.state.heartbeat();
        f.state.heartbeat();
        assert_eq!(f.pings.borrow().len(), 2);
        assert_eq!(*f.responsiveness.borrow(), vec![true]);
        assert!(f.state.surface(f.surface).unwrap().is_unresponsive());

        let serial = f.pings.borrow()[1];
        f.state.pong(f.surface, serial).unwrap();
        assert_eq!(*f.responsiveness.borrow(), vec![true, false]);
        assert!(!f.state.surface(f.surface).unwrap().is_unresponsive());
    }

    #[test]
    fn heartbeat_timer() {
        let mut f = fixture(3);
        let mut event_loop: calloop::EventLoop<'_, ShellState> = calloop::EventLoop::try_new().unwrap();
        insert_heartbeat(&event_loop.handle(), Duration::from_millis(1), |state| state).unwrap();

        while f.pings.borrow().is_empty() {
            event_loop
                .dispatch(Some(Duration::from_millis(100)), &mut f.state)
                .unwrap();
        }
        assert!(f.state.surface(f.surface).unwrap().pending_pings().len() >= 1);
    }
}
