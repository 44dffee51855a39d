//! Server side of the `wl_shell` protocol
//!
//! This module turns the requests clients send on their shell surfaces into a
//! consistent window state machine. It mediates the exclusive interactive
//! operations (move and resize) on each input device, tracks popup stacks, and
//! checks client liveness with ping and pong.
//!
//! ## How to use it
//!
//! Create a [`ShellState`] and register your input devices and outputs. When a
//! client binds the shell global call [`ShellState::bind`], and for each
//! `get_shell_surface` request call [`ShellState::get_shell_surface`], providing:
//!
//! - a [`ShellSurfaceResource`], through which the shell sends `ping`,
//!   `configure` and `popup_done` events to the client,
//! - a [`Window`], the window management projection of the surface the shell
//!   drives (position, size, maximize and fullscreen flags, metadata).
//!
//! Decoded requests are then fed to [`ShellState::dispatch`]. No request can fail
//! fatally: malformed or mistimed requests are logged and ignored. The typed
//! request methods (like [`ShellState::move_request`]) are available as well, and
//! report why a request was ignored.
//!
//! Input events are forwarded with [`ShellState::pointer_motion`],
//! [`ShellState::pointer_button`] and [`ShellState::keyboard_key`]. While a move
//! or resize is in progress the pointer events of its device are consumed by
//! the grab.
//!
//! Surface and client lifetimes are reported with [`ShellState::surface_mapped`],
//! [`ShellState::surface_unmapped`], [`ShellState::destroy_surface`] and
//! [`ShellState::client_disconnected`].
//!
//! The [`ping`] module provides a heartbeat timer for `calloop`.

use std::{fmt, time::Duration};

use indexmap::{IndexMap, IndexSet};
use thiserror::Error;
use tracing::{debug, info, info_span, instrument, trace, warn};

use crate::{
    input::{
        pointer::{ButtonEvent, GrabStartData, MotionEvent, PointerDevice},
        ButtonState, DeviceId,
    },
    output::{Output, OutputId},
    utils::{arena::Index, Logical, Point, Serial, Size},
    window::Window,
};

pub mod grabs;
pub mod ping;
mod popup;
mod surface;

pub use self::popup::PopupGrabber;
pub use self::surface::{GrabKind, PopupRole, Role, ShellSurfaceData, SurfaceMap, SurfaceState};

use self::grabs::{MoveSurfaceGrab, ResizeEdge, ResizeSurfaceGrab};

/// Identifier of a shell surface
///
/// Identifiers of destroyed surfaces never resolve again, even if their storage
/// is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(Index);

/// Identifier of a client connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u32);

/// Identifier of a `wl_surface`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WlSurfaceId(pub u32);

/// Events the shell sends to the client owning a shell surface
pub trait ShellSurfaceResource: fmt::Debug {
    /// Send a `ping` event
    fn ping(&self, serial: Serial);
    /// Send a `configure` event
    fn configure(&self, edges: ResizeEdge, size: Size<i32, Logical>);
    /// Send a `popup_done` event
    fn popup_done(&self);
}

/// Configuration of the shell
#[derive(Debug, Clone, PartialEq)]
pub struct ShellConfig {
    /// Interval of the heartbeat timer
    pub ping_interval: Duration,
    /// Number of unanswered pings after which a client is considered unresponsive
    pub max_pending_pings: usize,
    /// Dismiss popup stacks on key presses aimed outside of them
    pub popup_dismiss_on_key: bool,
    /// Smallest size proposed during interactive resizes, never below 1x1
    pub min_size: Size<i32, Logical>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        ShellConfig {
            ping_interval: Duration::from_secs(5),
            max_pending_pings: 3,
            popup_dismiss_on_key: true,
            min_size: (1, 1).into(),
        }
    }
}

/// Reasons for a shell request to be ignored
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShellError {
    /// The edges of a resize request are empty, out of range or ambiguous
    #[error("invalid resize edges `{0:#x}`")]
    InvalidResizeEdges(u32),
    /// The device, or the surface, already has an interactive grab
    #[error("device {0:?} already has an active grab")]
    GrabConflict(DeviceId),
    /// The request is not allowed in the current state of the surface
    #[error("request not allowed while {0:?}")]
    InvalidState(SurfaceState),
    /// The request is only valid for toplevel surfaces
    #[error("the surface is not a toplevel")]
    NotToplevel,
    /// The pong does not match any pending ping
    #[error("unexpected pong `{0:?}`")]
    UnexpectedPong(Serial),
    /// The popup was opened with a serial that no longer grants the grab
    #[error("popup serial `{serial:?}` does not match the grab serial `{grab_serial:?}`")]
    StalePopupSerial {
        /// Serial the popup was opened with
        serial: Serial,
        /// Current grab serial of the device
        grab_serial: Option<Serial>,
    },
    /// The shell surface has been destroyed
    #[error("the shell surface has been destroyed")]
    DeadSurface,
    /// The input device is not known
    #[error("unknown input device {0:?}")]
    UnknownDevice(DeviceId),
    /// The output is not known
    #[error("unknown output {0:?}")]
    UnknownOutput(OutputId),
    /// No output exists to place the surface on
    #[error("no output available")]
    NoOutput,
    /// The client did not bind the shell
    #[error("client {0:?} did not bind the shell")]
    UnknownClient(ClientId),
    /// The surface already has a shell surface
    #[error("{0:?} already has a shell surface")]
    RoleAlreadyAssigned(WlSurfaceId),
    /// The parent is not a live shell surface
    #[error("the parent is not a live shell surface")]
    ParentNotFound,
}

bitflags::bitflags! {
    /// Flags of `set_transient` and `set_popup` requests
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct TransientFlags: u32 {
        /// The surface should not receive focus
        const INACTIVE = 1;
    }
}

/// How a fullscreen surface should be fitted to its output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FullscreenMethod {
    /// No preference, the compositor decides
    Default,
    /// Scale the surface, keeping its aspect ratio
    Scale,
    /// Switch the output mode to match the surface
    Driver,
    /// Center the surface without scaling
    Fill,
}

/// A request received on a shell surface
#[derive(Debug, Clone, PartialEq)]
pub enum ShellRequest {
    /// Answer to a ping
    Pong {
        /// Serial of the ping
        serial: Serial,
    },
    /// Start an interactive move
    Move {
        /// Device of the implicit grab
        device: DeviceId,
        /// Serial of the implicit grab
        serial: Serial,
    },
    /// Start an interactive resize
    Resize {
        /// Device of the implicit grab
        device: DeviceId,
        /// Serial of the implicit grab
        serial: Serial,
        /// Edges being dragged, as sent by the client
        edges: u32,
    },
    /// Make the surface a toplevel
    SetToplevel,
    /// Make the surface a transient
    SetTransient {
        /// The parent surface
        parent: WlSurfaceId,
        /// Horizontal offset from the parent
        x: i32,
        /// Vertical offset from the parent
        y: i32,
        /// Transient flags
        flags: TransientFlags,
    },
    /// Make the surface fullscreen
    SetFullscreen {
        /// Fitting method
        method: FullscreenMethod,
        /// Framerate in mHz, for the driver method
        ///
        /// Outputs have no modes here, the value is logged and dropped.
        framerate: u32,
        /// Target output
        output: Option<OutputId>,
    },
    /// Make the surface a popup
    SetPopup {
        /// Device of the implicit grab
        device: DeviceId,
        /// Serial of the implicit grab
        serial: Serial,
        /// The parent surface
        parent: WlSurfaceId,
        /// Horizontal offset from the parent
        x: i32,
        /// Vertical offset from the parent
        y: i32,
        /// Transient flags
        flags: TransientFlags,
    },
    /// Maximize the surface
    SetMaximized {
        /// Target output
        output: Option<OutputId>,
    },
    /// Set the title
    SetTitle {
        /// The new title
        title: String,
    },
    /// Set the class
    SetClass {
        /// The new class
        class: String,
    },
}

#[derive(Debug)]
struct DeviceData {
    pointer: PointerDevice<SurfaceMap>,
    popup_grabber: Option<PopupGrabber>,
}

/// State of the shell global
#[derive(Debug)]
pub struct ShellState {
    config: ShellConfig,
    clients: IndexSet<ClientId>,
    surfaces: SurfaceMap,
    devices: IndexMap<DeviceId, DeviceData>,
    outputs: IndexMap<OutputId, Output>,
    span: tracing::Span,
}

impl ShellState {
    /// Create a new shell
    pub fn new(config: ShellConfig) -> ShellState {
        let span = info_span!("shell");
        let config = ShellConfig {
            min_size: (config.min_size.w.max(1), config.min_size.h.max(1)).into(),
            ..config
        };
        span.in_scope(|| info!(?config, "Initializing shell"));

        ShellState {
            config,
            clients: IndexSet::new(),
            surfaces: SurfaceMap::default(),
            devices: IndexMap::new(),
            outputs: IndexMap::new(),
            span,
        }
    }

    /// Configuration of this shell
    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// A client bound the shell global
    #[instrument(level = "debug", parent = &self.span, skip(self))]
    pub fn bind(&mut self, client: ClientId) {
        if self.clients.insert(client) {
            debug!("Client bound the shell");
        }
    }

    /// Whether the client bound the shell global
    pub fn is_bound(&self, client: ClientId) -> bool {
        self.clients.contains(&client)
    }

    /// Create the shell surface of a `wl_surface`
    ///
    /// Fails if the client did not bind the shell, or if the `wl_surface` already
    /// has a live shell surface.
    #[instrument(level = "debug", parent = &self.span, skip(self, resource, window))]
    pub fn get_shell_surface<R, W>(
        &mut self,
        client: ClientId,
        wl_surface: WlSurfaceId,
        resource: R,
        window: W,
    ) -> Result<SurfaceId, ShellError>
    where
        R: ShellSurfaceResource + 'static,
        W: Window + 'static,
    {
        if !self.clients.contains(&client) {
            return Err(ShellError::UnknownClient(client));
        }
        if self.shell_surface_for(wl_surface).is_some() {
            return Err(ShellError::RoleAlreadyAssigned(wl_surface));
        }

        let surface = self.surfaces.insert(ShellSurfaceData::new(
            client,
            wl_surface,
            Box::new(resource),
            Box::new(window),
        ));
        trace!(?surface, "Created shell surface");
        Ok(surface)
    }

    /// Destroy a shell surface
    ///
    /// An interactive operation the surface owns is cancelled, with its finish
    /// notification, and the surface leaves any popup stack.
    #[instrument(level = "debug", parent = &self.span, skip(self))]
    pub fn destroy_surface(&mut self, surface: SurfaceId) -> Result<(), ShellError> {
        let active_grab = self
            .surfaces
            .get(surface)
            .ok_or(ShellError::DeadSurface)?
            .active_grab;
        if let Some((device, kind)) = active_grab {
            debug!(?device, ?kind, "Cancelling grab of destroyed surface");
            if let Some(data) = self.devices.get_mut(&device) {
                data.pointer.unset_grab(&mut self.surfaces);
            }
        }
        self.leave_popup_stack(surface);
        self.surfaces.remove(surface);
        Ok(())
    }

    /// A client disconnected
    ///
    /// Dismisses the popup stacks it owned and destroys all its surfaces.
    #[instrument(level = "debug", parent = &self.span, skip(self))]
    pub fn client_disconnected(&mut self, client: ClientId) {
        for data in self.devices.values_mut() {
            if let Some(grabber) = data.popup_grabber.as_mut() {
                if grabber.owning_client() == Some(client) {
                    grabber.dismiss(&self.surfaces);
                }
            }
        }

        let owned = self.client_surfaces(client).collect::<Vec<_>>();
        for surface in &owned {
            let _ = self.destroy_surface(*surface);
        }
        self.clients.shift_remove(&client);
        info!(surfaces = owned.len(), "Client disconnected");
    }

    /// Access a shell surface
    pub fn surface(&self, surface: SurfaceId) -> Option<&ShellSurfaceData> {
        self.surfaces.get(surface)
    }

    /// Iterate over all shell surfaces
    pub fn surfaces(&self) -> impl Iterator<Item = (SurfaceId, &ShellSurfaceData)> {
        self.surfaces.iter()
    }

    /// Shell surfaces of a client
    pub fn client_surfaces(&self, client: ClientId) -> impl Iterator<Item = SurfaceId> + '_ {
        self.surfaces
            .iter()
            .filter(move |(_, data)| data.client == client)
            .map(|(id, _)| id)
    }

    /// The shell surface of a `wl_surface`, if any
    pub fn shell_surface_for(&self, wl_surface: WlSurfaceId) -> Option<SurfaceId> {
        self.surfaces
            .iter()
            .find(|(_, data)| data.wl_surface == wl_surface)
            .map(|(id, _)| id)
    }

    /// Register an input device
    #[instrument(level = "debug", parent = &self.span, skip(self))]
    pub fn add_device(&mut self, device: DeviceId) {
        self.devices.entry(device).or_insert_with(|| DeviceData {
            pointer: PointerDevice::new(device),
            popup_grabber: None,
        });
    }

    /// Remove an input device
    ///
    /// Its interactive grab is cancelled and its popup stack dismissed.
    #[instrument(level = "debug", parent = &self.span, skip(self))]
    pub fn remove_device(&mut self, device: DeviceId) -> Result<(), ShellError> {
        let mut data = self
            .devices
            .shift_remove(&device)
            .ok_or(ShellError::UnknownDevice(device))?;
        data.pointer.unset_grab(&mut self.surfaces);
        if let Some(grabber) = data.popup_grabber.as_mut() {
            grabber.dismiss(&self.surfaces);
        }
        Ok(())
    }

    /// Pointer state of a device
    pub fn pointer(&self, device: DeviceId) -> Option<&PointerDevice<SurfaceMap>> {
        self.devices.get(&device).map(|data| &data.pointer)
    }

    /// Popup grabber of a device, if a popup was ever opened through it
    pub fn popup_grabber(&self, device: DeviceId) -> Option<&PopupGrabber> {
        self.devices
            .get(&device)
            .and_then(|data| data.popup_grabber.as_ref())
    }

    /// Dismiss the popup stack of a device
    ///
    /// Returns the number of popups that were open.
    #[instrument(level = "debug", parent = &self.span, skip(self))]
    pub fn dismiss_popups(&mut self, device: DeviceId) -> Result<usize, ShellError> {
        let data = self
            .devices
            .get_mut(&device)
            .ok_or(ShellError::UnknownDevice(device))?;
        Ok(data
            .popup_grabber
            .as_mut()
            .map(|grabber| grabber.dismiss(&self.surfaces))
            .unwrap_or(0))
    }

    /// Register an output, replacing any output with the same id
    #[instrument(level = "debug", parent = &self.span, skip(self))]
    pub fn add_output(&mut self, output: Output) -> Option<Output> {
        self.outputs.insert(output.id(), output)
    }

    /// Remove an output
    #[instrument(level = "debug", parent = &self.span, skip(self))]
    pub fn remove_output(&mut self, output: OutputId) -> Option<Output> {
        self.outputs.shift_remove(&output)
    }

    /// Access an output
    pub fn output(&self, output: OutputId) -> Option<&Output> {
        self.outputs.get(&output)
    }

    /// Mutably access an output
    ///
    /// Geometry changes apply to the next maximize or fullscreen request, surfaces
    /// already sized to the output are left alone.
    pub fn output_mut(&mut self, output: OutputId) -> Option<&mut Output> {
        self.outputs.get_mut(&output)
    }

    /// Iterate over all outputs
    pub fn outputs(&self) -> impl Iterator<Item = &Output> {
        self.outputs.values()
    }

    /// The output a surface currently is on
    ///
    /// This is the output containing the center of the window, else the one it
    /// overlaps most, else the first output.
    pub fn output_for_surface(&self, surface: SurfaceId) -> Option<&Output> {
        let geometry = self.surfaces.get(surface)?.geometry();
        let center = geometry.loc + Point::from((geometry.size.w / 2, geometry.size.h / 2));

        self.outputs
            .values()
            .find(|output| output.geometry().contains(center))
            .or_else(|| {
                self.outputs
                    .values()
                    .filter_map(|output| {
                        let overlap = output.geometry().intersection(geometry)?;
                        Some((output, overlap.size.w as i64 * overlap.size.h as i64))
                    })
                    .max_by_key(|(_, area)| *area)
                    .map(|(output, _)| output)
            })
            .or_else(|| self.outputs.values().next())
    }

    fn target_output(&self, surface: SurfaceId, requested: Option<OutputId>) -> Result<&Output, ShellError> {
        match requested {
            Some(output) => self.outputs.get(&output).ok_or(ShellError::UnknownOutput(output)),
            None => self.output_for_surface(surface).ok_or(ShellError::NoOutput),
        }
    }

    fn claim_grab(
        &mut self,
        surface: SurfaceId,
        device: DeviceId,
        serial: Serial,
        kind: GrabKind,
    ) -> Result<GrabStartData, ShellError> {
        let pointer = &self
            .devices
            .get(&device)
            .ok_or(ShellError::UnknownDevice(device))?
            .pointer;
        if pointer.is_grabbed() {
            return Err(ShellError::GrabConflict(device));
        }
        let data = self.surfaces.get_mut(surface).ok_or(ShellError::DeadSurface)?;
        if let Some((other, _)) = data.active_grab {
            return Err(ShellError::GrabConflict(other));
        }

        data.active_grab = Some((device, kind));
        Ok(GrabStartData {
            button: pointer.current_pressed().last().copied(),
            location: pointer.current_location(),
            serial,
        })
    }

    /// Start an interactive move
    ///
    /// Refused while the device or the surface has a grab, and for fullscreen surfaces.
    #[instrument(level = "debug", parent = &self.span, skip(self))]
    pub fn move_request(
        &mut self,
        surface: SurfaceId,
        device: DeviceId,
        serial: Serial,
    ) -> Result<(), ShellError> {
        let state = self.surfaces.get(surface).ok_or(ShellError::DeadSurface)?.state;
        if state == SurfaceState::Fullscreen {
            return Err(ShellError::InvalidState(state));
        }
        let start_data = self.claim_grab(surface, device, serial, GrabKind::Move)?;

        if let Some(data) = self.surfaces.get_mut(surface) {
            data.window.motion_started();
        }
        if let Some(data) = self.devices.get_mut(&device) {
            data.pointer
                .set_grab(&mut self.surfaces, serial, MoveSurfaceGrab::new(start_data, surface));
        }
        Ok(())
    }

    /// Start an interactive resize
    ///
    /// Refused for invalid edges, while the device or the surface has a grab, and
    /// for maximized or fullscreen surfaces.
    #[instrument(level = "debug", parent = &self.span, skip(self))]
    pub fn resize_request(
        &mut self,
        surface: SurfaceId,
        device: DeviceId,
        serial: Serial,
        edges: u32,
    ) -> Result<(), ShellError> {
        let edges = ResizeEdge::from_request(edges)?;
        let data = self.surfaces.get(surface).ok_or(ShellError::DeadSurface)?;
        if data.state != SurfaceState::Normal {
            return Err(ShellError::InvalidState(data.state));
        }
        let initial_size = data.geometry().size;
        let start_data = self.claim_grab(surface, device, serial, GrabKind::Resize)?;

        if let Some(data) = self.surfaces.get_mut(surface) {
            data.window.resize_started();
        }
        let grab = ResizeSurfaceGrab::new(start_data, surface, edges, initial_size, self.config.min_size);
        if let Some(data) = self.devices.get_mut(&device) {
            data.pointer.set_grab(&mut self.surfaces, serial, grab);
        }
        Ok(())
    }

    /// Make a surface a toplevel
    ///
    /// A maximized or fullscreen surface gets its saved geometry back.
    #[instrument(level = "debug", parent = &self.span, skip(self))]
    pub fn set_toplevel(&mut self, surface: SurfaceId) -> Result<(), ShellError> {
        self.surfaces
            .get_mut(surface)
            .ok_or(ShellError::DeadSurface)?
            .set_toplevel();
        self.leave_popup_stack(surface);
        Ok(())
    }

    /// Make a surface a transient of another one
    #[instrument(level = "debug", parent = &self.span, skip(self))]
    pub fn set_transient(
        &mut self,
        surface: SurfaceId,
        parent: SurfaceId,
        offset: Point<i32, Logical>,
        flags: TransientFlags,
    ) -> Result<(), ShellError> {
        if !self.surfaces.contains(surface) {
            return Err(ShellError::DeadSurface);
        }
        if parent == surface || !self.surfaces.contains(parent) {
            return Err(ShellError::ParentNotFound);
        }

        self.surfaces
            .get_mut(surface)
            .ok_or(ShellError::DeadSurface)?
            .set_transient(parent, offset, flags.contains(TransientFlags::INACTIVE));
        self.leave_popup_stack(surface);
        Ok(())
    }

    /// Make a surface fullscreen
    ///
    /// Without an explicit output the surface's current output is used.
    #[instrument(level = "debug", parent = &self.span, skip(self))]
    pub fn set_fullscreen(
        &mut self,
        surface: SurfaceId,
        method: FullscreenMethod,
        output: Option<OutputId>,
    ) -> Result<(), ShellError> {
        if !self.surfaces.contains(surface) {
            return Err(ShellError::DeadSurface);
        }
        let output = self.target_output(surface, output)?.clone();
        self.surfaces
            .get_mut(surface)
            .ok_or(ShellError::DeadSurface)?
            .enter_fullscreen(&output, method)
    }

    /// Maximize a toplevel surface
    ///
    /// Without an explicit output the surface's current output is used.
    #[instrument(level = "debug", parent = &self.span, skip(self))]
    pub fn set_maximized(&mut self, surface: SurfaceId, output: Option<OutputId>) -> Result<(), ShellError> {
        if !self.surfaces.contains(surface) {
            return Err(ShellError::DeadSurface);
        }
        let output = self.target_output(surface, output)?.clone();
        self.surfaces
            .get_mut(surface)
            .ok_or(ShellError::DeadSurface)?
            .enter_maximized(&output)
    }

    /// Make a surface a popup opened through `device`
    ///
    /// The popup joins the device's popup stack when it is mapped, provided `serial`
    /// still is the device's grab serial at that point.
    #[instrument(level = "debug", parent = &self.span, skip(self))]
    pub fn set_popup(
        &mut self,
        surface: SurfaceId,
        device: DeviceId,
        serial: Serial,
        parent: SurfaceId,
        offset: Point<i32, Logical>,
        flags: TransientFlags,
    ) -> Result<(), ShellError> {
        if !self.surfaces.contains(surface) {
            return Err(ShellError::DeadSurface);
        }
        if parent == surface || !self.surfaces.contains(parent) {
            return Err(ShellError::ParentNotFound);
        }
        let data = self
            .devices
            .get_mut(&device)
            .ok_or(ShellError::UnknownDevice(device))?;
        if data.popup_grabber.is_none() {
            let grab_serial = data.pointer.last_press_serial();
            debug!(?grab_serial, "Creating popup grabber");
            data.popup_grabber = Some(PopupGrabber::new(device, grab_serial));
        }

        self.leave_popup_stack(surface);
        let data = self.surfaces.get_mut(surface).ok_or(ShellError::DeadSurface)?;
        data.set_popup(parent, offset, device, serial);
        if data.mapped {
            self.join_popup_stack(surface)?;
        }
        Ok(())
    }

    /// Set the title of a surface
    #[instrument(level = "trace", parent = &self.span, skip(self))]
    pub fn set_title(&mut self, surface: SurfaceId, title: String) -> Result<(), ShellError> {
        self.surfaces
            .get_mut(surface)
            .ok_or(ShellError::DeadSurface)?
            .set_title(title);
        Ok(())
    }

    /// Set the class of a surface
    #[instrument(level = "trace", parent = &self.span, skip(self))]
    pub fn set_class(&mut self, surface: SurfaceId, class: String) -> Result<(), ShellError> {
        self.surfaces
            .get_mut(surface)
            .ok_or(ShellError::DeadSurface)?
            .set_class(class);
        Ok(())
    }

    /// Handle a pong
    ///
    /// Only a serial of a pending ping is accepted. Unexpected pongs change nothing.
    #[instrument(level = "trace", parent = &self.span, skip(self))]
    pub fn pong(&mut self, surface: SurfaceId, serial: Serial) -> Result<(), ShellError> {
        self.surfaces
            .get_mut(surface)
            .ok_or(ShellError::DeadSurface)?
            .pong(serial)
    }

    /// Handle a request received on a shell surface
    ///
    /// Requests that cannot be honored are logged and otherwise ignored.
    #[instrument(level = "debug", parent = &self.span, skip(self))]
    pub fn dispatch(&mut self, surface: SurfaceId, request: ShellRequest) {
        let result = match request {
            ShellRequest::Pong { serial } => self.pong(surface, serial),
            ShellRequest::Move { device, serial } => self.move_request(surface, device, serial),
            ShellRequest::Resize { device, serial, edges } => {
                self.resize_request(surface, device, serial, edges)
            }
            ShellRequest::SetToplevel => self.set_toplevel(surface),
            ShellRequest::SetTransient { parent, x, y, flags } => self
                .resolve_parent(parent)
                .and_then(|parent| self.set_transient(surface, parent, (x, y).into(), flags)),
            ShellRequest::SetFullscreen {
                method,
                framerate,
                output,
            } => {
                trace!(framerate, "Ignoring fullscreen framerate");
                self.set_fullscreen(surface, method, output)
            }
            ShellRequest::SetPopup {
                device,
                serial,
                parent,
                x,
                y,
                flags,
            } => self
                .resolve_parent(parent)
                .and_then(|parent| self.set_popup(surface, device, serial, parent, (x, y).into(), flags)),
            ShellRequest::SetMaximized { output } => self.set_maximized(surface, output),
            ShellRequest::SetTitle { title } => self.set_title(surface, title),
            ShellRequest::SetClass { class } => self.set_class(surface, class),
        };

        if let Err(err) = result {
            warn!(?surface, %err, "Ignoring shell request");
        }
    }

    fn resolve_parent(&self, parent: WlSurfaceId) -> Result<SurfaceId, ShellError> {
        self.shell_surface_for(parent).ok_or(ShellError::ParentNotFound)
    }

    /// A surface got mapped
    ///
    /// A popup waiting for its first map joins its device's popup stack, or is
    /// dismissed if its serial no longer grants the grab.
    #[instrument(level = "debug", parent = &self.span, skip(self))]
    pub fn surface_mapped(&mut self, surface: SurfaceId) -> Result<(), ShellError> {
        self.surfaces
            .get_mut(surface)
            .ok_or(ShellError::DeadSurface)?
            .mapped = true;
        self.join_popup_stack(surface)
    }

    /// A surface got unmapped
    #[instrument(level = "debug", parent = &self.span, skip(self))]
    pub fn surface_unmapped(&mut self, surface: SurfaceId) -> Result<(), ShellError> {
        self.surfaces
            .get_mut(surface)
            .ok_or(ShellError::DeadSurface)?
            .mapped = false;
        self.leave_popup_stack(surface);
        Ok(())
    }

    fn join_popup_stack(&mut self, surface: SurfaceId) -> Result<(), ShellError> {
        let data = self.surfaces.get_mut(surface).ok_or(ShellError::DeadSurface)?;
        let Role::Popup(popup) = &mut data.role else {
            return Ok(());
        };
        if !popup.awaiting_map {
            return Ok(());
        }
        popup.awaiting_map = false;
        let (device, serial) = (popup.device, popup.serial);

        match self
            .devices
            .get_mut(&device)
            .and_then(|data| data.popup_grabber.as_mut())
        {
            Some(grabber) => grabber.add_popup(&self.surfaces, surface, serial),
            None => {
                if let Some(data) = self.surfaces.get(surface) {
                    data.resource.popup_done();
                }
                Err(ShellError::UnknownDevice(device))
            }
        }
    }

    fn leave_popup_stack(&mut self, surface: SurfaceId) {
        for data in self.devices.values_mut() {
            if let Some(grabber) = data.popup_grabber.as_mut() {
                if grabber.remove_popup(surface) {
                    trace!(?surface, device = ?grabber.device(), "Popup left its stack");
                }
            }
        }
    }

    /// Feed a pointer motion
    ///
    /// Returns whether an interactive grab consumed the event.
    #[instrument(level = "trace", parent = &self.span, skip(self))]
    pub fn pointer_motion(&mut self, device: DeviceId, event: &MotionEvent) -> Result<bool, ShellError> {
        let data = self
            .devices
            .get_mut(&device)
            .ok_or(ShellError::UnknownDevice(device))?;
        Ok(data.pointer.motion(&mut self.surfaces, event))
    }

    /// Feed a pointer button event
    ///
    /// `focus` is the surface under the pointer. A press not consumed by an
    /// interactive grab and not aimed at the device's popup stack dismisses the
    /// stack. Every press becomes the new grab serial of the device.
    ///
    /// Returns whether an interactive grab consumed the event.
    #[instrument(level = "trace", parent = &self.span, skip(self))]
    pub fn pointer_button(
        &mut self,
        device: DeviceId,
        event: &ButtonEvent,
        focus: Option<SurfaceId>,
    ) -> Result<bool, ShellError> {
        let data = self
            .devices
            .get_mut(&device)
            .ok_or(ShellError::UnknownDevice(device))?;
        let consumed = data.pointer.button(&mut self.surfaces, event);

        if event.state == ButtonState::Pressed {
            if let Some(grabber) = data.popup_grabber.as_mut() {
                if !consumed && grabber.is_active() && !focus.is_some_and(|focus| grabber.contains(focus)) {
                    grabber.dismiss(&self.surfaces);
                }
                grabber.set_grab_serial(event.serial);
            }
        }
        Ok(consumed)
    }

    /// Feed a key press
    ///
    /// `focus` is the surface with keyboard focus. A key aimed outside the device's
    /// popup stack dismisses it, unless disabled in the [`ShellConfig`].
    #[instrument(level = "trace", parent = &self.span, skip(self))]
    pub fn keyboard_key(&mut self, device: DeviceId, focus: Option<SurfaceId>) -> Result<(), ShellError> {
        let dismiss_on_key = self.config.popup_dismiss_on_key;
        let data = self
            .devices
            .get_mut(&device)
            .ok_or(ShellError::UnknownDevice(device))?;
        if let Some(grabber) = data.popup_grabber.as_mut() {
            if dismiss_on_key && grabber.is_active() && !focus.is_some_and(|focus| grabber.contains(focus)) {
                grabber.dismiss(&self.surfaces);
            }
        }
        Ok(())
    }
}
