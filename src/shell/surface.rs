use indexmap::IndexSet;
use tracing::{debug, trace};

use crate::{
    input::DeviceId,
    output::Output,
    utils::{arena::Arena, Logical, Point, Rectangle, Serial},
    window::Window,
};

use super::{
    grabs::ResizeEdge, ClientId, FullscreenMethod, ShellError, ShellSurfaceResource, SurfaceId, WlSurfaceId,
};

/// Storage of all shell surfaces
///
/// Grabs receive this map when they handle pointer events. Surfaces are referenced
/// by [`SurfaceId`], which stops resolving once the surface is destroyed.
#[derive(Debug, Default)]
pub struct SurfaceMap {
    arena: Arena<ShellSurfaceData>,
}

impl SurfaceMap {
    /// Access a surface, if it is still alive
    pub fn get(&self, id: SurfaceId) -> Option<&ShellSurfaceData> {
        self.arena.get(id.0)
    }

    /// Whether the surface is still alive
    pub fn contains(&self, id: SurfaceId) -> bool {
        self.arena.contains(id.0)
    }

    /// Number of live surfaces
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Whether there are no live surfaces
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Iterate over all live surfaces
    pub fn iter(&self) -> impl Iterator<Item = (SurfaceId, &ShellSurfaceData)> {
        self.arena.iter().map(|(idx, data)| (SurfaceId(idx), data))
    }

    pub(crate) fn get_mut(&mut self, id: SurfaceId) -> Option<&mut ShellSurfaceData> {
        self.arena.get_mut(id.0)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (SurfaceId, &mut ShellSurfaceData)> {
        self.arena.iter_mut().map(|(idx, data)| (SurfaceId(idx), data))
    }

    pub(super) fn insert(&mut self, data: ShellSurfaceData) -> SurfaceId {
        SurfaceId(self.arena.insert(data))
    }

    pub(super) fn remove(&mut self, id: SurfaceId) -> Option<ShellSurfaceData> {
        self.arena.remove(id.0)
    }
}

/// Role of a shell surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Role {
    /// No role was requested yet
    None,
    /// A regular toplevel window
    Toplevel,
    /// A window stacked relative to a parent
    Transient {
        /// The parent surface
        parent: SurfaceId,
        /// Location relative to the parent
        offset: Point<i32, Logical>,
        /// The window should not receive focus
        inactive: bool,
    },
    /// A popup opened through an input device
    Popup(PopupRole),
}

impl Role {
    /// Parent of a transient or popup surface
    pub fn parent(&self) -> Option<SurfaceId> {
        match self {
            Role::Transient { parent, .. } => Some(*parent),
            Role::Popup(popup) => Some(popup.parent),
            Role::None | Role::Toplevel => None,
        }
    }
}

/// Popup specific part of a [`Role`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopupRole {
    /// The parent surface
    pub parent: SurfaceId,
    /// Location relative to the parent
    pub offset: Point<i32, Logical>,
    /// Device that opened the popup
    pub device: DeviceId,
    /// Serial of the input event the client claims opened the popup
    pub serial: Serial,
    pub(super) awaiting_map: bool,
}

impl PopupRole {
    /// Whether the popup still has to pass the grab check on its next map
    pub fn awaiting_map(&self) -> bool {
        self.awaiting_map
    }
}

/// Display state of a shell surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceState {
    /// Regular state
    Normal,
    /// Covering the available geometry of an output
    Maximized,
    /// Covering a whole output
    Fullscreen,
}

/// Kind of interactive operation a surface owns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrabKind {
    /// Interactive move
    Move,
    /// Interactive resize
    Resize,
}

/// Protocol state of a single shell surface
#[derive(Debug)]
pub struct ShellSurfaceData {
    pub(super) client: ClientId,
    pub(super) wl_surface: WlSurfaceId,
    pub(super) role: Role,
    pub(super) state: SurfaceState,
    pub(super) prev_state: SurfaceState,
    pub(super) prev_geometry: Option<Rectangle<i32, Logical>>,
    pub(super) title: String,
    pub(super) class: String,
    pub(super) fullscreen_method: Option<FullscreenMethod>,
    pub(super) pending_pings: IndexSet<Serial>,
    pub(super) unresponsive: bool,
    pub(super) active_grab: Option<(DeviceId, GrabKind)>,
    pub(super) mapped: bool,
    pub(super) resource: Box<dyn ShellSurfaceResource>,
    pub(super) window: Box<dyn Window>,
}

impl ShellSurfaceData {
    pub(super) fn new(
        client: ClientId,
        wl_surface: WlSurfaceId,
        resource: Box<dyn ShellSurfaceResource>,
        window: Box<dyn Window>,
    ) -> Self {
        ShellSurfaceData {
            client,
            wl_surface,
            role: Role::None,
            state: SurfaceState::Normal,
            prev_state: SurfaceState::Normal,
            prev_geometry: None,
            title: String::new(),
            class: String::new(),
            fullscreen_method: None,
            pending_pings: IndexSet::new(),
            unresponsive: false,
            active_grab: None,
            mapped: false,
            resource,
            window,
        }
    }

    /// Client owning this surface
    pub fn client(&self) -> ClientId {
        self.client
    }

    /// The `wl_surface` this shell surface gives a role to
    pub fn wl_surface(&self) -> WlSurfaceId {
        self.wl_surface
    }

    /// Current role
    pub fn role(&self) -> Role {
        self.role
    }

    /// Current display state
    pub fn state(&self) -> SurfaceState {
        self.state
    }

    /// Display state before the last state change
    pub fn prev_state(&self) -> SurfaceState {
        self.prev_state
    }

    /// Geometry saved when entering the maximized or fullscreen state
    pub fn prev_geometry(&self) -> Option<Rectangle<i32, Logical>> {
        self.prev_geometry
    }

    /// Current geometry of the window
    pub fn geometry(&self) -> Rectangle<i32, Logical> {
        self.window.geometry()
    }

    /// Title set by the client
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Class set by the client
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Method requested by the last `set_fullscreen`
    pub fn fullscreen_method(&self) -> Option<FullscreenMethod> {
        self.fullscreen_method
    }

    /// Serials of the pings the client did not answer yet
    pub fn pending_pings(&self) -> &IndexSet<Serial> {
        &self.pending_pings
    }

    /// Whether the client stopped answering pings
    pub fn is_unresponsive(&self) -> bool {
        self.unresponsive
    }

    /// The interactive operation this surface currently owns
    pub fn active_grab(&self) -> Option<(DeviceId, GrabKind)> {
        self.active_grab
    }

    /// Whether the surface is currently mapped
    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    /// The window manager side of the surface
    pub fn window(&self) -> &dyn Window {
        &*self.window
    }

    pub(super) fn set_toplevel(&mut self) {
        self.role = Role::Toplevel;
        self.window.set_toplevel();
        if self.state == SurfaceState::Normal {
            return;
        }

        debug!(from = ?self.state, "Restoring normal state");
        self.clear_window_state();
        self.prev_state = self.state;
        self.state = SurfaceState::Normal;

        if let Some(geometry) = self.prev_geometry.take() {
            self.window.set_position(geometry.loc);
            self.window.set_size(geometry.size);
            self.resource.configure(ResizeEdge::NONE, geometry.size);
        }
    }

    pub(super) fn set_transient(&mut self, parent: SurfaceId, offset: Point<i32, Logical>, inactive: bool) {
        self.role = Role::Transient {
            parent,
            offset,
            inactive,
        };
        self.window.set_transient(parent, offset, inactive);
    }

    pub(super) fn set_popup(
        &mut self,
        parent: SurfaceId,
        offset: Point<i32, Logical>,
        device: DeviceId,
        serial: Serial,
    ) {
        self.role = Role::Popup(PopupRole {
            parent,
            offset,
            device,
            serial,
            awaiting_map: true,
        });
        self.window.set_popup(parent, offset);
    }

    // only the flag of the current state is ever set on the window
    fn clear_window_state(&mut self) {
        match self.state {
            SurfaceState::Maximized => self.window.unmaximize(),
            SurfaceState::Fullscreen => {
                self.window.set_fullscreen(false);
                self.fullscreen_method = None;
            }
            SurfaceState::Normal => {}
        }
    }

    fn save_geometry(&mut self, output: &Output) {
        let geometry = self.window.geometry();
        self.prev_geometry = Some(if geometry.is_empty() {
            output.geometry()
        } else {
            geometry
        });
    }

    pub(super) fn enter_fullscreen(
        &mut self,
        output: &Output,
        method: FullscreenMethod,
    ) -> Result<(), ShellError> {
        if self.state == SurfaceState::Fullscreen {
            return Err(ShellError::InvalidState(self.state));
        }

        // entering from maximized overwrites the saved maximized state and geometry
        self.save_geometry(output);
        self.resource
            .configure(ResizeEdge::BOTTOM_RIGHT, output.geometry().size);
        self.clear_window_state();
        self.prev_state = self.state;
        self.state = SurfaceState::Fullscreen;
        self.fullscreen_method = Some(method);
        self.window.set_fullscreen(true);
        trace!(output = output.name(), ?method, "Surface is fullscreen");
        Ok(())
    }

    pub(super) fn enter_maximized(&mut self, output: &Output) -> Result<(), ShellError> {
        if self.role != Role::Toplevel {
            return Err(ShellError::NotToplevel);
        }
        if self.state == SurfaceState::Maximized {
            return Err(ShellError::InvalidState(self.state));
        }

        self.save_geometry(output);
        self.resource
            .configure(ResizeEdge::BOTTOM_RIGHT, output.available_geometry().size);
        self.clear_window_state();
        self.prev_state = self.state;
        self.state = SurfaceState::Maximized;
        self.window.maximize(output);
        trace!(output = output.name(), "Surface is maximized");
        Ok(())
    }

    pub(super) fn set_title(&mut self, title: String) {
        self.window.set_title(&title);
        self.title = title;
    }

    pub(super) fn set_class(&mut self, class: String) {
        self.window.set_app_id(&class);
        self.class = class;
    }

    pub(super) fn pong(&mut self, serial: Serial) -> Result<(), ShellError> {
        if !self.pending_pings.shift_remove(&serial) {
            return Err(ShellError::UnexpectedPong(serial));
        }
        if self.unresponsive {
            debug!(?serial, "Client is responsive again");
            self.unresponsive = false;
            self.window.set_unresponsive(false);
        }
        Ok(())
    }
}
