use std::{cell::RefCell, rc::Rc, time::Instant};

use tracing::{debug, info, warn};
use wlshell::{
    input::{
        pointer::{ButtonEvent, MotionEvent},
        ButtonState, DeviceId,
    },
    output::{Output, OutputId},
    reexports::calloop::LoopSignal,
    shell::{
        grabs::ResizeEdge, ClientId, ShellConfig, ShellError, ShellRequest, ShellState, ShellSurfaceResource,
        SurfaceId, TransientFlags, WlSurfaceId,
    },
    utils::{Logical, Point, Rectangle, Serial, Size, SERIAL_COUNTER},
    window::Window,
};

use crate::session::Step;

const BTN_LEFT: u32 = 0x110;

type PendingPings = Rc<RefCell<Vec<(WlSurfaceId, Serial)>>>;

pub struct Shellvil {
    pub start_time: Instant,
    pub loop_signal: LoopSignal,

    pub shell: ShellState,
    pub client: ClientId,
    pub pointer: DeviceId,

    pings: PendingPings,
    answer_pings: bool,
}

impl Shellvil {
    pub fn new(config: ShellConfig, loop_signal: LoopSignal, answer_pings: bool) -> Self {
        let mut shell = ShellState::new(config);

        // a single headless output with a panel at the bottom
        shell.add_output(
            Output::new(
                OutputId(0),
                "headless-0".into(),
                Rectangle::from_loc_and_size((0, 0), (1920, 1080)),
            )
            .with_available_geometry(Rectangle::from_loc_and_size((0, 0), (1920, 1040))),
        );

        let pointer = DeviceId(0);
        shell.add_device(pointer);

        let client = ClientId(1);
        shell.bind(client);

        Shellvil {
            start_time: Instant::now(),
            loop_signal,
            shell,
            client,
            pointer,
            pings: PendingPings::default(),
            answer_pings,
        }
    }

    fn time(&self) -> u32 {
        self.start_time.elapsed().as_millis() as u32
    }

    fn lookup(&self, wl_surface: WlSurfaceId) -> Result<SurfaceId, ShellError> {
        self.shell
            .shell_surface_for(wl_surface)
            .ok_or(ShellError::DeadSurface)
    }

    fn last_press(&self) -> Option<Serial> {
        self.shell
            .pointer(self.pointer)
            .and_then(|pointer| pointer.last_press_serial())
    }

    /// Let the client answer the pings it received
    pub fn answer_pings(&mut self) {
        let pings = std::mem::take(&mut *self.pings.borrow_mut());
        if !self.answer_pings {
            return;
        }
        for (wl_surface, serial) in pings {
            if let Ok(surface) = self.lookup(wl_surface) {
                self.shell.dispatch(surface, ShellRequest::Pong { serial });
            }
        }
    }

    pub fn run_step(&mut self, step: &Step) -> Result<(), ShellError> {
        debug!(?step, "Replaying");
        match step {
            Step::Create(wl_surface, geometry) => {
                let resource = SimResource {
                    wl_surface: *wl_surface,
                    pings: self.pings.clone(),
                };
                let window = SimWindow::new(*wl_surface, *geometry);
                self.shell
                    .get_shell_surface(self.client, *wl_surface, resource, window)?;
            }
            Step::Map(wl_surface) => {
                let surface = self.lookup(*wl_surface)?;
                self.shell.surface_mapped(surface)?;
            }
            Step::Request(wl_surface, request) => {
                let surface = self.lookup(*wl_surface)?;
                self.shell.dispatch(surface, request.clone());
            }
            Step::Move(wl_surface) => {
                let surface = self.lookup(*wl_surface)?;
                let Some(serial) = self.last_press() else {
                    warn!("No press to start a move from");
                    return Ok(());
                };
                self.shell.dispatch(
                    surface,
                    ShellRequest::Move {
                        device: self.pointer,
                        serial,
                    },
                );
            }
            Step::Resize(wl_surface, edges) => {
                let surface = self.lookup(*wl_surface)?;
                let Some(serial) = self.last_press() else {
                    warn!("No press to start a resize from");
                    return Ok(());
                };
                self.shell.dispatch(
                    surface,
                    ShellRequest::Resize {
                        device: self.pointer,
                        serial,
                        edges: edges.bits(),
                    },
                );
            }
            Step::Popup { surface, parent, x, y } => {
                let popup = self.lookup(*surface)?;
                let Some(serial) = self.last_press() else {
                    warn!("No press to open a popup from");
                    return Ok(());
                };
                self.shell.dispatch(
                    popup,
                    ShellRequest::SetPopup {
                        device: self.pointer,
                        serial,
                        parent: *parent,
                        x: *x,
                        y: *y,
                        flags: TransientFlags::empty(),
                    },
                );
            }
            Step::Motion(x, y) => {
                let event = MotionEvent {
                    location: (*x, *y).into(),
                    serial: SERIAL_COUNTER.next_serial(),
                    time: self.time(),
                };
                self.shell.pointer_motion(self.pointer, &event)?;
            }
            Step::Button(state, focus) => {
                let focus = focus.map(|wl_surface| self.lookup(wl_surface)).transpose()?;
                let event = ButtonEvent {
                    serial: SERIAL_COUNTER.next_serial(),
                    time: self.time(),
                    button: BTN_LEFT,
                    state: *state,
                };
                let consumed = self.shell.pointer_button(self.pointer, &event, focus)?;
                debug!(consumed, "Button {:?}", state);
            }
            Step::Key(focus) => {
                let focus = focus.map(|wl_surface| self.lookup(wl_surface)).transpose()?;
                self.shell.keyboard_key(self.pointer, focus)?;
            }
            Step::Destroy(wl_surface) => {
                let surface = self.lookup(*wl_surface)?;
                self.shell.destroy_surface(surface)?;
            }
            Step::Disconnect => self.shell.client_disconnected(self.client),
        }
        Ok(())
    }
}

/// Client side of a shell surface, logging what it receives
#[derive(Debug)]
struct SimResource {
    wl_surface: WlSurfaceId,
    pings: PendingPings,
}

impl ShellSurfaceResource for SimResource {
    fn ping(&self, serial: Serial) {
        self.pings.borrow_mut().push((self.wl_surface, serial));
    }

    fn configure(&self, edges: ResizeEdge, size: Size<i32, Logical>) {
        info!(surface = ?self.wl_surface, ?edges, ?size, "configure");
    }

    fn popup_done(&self) {
        info!(surface = ?self.wl_surface, "popup_done");
    }
}

#[derive(Debug)]
struct SimWindow {
    wl_surface: WlSurfaceId,
    geometry: Rectangle<i32, Logical>,
}

impl SimWindow {
    fn new(wl_surface: WlSurfaceId, geometry: Rectangle<i32, Logical>) -> Self {
        SimWindow { wl_surface, geometry }
    }
}

impl Window for SimWindow {
    fn geometry(&self) -> Rectangle<i32, Logical> {
        self.geometry
    }

    fn set_position(&mut self, position: Point<i32, Logical>) {
        self.geometry.loc = position;
        debug!(surface = ?self.wl_surface, ?position, "Window moved");
    }

    fn set_size(&mut self, size: Size<i32, Logical>) {
        self.geometry.size = size;
        debug!(surface = ?self.wl_surface, ?size, "Window resized");
    }

    fn maximize(&mut self, output: &Output) {
        self.geometry = output.available_geometry();
        info!(surface = ?self.wl_surface, output = output.name(), "Window maximized");
    }

    fn unmaximize(&mut self) {
        info!(surface = ?self.wl_surface, "Window unmaximized");
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        info!(surface = ?self.wl_surface, fullscreen, "Window fullscreen state changed");
    }

    fn set_title(&mut self, title: &str) {
        info!(surface = ?self.wl_surface, title, "Window title changed");
    }

    fn motion_started(&mut self) {
        info!(surface = ?self.wl_surface, "Move started");
    }

    fn motion_finished(&mut self) {
        info!(surface = ?self.wl_surface, geometry = ?self.geometry, "Move finished");
    }

    fn resize_started(&mut self) {
        info!(surface = ?self.wl_surface, "Resize started");
    }

    fn resize_finished(&mut self) {
        info!(surface = ?self.wl_surface, "Resize finished");
    }

    fn set_unresponsive(&mut self, unresponsive: bool) {
        if unresponsive {
            warn!(surface = ?self.wl_surface, "Client stopped answering pings");
        } else {
            info!(surface = ?self.wl_surface, "Client answers pings again");
        }
    }
}
