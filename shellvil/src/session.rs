//! The scripted client session replayed by shellvil

use wlshell::{
    input::ButtonState,
    shell::{grabs::ResizeEdge, FullscreenMethod, ShellRequest, TransientFlags, WlSurfaceId},
    utils::{Logical, Rectangle},
};

pub const TERMINAL: WlSurfaceId = WlSurfaceId(1);
pub const MENU: WlSurfaceId = WlSurfaceId(2);
pub const SUBMENU: WlSurfaceId = WlSurfaceId(3);
pub const DIALOG: WlSurfaceId = WlSurfaceId(4);

/// One input event or client request
#[derive(Debug, Clone)]
pub enum Step {
    /// Create the shell surface of a `wl_surface`
    Create(WlSurfaceId, Rectangle<i32, Logical>),
    Map(WlSurfaceId),
    Request(WlSurfaceId, ShellRequest),
    /// Move request with the serial of the last press
    Move(WlSurfaceId),
    /// Resize request with the serial of the last press
    Resize(WlSurfaceId, ResizeEdge),
    /// Popup request with the serial of the last press
    Popup {
        surface: WlSurfaceId,
        parent: WlSurfaceId,
        x: i32,
        y: i32,
    },
    Motion(f64, f64),
    Button(ButtonState, Option<WlSurfaceId>),
    Key(Option<WlSurfaceId>),
    Destroy(WlSurfaceId),
    Disconnect,
}

pub fn script() -> Vec<Step> {
    use ButtonState::{Pressed, Released};

    vec![
        Step::Create(TERMINAL, Rectangle::from_loc_and_size((100, 100), (800, 600))),
        Step::Request(TERMINAL, ShellRequest::SetToplevel),
        Step::Request(
            TERMINAL,
            ShellRequest::SetTitle {
                title: "Terminal".into(),
            },
        ),
        Step::Request(
            TERMINAL,
            ShellRequest::SetClass {
                class: "org.example.Terminal".into(),
            },
        ),
        Step::Map(TERMINAL),
        // drag the window by its title bar
        Step::Motion(400.0, 110.0),
        Step::Button(Pressed, Some(TERMINAL)),
        Step::Move(TERMINAL),
        Step::Motion(410.0, 120.0),
        Step::Motion(500.0, 200.0),
        Step::Motion(600.0, 260.0),
        Step::Button(Released, None),
        // grow it from the bottom right corner
        Step::Motion(1100.0, 850.0),
        Step::Button(Pressed, Some(TERMINAL)),
        Step::Resize(TERMINAL, ResizeEdge::BOTTOM_RIGHT),
        Step::Motion(1150.0, 880.0),
        Step::Motion(1250.0, 900.0),
        Step::Button(Released, None),
        // ambiguous edges are refused
        Step::Button(Pressed, Some(TERMINAL)),
        Step::Resize(TERMINAL, ResizeEdge::LEFT | ResizeEdge::RIGHT),
        Step::Button(Released, None),
        Step::Request(TERMINAL, ShellRequest::SetMaximized { output: None }),
        Step::Request(TERMINAL, ShellRequest::SetToplevel),
        Step::Request(
            TERMINAL,
            ShellRequest::SetFullscreen {
                method: FullscreenMethod::Default,
                framerate: 0,
                output: None,
            },
        ),
        Step::Request(TERMINAL, ShellRequest::SetToplevel),
        // a menu with a submenu, closed by a key press on the terminal
        Step::Motion(650.0, 320.0),
        Step::Button(Pressed, Some(TERMINAL)),
        Step::Create(MENU, Rectangle::from_loc_and_size((0, 0), (200, 300))),
        Step::Popup {
            surface: MENU,
            parent: TERMINAL,
            x: 50,
            y: 60,
        },
        Step::Map(MENU),
        Step::Button(Released, None),
        Step::Button(Pressed, Some(MENU)),
        Step::Create(SUBMENU, Rectangle::from_loc_and_size((0, 0), (200, 150))),
        Step::Popup {
            surface: SUBMENU,
            parent: MENU,
            x: 200,
            y: 40,
        },
        Step::Map(SUBMENU),
        Step::Button(Released, None),
        Step::Key(Some(TERMINAL)),
        Step::Button(Pressed, Some(TERMINAL)),
        Step::Button(Released, None),
        Step::Destroy(SUBMENU),
        Step::Destroy(MENU),
        // a dialog destroyed in the middle of its own move
        Step::Create(DIALOG, Rectangle::from_loc_and_size((300, 300), (400, 200))),
        Step::Request(
            DIALOG,
            ShellRequest::SetTransient {
                parent: TERMINAL,
                x: 200,
                y: 200,
                flags: TransientFlags::empty(),
            },
        ),
        Step::Map(DIALOG),
        Step::Motion(320.0, 310.0),
        Step::Button(Pressed, Some(DIALOG)),
        Step::Move(DIALOG),
        Step::Motion(330.0, 320.0),
        Step::Destroy(DIALOG),
        Step::Motion(340.0, 330.0),
        Step::Button(Released, None),
        Step::Disconnect,
    ]
}
