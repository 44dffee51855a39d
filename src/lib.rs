#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

//! # wlshell: window management for the `wl_shell` protocol
//!
//! This crate implements the server side state machine of the `wl_shell` protocol:
//! surface roles and display states, interactive move and resize grabs, popup
//! stacks and client liveness checks. It does not speak the wire protocol itself
//! and does no rendering. Your compositor decodes requests, forwards them along
//! with its input events, and implements the small traits through which the shell
//! talks back to clients and to your window management.
//!
//! ## Structure of the crate
//!
//! - [`shell`] contains the [`ShellState`](shell::ShellState), the entry point of the crate,
//!   along with the grabs, popup stacks and ping handling.
//! - [`input`] contains the per device pointer state and the grab mechanism interactive
//!   operations are built on.
//! - [`output`] and [`window`] describe the collaborators the shell needs from your
//!   compositor.
//!
//! ## General principles
//!
//! ### The event loop and state handling
//!
//! The shell is built to live in a [`calloop`] event loop, dispatching one event at a
//! time on a single thread. All of its state is owned by the `ShellState` and accessed
//! through `&mut` references, so no synchronization is involved. Objects that refer to
//! each other with independent lifetimes, like a grab and the surface it moves, do so
//! through generational ids ([`utils::arena`]). A surface destroyed at an arbitrary
//! point simply stops resolving.
//!
//! ### Logging
//!
//! This crate makes extensive use of [`tracing`] for its internal logging.
//!
//! For release builds it is recommended to limit the log level during compile time.
//! This can be done by adding a dependency to [`tracing`] and enabling the corresponding features.
//! For example to enable `trace` messages for debug builds, but limit release builds to `debug` add
//! the following in your binary crate `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! tracing = { version = "0.1", features = ["max_level_trace", "release_max_level_debug"] }
//! ```
//!
//! If you do not want to use [`tracing`] for your compositor, refer to
//! [`log compatibility`](tracing#log-compatibility) for how to forward the debug
//! output to other `log` compatible frameworks.

pub mod input;
pub mod output;
pub mod shell;
pub mod utils;
pub mod window;

pub mod reexports;
