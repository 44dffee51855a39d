//! Output
//!
//! This module provides the [`Output`] type, the part of a compositor output the shell
//! needs: its geometry in the global compositor space, and the available geometry
//! left once panels and docks are subtracted. Fullscreen surfaces are sized to the
//! former, maximized ones to the latter.
//!
//! ```
//! # extern crate wlshell;
//! use wlshell::output::{Output, OutputId};
//! use wlshell::utils::{Rectangle, Size};
//!
//! // a 1080p output with a 40 pixel panel at the bottom
//! let geometry = Rectangle::from_loc_and_size((0, 0), (1920, 1080));
//! let output = Output::new(OutputId(0), "output-0".into(), geometry)
//!     .with_available_geometry(Rectangle::from_loc_and_size((0, 0), (1920, 1040)));
//! assert_eq!(output.available_geometry().size, Size::from((1920, 1040)));
//! ```

use tracing::{info, instrument};

use crate::utils::{Logical, Rectangle};

/// Identifier of an output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputId(pub u32);

/// An output of the compositor
#[derive(Debug, Clone)]
pub struct Output {
    id: OutputId,
    name: String,
    geometry: Rectangle<i32, Logical>,
    available_geometry: Rectangle<i32, Logical>,
}

impl Output {
    /// Create a new output
    ///
    /// The available geometry initially covers the whole output.
    pub fn new(id: OutputId, name: String, geometry: Rectangle<i32, Logical>) -> Output {
        info!(name = %name, ?geometry, "Creating new output");
        Output {
            id,
            name,
            geometry,
            available_geometry: geometry,
        }
    }

    /// Set the available geometry of a freshly created output
    pub fn with_available_geometry(mut self, available_geometry: Rectangle<i32, Logical>) -> Output {
        self.available_geometry = available_geometry;
        self
    }

    /// Identifier of this output
    pub fn id(&self) -> OutputId {
        self.id
    }

    /// Returns the name of the output
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Geometry of the output in the global compositor space
    pub fn geometry(&self) -> Rectangle<i32, Logical> {
        self.geometry
    }

    /// Part of the geometry not covered by exclusive zones
    pub fn available_geometry(&self) -> Rectangle<i32, Logical> {
        self.available_geometry
    }

    /// Change the geometry of this output
    ///
    /// The available geometry is clamped to the new geometry.
    #[instrument(skip(self), fields(output = %self.name))]
    pub fn change_geometry(&mut self, geometry: Rectangle<i32, Logical>) {
        self.geometry = geometry;
        self.available_geometry = self
            .available_geometry
            .intersection(geometry)
            .unwrap_or(geometry);
    }

    /// Change the available geometry of this output
    #[instrument(skip(self), fields(output = %self.name))]
    pub fn set_available_geometry(&mut self, available_geometry: Rectangle<i32, Logical>) {
        self.available_geometry = available_geometry;
    }
}
