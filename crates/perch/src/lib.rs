//! **perch** -- popups, tooltips and form widgets for [`ratatui`] applications.
//!
//! This is the umbrella crate that re-exports everything needed to build a
//! perch application from a single dependency:
//!
//! ```toml
//! [dependencies]
//! perch = "0.1"
//! ```
//!
//! # Re-exports
//!
//! * All public items from [`perch_core`] are available at the crate root
//!   ([`Model`], [`Component`], [`Command`], [`Scene`], [`Life`],
//!   [`Program`], [`run`], [`run_with`], etc.).
//! * The [`widgets`] module re-exports everything from [`perch_widgets`]
//!   (the stage and popup engine, tooltips, menus, dialogs, form widgets).
//! * [`ratatui`], [`crossterm`], and [`tokio`] are re-exported so downstream
//!   crates do not need to depend on them directly.
//!
//! # Quick start
//!
//! ```ignore
//! use perch::widgets::{stage, tooltip::{Tooltip, TooltipOptions}, Mounted, Stage};
//! use perch::{Element, Scene};
//! use ratatui::layout::Rect;
//!
//! let mut scene = Scene::new(Rect::new(0, 0, 80, 24));
//! let save = scene.add(Element::button(Rect::new(2, 2, 6, 1)).with_attr("data-title", "Save"));
//! let app = Mounted::attach(Stage::new(scene), |s| {
//!     Tooltip::attach(s, [save], TooltipOptions::default())
//! })?;
//! ```

pub use perch_core::*;
pub mod widgets {
    pub use perch_widgets::*;
}

// Re-export dependencies for use in demos and downstream crates
pub use crossterm;
pub use ratatui;
pub use tokio;
