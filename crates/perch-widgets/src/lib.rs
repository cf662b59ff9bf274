//! Popup engine and widgets for **perch**.
//!
//! Everything that pops up (tooltips, menus, dialogs, date pickers) is a
//! [`Popup`](popup::Popup) registered on a [`Stage`](stage::Stage): the stage
//! owns the scene, arms trigger listeners, runs show/hide delays with their
//! breakers, keeps one owner per layer and publishes
//! [`PopupEvent`](stage::PopupEvent)s. Widgets implement
//! [`Widget`](mount::Widget) and receive the stage explicitly;
//! [`Mounted`](mount::Mounted) turns a single widget plus its stage into a
//! [`perch_core::Component`].
//!
//! # Popup engine
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`trigger`] | Trigger kinds, sets and show/hide specs |
//! | [`popup`] | Popup definition, guards and show effects |
//! | [`stage`] | Popup registry, ownership and delays |
//! | [`position`] | Placement next to an anchor, centring, clamping |
//! | [`mount`] | The [`Widget`](mount::Widget) seam and [`Mounted`](mount::Mounted) |
//!
//! # Widgets
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`tooltip`] | Hover tooltips on a shared tip layer |
//! | [`context_menu`] | Right-click menu at the pointer |
//! | [`dialog`] | Centred, draggable modal dialog |
//! | [`calendar`] | Month calendar and input-bound date picker |
//! | [`carousel`] | Slides with autoplay and dots |
//! | [`number_input`] | Numeric input with auto-repeating steppers |
//! | [`uploader`] | File upload queue over a pluggable transport |
//!
//! # Utilities
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`draggable`] | Drag an element tree by a handle |
//! | [`keyboard`] | Key bindings, keymaps and long-press repeat |
//! | [`iterator`] | Looping or clamped index cursor |
//! | [`config`] | TOML option presets |

pub mod calendar;
pub mod carousel;
pub mod config;
pub mod context_menu;
pub mod dialog;
pub mod draggable;
pub mod iterator;
pub mod keyboard;
pub mod mount;
pub mod number_input;
pub mod popup;
pub mod position;
pub mod stage;
pub mod tooltip;
pub mod trigger;
pub mod uploader;

pub use mount::{Mounted, Widget};
pub use popup::{Popup, Reveal};
pub use position::Placement;
pub use stage::{Owner, PopupEvent, PopupEventKind, SharedLayer, Stage};
pub use trigger::{Transition, TriggerKind, TriggerSet, TriggerSpec};
