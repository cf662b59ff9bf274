//! Core runtime for **perch** terminal widgets.
//!
//! Applications follow the Elm architecture: a [`Model`] is initialised,
//! updated with messages and rendered with ratatui, and side effects are
//! returned as [`Command`]s. On top of that loop this crate provides the two
//! things every perch widget builds on:
//!
//! * a [`Scene`]: the addressable elements (trigger regions, inputs, layers)
//!   an application lays out, turning raw terminal input into
//!   element-addressed [`DomEvent`]s;
//! * the lifecycle framework: [`Life`] and [`Lifecycle`] give a widget an
//!   id, observable properties and states with per-tick change coalescing,
//!   an [`EventBus`] and the before/after interception convention.
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Model`] | Top-level application (init / update / view) |
//! | [`Component`] | Reusable piece rendering into a rect |
//! | [`Command`] | Side effect, including next-tick and cancellable timers |
//! | [`Subscription`] | Long-lived event source |
//! | [`Program`] | Runs a [`Model`] on a real terminal |
//! | [`TestProgram`](testing::TestProgram) | Headless harness with a virtual clock |

pub mod bus;
pub mod command;
pub mod component;
pub mod error;
pub mod event;
pub mod life;
pub mod model;
pub mod runtime;
pub mod scene;
pub mod store;
pub mod subscription;
pub mod subscriptions;
pub mod testing;

pub use bus::{BusEvent, EventBus, Flow, ListenerId, Namespace};
pub use command::{Command, MouseMode, TerminalCommand, TimerId};
pub use component::Component;
pub use error::Error;
pub use event::TerminalEvent;
pub use life::{
    Changes, ComponentId, Detail, Guard, Life, LifeEvent, LifeEventKind, Lifecycle, Phase,
    Schedule,
};
pub use model::Model;
pub use runtime::{init_logging, OutputTarget, Program, ProgramError, ProgramHandle, ProgramOptions};
pub use scene::{DomEvent, DomEventKind, Element, ElementId, Role, Scene};
pub use store::{Change, SetOptions};
pub use subscription::{subscribe, Subscription, SubscriptionId, SubscriptionSource};
pub use subscriptions::{terminal_events, Every};

/// Run a model with default options.
pub async fn run<M: Model>(flags: M::Flags) -> Result<M, ProgramError> {
    Program::<M>::new(flags)?.run().await
}

pub async fn run_with<M: Model>(
    flags: M::Flags,
    options: ProgramOptions,
) -> Result<M, ProgramError> {
    Program::<M>::with_options(flags, options)?.run().await
}
