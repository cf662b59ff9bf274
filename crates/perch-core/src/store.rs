//! Named values with per-tick change coalescing.
//!
//! A [`Store`] keeps the current value of each named property and a buffer
//! of pending [`Change`]s. Writes made before the next flush collapse into
//! one change per name whose `old` is the value before the first write, and
//! changes that end where they started are dropped at flush time.

use std::collections::HashMap;

/// One property's net transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Change<V> {
    pub old: V,
    pub new: V,
}

/// Flags accepted by [`Store::set`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Write the value without recording a change.
    pub silent: bool,
    /// Record a change even if the value is equal to the current one.
    pub force: bool,
    /// Report the change immediately instead of queueing it.
    pub sync: bool,
}

impl SetOptions {
    pub const SILENT: SetOptions = SetOptions {
        silent: true,
        force: false,
        sync: false,
    };
    pub const FORCE: SetOptions = SetOptions {
        silent: false,
        force: true,
        sync: false,
    };
    pub const SYNC: SetOptions = SetOptions {
        silent: false,
        force: false,
        sync: true,
    };
}

/// Maps a candidate value (and the current one) to the value actually stored.
/// Used to coerce invalid input back to something acceptable.
pub type Validator<V> = Box<dyn Fn(V, &V) -> V + Send + Sync>;

/// Result of a [`Store::set`].
#[derive(Debug, Clone, PartialEq)]
pub enum Write<V> {
    /// The name was not defined yet; it now is, with no change recorded.
    Defined,
    /// Equal to the current value and not forced.
    Unchanged,
    /// Stored without a change record.
    Silent,
    /// Stored and queued for the next flush.
    Queued,
    /// Stored; the caller must report this change now.
    Immediate(Change<V>),
}

struct Pending<V> {
    name: &'static str,
    old: V,
    forced: bool,
}

pub struct Store<V> {
    values: HashMap<&'static str, V>,
    pending: Vec<Pending<V>>,
    validators: HashMap<&'static str, Validator<V>>,
}

impl<V> Default for Store<V> {
    fn default() -> Self {
        Self {
            values: HashMap::new(),
            pending: Vec::new(),
            validators: HashMap::new(),
        }
    }
}

impl<V: std::fmt::Debug> std::fmt::Debug for Store<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("values", &self.values)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl<V: Clone + PartialEq> Store<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial value of `name` without recording a change.
    pub fn define(&mut self, name: &'static str, value: V) {
        self.values.insert(name, value);
    }

    pub fn validate(&mut self, name: &'static str, validator: Validator<V>) {
        self.validators.insert(name, validator);
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.values.get(name)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn set(&mut self, name: &'static str, value: V, opts: SetOptions) -> Write<V> {
        let Some(current) = self.values.get(name).cloned() else {
            let value = match self.validators.get(name) {
                Some(validate) => validate(value.clone(), &value),
                None => value,
            };
            self.values.insert(name, value);
            return Write::Defined;
        };
        let value = match self.validators.get(name) {
            Some(validate) => validate(value, &current),
            None => value,
        };
        if !opts.force && value == current {
            return Write::Unchanged;
        }
        self.values.insert(name, value.clone());

        if opts.silent {
            return Write::Silent;
        }
        if opts.sync {
            let (old, forced) = match self.pending.iter().position(|p| p.name == name) {
                Some(index) => {
                    let pending = self.pending.remove(index);
                    (pending.old, pending.forced)
                }
                None => (current, false),
            };
            // A queued write undone by this one nets out.
            if !opts.force && !forced && old == value {
                return Write::Unchanged;
            }
            return Write::Immediate(Change { old, new: value });
        }
        match self.pending.iter_mut().find(|p| p.name == name) {
            Some(pending) => pending.forced |= opts.force,
            None => self.pending.push(Pending {
                name,
                old: current,
                forced: opts.force,
            }),
        }
        Write::Queued
    }

    /// Drain the pending buffer into net changes, in first-write order.
    pub fn take_pending(&mut self) -> Vec<(&'static str, Change<V>)> {
        let pending = std::mem::take(&mut self.pending);
        pending
            .into_iter()
            .filter_map(|p| {
                let new = self.values.get(p.name)?.clone();
                (p.forced || new != p.old).then_some((p.name, Change { old: p.old, new }))
            })
            .collect()
    }
}
