//! Mode flags for backprop recording and training, with scoped overrides.
//!
//! Graph handles are `Rc`-based, so the flags live in thread-local cells: a
//! training process drives the engine from a single thread.

use std::cell::Cell;

thread_local! {
    static ENABLE_BACKPROP: Cell<bool> = const { Cell::new(true) };
    static TRAIN: Cell<bool> = const { Cell::new(true) };
}

/// A mode flag that can be overridden for a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    /// When false, ops compute values without recording a graph.
    EnableBackprop,
    /// When false, training-only ops such as dropout become identities.
    Train,
}

impl Flag {
    fn get(self) -> bool {
        match self {
            Flag::EnableBackprop => ENABLE_BACKPROP.with(Cell::get),
            Flag::Train => TRAIN.with(Cell::get),
        }
    }

    fn set(self, value: bool) {
        match self {
            Flag::EnableBackprop => ENABLE_BACKPROP.with(|c| c.set(value)),
            Flag::Train => TRAIN.with(|c| c.set(value)),
        }
    }
}

/// Read access to the current mode flags.
pub struct Config;

impl Config {
    pub fn enable_backprop() -> bool {
        Flag::EnableBackprop.get()
    }

    pub fn train() -> bool {
        Flag::Train.get()
    }
}

/// Restores a flag's previous value when ended or dropped.
#[must_use = "the override ends as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ConfigGuard {
    flag: Flag,
    previous: bool,
    active: bool,
}

impl ConfigGuard {
    /// End the override now.
    pub fn end(mut self) {
        self.restore();
    }

    fn restore(&mut self) {
        if self.active {
            self.flag.set(self.previous);
            self.active = false;
        }
    }
}

impl Drop for ConfigGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Set `flag` to `value` until the returned guard is ended or dropped.
pub fn using_config(flag: Flag, value: bool) -> ConfigGuard {
    let previous = flag.get();
    flag.set(value);
    ConfigGuard {
        flag,
        previous,
        active: true,
    }
}

/// Disable graph recording for the guard's lifetime.
pub fn no_grad() -> ConfigGuard {
    using_config(Flag::EnableBackprop, false)
}

/// Switch to inference behaviour for the guard's lifetime.
pub fn test_mode() -> ConfigGuard {
    using_config(Flag::Train, false)
}
