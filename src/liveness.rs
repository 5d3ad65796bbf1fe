use std::{cell::Cell, rc::Rc};

use crate::{AsyncOp, AsyncOpBuilder};

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Unattached,
    Attached,
    Detached,
}

/// Lifecycle signal of the UI node that owns one or more [`AsyncOp`]s.
///
/// Operations created from a `Node` only apply state changes while the node is attached.
/// Dropping an attached `Node` detaches it.
pub struct Node {
    phase: Rc<Cell<Phase>>,
}

impl Node {
    /// Create a node that is not attached yet.
    pub fn new() -> Self {
        Self {
            phase: Rc::new(Cell::new(Phase::Unattached)),
        }
    }

    /// Notifies that the node has been attached to the UI tree.
    ///
    /// Panics if the node has already been attached.
    pub fn attach(&self) {
        match self.phase.get() {
            Phase::Unattached => self.phase.set(Phase::Attached),
            Phase::Attached | Phase::Detached => panic!("`Node` cannot be attached twice."),
        }
    }

    /// Notifies that the node is about to be removed from the UI tree.
    ///
    /// Panics if the node is not attached.
    pub fn detach(&self) {
        match self.phase.get() {
            Phase::Attached => self.phase.set(Phase::Detached),
            Phase::Unattached => panic!("`Node` is not attached yet."),
            Phase::Detached => panic!("`Node` is already detached."),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.phase.get() == Phase::Attached
    }

    /// Creates an [`AsyncOp`] owned by this node with the default initial state.
    pub fn use_async<T: Clone + 'static, E: Clone + 'static>(&self) -> AsyncOp<T, E> {
        AsyncOp::new(self)
    }

    /// Creates a builder for an [`AsyncOp`] owned by this node.
    pub fn async_op<T: Clone + 'static, E: Clone + 'static>(&self) -> AsyncOpBuilder<'_, T, E> {
        AsyncOp::builder(self)
    }

    pub(crate) fn liveness(&self) -> LivenessToken {
        LivenessToken(self.phase.clone())
    }
}
impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}
impl Drop for Node {
    fn drop(&mut self) {
        if self.phase.get() == Phase::Attached {
            self.phase.set(Phase::Detached);
        }
    }
}
impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("phase", &self.phase.get())
            .finish()
    }
}

/// Read side of a [`Node`]'s liveness, held by the dispatcher of each operation.
#[derive(Clone)]
pub(crate) struct LivenessToken(Rc<Cell<Phase>>);

impl LivenessToken {
    pub fn is_live(&self) -> bool {
        self.0.get() == Phase::Attached
    }
}
