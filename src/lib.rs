//! Lifecycle tracking for asynchronous operations started from UI nodes.
//!
//! ```
//! use asyncop::{Node, Runtime, Task};
//! use futures::FutureExt;
//!
//! let mut rt = Runtime::new();
//! let node = Node::new();
//! let op = node.use_async::<i32, String>();
//! node.attach();
//!
//! let handle = op.run(Task::resolve(42)).unwrap();
//! assert!(op.is_loading());
//!
//! rt.update();
//! assert!(op.is_success());
//! assert_eq!(op.data(), Some(42));
//! assert_eq!(handle.now_or_never(), Some(Ok(42)));
//! ```
mod async_op;
mod core;
mod lifecycle;
mod liveness;
mod subscription;
mod task;

#[cfg(test)]
mod test_helpers;

pub use async_op::*;
pub use crate::core::Runtime;
pub use lifecycle::*;
pub use liveness::Node;
pub use subscription::*;
pub use task::*;
