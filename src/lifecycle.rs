use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};

#[cfg(test)]
mod tests;

/// Stage of an asynchronous operation.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, FromStr, Serialize, Deserialize,
)]
#[display(style = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Idle,
    Pending,
    Resolved,
    Rejected,
}

/// State of an asynchronous operation.
///
/// `data` and `error` are only replaced by the transition that owns them,
/// so a value from an earlier settlement stays readable after the status moves on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle<T, E> {
    pub status: Status,
    pub data: Option<T>,
    pub error: Option<E>,
}

impl<T, E> Lifecycle<T, E> {
    /// `{ status: Idle, data: None, error: None }`
    pub const fn new() -> Self {
        Self {
            status: Status::Idle,
            data: None,
            error: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.status == Status::Idle
    }
    pub fn is_loading(&self) -> bool {
        self.status == Status::Pending
    }
    pub fn is_error(&self) -> bool {
        self.status == Status::Rejected
    }
    pub fn is_success(&self) -> bool {
        self.status == Status::Resolved
    }

    /// Applies a transition in place.
    pub fn apply(&mut self, patch: Patch<T, E>) {
        match patch {
            Patch::ToPending => self.status = Status::Pending,
            Patch::ToResolved(data) => {
                self.data = Some(data);
                self.status = Status::Resolved;
            }
            Patch::ToRejected(error) => {
                self.error = Some(error);
                self.status = Status::Rejected;
            }
            Patch::Replace(record) => *self = record,
        }
    }
}

impl<T, E> Default for Lifecycle<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> From<Seed<T, E>> for Lifecycle<T, E> {
    fn from(seed: Seed<T, E>) -> Self {
        let default = Self::new();
        Self {
            status: seed.status.unwrap_or(default.status),
            data: seed.data.or(default.data),
            error: seed.error.or(default.error),
        }
    }
}

/// Merges `patch` into `record` and returns the result.
pub fn apply_patch<T, E>(mut record: Lifecycle<T, E>, patch: Patch<T, E>) -> Lifecycle<T, E> {
    record.apply(patch);
    record
}

/// A transition of [`Lifecycle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T, E> {
    /// Overwrites `status` only.
    ToPending,
    /// Overwrites `data` and `status`.
    ToResolved(T),
    /// Overwrites `error` and `status`.
    ToRejected(E),
    /// Replaces the whole record.
    Replace(Lifecycle<T, E>),
}

/// Partial initial state of an [`AsyncOp`](crate::AsyncOp).
///
/// Fields left as `None` fall back to [`Lifecycle::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seed<T, E> {
    pub status: Option<Status>,
    pub data: Option<T>,
    pub error: Option<E>,
}

impl<T, E> Seed<T, E> {
    pub const fn new() -> Self {
        Self {
            status: None,
            data: None,
            error: None,
        }
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }
    pub fn data(mut self, data: T) -> Self {
        self.data = Some(data);
        self
    }
    pub fn error(mut self, error: E) -> Self {
        self.error = Some(error);
        self
    }
}
impl<T, E> Default for Seed<T, E> {
    fn default() -> Self {
        Self::new()
    }
}
