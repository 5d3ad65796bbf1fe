use std::{
    cell::{Cell, Ref, RefCell},
    collections::VecDeque,
    mem::take,
    rc::Rc,
};

use derive_ex::derive_ex;
use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};
use slabmap::SlabMap;

use crate::{
    core::{assert_runtime_exists, spawn_local},
    liveness::LivenessToken,
    IntoTask, Lifecycle, Node, Patch, RunHandle, Seed, Status, Subscription, Task, UsageError,
};


/// How the settlements of overlapping [`AsyncOp::run`] calls are applied.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, FromStr, Serialize, Deserialize,
)]
#[display(style = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Overlap {
    /// Every settlement is applied. The task that settles last determines the state.
    #[default]
    LastSettleWins,
    /// Only the settlement of the most recent `run` is applied.
    LatestOnly,
}

/// Tracks the state of an asynchronous operation on behalf of a [`Node`].
///
/// State changes are dropped unless the owning node is attached.
pub struct AsyncOp<T: 'static, E: 'static> {
    dispatch: Dispatch<T, E>,
    callbacks: Callbacks<T, E>,
}

impl<T: Clone + 'static, E: Clone + 'static> AsyncOp<T, E> {
    /// Create an operation with the default initial state.
    pub fn new(node: &Node) -> Self {
        Self::builder(node).build()
    }

    pub fn builder(node: &Node) -> AsyncOpBuilder<'_, T, E> {
        AsyncOpBuilder {
            node,
            seed: Seed::new(),
            overlap: Overlap::default(),
        }
    }

    fn from_builder(b: AsyncOpBuilder<'_, T, E>) -> Self {
        let initial = Lifecycle::from(b.seed);
        let dispatch = Dispatch(Rc::new(DispatchData {
            liveness: b.node.liveness(),
            overlap: b.overlap,
            generation: Cell::new(0),
            record: RefCell::new(initial.clone()),
            initial,
            watchers: RefCell::new(SlabMap::new()),
            notifications: RefCell::new(VecDeque::new()),
            is_notifying: Cell::new(false),
        }));
        let callbacks = Callbacks::new(&dispatch);
        Self {
            dispatch,
            callbacks,
        }
    }

    /// Starts tracking `task`.
    ///
    /// The status becomes [`Status::Pending`] before this method returns.
    /// When the task settles, its value or failure is stored and the returned handle completes with it.
    ///
    /// Panics if no [`Runtime`](crate::Runtime) exists on the current thread,
    /// or if the state is borrowed. In both cases nothing is queued and the state is unchanged.
    pub fn run(&self, task: impl IntoTask<T, E>) -> Result<RunHandle<T, E>, UsageError> {
        self.dispatch.run(task.into_task())
    }

    /// Stores `data` and sets the status to [`Status::Resolved`].
    pub fn set_data(&self, data: T) {
        self.dispatch.send(Patch::ToResolved(data))
    }

    /// Stores `error` and sets the status to [`Status::Rejected`].
    pub fn set_error(&self, error: E) {
        self.dispatch.send(Patch::ToRejected(error))
    }

    /// Restores the state the operation was created with.
    pub fn reset(&self) {
        self.dispatch.reset()
    }

    /// Callbacks whose identities stay the same for the lifetime of this operation.
    pub fn callbacks(&self) -> &Callbacks<T, E> {
        &self.callbacks
    }

    /// Calls `f` with the new state after every applied change.
    pub fn watch(&self, f: impl Fn(&Lifecycle<T, E>) + 'static) -> Subscription {
        let key = self.dispatch.0.watchers.borrow_mut().insert(Rc::new(f));
        Subscription::from_weak_fn(Rc::downgrade(&self.dispatch.0), move |d| {
            d.watchers.borrow_mut().remove(key);
        })
    }

    pub fn snapshot(&self) -> Lifecycle<T, E> {
        self.borrow().clone()
    }
    pub fn data(&self) -> Option<T> {
        self.borrow().data.clone()
    }
    pub fn error(&self) -> Option<E> {
        self.borrow().error.clone()
    }
}
impl<T: 'static, E: 'static> AsyncOp<T, E> {
    /// Borrows the current state.
    ///
    /// Changing the state of this operation while the borrow is alive panics.
    pub fn borrow(&self) -> Ref<'_, Lifecycle<T, E>> {
        self.dispatch.0.record.borrow()
    }
    pub fn with<U>(&self, f: impl FnOnce(&Lifecycle<T, E>) -> U) -> U {
        f(&self.borrow())
    }

    pub fn status(&self) -> Status {
        self.borrow().status
    }
    pub fn is_idle(&self) -> bool {
        self.status() == Status::Idle
    }
    pub fn is_loading(&self) -> bool {
        self.status() == Status::Pending
    }
    pub fn is_error(&self) -> bool {
        self.status() == Status::Rejected
    }
    pub fn is_success(&self) -> bool {
        self.status() == Status::Resolved
    }
    pub fn overlap(&self) -> Overlap {
        self.dispatch.0.overlap
    }
}
impl<T: std::fmt::Debug + 'static, E: std::fmt::Debug + 'static> std::fmt::Debug
    for AsyncOp<T, E>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.dispatch.0.record.try_borrow() {
            Ok(record) => std::fmt::Debug::fmt(&*record, f),
            Err(_) => write!(f, "<borrowed>"),
        }
    }
}

/// Builder for [`AsyncOp`].
pub struct AsyncOpBuilder<'a, T, E> {
    node: &'a Node,
    seed: Seed<T, E>,
    overlap: Overlap,
}

impl<T: Clone + 'static, E: Clone + 'static> AsyncOpBuilder<'_, T, E> {
    /// Overrides part of the initial state.
    pub fn seed(mut self, seed: Seed<T, E>) -> Self {
        self.seed = seed;
        self
    }
    pub fn overlap(mut self, overlap: Overlap) -> Self {
        self.overlap = overlap;
        self
    }
    pub fn build(self) -> AsyncOp<T, E> {
        AsyncOp::from_builder(self)
    }
}

type Watcher<T, E> = Rc<dyn Fn(&Lifecycle<T, E>)>;

struct DispatchData<T: 'static, E: 'static> {
    liveness: LivenessToken,
    overlap: Overlap,
    generation: Cell<u64>,
    record: RefCell<Lifecycle<T, E>>,
    initial: Lifecycle<T, E>,
    watchers: RefCell<SlabMap<Watcher<T, E>>>,
    notifications: RefCell<VecDeque<Lifecycle<T, E>>>,
    is_notifying: Cell<bool>,
}

#[derive_ex(Clone(bound()))]
struct Dispatch<T: 'static, E: 'static>(Rc<DispatchData<T, E>>);

impl<T: Clone + 'static, E: Clone + 'static> Dispatch<T, E> {
    fn send(&self, patch: Patch<T, E>) {
        let d = &self.0;
        if !d.liveness.is_live() {
            tracing::trace!("node is not attached, state change dropped");
            return;
        }
        let record = {
            let mut record = d.record.borrow_mut();
            record.apply(patch);
            if d.watchers.borrow().is_empty() {
                return;
            }
            record.clone()
        };
        d.notifications.borrow_mut().push_back(record);
        if d.is_notifying.replace(true) {
            return;
        }
        let _guard = NotifyGuard(d);
        loop {
            let record = d.notifications.borrow_mut().pop_front();
            let Some(record) = record else {
                break;
            };
            let watchers: Vec<_> = d.watchers.borrow().values().cloned().collect();
            for watcher in watchers {
                watcher(&record);
            }
        }
    }
    fn reset(&self) {
        self.send(Patch::Replace(self.0.initial.clone()))
    }
    fn run(&self, task: Option<Task<T, E>>) -> Result<RunHandle<T, E>, UsageError> {
        let Some(task) = task else {
            tracing::warn!("`run` called without a task");
            return Err(UsageError {});
        };
        assert_runtime_exists();
        self.send(Patch::ToPending);
        let generation = self.0.generation.get().wrapping_add(1);
        self.0.generation.set(generation);
        tracing::trace!(generation, "run started");
        let (sender, handle) = RunHandle::channel();
        let this = self.clone();
        spawn_local(async move {
            let result = task.await;
            if this.is_current(generation) {
                this.send(match &result {
                    Ok(data) => Patch::ToResolved(data.clone()),
                    Err(error) => Patch::ToRejected(error.clone()),
                });
            } else {
                tracing::trace!(generation, "superseded run settled, state change dropped");
            }
            let _ = sender.send(result);
        });
        Ok(handle)
    }
    fn is_current(&self, generation: u64) -> bool {
        match self.0.overlap {
            Overlap::LastSettleWins => true,
            Overlap::LatestOnly => self.0.generation.get() == generation,
        }
    }
}

// Changes made by a watcher are delivered after the current change reaches every watcher.
struct NotifyGuard<'a, T: 'static, E: 'static>(&'a DispatchData<T, E>);

impl<T: 'static, E: 'static> Drop for NotifyGuard<'_, T, E> {
    fn drop(&mut self) {
        take(&mut *self.0.notifications.borrow_mut());
        self.0.is_notifying.set(false);
    }
}

/// A state-changing function of [`AsyncOp`] with a stable identity.
#[derive_ex(Clone(bound()))]
pub struct Callback<A: 'static>(Rc<dyn Fn(A)>);

impl<A: 'static> Callback<A> {
    pub fn call(&self, arg: A) {
        (self.0)(arg)
    }

    /// Returns `true` if both values refer to the same function.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl<A: 'static> std::fmt::Debug for Callback<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Callback({:p})", Rc::as_ptr(&self.0))
    }
}

type RawRunFn<T, E> = dyn Fn(Option<Task<T, E>>) -> Result<RunHandle<T, E>, UsageError>;

/// [`AsyncOp::run`] with a stable identity.
#[derive_ex(Clone(bound()))]
pub struct RunFn<T: 'static, E: 'static>(Rc<RawRunFn<T, E>>);

impl<T: 'static, E: 'static> RunFn<T, E> {
    pub fn call(&self, task: impl IntoTask<T, E>) -> Result<RunHandle<T, E>, UsageError> {
        (self.0)(task.into_task())
    }
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl<T: 'static, E: 'static> std::fmt::Debug for RunFn<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RunFn({:p})", Rc::as_ptr(&self.0))
    }
}

/// The state-changing functions of an [`AsyncOp`].
///
/// Each function is created once per operation, so the identities never change.
#[derive_ex(Clone(bound()))]
pub struct Callbacks<T: 'static, E: 'static> {
    pub set_data: Callback<T>,
    pub set_error: Callback<E>,
    pub reset: Callback<()>,
    pub run: RunFn<T, E>,
}

impl<T: Clone + 'static, E: Clone + 'static> Callbacks<T, E> {
    fn new(dispatch: &Dispatch<T, E>) -> Self {
        let d = dispatch.clone();
        let set_data = Callback(Rc::new(move |data| d.send(Patch::ToResolved(data))));
        let d = dispatch.clone();
        let set_error = Callback(Rc::new(move |error| d.send(Patch::ToRejected(error))));
        let d = dispatch.clone();
        let reset = Callback(Rc::new(move |()| d.reset()));
        let d = dispatch.clone();
        let run = RunFn(Rc::new(move |task| d.run(task)));
        Self {
            set_data,
            set_error,
            reset,
            run,
        }
    }

    /// Returns `true` if every function is identical to the one in `other`.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.set_data.ptr_eq(&other.set_data)
            && self.set_error.ptr_eq(&other.set_error)
            && self.reset.ptr_eq(&other.reset)
            && self.run.ptr_eq(&other.run)
    }
}
impl<T: 'static, E: 'static> std::fmt::Debug for Callbacks<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("set_data", &self.set_data)
            .field("set_error", &self.set_error)
            .field("reset", &self.reset)
            .field("run", &self.run)
            .finish()
    }
}
