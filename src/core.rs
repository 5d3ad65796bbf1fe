use std::{
    cell::RefCell,
    future::{poll_fn, Future},
    mem::{replace, swap, take},
    rc::Rc,
    sync::{Arc, Mutex, MutexGuard},
    task::{Context, Poll, Wake, Waker},
};

use derive_ex::derive_ex;
use futures::future::LocalBoxFuture;
use slabmap::SlabMap;


thread_local! {
    static GLOBALS: RefCell<Globals> = RefCell::new(Globals::new());
}

struct Globals {
    is_runtime_exists: bool,
    actions: Vec<Action>,
    need_wake: bool,
    wakes: WakeTable,
}
impl Globals {
    fn new() -> Self {
        Self {
            is_runtime_exists: false,
            actions: Vec::new(),
            need_wake: false,
            wakes: WakeTable::default(),
        }
    }
    fn with<T>(f: impl FnOnce(&mut Self) -> T) -> T {
        GLOBALS.with(|g| f(&mut g.borrow_mut()))
    }
    fn get_actions(actions: &mut Vec<Action>) -> bool {
        Self::with(|g| {
            g.apply_wake();
            swap(actions, &mut g.actions);
        });
        !actions.is_empty()
    }
    fn assert_exists(&self) {
        if !self.is_runtime_exists {
            panic!("`Runtime` is not created.");
        }
    }
    fn queued_spawns(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| matches!(a, Action::Spawn(_)))
            .count()
    }
    fn push_action(&mut self, action: Action) {
        self.assert_exists();
        self.actions.push(action);
        self.wake();
    }
    fn apply_wake(&mut self) {
        let mut requests = self.wakes.requests.lock();
        for key in requests.drops.drain(..) {
            self.wakes.tasks.remove(key);
        }
        for key in requests.wakes.drain(..) {
            if let Some(task) = self.wakes.tasks.get(key) {
                self.actions.push(Action::Poll(task.clone()));
            }
        }
    }
    fn wait_for_ready(&mut self, cx: &Context) -> Poll<()> {
        self.need_wake = false;
        if !self.actions.is_empty() {
            return Poll::Ready(());
        }
        let mut requests = self.wakes.requests.lock();
        if !requests.drops.is_empty() || !requests.wakes.is_empty() {
            return Poll::Ready(());
        }
        requests.waker = Some(cx.waker().clone());
        self.need_wake = true;
        Poll::Pending
    }
    fn finish_runtime(&mut self) -> (Vec<Action>, WakeTable) {
        self.is_runtime_exists = false;
        self.need_wake = false;
        (take(&mut self.actions), take(&mut self.wakes))
    }
    fn wake(&mut self) {
        if !self.need_wake {
            return;
        }
        self.need_wake = false;
        self.wakes.requests.lock().wake();
    }
}

/// Single-threaded cooperative scheduler that settles tasks passed to [`AsyncOp::run`](crate::AsyncOp::run).
///
/// Continuations are only executed inside [`run_actions`](Self::run_actions) or [`update`](Self::update),
/// so a transition caused by a settled task is never observable before the host yields to the runtime.
#[derive_ex(Default)]
#[default(Self::new())]
pub struct Runtime {
    tasks: SlabMap<Rc<LocalTask>>,
    actions_buffer: Vec<Action>,
}
impl Runtime {
    pub fn new() -> Self {
        if Globals::with(|g| replace(&mut g.is_runtime_exists, true)) {
            panic!("Only one `Runtime` can exist in the same thread at the same time.");
        };
        Self {
            tasks: SlabMap::new(),
            actions_buffer: Vec::new(),
        }
    }

    /// Perform scheduled actions.
    ///
    /// Returns `true` if any action was performed.
    pub fn run_actions(&mut self) -> bool {
        let mut handled = false;
        let mut actions = take(&mut self.actions_buffer);
        while Globals::get_actions(&mut actions) {
            for action in actions.drain(..) {
                match action {
                    Action::Spawn(future) => LocalTask::start(self, future),
                    Action::Poll(task) => task.next(self),
                }
                handled = true;
            }
        }
        self.actions_buffer = actions;
        handled
    }

    /// Repeat [`run_actions`](Self::run_actions) until there is nothing left to do.
    pub fn update(&mut self) {
        while self.run_actions() {}
    }

    /// Wait while there is no process to be executed by [`update`](Self::update).
    pub async fn wait_for_ready(&mut self) {
        poll_fn(|cx| Globals::with(|g| g.wait_for_ready(cx))).await
    }

    /// Number of spawned tasks that have not settled yet, including those not yet polled.
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len() + Globals::with(|g| g.queued_spawns())
    }

    fn cancel_tasks(&mut self) {
        for (_, task) in take(&mut self.tasks) {
            task.cancel();
        }
    }
}
impl Drop for Runtime {
    fn drop(&mut self) {
        let unsettled = self.pending_tasks();
        self.cancel_tasks();
        let (actions, wakes) = Globals::with(|g| g.finish_runtime());
        if unsettled != 0 {
            tracing::debug!(unsettled, "runtime dropped with unsettled tasks");
        }
        drop(actions);
        drop(wakes);
    }
}

pub(crate) fn assert_runtime_exists() {
    Globals::with(|g| g.assert_exists())
}

/// Queues `future` on the current thread's [`Runtime`].
///
/// The future is first polled by the runtime, never inline.
pub(crate) fn spawn_local(future: impl Future<Output = ()> + 'static) {
    Globals::with(|g| g.push_action(Action::Spawn(Box::pin(future))))
}

enum Action {
    Spawn(LocalBoxFuture<'static, ()>),
    Poll(Rc<LocalTask>),
}

struct LocalTask {
    data: RefCell<Option<LocalTaskData>>,
}

struct LocalTaskData {
    future: LocalBoxFuture<'static, ()>,
    waker: Waker,
    id: usize,
}

impl LocalTask {
    fn start(rt: &mut Runtime, future: LocalBoxFuture<'static, ()>) {
        let task = Rc::new(Self {
            data: RefCell::new(None),
        });
        let id = rt.tasks.insert(task.clone());
        *task.data.borrow_mut() = Some(LocalTaskData {
            future,
            waker: Globals::with(|g| g.wakes.insert(task.clone())).into(),
            id,
        });
        task.next(rt);
    }
    fn next(self: Rc<Self>, rt: &mut Runtime) {
        let Some(mut d) = self.data.borrow_mut().take() else {
            return;
        };
        let mut cx = Context::from_waker(&d.waker);
        if d.future.as_mut().poll(&mut cx).is_ready() {
            rt.tasks.remove(d.id);
        } else {
            *self.data.borrow_mut() = Some(d);
        }
    }
    fn cancel(&self) {
        let data = self.data.borrow_mut().take();
        drop(data);
    }
}

#[derive(Default)]
struct WakeTable {
    tasks: SlabMap<Rc<LocalTask>>,
    requests: WakeRequests,
}

impl WakeTable {
    fn insert(&mut self, task: Rc<LocalTask>) -> Arc<RawWake> {
        RawWake::new(&self.requests, self.tasks.insert(task))
    }
}

#[derive(Clone, Default)]
struct WakeRequests(Arc<Mutex<RawWakeRequests>>);

impl WakeRequests {
    fn lock(&self) -> MutexGuard<'_, RawWakeRequests> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(e) => e.into_inner(),
        }
    }
}

#[derive(Default)]
struct RawWakeRequests {
    wakes: Vec<usize>,
    drops: Vec<usize>,
    waker: Option<Waker>,
}
impl RawWakeRequests {
    fn wake(&mut self) {
        if let Some(waker) = self.waker.take() {
            waker.wake();
        }
    }
}

struct RawWake {
    requests: WakeRequests,
    key: usize,
}
impl RawWake {
    fn new(requests: &WakeRequests, key: usize) -> Arc<Self> {
        Arc::new(RawWake {
            requests: requests.clone(),
            key,
        })
    }
}

impl Wake for RawWake {
    fn wake(self: Arc<Self>) {
        let mut requests = self.requests.lock();
        requests.wakes.push(self.key);
        requests.wake();
    }
}
impl Drop for RawWake {
    fn drop(&mut self) {
        self.requests.lock().drops.push(self.key);
    }
}
