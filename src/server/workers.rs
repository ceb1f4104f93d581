// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! The worker pool that serves connections.

use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::mem::drop;
use std::net::{Shutdown, TcpStream};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use log::{debug, error, info};
use slab::Slab;

/// How long to wait between successive starts of a permanent worker.
/// If a worker panics within `WORKER_RESPAWN_DELAY` of its start, its
/// replacement is delayed until this much time has passed, so that a
/// task that always panics cannot keep a core busy respawning workers.
const WORKER_RESPAWN_DELAY: Duration = Duration::from_secs(1);

type Task = Box<dyn FnOnce() + Send + 'static>;

/// A pool of threads on which tasks (typically, serving a connection)
/// run.
///
/// A `WorkerPool` keeps a fixed number of permanent worker threads.
/// Tasks are never queued beyond the number of idle permanent workers:
/// when all are busy, [`WorkerPool::submit_or_spawn`] starts an
/// overflow thread that runs just the one task. A permanent worker
/// whose task panics is replaced.
///
/// The pool also tracks the TCP connections its tasks are serving (see
/// [`WorkerPool::track`]). [`WorkerPool::shut_down`] shuts down the
/// read side of each of them, so that tasks blocked reading from a
/// client wake up and can notice the shutdown. Once shutdown has
/// begun, no new tasks or threads are accepted.
/// [`WorkerPool::await_shutdown`] waits for every thread of the pool,
/// including overflow threads and one-shot threads started with
/// [`WorkerPool::start_oneshot`], to exit.
pub struct WorkerPool {
    name: String,
    state: Mutex<PoolState>,

    /// Wakes idle permanent workers when a task is queued or shutdown
    /// begins. Used with the `state` mutex.
    task_wakeup: Condvar,

    /// Notified when shutdown begins and when the last thread exits.
    /// Used with the `state` mutex.
    shutdown_wakeup: Condvar,
}

/// The internal state of a [`WorkerPool`].
#[derive(Default)]
struct PoolState {
    queue: VecDeque<Task>,
    idle_workers: usize,
    thread_count: usize,
    next_overflow_id: u64,
    connections: Slab<TcpStream>,
    shutting_down: bool,
}

impl WorkerPool {
    /// Starts a pool with `permanent_workers` permanent worker threads.
    /// The threads are named after `name`.
    pub fn start(name: &str, permanent_workers: usize) -> Result<Arc<Self>, Error> {
        let pool = Arc::new(Self {
            name: name.to_owned(),
            state: Mutex::new(PoolState::default()),
            task_wakeup: Condvar::new(),
            shutdown_wakeup: Condvar::new(),
        });

        let mut state = pool.state.lock().unwrap();
        for index in 0..permanent_workers {
            if let Err(e) = start_worker(&pool, &mut state, index) {
                // Stop any workers that did start.
                drop(state);
                pool.shut_down();
                return Err(e.into());
            }
        }
        drop(state);
        Ok(pool)
    }

    /// Runs `task` on an idle permanent worker, or on a new overflow
    /// thread if no permanent worker is idle.
    pub fn submit_or_spawn<F>(self: &Arc<Self>, task: F) -> Result<(), Error>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.state.lock().unwrap();
        if state.shutting_down {
            Err(Error::ShuttingDown)
        } else if state.idle_workers > state.queue.len() {
            state.queue.push_back(Box::new(task));
            self.task_wakeup.notify_one();
            Ok(())
        } else {
            let id = state.next_overflow_id;
            state.next_overflow_id += 1;
            let name = format!("{} overflow {}", self.name, id);
            start_oneshot(self, &mut state, name, task).map_err(Into::into)
        }
    }

    /// Starts a thread named `name` that runs `task` once. The thread
    /// counts towards the pool for [`WorkerPool::await_shutdown`], so
    /// long-running tasks should check
    /// [`WorkerPool::is_shutting_down`] and exit when it is set.
    pub fn start_oneshot<F>(self: &Arc<Self>, name: String, task: F) -> Result<(), Error>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.state.lock().unwrap();
        if state.shutting_down {
            Err(Error::ShuttingDown)
        } else {
            start_oneshot(self, &mut state, name, task).map_err(Into::into)
        }
    }

    /// Registers a connection being served by a task of this pool, so
    /// that shutdown can interrupt reads from it. The connection stays
    /// registered until the returned guard is dropped.
    pub fn track(self: &Arc<Self>, stream: &TcpStream) -> Result<ConnectionGuard, Error> {
        let stream = stream.try_clone()?;
        let mut state = self.state.lock().unwrap();
        if state.shutting_down {
            Err(Error::ShuttingDown)
        } else {
            let key = state.connections.insert(stream);
            Ok(ConnectionGuard {
                pool: self.clone(),
                key,
            })
        }
    }

    /// Begins shutting down the pool.
    pub fn shut_down(&self) {
        let mut state = self.state.lock().unwrap();
        state.shutting_down = true;
        for (_, connection) in state.connections.iter() {
            if let Err(e) = connection.shutdown(Shutdown::Read) {
                debug!("Failed to shut down a connection: {}", e);
            }
        }
        self.task_wakeup.notify_all();
        self.shutdown_wakeup.notify_all();
    }

    /// Waits until shutdown has begun and every thread of the pool has
    /// exited. Calling this from a thread of the pool deadlocks.
    pub fn await_shutdown(&self) {
        let state = self.state.lock().unwrap();
        let _state = self
            .shutdown_wakeup
            .wait_while(state, |s| !s.shutting_down || s.thread_count > 0)
            .unwrap();
    }

    /// Returns whether the pool is shutting down.
    pub fn is_shutting_down(&self) -> bool {
        self.state.lock().unwrap().shutting_down
    }
}

/// Keeps a connection registered with a [`WorkerPool`]; see
/// [`WorkerPool::track`].
pub struct ConnectionGuard {
    pool: Arc<WorkerPool>,
    key: usize,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let mut state = self.pool.state.lock().unwrap();
        state.connections.remove(self.key);
    }
}

////////////////////////////////////////////////////////////////////////
// THREADS                                                            //
////////////////////////////////////////////////////////////////////////

/// Owned by a permanent worker thread. When dropped at thread exit, it
/// releases the thread's slot in the pool and, if the thread panicked,
/// starts a replacement.
struct WorkerGuard {
    pool: Arc<WorkerPool>,
    index: usize,
    parent: ThreadId,
    started: Instant,
}

fn start_worker(
    pool: &Arc<WorkerPool>,
    state: &mut MutexGuard<PoolState>,
    index: usize,
) -> io::Result<()> {
    state.thread_count += 1;
    let guard = WorkerGuard {
        pool: pool.clone(),
        index,
        parent: thread::current().id(),
        started: Instant::now(),
    };
    let result = thread::Builder::new()
        .name(format!("{} worker {}", pool.name, index))
        .spawn(move || {
            run_worker(&guard.pool);
            drop(guard);
        });
    if result.is_err() {
        state.thread_count -= 1;
    }
    result.and(Ok(()))
}

/// The get task/run task loop of a permanent worker. Queued tasks are
/// drained before the worker exits for shutdown.
fn run_worker(pool: &WorkerPool) {
    loop {
        let mut state = pool.state.lock().unwrap();
        state.idle_workers += 1;
        let mut state = pool
            .task_wakeup
            .wait_while(state, |s| s.queue.is_empty() && !s.shutting_down)
            .unwrap();
        state.idle_workers -= 1;
        let task = match state.queue.pop_front() {
            Some(task) => task,
            None => return,
        };
        drop(state);
        task();
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        let current_thread = thread::current();

        // If we are being dropped in the spawning thread, the worker
        // failed to start, and start_worker does the clean-up. Going on
        // would lock the state mutex twice from the same thread.
        if current_thread.id() == self.parent {
            return;
        }

        let thread_name = current_thread.name().unwrap_or("anonymous");
        let mut state = self.pool.state.lock().unwrap();
        if thread::panicking() && !state.shutting_down {
            error!("Thread {} panicked; replacing it.", thread_name);
            let since_start = self.started.elapsed();
            if since_start < WORKER_RESPAWN_DELAY {
                let wait_for = WORKER_RESPAWN_DELAY - since_start;
                info!(
                    "Replacement of thread {} throttled: delayed by {} ms",
                    thread_name,
                    wait_for.as_millis(),
                );
                // Shutdown interrupts the delay.
                state = self
                    .pool
                    .shutdown_wakeup
                    .wait_timeout(state, wait_for)
                    .unwrap()
                    .0;
            }
            if !state.shutting_down {
                if let Err(e) = start_worker(&self.pool, &mut state, self.index) {
                    error!("Replacement of thread {} failed: {}", thread_name, e);
                }
            }
        }
        end_thread(&mut state, &self.pool.shutdown_wakeup);
    }
}

/// Owned by a one-shot thread; releases the thread's slot in the pool
/// when dropped at thread exit.
struct OneshotGuard {
    pool: Arc<WorkerPool>,
    parent: ThreadId,
}

fn start_oneshot<F>(
    pool: &Arc<WorkerPool>,
    state: &mut MutexGuard<PoolState>,
    name: String,
    task: F,
) -> io::Result<()>
where
    F: FnOnce() + Send + 'static,
{
    state.thread_count += 1;
    let guard = OneshotGuard {
        pool: pool.clone(),
        parent: thread::current().id(),
    };
    let result = thread::Builder::new().name(name).spawn(move || {
        task();
        drop(guard);
    });
    if result.is_err() {
        state.thread_count -= 1;
    }
    result.and(Ok(()))
}

impl Drop for OneshotGuard {
    fn drop(&mut self) {
        let current_thread = thread::current();

        // See WorkerGuard::drop.
        if current_thread.id() == self.parent {
            return;
        }

        if thread::panicking() {
            let thread_name = current_thread.name().unwrap_or("anonymous");
            error!("Thread {} panicked", thread_name);
        }

        let mut state = self.pool.state.lock().unwrap();
        end_thread(&mut state, &self.pool.shutdown_wakeup);
    }
}

/// Releases an exiting thread's slot in the pool.
fn end_thread(state: &mut MutexGuard<PoolState>, shutdown_wakeup: &Condvar) {
    state.thread_count -= 1;
    if state.shutting_down && state.thread_count == 0 {
        shutdown_wakeup.notify_all();
    }
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error type for [`WorkerPool`] operations.
#[derive(Debug)]
pub enum Error {
    /// An OS-level error occurred while starting a thread or cloning a
    /// socket handle.
    Io(io::Error),

    /// The [`WorkerPool`] is shutting down.
    ShuttingDown,
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Io(err) => err.fmt(f),
            Self::ShuttingDown => f.write_str("worker pool is shutting down"),
        }
    }
}

impl std::error::Error for Error {}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::net::TcpListener;
    use std::sync::mpsc;

    use super::*;

    fn wait_for_idle_workers(pool: &WorkerPool, n: usize) {
        let start = Instant::now();
        while pool.state.lock().unwrap().idle_workers < n {
            assert!(start.elapsed() < Duration::from_secs(10));
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn all_submitted_tasks_run() {
        let tasks_completed = Arc::new(Mutex::new(0));
        let pool = WorkerPool::start("test", 2).unwrap();
        for _ in 0..8 {
            let tasks_completed = tasks_completed.clone();
            pool.submit_or_spawn(move || {
                thread::sleep(Duration::from_millis(50));
                *tasks_completed.lock().unwrap() += 1;
            })
            .unwrap();
        }
        pool.shut_down();
        pool.await_shutdown();
        assert_eq!(*tasks_completed.lock().unwrap(), 8);
        assert_eq!(pool.state.lock().unwrap().thread_count, 0);
    }

    #[test]
    fn busy_pools_spawn_overflow_threads() {
        let pool = WorkerPool::start("test", 0).unwrap();
        let (sender, receiver) = mpsc::channel();
        pool.submit_or_spawn(move || {
            let name = thread::current().name().map(str::to_owned);
            sender.send(name).unwrap();
        })
        .unwrap();
        let name = receiver.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(name.as_deref(), Some("test overflow 0"));
        pool.shut_down();
        pool.await_shutdown();
    }

    #[test]
    fn pools_reject_work_after_shutdown() {
        let pool = WorkerPool::start("test", 1).unwrap();
        pool.shut_down();
        assert!(matches!(pool.submit_or_spawn(|| ()), Err(Error::ShuttingDown)));
        assert!(matches!(
            pool.start_oneshot("late".to_owned(), || ()),
            Err(Error::ShuttingDown),
        ));
        pool.await_shutdown();
    }

    #[test]
    fn panicked_workers_are_replaced() {
        let pool = WorkerPool::start("test", 1).unwrap();
        wait_for_idle_workers(&pool, 1);
        pool.submit_or_spawn(|| panic!("task failure")).unwrap();

        // The replacement comes up after WORKER_RESPAWN_DELAY.
        thread::sleep(Duration::from_millis(100));
        wait_for_idle_workers(&pool, 1);
        let (sender, receiver) = mpsc::channel();
        pool.submit_or_spawn(move || {
            let name = thread::current().name().map(str::to_owned);
            sender.send(name).unwrap();
        })
        .unwrap();
        let name = receiver.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(name.as_deref(), Some("test worker 0"));

        pool.shut_down();
        pool.await_shutdown();
    }

    #[test]
    fn shutdown_interrupts_tracked_connections() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let _client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (mut stream, _) = listener.accept().unwrap();

        let pool = WorkerPool::start("test", 1).unwrap();
        let guard = pool.track(&stream).unwrap();
        let (sender, receiver) = mpsc::channel();
        pool.submit_or_spawn(move || {
            let _guard = guard;
            let mut buf = [0; 16];
            sender.send(stream.read(&mut buf).ok()).unwrap();
        })
        .unwrap();

        thread::sleep(Duration::from_millis(100));
        pool.shut_down();
        pool.await_shutdown();
        assert_eq!(receiver.recv().unwrap(), Some(0));
        assert!(pool.state.lock().unwrap().connections.is_empty());
    }
}
