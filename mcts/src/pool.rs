//! Fixed-size worker pool for search descents.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

type Task = Box<dyn FnOnce() + Send + 'static>;

struct PoolState {
    tasks: VecDeque<Task>,
    terminated: bool,
}

struct PoolShared {
    state: Mutex<PoolState>,
    wake: Condvar,
}

/// A handful of threads draining a task queue. Dropping the pool stops the
/// workers after their current task; queued tasks are discarded.
pub struct ThreadPool {
    shared: Arc<PoolShared>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    pub fn new(threads: usize) -> Self {
        let shared = Arc::new(PoolShared {
            state: Mutex::new(PoolState {
                tasks: VecDeque::new(),
                terminated: false,
            }),
            wake: Condvar::new(),
        });

        let workers = (0..threads.max(1))
            .map(|_| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || loop {
                    let task = {
                        let mut state = shared.state.lock().expect("pool state poisoned");
                        loop {
                            if state.terminated {
                                return;
                            }
                            if let Some(task) = state.tasks.pop_front() {
                                break task;
                            }
                            state = shared.wake.wait(state).expect("pool state poisoned");
                        }
                    };
                    task();
                })
            })
            .collect();

        Self { shared, workers }
    }

    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.shared.state.lock().expect("pool state poisoned");
        state.tasks.push_back(Box::new(task));
        self.shared.wake.notify_one();
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock().expect("pool state poisoned");
            state.terminated = true;
        }
        self.shared.wake.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}
