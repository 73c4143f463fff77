use std::{
    io,
    thread::{self, JoinHandle},
};

use log::{debug, error};

/// Set of connection workers, one thread each.
///
/// Finished threads are reaped whenever a new one is spawned; dropping the set waits for the
/// remaining ones.
#[derive(Debug, Default)]
pub struct Workers {
    next_id: usize,
    handles: Vec<Worker>,
}

impl Workers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&mut self, f: F) -> io::Result<usize>
    where
        F: FnOnce() + Send + 'static,
    {
        self.reap();

        let id = self.next_id;
        self.next_id += 1;

        let thread = thread::Builder::new()
            .name(format!("connection-{id}"))
            .spawn(f)?;
        self.handles.push(Worker { id, thread });

        debug!("worker {id} spawned, {} running", self.handles.len());
        Ok(id)
    }

    pub fn running(&self) -> usize {
        self.handles
            .iter()
            .filter(|w| !w.thread.is_finished())
            .count()
    }

    fn reap(&mut self) {
        let (finished, running): (Vec<_>, Vec<_>) = self
            .handles
            .drain(..)
            .partition(|w| w.thread.is_finished());
        self.handles = running;

        for worker in finished {
            worker.join();
        }
    }
}

impl Drop for Workers {
    fn drop(&mut self) {
        for worker in self.handles.drain(..) {
            debug!("waiting on worker {}", worker.id);
            worker.join();
        }
    }
}

#[derive(Debug)]
struct Worker {
    id: usize,
    thread: JoinHandle<()>,
}

impl Worker {
    fn join(self) {
        if self.thread.join().is_err() {
            error!("worker {} panicked", self.id);
        }
    }
}
