//! # Pool de Workers
//! src/pool/worker.rs
//!
//! N threads de larga vida que consumen la cola acotada. Cada worker:
//!
//! 1. `pop` (bloquea mientras no haya trabajo)
//! 2. `None` → la cola fue cerrada, termina
//! 3. Ejecuta el handler con el elemento desencolado
//!
//! Un panic dentro del handler se captura y se loguea; el worker sigue con
//! el siguiente elemento.
//!
//! El shutdown es explícito: cierra la cola y espera hasta `timeout` a que
//! los workers terminen. Los que terminaron se hacen `join`, los que no se
//! reportan y quedan desacoplados.

use crate::pool::queue::BoundedQueue;
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Intervalo de polling mientras se espera a los workers
const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

struct Worker {
    id: usize,
    handle: JoinHandle<()>,
}

/// Resultado de `WorkerPool::shutdown`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Workers que terminaron a tiempo y se les hizo join
    pub joined: usize,

    /// Workers que seguían ocupados al vencer el timeout
    pub detached: usize,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.detached == 0
    }
}

/// Pool fijo de workers sobre una `BoundedQueue<T>`
pub struct WorkerPool<T> {
    queue: BoundedQueue<T>,
    workers: Vec<Worker>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Lanza `size` workers consumiendo de `queue`
    ///
    /// El handler recibe el id del worker (0..size) y el elemento.
    /// Si algún thread no se puede crear, se cierra la cola, se esperan los
    /// ya creados y se retorna el error.
    pub fn start<F>(size: usize, queue: BoundedQueue<T>, handler: F) -> io::Result<Self>
    where
        F: Fn(usize, T) + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        let mut workers = Vec::with_capacity(size);

        for id in 0..size {
            let worker_queue = queue.clone();
            let worker_handler = Arc::clone(&handler);

            let spawned = thread::Builder::new()
                .name(format!("worker-{}", id))
                .spawn(move || worker_loop(id, worker_queue, worker_handler));

            match spawned {
                Ok(handle) => workers.push(Worker { id, handle }),
                Err(e) => {
                    error!(worker = id, error = %e, "failed to spawn worker thread");
                    queue.shutdown();
                    for worker in workers {
                        let _ = worker.handle.join();
                    }
                    return Err(e);
                }
            }
        }

        info!(workers = size, "worker pool started");
        Ok(Self { queue, workers })
    }

    /// Número de workers lanzados
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Cola que consumen los workers
    pub fn queue(&self) -> &BoundedQueue<T> {
        &self.queue
    }

    /// Cierra la cola y espera hasta `timeout` a que terminen los workers
    pub fn shutdown(mut self, timeout: Duration) -> ShutdownReport {
        self.queue.shutdown();

        let workers = std::mem::take(&mut self.workers);
        let deadline = Instant::now() + timeout;

        while Instant::now() < deadline && !workers.iter().all(|w| w.handle.is_finished()) {
            thread::sleep(JOIN_POLL_INTERVAL);
        }

        let mut report = ShutdownReport { joined: 0, detached: 0 };
        for worker in workers {
            if worker.handle.is_finished() {
                if worker.handle.join().is_err() {
                    warn!(worker = worker.id, "worker thread terminated with a panic");
                }
                report.joined += 1;
            } else {
                warn!(worker = worker.id, "worker still busy after shutdown timeout, detaching");
                report.detached += 1;
            }
        }

        info!(joined = report.joined, detached = report.detached, "worker pool stopped");
        report
    }
}

impl<T> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        // Sin shutdown explícito: al menos liberar a los workers bloqueados
        if !self.workers.is_empty() {
            self.queue.shutdown();
        }
    }
}

fn worker_loop<T, F>(id: usize, queue: BoundedQueue<T>, handler: Arc<F>)
where
    F: Fn(usize, T),
{
    debug!(worker = id, "worker started");

    while let Some(item) = queue.pop() {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(id, item)));

        if let Err(payload) = outcome {
            error!(worker = id, panic = %panic_message(payload.as_ref()), "task handler panicked");
        }
    }

    debug!(worker = id, "worker exiting");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}
