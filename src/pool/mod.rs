//! # Concurrencia
//! src/pool/mod.rs
//!
//! Cola acotada productor/consumidor y pool fijo de workers.
//!
//! ```text
//! Acceptor ──push──► BoundedQueue<Task> ──pop──► worker-0 .. worker-N
//! ```

pub mod queue;
pub mod task;
pub mod worker;

pub use queue::{BoundedQueue, PushError};
pub use task::Task;
pub use worker::{ShutdownReport, WorkerPool};

/// Cola de conexiones aceptadas
pub type TaskQueue = BoundedQueue<Task>;
