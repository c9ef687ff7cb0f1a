//! # Cola Acotada Productor/Consumidor
//! src/pool/queue.rs
//!
//! Buffer circular de capacidad fija compartido entre el acceptor
//! (productor) y los workers (consumidores). Es el único punto de
//! sincronización entre ambos lados.
//!
//! - `push` bloquea mientras la cola está llena (backpressure)
//! - `pop` bloquea mientras la cola está vacía
//! - `shutdown` despierta a todos los que esperan en ambas condiciones
//!
//! Orden FIFO: los elementos salen en el orden en que entraron.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Estado protegido por el mutex
struct QueueState<T> {
    /// Slots del buffer circular
    slots: Vec<Option<T>>,

    /// Próximo slot a leer
    front: usize,

    /// Próximo slot a escribir
    rear: usize,

    /// Elementos vivos en la cola
    count: usize,

    /// `false` después de `shutdown`
    running: bool,
}

impl<T> QueueState<T> {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    fn store(&mut self, item: T) {
        self.slots[self.rear] = Some(item);
        self.rear = (self.rear + 1) % self.capacity();
        self.count += 1;
    }

    fn take(&mut self) -> Option<T> {
        let item = self.slots[self.front].take()?;
        self.front = (self.front + 1) % self.capacity();
        self.count -= 1;
        Some(item)
    }
}

/// Error al encolar: devuelve el elemento al caller
#[derive(Debug, Error)]
pub enum PushError<T> {
    /// Cola llena (solo `try_push`)
    #[error("queue is full")]
    Full(T),

    /// La cola ya fue cerrada con `shutdown`
    #[error("queue is shut down")]
    Closed(T),
}

impl<T> PushError<T> {
    /// Recupera el elemento que no se pudo encolar
    pub fn into_inner(self) -> T {
        match self {
            PushError::Full(item) | PushError::Closed(item) => item,
        }
    }
}

/// Cola acotada thread-safe
///
/// Clonar la cola comparte el mismo buffer (como un `Arc`).
pub struct BoundedQueue<T> {
    state: Arc<Mutex<QueueState<T>>>,

    /// Señalada cuando se libera un slot
    not_full: Arc<Condvar>,

    /// Señalada cuando llega un elemento
    not_empty: Arc<Condvar>,
}

impl<T> BoundedQueue<T> {
    /// Crea una cola con `capacity` slots
    ///
    /// # Panics
    ///
    /// Si `capacity` es 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be >= 1");

        let slots = (0..capacity).map(|_| None).collect();
        Self {
            state: Arc::new(Mutex::new(QueueState {
                slots,
                front: 0,
                rear: 0,
                count: 0,
                running: true,
            })),
            not_full: Arc::new(Condvar::new()),
            not_empty: Arc::new(Condvar::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Encola un elemento, bloqueando mientras la cola esté llena
    ///
    /// Nunca descarta elementos: si la cola se cierra mientras se espera,
    /// el elemento vuelve en `PushError::Closed`.
    pub fn push(&self, item: T) -> Result<(), PushError<T>> {
        let mut state = self.lock();

        while state.running && state.is_full() {
            state = self
                .not_full
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }

        if !state.running {
            return Err(PushError::Closed(item));
        }

        state.store(item);
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Encola sin bloquear; si está llena devuelve `PushError::Full`
    pub fn try_push(&self, item: T) -> Result<(), PushError<T>> {
        let mut state = self.lock();

        if !state.running {
            return Err(PushError::Closed(item));
        }
        if state.is_full() {
            return Err(PushError::Full(item));
        }

        state.store(item);
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Desencola el elemento más antiguo, bloqueando mientras esté vacía
    ///
    /// Retorna `None` una vez que la cola fue cerrada.
    pub fn pop(&self) -> Option<T> {
        let mut state = self.lock();

        while state.running && state.count == 0 {
            state = self
                .not_empty
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }

        if !state.running {
            return None;
        }

        let item = state.take();
        drop(state);
        self.not_full.notify_one();
        item
    }

    /// Cierra la cola y despierta a todos los que esperan
    pub fn shutdown(&self) {
        self.lock().running = false;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Saca todos los elementos que quedaron en la cola, en orden FIFO
    pub fn drain(&self) -> Vec<T> {
        let mut state = self.lock();
        let mut items = Vec::with_capacity(state.count);
        while let Some(item) = state.take() {
            items.push(item);
        }
        drop(state);
        self.not_full.notify_all();
        items
    }

    /// Retorna el tamaño actual de la cola
    pub fn len(&self) -> usize {
        self.lock().count
    }

    /// Verifica si la cola está vacía
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Verifica si la cola está llena
    pub fn is_full(&self) -> bool {
        self.lock().is_full()
    }

    /// Retorna la capacidad máxima
    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    /// `false` después de `shutdown`
    pub fn is_running(&self) -> bool {
        self.lock().running
    }
}

impl<T> Clone for BoundedQueue<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            not_full: Arc::clone(&self.not_full),
            not_empty: Arc::clone(&self.not_empty),
        }
    }
}

impl<T> fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("BoundedQueue")
            .field("count", &state.count)
            .field("capacity", &state.capacity())
            .field("running", &state.running)
            .finish()
    }
}
