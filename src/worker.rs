//! Background processing of accepted events.
//!
//! The webhook handler only enqueues. A fixed number of worker tasks drain
//! the bounded queue and run each event through the [`EventRouter`], so a
//! slow call to the hosting service never holds up event intake.
use log::*;
use std::sync::Arc;
use thiserror::Error;
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
};

use crate::{event::CascadeEvent, router::EventRouter};

/// Default number of worker tasks.
pub const DEFAULT_WORKERS: usize = 4;
/// Default capacity of the event queue.
pub const DEFAULT_QUEUE_SIZE: usize = 64;

/// Errors that can occur when handing an event to the pool.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("event queue is full")]
    QueueFull,

    #[error("event queue is closed")]
    Closed,
}

/// Cheap handle used to enqueue events.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<CascadeEvent>,
}

impl Dispatcher {
    pub fn new(tx: mpsc::Sender<CascadeEvent>) -> Self {
        Self { tx }
    }

    /// Enqueues without waiting; a full queue is reported to the caller.
    pub fn dispatch(&self, event: CascadeEvent) -> Result<(), DispatchError> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DispatchError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DispatchError::Closed,
        })
    }
}

/// Fixed set of tasks draining the event queue.
pub struct WorkerPool {
    dispatcher: Dispatcher,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `workers` tasks onto the current tokio runtime.
    pub fn spawn(
        router: Arc<EventRouter>,
        workers: usize,
        queue_size: usize,
    ) -> Self {
        let (tx, rx) = mpsc::channel(queue_size.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let workers = (0..workers.max(1))
            .map(|id| {
                let rx = Arc::clone(&rx);
                let router = Arc::clone(&router);
                tokio::spawn(async move { run_worker(id, rx, router).await })
            })
            .collect();

        Self {
            dispatcher: Dispatcher::new(tx),
            workers,
        }
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    /// Closes the queue and waits for queued events to finish.
    pub async fn shutdown(self) {
        let Self {
            dispatcher,
            workers,
        } = self;
        drop(dispatcher);

        for worker in workers {
            if let Err(err) = worker.await {
                error!("worker task failed: {err}");
            }
        }
    }
}

async fn run_worker(
    id: usize,
    rx: Arc<Mutex<mpsc::Receiver<CascadeEvent>>>,
    router: Arc<EventRouter>,
) {
    debug!("worker {id} started");

    loop {
        let next = rx.lock().await.recv().await;

        let Some(event) = next else {
            break;
        };

        debug!("worker {id} handling event for {}", event.repository());
        router.handle(event).await;
    }

    debug!("worker {id} stopped");
}
