use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::dispatcher::invoke_listener;
use crate::constants::MODE_ASYNC;
use crate::listener::Registration;
use crate::metrics::DELIVERY_FAILURES;
use crate::metrics::EVENTS_DELIVERED;
use crate::Event;

struct AsyncJob {
    registration: Arc<Registration>,
    event: Event,
}

struct Stripe {
    sender: mpsc::UnboundedSender<AsyncJob>,
    pending: Arc<AtomicUsize>,
}

/// Delivers to asynchronous listeners on striped worker tasks.
///
/// A job's stripe is derived from the listener id and the event key, so one
/// listener sees events for a key in the order they were submitted.
/// Dropping the executor closes the stripes; workers finish what is queued.
pub(crate) struct AsyncExecutor {
    stripes: Vec<Stripe>,
    warn_threshold: usize,
}

impl AsyncExecutor {
    pub(crate) fn start(
        handle: &Handle,
        workers: usize,
        warn_threshold: usize,
    ) -> Self {
        let stripes = (0..workers.max(1))
            .map(|worker| {
                let (sender, receiver) = mpsc::unbounded_channel();
                let pending = Arc::new(AtomicUsize::new(0));
                handle.spawn(run_worker(worker, receiver, pending.clone()));
                Stripe { sender, pending }
            })
            .collect();
        Self {
            stripes,
            warn_threshold,
        }
    }

    pub(crate) fn submit(
        &self,
        registration: Arc<Registration>,
        event: Event,
    ) {
        let mut hasher = DefaultHasher::new();
        registration.id.hash(&mut hasher);
        if let Some(key) = event.key() {
            key.hash(&mut hasher);
        }
        let stripe = &self.stripes[(hasher.finish() % self.stripes.len() as u64) as usize];

        let pending = stripe.pending.fetch_add(1, Ordering::Relaxed) + 1;
        if self.warn_threshold > 0 && pending == self.warn_threshold {
            warn!(pending, "Async listener backlog reached the warning threshold");
        }

        let listener_id = registration.id;
        if stripe.sender.send(AsyncJob { registration, event }).is_err() {
            stripe.pending.fetch_sub(1, Ordering::Relaxed);
            debug!(listener_id, "Async worker gone, event dropped");
        }
    }
}

async fn run_worker(
    worker: usize,
    mut receiver: mpsc::UnboundedReceiver<AsyncJob>,
    pending: Arc<AtomicUsize>,
) {
    trace!(worker, "Async notification worker started");
    while let Some(job) = receiver.recv().await {
        pending.fetch_sub(1, Ordering::Relaxed);

        if job.registration.cancel.is_cancelled() {
            continue;
        }
        let Some(listener) = &job.registration.listener else {
            continue;
        };
        match invoke_listener(listener, &job.event) {
            Ok(()) => EVENTS_DELIVERED.with_label_values(&[MODE_ASYNC]).inc(),
            Err(e) => {
                DELIVERY_FAILURES.with_label_values(&[MODE_ASYNC]).inc();
                warn!(
                    listener_id = job.registration.id,
                    event_type = ?job.event.event_type(),
                    error = %e,
                    "Async listener failed to handle event"
                );
            }
        }
    }
    trace!(worker, "Async notification worker stopped");
}
