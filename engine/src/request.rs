//! Single-flight background requests with stale-result discard.
//!
//! Each [`RequestSlot`] runs at most one request at a time. Every start bumps
//! a generation counter that travels with the request; a result is applied
//! only if its generation still matches the slot's current in-flight request.
//! Cancelling aborts the task and bumps the generation, so anything that
//! resolves afterwards is dropped on the floor.

use std::future::Future;

use futures_util::future::{AbortHandle, Abortable};
use tokio::sync::mpsc;

#[derive(Debug)]
struct InFlight {
    generation: u64,
    abort_handle: AbortHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotStart {
    Started,
    Busy,
}

#[derive(Debug)]
pub(crate) struct RequestSlot<T> {
    name: &'static str,
    tx: mpsc::UnboundedSender<(u64, T)>,
    rx: mpsc::UnboundedReceiver<(u64, T)>,
    generation: u64,
    in_flight: Option<InFlight>,
}

impl<T: Send + 'static> RequestSlot<T> {
    pub(crate) fn new(name: &'static str) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            name,
            tx,
            rx,
            generation: 0,
            in_flight: None,
        }
    }

    pub(crate) fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Spawn `request` on the current Tokio runtime unless one is already
    /// running.
    ///
    /// Must be called from within a Tokio runtime.
    pub(crate) fn start<F>(&mut self, request: F) -> SlotStart
    where
        F: Future<Output = T> + Send + 'static,
    {
        if self.in_flight.is_some() {
            return SlotStart::Busy;
        }

        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;
        let (abort_handle, abort_registration) = AbortHandle::new_pair();
        let tx = self.tx.clone();

        tokio::spawn(async move {
            if let Ok(output) = Abortable::new(request, abort_registration).await {
                let _ = tx.send((generation, output));
            }
        });

        tracing::debug!(slot = self.name, generation, "Request started");
        self.in_flight = Some(InFlight {
            generation,
            abort_handle,
        });
        SlotStart::Started
    }

    /// Take the result of the in-flight request if it has resolved.
    pub(crate) fn poll(&mut self) -> Option<T> {
        loop {
            let (generation, output) = match self.rx.try_recv() {
                Ok(message) => message,
                Err(_) => return None,
            };

            match &self.in_flight {
                Some(in_flight) if in_flight.generation == generation => {
                    self.in_flight = None;
                    return Some(output);
                }
                _ => {
                    tracing::debug!(
                        slot = self.name,
                        generation,
                        current = self.generation,
                        "Discarding stale result"
                    );
                }
            }
        }
    }

    /// Abort the in-flight request (if any) and invalidate its result.
    pub(crate) fn cancel(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.abort_handle.abort();
            tracing::debug!(
                slot = self.name,
                generation = in_flight.generation,
                "Request cancelled"
            );
        }
        self.generation = self.generation.wrapping_add(1);
    }
}

impl<T> Drop for RequestSlot<T> {
    fn drop(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.abort_handle.abort();
        }
    }
}
