//! Bounded relay between the fetch and write stages
//!
//! A single-producer/single-consumer FIFO with fixed capacity. A full queue
//! suspends the producer, which is the only backpressure in the pipeline:
//! the fetcher will not request another page while the writer is behind.

use tokio::sync::mpsc;

/// Producer half, owned by the fetcher
#[derive(Debug)]
pub struct RelayProducer<T> {
    tx: mpsc::Sender<T>,
}

/// Consumer half, owned by the writer
#[derive(Debug)]
pub struct RelayConsumer<T> {
    rx: mpsc::Receiver<T>,
}

/// Returned by [`RelayProducer::push`] when the consumer is gone
#[derive(Debug, PartialEq, Eq)]
pub struct Disconnected<T>(pub T);

/// Create a relay holding at most `capacity` items
///
/// # Panics
/// Panics if `capacity` is zero.
pub fn relay<T>(capacity: usize) -> (RelayProducer<T>, RelayConsumer<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    (RelayProducer { tx }, RelayConsumer { rx })
}

impl<T> RelayProducer<T> {
    /// Queue an item, waiting while the relay is full
    pub async fn push(&self, item: T) -> Result<(), Disconnected<T>> {
        self.tx.send(item).await.map_err(|e| Disconnected(e.0))
    }

    /// Signal end-of-stream. Items already queued stay deliverable.
    pub fn close(self) {
        drop(self.tx);
    }

    /// Number of items waiting in the relay
    pub fn occupancy(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

impl<T> RelayConsumer<T> {
    /// Next item in push order, `None` once closed and drained
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Refuse further pushes. Items already queued can still be read.
    pub fn close(&mut self) {
        self.rx.close();
    }
}
