//! Query port for a store owned by another task.
//!
//! The owner keeps the [`mpsc::Receiver`] half and calls [`StoreQuery::answer`]
//! for each request; any number of [`StoreHandle`] clones can ask.

use tokio::sync::{mpsc, oneshot};

use crate::{Report, Result, StoreError, r#trait::Store};

#[derive(Debug)]
pub enum StoreQuery {
    /// Current summary, with no threshold applied.
    Summary(oneshot::Sender<Report>),
    /// Number of messages held.
    Len(oneshot::Sender<usize>),
}

impl StoreQuery {
    /// Reply to this query from `store`.
    ///
    /// A requester that has gone away is ignored.
    pub fn answer<S: Store + ?Sized>(self, store: &S) {
        match self {
            Self::Summary(reply) => {
                let _ = reply.send(store.summary());
            }
            Self::Len(reply) => {
                let _ = reply.send(store.len());
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreHandle {
    queries: mpsc::Sender<StoreQuery>,
}

impl StoreHandle {
    /// A handle plus the receiving end its owner must serve.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<StoreQuery>) {
        let (queries, receiver) = mpsc::channel(capacity.max(1));
        (Self { queries }, receiver)
    }

    /// # Errors
    /// [`StoreError::Unavailable`] if the owner has stopped serving queries
    pub async fn summary(&self) -> Result<Report> {
        let (reply, response) = oneshot::channel();
        self.ask(StoreQuery::Summary(reply)).await?;
        response.await.map_err(|_| StoreError::Unavailable)
    }

    /// # Errors
    /// [`StoreError::Unavailable`] if the owner has stopped serving queries
    pub async fn len(&self) -> Result<usize> {
        let (reply, response) = oneshot::channel();
        self.ask(StoreQuery::Len(reply)).await?;
        response.await.map_err(|_| StoreError::Unavailable)
    }

    async fn ask(&self, query: StoreQuery) -> Result<()> {
        self.queries
            .send(query)
            .await
            .map_err(|_| StoreError::Unavailable)
    }
}
