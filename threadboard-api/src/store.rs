use async_trait::async_trait;
use futures::channel::mpsc;

use crate::{Comment, CommentId, RecordPatch, Time};

/// Lookup on one of the indexed fields of the `comments` table
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Where {
    ParentId(CommentId),
    CreatedAt(Time),
    Author(String),
}

impl Where {
    pub fn matches(&self, c: &Comment) -> bool {
        match self {
            Where::ParentId(p) => c.parent_id == Some(*p),
            Where::CreatedAt(t) => c.created_at == *t,
            Where::Author(a) => c.author == *a,
        }
    }
}

/// Sent to every subscriber after a mutation went through
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StoreChange {
    Inserted(CommentId),
    Updated(CommentId),
    Deleted(CommentId),
}

/// Persistent table of flat comment records
///
/// Any failure is reported as-is, with no retry: it is up to the caller to decide what to do.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fails if a record with the same id already exists
    async fn insert(&self, c: Comment) -> anyhow::Result<()>;

    /// Returns false, without notifying anyone, if there is no record with this id
    async fn update(&self, id: CommentId, patch: RecordPatch) -> anyhow::Result<bool>;

    /// Returns false, without notifying anyone, if there is no record with this id
    async fn delete(&self, id: CommentId) -> anyhow::Result<bool>;

    async fn get(&self, id: CommentId) -> anyhow::Result<Option<Comment>>;

    async fn list_all(&self) -> anyhow::Result<Vec<Comment>>;

    async fn list_where(&self, w: &Where) -> anyhow::Result<Vec<Comment>>;

    async fn count_where(&self, w: &Where) -> anyhow::Result<usize> {
        Ok(self.list_where(w).await?.len())
    }

    /// The returned feed ends when the store gets closed
    fn subscribe(&self) -> mpsc::UnboundedReceiver<StoreChange>;

    fn close(&self);
}
