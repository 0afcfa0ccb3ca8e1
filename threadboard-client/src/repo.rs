use std::{fmt, sync::Arc};

use anyhow::Context;
use chrono::Utc;

use crate::api::{
    Comment, CommentData, CommentEdit, CommentId, RecordPatch, RecordStore, Time, Where,
};

pub type Clock = Arc<dyn Fn() -> Time + Send + Sync>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeleteOutcome {
    /// The comment had no replies and is gone
    HardDeleted,

    /// The comment had replies, so only its contents got replaced
    Tombstoned,

    Absent,
}

/// Comment-level operations on top of a record store
///
/// Nothing is validated here, callers are expected to have done it.
pub struct Repository<S> {
    store: Arc<S>,
    clock: Clock,
}

impl<S> Clone for Repository<S> {
    fn clone(&self) -> Self {
        Repository {
            store: self.store.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<S> fmt::Debug for Repository<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository").finish_non_exhaustive()
    }
}

impl<S: RecordStore> Repository<S> {
    pub fn new(store: Arc<S>) -> Repository<S> {
        Repository::with_clock(store, Arc::new(Utc::now))
    }

    pub fn with_clock(store: Arc<S>, clock: Clock) -> Repository<S> {
        Repository { store, clock }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn now(&self) -> Time {
        (self.clock)()
    }

    pub async fn create(
        &self,
        data: CommentData,
        parent_id: Option<CommentId>,
    ) -> anyhow::Result<CommentId> {
        let id = CommentId::random();
        tracing::debug!(?id, ?parent_id, "creating comment");
        self.store
            .insert(Comment {
                id,
                text: data.text,
                author: data.author,
                created_at: self.now(),
                edited_at: None,
                parent_id,
            })
            .await
            .with_context(|| format!("creating comment {id:?}"))?;
        Ok(id)
    }

    /// Marks the comment as edited even if `edit` is empty
    ///
    /// Returns false if there is no such comment.
    pub async fn update(&self, id: CommentId, edit: CommentEdit) -> anyhow::Result<bool> {
        tracing::debug!(?id, "updating comment");
        self.store
            .update(id, RecordPatch::edit(edit, self.now()))
            .await
            .with_context(|| format!("updating comment {id:?}"))
    }

    pub async fn delete(&self, id: CommentId) -> anyhow::Result<DeleteOutcome> {
        if self
            .store
            .get(id)
            .await
            .with_context(|| format!("looking up comment {id:?}"))?
            .is_none()
        {
            tracing::debug!(?id, "not deleting already-absent comment");
            return Ok(DeleteOutcome::Absent);
        }
        let replies = self
            .store
            .count_where(&Where::ParentId(id))
            .await
            .with_context(|| format!("counting replies to comment {id:?}"))?;
        if replies == 0 {
            tracing::debug!(?id, "deleting comment");
            let deleted = self
                .store
                .delete(id)
                .await
                .with_context(|| format!("deleting comment {id:?}"))?;
            Ok(match deleted {
                true => DeleteOutcome::HardDeleted,
                false => DeleteOutcome::Absent,
            })
        } else {
            tracing::debug!(?id, replies, "replacing contents of deleted comment");
            let updated = self
                .store
                .update(id, RecordPatch::tombstone(self.now()))
                .await
                .with_context(|| format!("tombstoning comment {id:?}"))?;
            Ok(match updated {
                true => DeleteOutcome::Tombstoned,
                false => DeleteOutcome::Absent,
            })
        }
    }

    pub async fn has_children(&self, id: CommentId) -> anyhow::Result<bool> {
        let replies = self
            .store
            .count_where(&Where::ParentId(id))
            .await
            .with_context(|| format!("counting replies to comment {id:?}"))?;
        Ok(replies > 0)
    }

    pub async fn get(&self, id: CommentId) -> anyhow::Result<Option<Comment>> {
        self.store
            .get(id)
            .await
            .with_context(|| format!("looking up comment {id:?}"))
    }

    pub async fn list(&self) -> anyhow::Result<Vec<Comment>> {
        self.store.list_all().await.context("listing comments")
    }
}
