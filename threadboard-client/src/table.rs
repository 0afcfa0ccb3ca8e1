use std::collections::BTreeMap;

use anyhow::Context;
use async_trait::async_trait;
use futures::channel::mpsc;
use parking_lot::Mutex;

use crate::{
    api::{Comment, CommentId, RecordPatch, RecordStore, StoreChange, Where},
    kv::{self, KvBackend},
};

const TABLE_KEY: &str = "comments";

/// Record store keeping the whole `comments` table as one JSON array in a [`KvBackend`]
///
/// Every mutation is persisted before being made visible, so a failed write changes nothing and
/// notifies nobody.
pub struct TableStore<B> {
    backend: B,
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    rows: BTreeMap<CommentId, Comment>,
    feeds: Vec<mpsc::UnboundedSender<StoreChange>>,
    closed: bool,
}

impl State {
    fn relay_change(&mut self, c: StoreChange) {
        self.feeds.retain(|f| f.unbounded_send(c).is_ok());
    }

    fn check_open(&self) -> anyhow::Result<()> {
        if self.closed {
            anyhow::bail!("comment store is closed");
        }
        Ok(())
    }
}

impl<B: KvBackend> TableStore<B> {
    pub fn open(backend: B) -> anyhow::Result<TableStore<B>> {
        let stored = kv::load_as::<Vec<Comment>>(&backend, TABLE_KEY)
            .context("loading the comments table")?
            .unwrap_or_default();
        let mut rows = BTreeMap::new();
        for c in stored {
            let id = c.id;
            if rows.insert(id, c).is_some() {
                anyhow::bail!("comments table holds comment {id:?} twice");
            }
        }
        tracing::debug!(rows = rows.len(), "opened comments table");
        Ok(TableStore {
            backend,
            state: Mutex::new(State {
                rows,
                ..State::default()
            }),
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn persist(&self, rows: &BTreeMap<CommentId, Comment>) -> anyhow::Result<()> {
        let table = serde_json::to_value(rows.values().collect::<Vec<_>>())
            .context("serializing the comments table")?;
        self.backend
            .store(TABLE_KEY, &table)
            .context("writing the comments table")
    }
}

#[async_trait]
impl<B: KvBackend> RecordStore for TableStore<B> {
    async fn insert(&self, c: Comment) -> anyhow::Result<()> {
        let mut state = self.state.lock();
        state.check_open()?;
        let id = c.id;
        if state.rows.contains_key(&id) {
            anyhow::bail!("comment {id:?} already exists");
        }
        let mut rows = state.rows.clone();
        rows.insert(id, c);
        self.persist(&rows)
            .with_context(|| format!("inserting comment {id:?}"))?;
        state.rows = rows;
        state.relay_change(StoreChange::Inserted(id));
        Ok(())
    }

    async fn update(&self, id: CommentId, patch: RecordPatch) -> anyhow::Result<bool> {
        let mut state = self.state.lock();
        state.check_open()?;
        if !state.rows.contains_key(&id) {
            return Ok(false);
        }
        let mut rows = state.rows.clone();
        if let Some(c) = rows.get_mut(&id) {
            patch.apply(c);
        }
        self.persist(&rows)
            .with_context(|| format!("updating comment {id:?}"))?;
        state.rows = rows;
        state.relay_change(StoreChange::Updated(id));
        Ok(true)
    }

    async fn delete(&self, id: CommentId) -> anyhow::Result<bool> {
        let mut state = self.state.lock();
        state.check_open()?;
        let mut rows = state.rows.clone();
        if rows.remove(&id).is_none() {
            return Ok(false);
        }
        self.persist(&rows)
            .with_context(|| format!("deleting comment {id:?}"))?;
        state.rows = rows;
        state.relay_change(StoreChange::Deleted(id));
        Ok(true)
    }

    async fn get(&self, id: CommentId) -> anyhow::Result<Option<Comment>> {
        let state = self.state.lock();
        state.check_open()?;
        Ok(state.rows.get(&id).cloned())
    }

    async fn list_all(&self) -> anyhow::Result<Vec<Comment>> {
        let state = self.state.lock();
        state.check_open()?;
        Ok(state.rows.values().cloned().collect())
    }

    async fn list_where(&self, w: &Where) -> anyhow::Result<Vec<Comment>> {
        let state = self.state.lock();
        state.check_open()?;
        Ok(state
            .rows
            .values()
            .filter(|c| w.matches(c))
            .cloned()
            .collect())
    }

    async fn count_where(&self, w: &Where) -> anyhow::Result<usize> {
        let state = self.state.lock();
        state.check_open()?;
        Ok(state.rows.values().filter(|c| w.matches(c)).count())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<StoreChange> {
        let (sender, receiver) = mpsc::unbounded();
        let mut state = self.state.lock();
        // a closed store hands out feeds that are already over
        if !state.closed {
            state.feeds.push(sender);
        }
        receiver
    }

    fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.feeds.clear();
        tracing::debug!("closed comments table");
    }
}
