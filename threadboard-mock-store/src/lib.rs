use std::collections::{btree_map, BTreeMap};

use async_trait::async_trait;
use futures::channel::mpsc;
use parking_lot::Mutex;
use threadboard_api::{Comment, CommentId, RecordPatch, RecordStore, StoreChange, Where};

/// Simplest possible record store, against which the real ones get compared
pub struct MockStore(Mutex<State>);

#[derive(Debug, Default)]
struct State {
    rows: BTreeMap<CommentId, Comment>,
    feeds: Vec<mpsc::UnboundedSender<StoreChange>>,
}

impl State {
    fn relay_change(&mut self, c: StoreChange) {
        self.feeds.retain(|f| f.unbounded_send(c).is_ok());
    }
}

impl MockStore {
    pub fn new() -> MockStore {
        MockStore(Mutex::new(State::default()))
    }

    /// Return the current number of records
    pub fn test_num_rows(&self) -> usize {
        self.0.lock().rows.len()
    }
}

impl Default for MockStore {
    fn default() -> MockStore {
        MockStore::new()
    }
}

#[async_trait]
impl RecordStore for MockStore {
    async fn insert(&self, c: Comment) -> anyhow::Result<()> {
        let mut state = self.0.lock();
        let id = c.id;
        match state.rows.entry(id) {
            btree_map::Entry::Occupied(_) => anyhow::bail!("comment {id:?} already exists"),
            btree_map::Entry::Vacant(entry) => {
                entry.insert(c);
            }
        }
        state.relay_change(StoreChange::Inserted(id));
        Ok(())
    }

    async fn update(&self, id: CommentId, patch: RecordPatch) -> anyhow::Result<bool> {
        let mut state = self.0.lock();
        match state.rows.get_mut(&id) {
            None => Ok(false),
            Some(c) => {
                patch.apply(c);
                state.relay_change(StoreChange::Updated(id));
                Ok(true)
            }
        }
    }

    async fn delete(&self, id: CommentId) -> anyhow::Result<bool> {
        let mut state = self.0.lock();
        if state.rows.remove(&id).is_none() {
            return Ok(false);
        }
        state.relay_change(StoreChange::Deleted(id));
        Ok(true)
    }

    async fn get(&self, id: CommentId) -> anyhow::Result<Option<Comment>> {
        Ok(self.0.lock().rows.get(&id).cloned())
    }

    async fn list_all(&self) -> anyhow::Result<Vec<Comment>> {
        Ok(self.0.lock().rows.values().cloned().collect())
    }

    async fn list_where(&self, w: &Where) -> anyhow::Result<Vec<Comment>> {
        Ok(self
            .0
            .lock()
            .rows
            .values()
            .filter(|c| w.matches(c))
            .cloned()
            .collect())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<StoreChange> {
        let (sender, receiver) = mpsc::unbounded();
        self.0.lock().feeds.push(sender);
        receiver
    }

    fn close(&self) {
        self.0.lock().feeds.clear();
    }
}
