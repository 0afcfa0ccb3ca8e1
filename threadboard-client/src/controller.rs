use std::sync::Arc;

use futures::{channel::mpsc, StreamExt};
use serde::ser::SerializeStruct;
use tokio::sync::watch;

use crate::{
    api::{BoardConfig, CommentData, CommentEdit, CommentId, RecordStore, StoreChange},
    build_tree, CommentNode, CommentTree, DeleteOutcome, Error, Repository,
};

/// What the comment board currently displays
#[derive(Debug, Default)]
pub struct CommentView {
    tree: CommentTree,
    total_count: usize,
    loading: bool,
}

impl CommentView {
    fn initial(max_depth: usize) -> CommentView {
        CommentView {
            tree: build_tree(Vec::new(), max_depth),
            total_count: 0,
            loading: true,
        }
    }

    pub fn roots(&self) -> impl ExactSizeIterator<Item = CommentNode<'_>> {
        self.tree.roots()
    }

    pub fn tree(&self) -> &CommentTree {
        &self.tree
    }

    /// Number of stored records, tombstones included
    pub fn total_count(&self) -> usize {
        self.total_count
    }

    /// True until the records got read for the first time
    pub fn is_loading(&self) -> bool {
        self.loading
    }
}

impl serde::Serialize for CommentView {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut view = s.serialize_struct("CommentView", 3)?;
        view.serialize_field("comments", &self.tree)?;
        view.serialize_field("totalCount", &self.total_count)?;
        view.serialize_field("loading", &self.loading)?;
        view.end()
    }
}

/// Entry point of the UI: validates user input, forwards it to the repository, and exposes the
/// view kept up-to-date by the associated [`Rebuilder`]
pub struct Controller<S> {
    repo: Repository<S>,
    config: BoardConfig,
    view: watch::Receiver<Arc<CommentView>>,
}

/// Rebuilds the [`CommentView`] every time the store changes
///
/// Must be spawned by the caller, eg. with `spawn_local` in the browser or `tokio::spawn`.
pub struct Rebuilder<S> {
    store: Arc<S>,
    max_depth: usize,
    feed: mpsc::UnboundedReceiver<StoreChange>,
    view: watch::Sender<Arc<CommentView>>,
}

impl<S: RecordStore> Controller<S> {
    pub fn new(store: Arc<S>, config: BoardConfig) -> Result<(Controller<S>, Rebuilder<S>), Error> {
        Controller::with_repository(Repository::new(store), config)
    }

    pub fn with_repository(
        repo: Repository<S>,
        config: BoardConfig,
    ) -> Result<(Controller<S>, Rebuilder<S>), Error> {
        config.validate()?;
        // subscribe before the first read, so that no change can slip in between
        let feed = repo.store().subscribe();
        let (sender, receiver) = watch::channel(Arc::new(CommentView::initial(config.max_depth)));
        let rebuilder = Rebuilder {
            store: repo.store().clone(),
            max_depth: config.max_depth,
            feed,
            view: sender,
        };
        let controller = Controller {
            repo,
            config,
            view: receiver,
        };
        Ok((controller, rebuilder))
    }

    pub fn repository(&self) -> &Repository<S> {
        &self.repo
    }

    /// The latest published view
    pub fn view(&self) -> Arc<CommentView> {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<CommentView>> {
        self.view.clone()
    }

    pub async fn add_comment(
        &self,
        data: CommentData,
        parent_id: Option<CommentId>,
    ) -> Result<CommentId, Error> {
        let data = data.trimmed();
        data.validate(&self.config)?;
        Ok(self.repo.create(data, parent_id).await?)
    }

    /// Returns false if there is no such comment
    pub async fn update_comment(&self, id: CommentId, edit: CommentEdit) -> Result<bool, Error> {
        let edit = edit.trimmed();
        edit.validate(&self.config)?;
        Ok(self.repo.update(id, edit).await?)
    }

    pub async fn delete_comment(&self, id: CommentId) -> Result<DeleteOutcome, Error> {
        Ok(self.repo.delete(id).await?)
    }
}

impl<S: RecordStore> Rebuilder<S> {
    /// Returns once the store got closed, or once nobody listens to the view anymore
    pub async fn run(mut self) {
        loop {
            match self.store.list_all().await {
                Ok(comments) => {
                    let total_count = comments.len();
                    let view = CommentView {
                        tree: build_tree(comments, self.max_depth),
                        total_count,
                        loading: false,
                    };
                    if self.view.send(Arc::new(view)).is_err() {
                        tracing::debug!("comment view no longer observed, stopping rebuilds");
                        return;
                    }
                }
                Err(err) => {
                    tracing::error!(?err, "failed reading comments, keeping the previous view")
                }
            }

            match self.feed.next().await {
                Some(change) => tracing::trace!(?change, "rebuilding comment view"),
                None => {
                    tracing::debug!("comment store closed, stopping rebuilds");
                    return;
                }
            }
            // one rebuild is enough for all the changes already queued
            while let Ok(change) = self.feed.try_recv() {
                tracing::trace!(?change, "coalescing store change");
            }
        }
    }
}
