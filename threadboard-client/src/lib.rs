mod controller;
pub use controller::{CommentView, Controller, Rebuilder};

mod error;
pub use error::Error;

mod kv;
#[cfg(target_arch = "wasm32")]
pub use kv::LocalStorageKv;
pub use kv::{KvBackend, MemoryKv};

mod prefs;
pub use prefs::AuthorPreference;

mod repo;
pub use repo::{Clock, DeleteOutcome, Repository};

mod table;
pub use table::TableStore;

mod tree;
pub use tree::{build_tree, CommentNode, CommentTree};

#[cfg(test)]
mod fuzz;

pub mod api {
    pub use threadboard_api::*;
}
