use anyhow::Context;

use crate::kv::{self, KvBackend};

const AUTHOR_KEY: &str = "comment-author-name";

/// Remembers the name last used to post a comment, so the form can be prefilled
pub struct AuthorPreference<B> {
    backend: B,
}

impl<B: KvBackend> AuthorPreference<B> {
    pub fn new(backend: B) -> AuthorPreference<B> {
        AuthorPreference { backend }
    }

    /// Unreadable values are treated as if nothing had been saved
    pub fn load(&self) -> Option<String> {
        match kv::load_as::<String>(&self.backend, AUTHOR_KEY) {
            Ok(author) => author,
            Err(err) => {
                tracing::warn!(?err, "ignoring unreadable saved author name");
                None
            }
        }
    }

    pub fn save(&self, author: &str) -> anyhow::Result<()> {
        self.backend
            .store(AUTHOR_KEY, &serde_json::Value::from(author))
            .context("saving author name")
    }

    pub fn clear(&self) {
        self.backend.remove(AUTHOR_KEY)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}
