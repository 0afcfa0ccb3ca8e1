use crate::{BoardConfig, Error, Time, Uuid, STUB_UUID};

/// Written over both the text and the author of a comment deleted while it still had replies
pub const DELETED: &str = "[deleted]";

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct CommentId(pub Uuid);

impl CommentId {
    pub fn random() -> CommentId {
        CommentId(Uuid::new_v4())
    }

    pub fn stub() -> CommentId {
        CommentId(STUB_UUID)
    }
}

/// A comment as it is stored: replies only know about their parent
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub text: String,
    pub author: String,
    pub created_at: Time,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<Time>,

    /// Not checked on write, may point to a comment that does not exist (anymore)
    #[serde(default)]
    pub parent_id: Option<CommentId>,
}

impl Comment {
    pub fn is_tombstone(&self) -> bool {
        self.text == DELETED && self.author == DELETED
    }

    pub fn is_edited(&self) -> bool {
        self.edited_at.is_some()
    }
}

/// What the user typed in the comment form
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CommentData {
    pub text: String,
    pub author: String,
}

impl CommentData {
    pub fn new(text: impl Into<String>, author: impl Into<String>) -> CommentData {
        CommentData {
            text: text.into(),
            author: author.into(),
        }
    }

    pub fn trimmed(&self) -> CommentData {
        CommentData {
            text: String::from(self.text.trim()),
            author: String::from(self.author.trim()),
        }
    }

    // Callers are expected to validate the trimmed version, that is what gets stored
    pub fn validate(&self, cfg: &BoardConfig) -> Result<(), Error> {
        validate_text(&self.text, cfg)?;
        validate_author(&self.author)
    }
}

/// Partial update of a comment, absent fields are left untouched
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CommentEdit {
    pub text: Option<String>,
    pub author: Option<String>,
}

impl CommentEdit {
    pub fn text(text: impl Into<String>) -> CommentEdit {
        CommentEdit {
            text: Some(text.into()),
            author: None,
        }
    }

    pub fn trimmed(&self) -> CommentEdit {
        CommentEdit {
            text: self.text.as_deref().map(|t| String::from(t.trim())),
            author: self.author.as_deref().map(|a| String::from(a.trim())),
        }
    }

    pub fn validate(&self, cfg: &BoardConfig) -> Result<(), Error> {
        if let Some(text) = &self.text {
            validate_text(text, cfg)?;
        }
        if let Some(author) = &self.author {
            validate_author(author)?;
        }
        Ok(())
    }
}

fn validate_text(text: &str, cfg: &BoardConfig) -> Result<(), Error> {
    crate::validate_string(text)?;
    let len = text.chars().count();
    if text.trim().is_empty() || len < cfg.min_text_len || len > cfg.max_text_len {
        return Err(Error::TextLength {
            min: cfg.min_text_len,
            max: cfg.max_text_len,
        });
    }
    Ok(())
}

fn validate_author(author: &str) -> Result<(), Error> {
    crate::validate_string(author)?;
    if author.trim().is_empty() {
        return Err(Error::AuthorRequired);
    }
    Ok(())
}

/// Field-level update as handed to a record store
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RecordPatch {
    pub text: Option<String>,
    pub author: Option<String>,
    pub edited_at: Option<Time>,
}

impl RecordPatch {
    pub fn edit(edit: CommentEdit, now: Time) -> RecordPatch {
        RecordPatch {
            text: edit.text,
            author: edit.author,
            edited_at: Some(now),
        }
    }

    pub fn tombstone(now: Time) -> RecordPatch {
        RecordPatch {
            text: Some(String::from(DELETED)),
            author: Some(String::from(DELETED)),
            edited_at: Some(now),
        }
    }

    pub fn apply(&self, c: &mut Comment) {
        if let Some(text) = &self.text {
            c.text = text.clone();
        }
        if let Some(author) = &self.author {
            c.author = author.clone();
        }
        if let Some(edited_at) = self.edited_at {
            c.edited_at = Some(edited_at);
        }
    }
}
