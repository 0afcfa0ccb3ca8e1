use chrono::Utc;

pub use uuid::{uuid, Uuid};
pub type Time = chrono::DateTime<Utc>;

pub const STUB_UUID: Uuid = uuid!("ffffffff-ffff-ffff-ffff-ffffffffffff");

mod comment;
pub use comment::{Comment, CommentData, CommentEdit, CommentId, RecordPatch, DELETED};

mod config;
pub use config::BoardConfig;

mod error;
pub use error::Error;

mod store;
pub use store::{RecordStore, StoreChange, Where};

// Strings end up in the browser's storage, which does not cope well with NUL bytes
pub fn validate_string(s: &str) -> Result<(), Error> {
    if s.contains('\0') {
        return Err(Error::NullByteInString(String::from(s)));
    }
    Ok(())
}
