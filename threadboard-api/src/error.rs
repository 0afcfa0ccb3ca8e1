#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Comment must be between {min} and {max} characters")]
    TextLength { min: usize, max: usize },

    #[error("Author name is required")]
    AuthorRequired,

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),

    #[error("Invalid board configuration: {0}")]
    InvalidConfig(String),
}
