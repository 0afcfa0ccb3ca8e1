use crate::api::Error as ApiError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl Error {
    /// Whether the input got rejected before reaching the store
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Api(_))
    }

    pub fn api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(err) => Some(err),
            Error::Anyhow(_) => None,
        }
    }
}
