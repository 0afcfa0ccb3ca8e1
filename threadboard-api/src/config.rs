use crate::Error;

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Number of nesting levels, replies that would go deeper become new roots
    pub max_depth: usize,

    /// Bounds on a comment's text, counted in characters after trimming
    pub min_text_len: usize,
    pub max_text_len: usize,
}

impl Default for BoardConfig {
    fn default() -> BoardConfig {
        BoardConfig {
            max_depth: 4,
            min_text_len: 1,
            max_text_len: 1000,
        }
    }
}

impl BoardConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_depth == 0 {
            return Err(Error::InvalidConfig(String::from(
                "max_depth must allow at least the root level",
            )));
        }
        if self.min_text_len > self.max_text_len {
            return Err(Error::InvalidConfig(format!(
                "min_text_len {} is above max_text_len {}",
                self.min_text_len, self.max_text_len
            )));
        }
        Ok(())
    }
}
