//! Class name <-> integer code mapping

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{corrupt, Artifact, ENCODER_FILE};
use crate::error::{Result, TonoError};

/// Class names indexed by their integer code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new<S: Into<String>>(classes: impl IntoIterator<Item = S>) -> Self {
        Self {
            classes: classes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Code assigned to `label`, if known
    pub fn transform(&self, label: &str) -> Option<i64> {
        self.classes
            .iter()
            .position(|c| c == label)
            .map(|i| i as i64)
    }

    /// Class name for a code
    ///
    /// # Errors
    /// * `UnknownClassCode` - If the code is outside the encoder's range
    pub fn inverse_transform(&self, code: i64) -> Result<&str> {
        usize::try_from(code)
            .ok()
            .and_then(|i| self.classes.get(i))
            .map(String::as_str)
            .ok_or(TonoError::UnknownClassCode {
                code,
                known: self.classes.len(),
            })
    }
}

impl Artifact for LabelEncoder {
    const FILE_NAME: &'static str = ENCODER_FILE;

    fn validate(&self) -> Result<()> {
        if self.classes.is_empty() {
            return Err(corrupt(ENCODER_FILE, "no classes"));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.classes.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(corrupt(ENCODER_FILE, format!("duplicate class '{}'", dup)));
        }
        Ok(())
    }
}
