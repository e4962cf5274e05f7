//! Music-library mood categories
//!
//! Maps the classifier's emotion labels onto the moods the music library
//! files songs under.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Mood category of a song
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mood {
    #[default]
    Joy,
    Sad,
    Anger,
    Romantic,
    Excitement,
}

impl Mood {
    /// Mood for a predicted label
    ///
    /// Labels are matched after trimming and lower-casing. Unknown labels
    /// fall back to [`Mood::Joy`].
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "happy" => Mood::Joy,
            "sad" => Mood::Sad,
            "angry" => Mood::Anger,
            "relaxed" => Mood::Romantic,
            "energetic" => Mood::Excitement,
            _ => Mood::Joy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Joy => "Joy",
            Mood::Sad => "Sad",
            Mood::Anger => "Anger",
            Mood::Romantic => "Romantic",
            Mood::Excitement => "Excitement",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
