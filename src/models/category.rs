//! Activity categories.
//!
//! The set is closed: adding a category means redeploying this enum.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::FocusError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Work,
    Development,
    Research,
    Learning,
    Entertainment,
    Social,
    Shopping,
    News,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Work,
        Category::Development,
        Category::Research,
        Category::Learning,
        Category::Entertainment,
        Category::Social,
        Category::Shopping,
        Category::News,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Work => "Work",
            Category::Development => "Development",
            Category::Research => "Research",
            Category::Learning => "Learning",
            Category::Entertainment => "Entertainment",
            Category::Social => "Social",
            Category::Shopping => "Shopping",
            Category::News => "News",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = FocusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Category::ALL
            .iter()
            .copied()
            .find(|category| category.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| FocusError::UnknownCategory(value.to_string()))
    }
}
