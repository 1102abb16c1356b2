use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentPreferences {
    pub necessary: bool,
    #[serde(default)]
    pub analytics: bool,
    #[serde(default)]
    pub marketing: bool,
    #[serde(default)]
    pub functional: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ConsentPreferences {
    pub fn all_accepted() -> Self {
        Self {
            necessary: true,
            analytics: true,
            marketing: true,
            functional: true,
            updated_at: None,
        }
    }

    pub fn necessary_only() -> Self {
        Self {
            necessary: true,
            analytics: false,
            marketing: false,
            functional: false,
            updated_at: None,
        }
    }
}

impl Default for ConsentPreferences {
    fn default() -> Self {
        Self::necessary_only()
    }
}
