//! Sprint categories and per-category time accounting.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The activity a sprint is tracking.
///
/// Every category except [`SprintCategory::Chaos`] is a "corner timer" and is
/// subject to the cooldown limit. Chaos is where time lands once a corner
/// timer runs past its cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SprintCategory {
    Code,
    Study,
    Spirit,
    Home,
    Chaos,
}

impl SprintCategory {
    pub const ALL: [SprintCategory; 5] = [
        SprintCategory::Code,
        SprintCategory::Study,
        SprintCategory::Spirit,
        SprintCategory::Home,
        SprintCategory::Chaos,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SprintCategory::Code => "code",
            SprintCategory::Study => "study",
            SprintCategory::Spirit => "spirit",
            SprintCategory::Home => "home",
            SprintCategory::Chaos => "chaos",
        }
    }

    /// Whether the category is bound by the cooldown.
    pub fn has_cooldown(&self) -> bool {
        !matches!(self, SprintCategory::Chaos)
    }

    /// Whether time in this category counts towards active time.
    pub fn is_active(&self) -> bool {
        self.has_cooldown()
    }
}

impl fmt::Display for SprintCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SprintCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        SprintCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == needle)
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "sprint".to_string(),
                message: format!(
                    "unknown sprint category '{s}' (expected one of: code, study, spirit, home, chaos)"
                ),
            })
    }
}

/// Milliseconds accumulated per category.
///
/// Serialized as `{code, study, spirit, home, chaos}` so the persisted
/// record keeps one field per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SprintStats {
    #[serde(default)]
    pub code: u64,
    #[serde(default)]
    pub study: u64,
    #[serde(default)]
    pub spirit: u64,
    #[serde(default)]
    pub home: u64,
    #[serde(default)]
    pub chaos: u64,
}

impl SprintStats {
    pub fn get(&self, category: SprintCategory) -> u64 {
        match category {
            SprintCategory::Code => self.code,
            SprintCategory::Study => self.study,
            SprintCategory::Spirit => self.spirit,
            SprintCategory::Home => self.home,
            SprintCategory::Chaos => self.chaos,
        }
    }

    pub fn get_mut(&mut self, category: SprintCategory) -> &mut u64 {
        match category {
            SprintCategory::Code => &mut self.code,
            SprintCategory::Study => &mut self.study,
            SprintCategory::Spirit => &mut self.spirit,
            SprintCategory::Home => &mut self.home,
            SprintCategory::Chaos => &mut self.chaos,
        }
    }

    /// Returns a copy with `ms` added to `category`.
    #[must_use]
    pub fn with_added(mut self, category: SprintCategory, ms: u64) -> Self {
        let slot = self.get_mut(category);
        *slot = slot.saturating_add(ms);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (SprintCategory, u64)> + '_ {
        SprintCategory::ALL.into_iter().map(|c| (c, self.get(c)))
    }

    /// Sum over every category, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        self.iter().fold(0u64, |acc, (_, ms)| acc.saturating_add(ms))
    }

    /// Sum over every category except chaos, saturating at `u64::MAX`.
    pub fn total_active(&self) -> u64 {
        self.iter()
            .filter(|(c, _)| c.is_active())
            .fold(0u64, |acc, (_, ms)| acc.saturating_add(ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_saturate_instead_of_overflowing() {
        let stats = SprintStats {
            code: u64::MAX,
            study: 1,
            chaos: u64::MAX,
            ..Default::default()
        };
        assert_eq!(stats.total(), u64::MAX);
        assert_eq!(stats.total_active(), u64::MAX);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("Code".parse::<SprintCategory>().unwrap(), SprintCategory::Code);
        assert_eq!(" chaos ".parse::<SprintCategory>().unwrap(), SprintCategory::Chaos);
        assert!("gym".parse::<SprintCategory>().is_err());
    }

    #[test]
    fn only_chaos_is_exempt_from_cooldown() {
        let exempt: Vec<_> = SprintCategory::ALL
            .into_iter()
            .filter(|c| !c.has_cooldown())
            .collect();
        assert_eq!(exempt, vec![SprintCategory::Chaos]);
    }

    #[test]
    fn stats_serialize_with_one_field_per_category() {
        let stats = SprintStats::default().with_added(SprintCategory::Home, 42);
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"code": 0, "study": 0, "spirit": 0, "home": 42, "chaos": 0})
        );
    }

    #[test]
    fn active_total_excludes_chaos() {
        let stats = SprintStats {
            code: 10,
            study: 20,
            spirit: 30,
            home: 40,
            chaos: 1_000,
        };
        assert_eq!(stats.total(), 1_100);
        assert_eq!(stats.total_active(), 100);
    }
}
