use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Dashboard tabs, in navigation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Transition,
    Jobs,
    Actions,
    Team,
    Training,
}

impl Tab {
    pub const ALL: [Tab; 5] = [Tab::Transition, Tab::Jobs, Tab::Actions, Tab::Team, Tab::Training];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tab::Transition => "transition",
            Tab::Jobs => "jobs",
            Tab::Actions => "actions",
            Tab::Team => "team",
            Tab::Training => "training",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tab::Transition => "Transition Plan",
            Tab::Jobs => "Jobs",
            Tab::Actions => "Action Items",
            Tab::Team => "Team",
            Tab::Training => "Training",
        }
    }

    /// Whether the tab has an open/completed sub-navigation.
    pub fn has_filter(&self) -> bool {
        matches!(self, Tab::Jobs | Tab::Actions | Tab::Training)
    }

    /// Sub-tab label for the open filter of this tab.
    pub fn open_label(&self) -> &'static str {
        match self {
            Tab::Actions => "pending",
            _ => "active",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tab::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown tab '{s}'"))
    }
}

/// Open vs completed records. "Open" means active/pending/on-hold for jobs,
/// not-started/in-progress/on-hold for actions, and active for training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListFilter {
    #[default]
    Open,
    Completed,
}

impl FromStr for ListFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" | "active" | "pending" => Ok(ListFilter::Open),
            "completed" => Ok(ListFilter::Completed),
            other => Err(format!("Unknown filter '{other}'")),
        }
    }
}

/// Explicit per-request view state, passed into list and render calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewState {
    pub tab: Tab,
    pub filter: ListFilter,
}

impl ViewState {
    pub fn new(tab: Tab, filter: ListFilter) -> Self {
        Self { tab, filter }
    }

    /// Word used in "No … found" messages: `active`, `pending`, `completed`.
    pub fn filter_label(&self) -> &'static str {
        match self.filter {
            ListFilter::Open => self.tab.open_label(),
            ListFilter::Completed => "completed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_round_trip() {
        for tab in Tab::ALL {
            assert_eq!(tab.as_str().parse::<Tab>().unwrap(), tab);
        }
        assert!("settings".parse::<Tab>().is_err());
    }

    #[test]
    fn test_filter_aliases() {
        assert_eq!("active".parse::<ListFilter>().unwrap(), ListFilter::Open);
        assert_eq!("pending".parse::<ListFilter>().unwrap(), ListFilter::Open);
        assert_eq!("completed".parse::<ListFilter>().unwrap(), ListFilter::Completed);
        assert!("archived".parse::<ListFilter>().is_err());
    }

    #[test]
    fn test_filter_label_per_tab() {
        assert_eq!(ViewState::new(Tab::Actions, ListFilter::Open).filter_label(), "pending");
        assert_eq!(ViewState::new(Tab::Jobs, ListFilter::Open).filter_label(), "active");
        assert_eq!(
            ViewState::new(Tab::Training, ListFilter::Completed).filter_label(),
            "completed"
        );
    }
}
