use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Week keys every valid plan must carry.
pub const REQUIRED_WEEKS: [&str; 6] = ["week1", "week2", "week3", "week4", "week5", "week6"];

/// Text given to items created with "Add item".
pub const NEW_ITEM_TEXT: &str = "New Action Item";

/// Where the singleton plan document lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLocation {
    pub collection: String,
    pub document_id: String,
}

impl Default for PlanLocation {
    fn default() -> Self {
        Self {
            collection: "transitionPlans".to_string(),
            document_id: "main_transition_plan".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransitionPlan {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub weeks: BTreeMap<String, WeekPlan>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekPlan {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub focus: String,
    #[serde(default)]
    pub action_items: Vec<ActionItem>,
    #[serde(default)]
    pub learning_focus: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub target_date: String,
    /// Stable identity. Absent on documents written before ids existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ActionItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            id: Some(new_item_id()),
            ..Self::default()
        }
    }
}

pub fn new_item_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Integer suffix of a week key: `week4` → 4.
pub fn week_ordinal(key: &str) -> Option<u32> {
    key.strip_prefix("week")?.parse().ok()
}

impl TransitionPlan {
    /// Weeks in display order: ascending ordinal, keys without a numeric
    /// suffix last (by key).
    pub fn sorted_weeks(&self) -> Vec<(&String, &WeekPlan)> {
        let mut weeks: Vec<_> = self.weeks.iter().collect();
        weeks.sort_by(|(a, _), (b, _)| {
            let rank = |key: &str| (week_ordinal(key).is_none(), week_ordinal(key));
            rank(a).cmp(&rank(b)).then_with(|| a.cmp(b))
        });
        weeks
    }

    pub fn week(&self, key: &str) -> Option<&WeekPlan> {
        self.weeks.get(key)
    }

    /// Assign ids to items that lack one. Returns how many were assigned.
    pub fn backfill_ids(&mut self) -> usize {
        let mut assigned = 0;
        for week in self.weeks.values_mut() {
            for item in week.action_items.iter_mut().filter(|i| i.id.is_none()) {
                item.id = Some(new_item_id());
                assigned += 1;
            }
        }
        assigned
    }
}

impl WeekPlan {
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.action_items
            .iter()
            .position(|item| item.id.as_deref() == Some(id))
    }
}
