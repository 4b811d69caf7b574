//! Drag-and-drop reordering of action items across week lists.
//!
//! The engine works on a [`BoardSnapshot`]: every action-item list on the
//! page with each item's live field values and vertical midpoint, as read
//! back from the rendered page when the drag started. A drag moves one item
//! within that snapshot; finishing it rebuilds every week's `actionItems`
//! from the snapshot's final order, so the values written are whatever the
//! page showed at drop time.
//!
//! ```text
//!   Idle ──drag_start──> Dragging ──drop──> DropPending ──finish──> Idle
//!    ^                      │
//!    └──────cancel──────────┘
//! ```

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::models::{ActionItem, TransitionPlan, WeekPlan};
use crate::errors::PlanError;

/// One rendered item as seen on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemNode {
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
    pub completed: bool,
    #[serde(default)]
    pub target_date: String,
    /// Vertical midpoint of the element in page coordinates.
    pub midpoint_y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListSnapshot {
    pub week: String,
    pub items: Vec<ItemNode>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub lists: Vec<ListSnapshot>,
}

impl BoardSnapshot {
    fn list(&self, week: &str) -> Option<&ListSnapshot> {
        self.lists.iter().find(|l| l.week == week)
    }

    fn list_mut(&mut self, week: &str) -> Option<&mut ListSnapshot> {
        self.lists.iter_mut().find(|l| l.week == week)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPos {
    pub week: String,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragState {
    Idle,
    /// One item is tagged as the drag source.
    Dragging { source: ItemPos },
    /// The item has been placed; the weeks map has not been rebuilt yet.
    DropPending { placed: ItemPos },
}

impl DragState {
    fn name(&self) -> &'static str {
        match self {
            DragState::Idle => "idle",
            DragState::Dragging { .. } => "dragging",
            DragState::DropPending { .. } => "drop-pending",
        }
    }
}

pub struct DragReorder {
    board: BoardSnapshot,
    state: DragState,
}

impl DragReorder {
    pub fn new(board: BoardSnapshot) -> Self {
        Self {
            board,
            state: DragState::Idle,
        }
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn board(&self) -> &BoardSnapshot {
        &self.board
    }

    pub fn drag_start(&mut self, week: &str, index: usize) -> Result<(), PlanError> {
        if self.state != DragState::Idle {
            return Err(self.invalid("drag start"));
        }
        let list = self.board.list(week).ok_or_else(|| PlanError::UnknownWeek {
            week: week.to_string(),
        })?;
        if index >= list.items.len() {
            return Err(PlanError::ItemOutOfRange {
                week: week.to_string(),
                index,
                len: list.items.len(),
            });
        }
        self.state = DragState::Dragging {
            source: ItemPos {
                week: week.to_string(),
                index,
            },
        };
        Ok(())
    }

    /// Abandon the drag. Nothing is written.
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }

    /// Drop the dragged item onto `week`'s list at pointer height
    /// `pointer_y`. Returns where it landed.
    pub fn drop_on(&mut self, week: &str, pointer_y: f64) -> Result<ItemPos, PlanError> {
        let DragState::Dragging { source } = &self.state else {
            return Err(self.invalid("drop"));
        };
        if self.board.list(week).is_none() {
            return Err(PlanError::UnknownWeek {
                week: week.to_string(),
            });
        }
        let source = source.clone();

        let node = match self.board.list_mut(&source.week) {
            Some(list) if source.index < list.items.len() => Some(list.items.remove(source.index)),
            _ => None,
        };
        let Some(node) = node else {
            return Err(self.invalid("drop with a vanished source"));
        };
        let target = self
            .board
            .list_mut(week)
            .ok_or_else(|| PlanError::UnknownWeek {
                week: week.to_string(),
            })?;
        let midpoints: Vec<f64> = target.items.iter().map(|n| n.midpoint_y).collect();
        let index = insertion_index(&midpoints, pointer_y);
        target.items.insert(index, node);

        let placed = ItemPos {
            week: week.to_string(),
            index,
        };
        self.state = DragState::DropPending {
            placed: placed.clone(),
        };
        Ok(placed)
    }

    /// Rebuild the weeks map of `base` from the snapshot's final order and
    /// return to idle. Weeks the page did not show keep their items.
    pub fn finish(
        &mut self,
        base: &TransitionPlan,
    ) -> Result<BTreeMap<String, WeekPlan>, PlanError> {
        if !matches!(self.state, DragState::DropPending { .. }) {
            return Err(self.invalid("finish"));
        }
        let weeks = rebuild_weeks(base, &self.board)?;
        self.state = DragState::Idle;
        Ok(weeks)
    }

    fn invalid(&self, action: &str) -> PlanError {
        PlanError::InvalidDrag(format!("{action} while {}", self.state.name()))
    }
}

/// Position before the first sibling whose midpoint lies below the pointer,
/// or the end of the list.
pub fn insertion_index(sibling_midpoints: &[f64], pointer_y: f64) -> usize {
    sibling_midpoints
        .iter()
        .position(|&mid| mid > pointer_y)
        .unwrap_or(sibling_midpoints.len())
}

/// Replace each shown week's `actionItems` with the snapshot's items, in
/// snapshot order, carrying unknown fields over from the stored item with
/// the same id.
pub fn rebuild_weeks(
    base: &TransitionPlan,
    board: &BoardSnapshot,
) -> Result<BTreeMap<String, WeekPlan>, PlanError> {
    let mut extras: HashMap<&str, &Map<String, Value>> = HashMap::new();
    for item in base.weeks.values().flat_map(|w| &w.action_items) {
        if let Some(id) = item.id.as_deref() {
            extras.insert(id, &item.extra);
        }
    }

    let mut weeks = base.weeks.clone();
    for list in &board.lists {
        let week = weeks
            .get_mut(&list.week)
            .ok_or_else(|| PlanError::UnknownWeek {
                week: list.week.clone(),
            })?;
        week.action_items = list
            .items
            .iter()
            .map(|node| ActionItem {
                text: node.text.clone(),
                completed: node.completed,
                target_date: node.target_date.clone(),
                extra: node
                    .id
                    .as_deref()
                    .and_then(|id| extras.get(id))
                    .map(|m| (*m).clone())
                    .unwrap_or_default(),
                id: node.id.clone(),
            })
            .collect();
    }
    Ok(weeks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::template::default_plan;

    fn node(text: &str, y: f64) -> ItemNode {
        ItemNode {
            id: Some(format!("id-{text}")),
            text: text.to_string(),
            completed: false,
            target_date: String::new(),
            midpoint_y: y,
        }
    }

    fn board() -> BoardSnapshot {
        BoardSnapshot {
            lists: vec![
                ListSnapshot {
                    week: "week1".into(),
                    items: vec![node("a", 10.0), node("b", 30.0), node("c", 50.0)],
                },
                ListSnapshot {
                    week: "week2".into(),
                    items: vec![node("x", 210.0), node("y", 230.0)],
                },
            ],
        }
    }

    fn texts(board: &BoardSnapshot, week: &str) -> Vec<String> {
        board
            .list(week)
            .unwrap()
            .items
            .iter()
            .map(|n| n.text.clone())
            .collect()
    }

    #[test]
    fn test_insertion_index() {
        let mids = [10.0, 30.0, 50.0];
        assert_eq!(insertion_index(&mids, 0.0), 0);
        assert_eq!(insertion_index(&mids, 20.0), 1);
        assert_eq!(insertion_index(&mids, 45.0), 2);
        assert_eq!(insertion_index(&mids, 99.0), 3);
        assert_eq!(insertion_index(&[], 5.0), 0);
    }

    #[test]
    fn test_move_within_week() {
        let mut engine = DragReorder::new(board());
        engine.drag_start("week1", 0).unwrap();
        let placed = engine.drop_on("week1", 60.0).unwrap();
        assert_eq!(placed.index, 2);
        assert_eq!(texts(engine.board(), "week1"), vec!["b", "c", "a"]);
        assert!(matches!(engine.state(), DragState::DropPending { .. }));
    }

    #[test]
    fn test_cross_week_drop() {
        let mut engine = DragReorder::new(board());
        engine.drag_start("week1", 1).unwrap();
        engine.drop_on("week2", 220.0).unwrap();
        assert_eq!(texts(engine.board(), "week1"), vec!["a", "c"]);
        assert_eq!(texts(engine.board(), "week2"), vec!["x", "b", "y"]);
    }

    #[test]
    fn test_drop_past_end_appends() {
        let mut engine = DragReorder::new(board());
        engine.drag_start("week2", 0).unwrap();
        engine.drop_on("week1", 500.0).unwrap();
        assert_eq!(texts(engine.board(), "week1"), vec!["a", "b", "c", "x"]);
    }

    #[test]
    fn test_invalid_transitions() {
        let mut engine = DragReorder::new(board());
        assert!(matches!(
            engine.drop_on("week1", 0.0),
            Err(PlanError::InvalidDrag(_))
        ));
        engine.drag_start("week1", 0).unwrap();
        assert!(matches!(
            engine.drag_start("week1", 1),
            Err(PlanError::InvalidDrag(_))
        ));
        assert!(matches!(
            engine.finish(&default_plan()),
            Err(PlanError::InvalidDrag(_))
        ));
    }

    #[test]
    fn test_cancel_returns_to_idle_without_moving() {
        let mut engine = DragReorder::new(board());
        engine.drag_start("week1", 2).unwrap();
        engine.cancel();
        assert_eq!(engine.state(), &DragState::Idle);
        assert_eq!(texts(engine.board(), "week1"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_drag_start_validates_source() {
        let mut engine = DragReorder::new(board());
        assert!(matches!(
            engine.drag_start("week7", 0),
            Err(PlanError::UnknownWeek { .. })
        ));
        assert!(matches!(
            engine.drag_start("week2", 5),
            Err(PlanError::ItemOutOfRange { .. })
        ));
    }

    #[test]
    fn test_finish_uses_live_values() {
        let mut plan = default_plan();
        let stored = plan.weeks["week1"].action_items.clone();
        plan.weeks.get_mut("week1").unwrap().action_items[0]
            .extra
            .insert("pinned".into(), Value::Bool(true));

        // Page shows week1 with an edited text and a ticked box not yet saved.
        let mut nodes: Vec<ItemNode> = stored
            .iter()
            .enumerate()
            .map(|(i, item)| ItemNode {
                id: item.id.clone(),
                text: item.text.clone(),
                completed: false,
                target_date: String::new(),
                midpoint_y: 100.0 + 20.0 * i as f64,
            })
            .collect();
        nodes[1].text = "Edited on page".into();
        nodes[1].completed = true;
        let board = BoardSnapshot {
            lists: vec![ListSnapshot {
                week: "week1".into(),
                items: nodes,
            }],
        };

        let mut engine = DragReorder::new(board);
        engine.drag_start("week1", 0).unwrap();
        engine.drop_on("week1", 1000.0).unwrap();
        let weeks = engine.finish(&plan).unwrap();
        assert_eq!(engine.state(), &DragState::Idle);

        let items = &weeks["week1"].action_items;
        assert_eq!(items.len(), 4);
        assert_eq!(items[0].text, "Edited on page");
        assert!(items[0].completed);
        assert_eq!(items[3].id, stored[0].id);
        assert_eq!(items[3].extra.get("pinned"), Some(&Value::Bool(true)));
        // Weeks the page did not show are untouched.
        assert_eq!(weeks["week2"], plan.weeks["week2"]);
    }

    #[test]
    fn test_rebuild_rejects_unknown_week() {
        let board = BoardSnapshot {
            lists: vec![ListSnapshot {
                week: "week42".into(),
                items: vec![],
            }],
        };
        assert!(matches!(
            rebuild_weeks(&default_plan(), &board),
            Err(PlanError::UnknownWeek { .. })
        ));
    }
}
