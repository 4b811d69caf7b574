use serde::Serialize;

use super::models::TransitionPlan;
use crate::ui::html::{checked, escape};

pub const NO_ACTION_ITEMS: &str = "No action items listed.";
pub const NO_LEARNING_ITEMS: &str = "No learning focus items listed.";

/// Display model of the whole plan. Rendering is a pure function of the
/// plan data; producing a new view replaces the previous one entirely.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanView {
    pub title: String,
    pub version: u64,
    pub weeks: Vec<WeekCard>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekCard {
    pub key: String,
    pub title: String,
    pub focus: String,
    pub action_items: Vec<ActionItemRow>,
    pub learning_focus: Vec<LearningLine>,
}

/// One draggable action item row: checkbox, editable text, date, delete.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionItemRow {
    pub index: usize,
    pub id: Option<String>,
    pub text: String,
    pub completed: bool,
    pub target_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearningLine {
    pub index: usize,
    pub text: String,
}

pub fn render_plan(plan: &TransitionPlan, version: u64) -> PlanView {
    let weeks = plan
        .sorted_weeks()
        .into_iter()
        .map(|(key, week)| WeekCard {
            key: key.clone(),
            title: week.title.clone(),
            focus: week.focus.clone(),
            action_items: week
                .action_items
                .iter()
                .enumerate()
                .map(|(index, item)| ActionItemRow {
                    index,
                    id: item.id.clone(),
                    text: item.text.clone(),
                    completed: item.completed,
                    target_date: item.target_date.clone(),
                })
                .collect(),
            learning_focus: week
                .learning_focus
                .iter()
                .enumerate()
                .map(|(index, text)| LearningLine {
                    index,
                    text: text.clone(),
                })
                .collect(),
        })
        .collect();

    PlanView {
        title: plan.title.clone(),
        version,
        weeks,
    }
}

impl PlanView {
    pub fn to_html(&self) -> String {
        let cards: String = self.weeks.iter().map(WeekCard::to_html).collect();
        format!(
            r#"<div class="tab-header"><h2 class="section-title">{}</h2></div><div class="plan-grid" data-version="{}">{cards}</div>"#,
            escape(&self.title),
            self.version
        )
    }
}

impl WeekCard {
    fn to_html(&self) -> String {
        let key = escape(&self.key);
        let actions = if self.action_items.is_empty() {
            format!(r#"<li class="placeholder">{NO_ACTION_ITEMS}</li>"#)
        } else {
            self.action_items.iter().map(ActionItemRow::to_html).collect()
        };
        let learning = if self.learning_focus.is_empty() {
            format!(r#"<li class="placeholder">{NO_LEARNING_ITEMS}</li>"#)
        } else {
            self.learning_focus
                .iter()
                .map(|line| {
                    format!(
                        r#"<li data-index="{}" contenteditable="true">{}</li>"#,
                        line.index,
                        escape(&line.text)
                    )
                })
                .collect()
        };

        format!(
            r#"<div class="card">
<div class="card-header"><div class="card-title">{title}</div><div class="card-focus">{focus}</div></div>
<div class="content-section"><h4>Action Items</h4><ul class="task-list action-items-list" data-week="{key}" data-type="actions">{actions}</ul>
<button type="button" class="btn btn-secondary add-item-btn" data-command="plan.addItem" data-args='{{"week":"{key}"}}'>+ Add Item</button></div>
<div class="content-section"><h4>Learning Focus</h4><ul class="task-list" data-week="{key}" data-type="learning">{learning}</ul></div>
</div>"#,
            title = escape(&self.title),
            focus = escape(&self.focus),
        )
    }
}

impl ActionItemRow {
    fn to_html(&self) -> String {
        let id_attr = self
            .id
            .as_deref()
            .map(|id| format!(r#" data-id="{}""#, escape(id)))
            .unwrap_or_default();
        let done = if self.completed { " completed-text" } else { "" };
        format!(
            r#"<li data-index="{index}"{id_attr} draggable="true"><div class="task-item-container"><input type="checkbox" class="action-item-checkbox"{checked}><span class="task-text{done}" contenteditable="true">{text}</span><input type="date" class="task-date" value="{date}"><button type="button" class="icon-btn delete-btn delete-item-btn" title="Delete item">&times;</button></div></li>"#,
            index = self.index,
            checked = checked(self.completed),
            text = escape(&self.text),
            date = escape(&self.target_date),
        )
    }
}

/// Static inline error shown in place of the plan when loading fails.
pub fn render_load_error() -> String {
    crate::ui::html::error_block("Error loading plan. Please check the server log.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::models::{ActionItem, WeekPlan};
    use crate::plan::template::default_plan;

    fn plan_with(weeks: Vec<(&str, WeekPlan)>) -> TransitionPlan {
        let mut plan = TransitionPlan {
            title: "T".into(),
            ..TransitionPlan::default()
        };
        for (k, w) in weeks {
            plan.weeks.insert(k.to_string(), w);
        }
        plan
    }

    #[test]
    fn test_render_orders_weeks_numerically() {
        let plan = plan_with(vec![
            ("week10", WeekPlan::default()),
            ("week2", WeekPlan::default()),
            ("week1", WeekPlan::default()),
        ]);
        let view = render_plan(&plan, 3);
        let keys: Vec<_> = view.weeks.iter().map(|w| w.key.as_str()).collect();
        assert_eq!(keys, vec!["week1", "week2", "week10"]);
        assert_eq!(view.version, 3);
    }

    #[test]
    fn test_render_keeps_item_order_and_indices() {
        let plan = default_plan();
        let view = render_plan(&plan, 1);
        let week1 = &view.weeks[0];
        assert_eq!(week1.key, "week1");
        assert_eq!(week1.action_items.len(), 4);
        for (i, row) in week1.action_items.iter().enumerate() {
            assert_eq!(row.index, i);
            assert_eq!(row.text, plan.weeks["week1"].action_items[i].text);
        }
    }

    #[test]
    fn test_render_is_repeatable() {
        let plan = default_plan();
        let first = render_plan(&plan, 4).to_html();
        assert_eq!(render_plan(&plan, 4).to_html(), first);
        assert_eq!(render_plan(&plan, 4), render_plan(&plan, 4));
    }

    #[test]
    fn test_empty_lists_render_placeholders() {
        let plan = plan_with(vec![("week1", WeekPlan::default())]);
        let html = render_plan(&plan, 1).to_html();
        assert!(html.contains(NO_ACTION_ITEMS));
        assert!(html.contains(NO_LEARNING_ITEMS));
    }

    #[test]
    fn test_html_escapes_user_text() {
        let mut week = WeekPlan {
            title: "Week <1>".into(),
            ..WeekPlan::default()
        };
        week.action_items.push(ActionItem::new("<script>alert(1)</script>"));
        week.learning_focus.push("A & B".into());
        let html = render_plan(&plan_with(vec![("week1", week)]), 1).to_html();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("Week &lt;1&gt;"));
        assert!(html.contains("A &amp; B"));
    }

    #[test]
    fn test_completed_item_is_checked() {
        let mut week = WeekPlan::default();
        let mut item = ActionItem::new("done");
        item.completed = true;
        item.target_date = "2025-05-01".into();
        week.action_items.push(item);
        let html = render_plan(&plan_with(vec![("week1", week)]), 1).to_html();
        assert!(html.contains(r#"class="action-item-checkbox" checked"#));
        assert!(html.contains("completed-text"));
        assert!(html.contains(r#"value="2025-05-01""#));
        assert!(html.contains(r#"draggable="true""#));
    }
}
