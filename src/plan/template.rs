//! The canonical six-week plan used to create or repair the plan document.

use super::models::{ActionItem, TransitionPlan, WeekPlan};

pub const DEFAULT_TITLE: &str = "Matt's 6-Week Transition Plan";

struct WeekTemplate {
    key: &'static str,
    title: &'static str,
    focus: &'static str,
    action_items: &'static [&'static str],
    learning_focus: &'static [&'static str],
}

const WEEKS: [WeekTemplate; 6] = [
    WeekTemplate {
        key: "week1",
        title: "Week 1",
        focus: "Foundation & Project Kick-off",
        action_items: &[
            "Get Google Calendar access for team schedules.",
            "Schedule initial one-on-ones with Jacob, Hardie, and Chandler.",
            "Begin Project: Create tracking spreadsheet for March-July jobs with outstanding payment issues.",
            "Begin Project: Build a system/spreadsheet for tracking trainee progress and development milestones.",
        ],
        learning_focus: &[
            "Admin Tasks: Learn how to track performance metrics and ensure daily operational reports are accurate.",
            "Team Development: Understand how to prepare high-performing Level 2s for future leadership roles.",
        ],
    },
    WeekTemplate {
        key: "week2",
        title: "Week 2",
        focus: "Technical Immersion & Strategic Planning",
        action_items: &[
            "Complete 3-day IICRC Water Damage Certification course.",
            "Conduct all initial one-on-one meetings with the team.",
            "Create Execution Plan: Finalize a detailed plan to resolve all outstanding job issues within 6 weeks.",
            "Create Execution Plan: Formalize the trainee tracking system and set a schedule for regular follow-ups.",
        ],
        learning_focus: &[
            "Mit Tech Fulfillment: Learn to audit work quality, ensuring consistency in service delivery based on IICRC standards.",
            "Planning: Develop skills in creating daily and weekly work schedules for Level 2s and Mit Techs.",
        ],
    },
    WeekTemplate {
        key: "week3",
        title: "Week 3",
        focus: "Mastering Morning Operations",
        action_items: &[
            "Take ownership of running the daily morning huddle.",
            "Take over daily truck inspections and learn equipment requirements.",
            "Get hands-on training on the DPT system.",
            "Conduct a ride-along with the Second Shift Lead.",
        ],
        learning_focus: &[
            "Customer Communication (Advanced): Learn to address critical customer service concerns and handle escalations.",
            "Safety & Compliance: Take responsibility for ensuring adherence to safety regulations at an operational level.",
        ],
    },
    WeekTemplate {
        key: "week4",
        title: "Week 4",
        focus: "Routing & Cross-Departmental Insights",
        action_items: &[
            "Take full ownership of the morning routing calls.",
            "Understand and apply capacity planning for the 260 job goal.",
            "Launch the 'Floor Demo Cost Analysis' project.",
            "Conduct a ride-along with the Marketing team.",
        ],
        learning_focus: &[
            "Workload & Labor Management: Learn to handle daily operational challenges and ensure the right workload distribution.",
            "Performance Management: Begin to review and address performance trends for Level 2s and their teams.",
        ],
    },
    WeekTemplate {
        key: "week5",
        title: "Week 5",
        focus: "Team Growth & Process Improvement",
        action_items: &[
            "Establish a recurring weekly one-on-one schedule with the team.",
            "Begin developing formal development plans for each Level 2.",
            "Begin documenting and prioritizing process improvement opportunities.",
            "Conduct a ride-along with the Sales team.",
        ],
        learning_focus: &[
            "Internal Communication: Learn to communicate effectively with upper management and internal teams to solve problems.",
            "Strategic Oversight: Practice ensuring that all established processes are being followed consistently by the team.",
        ],
    },
    WeekTemplate {
        key: "week6",
        title: "Week 6",
        focus: "Full Independence & Optimization",
        action_items: &[
            "Operate with full responsibility and minimal supervision.",
            "Present findings from the 'Outstanding Jobs' and 'Floor Demo' projects.",
            "Identify additional areas for team and process optimization.",
        ],
        learning_focus: &[
            "Labor Spend Management: Demonstrate the ability to manage labor spend effectively, optimizing team resources and time.",
            "Leadership: Solidify the ability to develop Level 2s into strong leaders who effectively manage Mit Techs.",
        ],
    },
];

/// Build a fresh default plan. Every item starts incomplete with no target
/// date and a newly generated id.
pub fn default_plan() -> TransitionPlan {
    let mut plan = TransitionPlan {
        title: DEFAULT_TITLE.to_string(),
        ..TransitionPlan::default()
    };
    for week in &WEEKS {
        plan.weeks.insert(
            week.key.to_string(),
            WeekPlan {
                title: week.title.to_string(),
                focus: week.focus.to_string(),
                action_items: week.action_items.iter().map(|text| ActionItem::new(*text)).collect(),
                learning_focus: week.learning_focus.iter().map(|s| s.to_string()).collect(),
                ..WeekPlan::default()
            },
        );
    }
    plan
}
