//! Transition plan: the singleton six-week checklist and its sync model.
//!
//! | Module     | Responsibility                                              |
//! |------------|-------------------------------------------------------------|
//! | `models`   | `TransitionPlan`, `WeekPlan`, `ActionItem` wire types       |
//! | `template` | Canonical default plan used to create or repair             |
//! | `loader`   | Load with structural check, repair and id back-fill         |
//! | `render`   | Pure plan → `PlanView` → HTML                               |
//! | `mutator`  | Field-path writes and version-guarded structural writes     |
//! | `reorder`  | Drag state machine over a snapshot of the rendered lists    |
//!
//! Scalar edits go to the store as one partial write addressed by field
//! path. Add, delete and reorder replace the whole `weeks` map in one
//! conditional write, after which callers reload and re-render.

pub mod loader;
pub mod models;
pub mod mutator;
pub mod render;
pub mod reorder;
pub mod template;

pub use loader::{LoadedPlan, PlanHealth, inspect, load_plan};
pub use models::{ActionItem, PlanLocation, TransitionPlan, WeekPlan};
pub use mutator::{FieldWrite, ItemField, ItemRef, PlanMutator, Revert};
pub use render::{PlanView, render_plan};
pub use reorder::{BoardSnapshot, DragReorder, DragState};
pub use template::default_plan;
