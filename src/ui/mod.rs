pub mod html;
pub mod icons;
pub mod modal;

use chrono::NaiveDate;

pub use html::escape;
pub use modal::{ConfirmDialog, EditForm, FieldKind, FormField};

/// Long-form date shown in the header, e.g. `Thursday, March 6, 2025`.
pub fn current_date_banner(today: NaiveDate) -> String {
    today.format("%A, %B %-d, %Y").to_string()
}
