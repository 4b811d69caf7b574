use chrono::{DateTime, NaiveDate, Utc};

/// Escape text for use in element content or a quoted attribute.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// `high` → `High`, `on-hold` → `On-hold`.
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn checked(on: bool) -> &'static str {
    if on { " checked" } else { "" }
}

pub fn selected(on: bool) -> &'static str {
    if on { " selected" } else { "" }
}

/// US-style short date (`3/7/2025`), matching how the tables display dates.
pub fn display_date(date: NaiveDate) -> String {
    date.format("%-m/%-d/%Y").to_string()
}

pub fn display_optional_date(date: Option<NaiveDate>) -> String {
    date.map(display_date).unwrap_or_default()
}

pub fn display_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| display_date(t.date_naive())).unwrap_or_default()
}

/// Placeholder row spanning a whole table.
pub fn message_row(colspan: usize, message: &str) -> String {
    format!(
        r#"<tr><td colspan="{colspan}" class="table-message">{}</td></tr>"#,
        escape(message)
    )
}

/// Static inline error shown in place of a table body or view.
pub fn error_row(colspan: usize, message: &str) -> String {
    format!(
        r#"<tr><td colspan="{colspan}" class="table-message error-text">{}</td></tr>"#,
        escape(message)
    )
}

pub fn error_block(message: &str) -> String {
    format!(r#"<div class="inline-error">{}</div>"#, escape(message))
}

/// `<option>` list for a select, marking `current` as selected.
pub fn options(values: &[&str], current: &str) -> String {
    values
        .iter()
        .map(|v| {
            format!(
                r#"<option value="{}"{}>{}</option>"#,
                escape(v),
                selected(*v == current),
                escape(&capitalize(v))
            )
        })
        .collect()
}
