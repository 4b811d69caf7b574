//! Markup for the two shared dialogs: confirmation and edit form.
//!
//! The shell renders one empty instance of each dialog. Views hand the
//! client a [`ConfirmDialog`] (as data attributes on the triggering button)
//! or an [`EditForm`] fragment; the client fills the dialog and, on submit,
//! posts the named command with the form values as arguments.

use serde_json::Value;

use super::html::{checked, escape, selected};

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text,
    Url,
    Date,
    TextArea,
    Hidden,
    Checkbox,
    /// `(value, label)` pairs.
    Select(Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub value: String,
    pub required: bool,
    pub placeholder: Option<String>,
}

impl FormField {
    pub fn new(name: &str, label: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind,
            value: String::new(),
            required: false,
            placeholder: None,
        }
    }

    pub fn hidden(name: &str, value: &str) -> Self {
        Self::new(name, "", FieldKind::Hidden).value(value)
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn placeholder(mut self, text: &str) -> Self {
        self.placeholder = Some(text.to_string());
        self
    }

    /// Checkbox fields carry their state as the value `on`.
    pub fn checked(self, on: bool) -> Self {
        self.value(if on { "on" } else { "" })
    }

    fn to_html(&self) -> String {
        let name = escape(&self.name);
        let value = escape(&self.value);
        let required = if self.required { " required" } else { "" };
        let placeholder = self
            .placeholder
            .as_deref()
            .map(|p| format!(r#" placeholder="{}""#, escape(p)))
            .unwrap_or_default();
        let label = escape(&self.label);

        let control = match &self.kind {
            FieldKind::Hidden => {
                return format!(r#"<input type="hidden" name="{name}" value="{value}">"#);
            }
            FieldKind::Checkbox => {
                return format!(
                    r#"<div class="form-check"><input type="checkbox" class="form-check-input" name="{name}" id="field_{name}"{}><label for="field_{name}" class="form-check-label">{label}</label></div>"#,
                    checked(self.value == "on")
                );
            }
            FieldKind::Text => format!(
                r#"<input type="text" class="form-input" name="{name}" value="{value}"{placeholder}{required}>"#
            ),
            FieldKind::Url => format!(
                r#"<input type="url" class="form-input" name="{name}" value="{value}"{placeholder}{required}>"#
            ),
            FieldKind::Date => format!(
                r#"<input type="date" class="form-input" name="{name}" value="{value}"{required}>"#
            ),
            FieldKind::TextArea => format!(
                r#"<textarea class="form-textarea" name="{name}"{placeholder}{required}>{value}</textarea>"#
            ),
            FieldKind::Select(choices) => {
                let opts: String = choices
                    .iter()
                    .map(|(v, l)| {
                        format!(
                            r#"<option value="{}"{}>{}</option>"#,
                            escape(v),
                            selected(*v == self.value),
                            escape(l)
                        )
                    })
                    .collect();
                format!(r#"<select class="form-select" name="{name}"{required}>{opts}</select>"#)
            }
        };
        format!(r#"<div class="form-group"><label class="form-label">{label}</label>{control}</div>"#)
    }
}

/// A dialog form whose submission dispatches `command`.
#[derive(Debug, Clone, PartialEq)]
pub struct EditForm {
    pub title: String,
    pub command: String,
    pub submit_label: String,
    pub fields: Vec<FormField>,
    /// Optional destructive button (label, command) shown opposite submit.
    pub danger: Option<(String, String)>,
}

impl EditForm {
    pub fn new(title: impl Into<String>, command: &str, submit_label: &str) -> Self {
        Self {
            title: title.into(),
            command: command.to_string(),
            submit_label: submit_label.to_string(),
            fields: Vec::new(),
            danger: None,
        }
    }

    pub fn field(mut self, field: FormField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn danger(mut self, label: &str, command: &str) -> Self {
        self.danger = Some((label.to_string(), command.to_string()));
        self
    }

    pub fn to_html(&self) -> String {
        let fields: String = self.fields.iter().map(FormField::to_html).collect();
        let danger = self
            .danger
            .as_ref()
            .map(|(label, command)| {
                format!(
                    r#"<button type="button" class="btn btn-danger" data-command="{}" data-confirm="{}">{}</button>"#,
                    escape(command),
                    escape(&format!("Are you sure you want to {}?", label.to_lowercase())),
                    escape(label)
                )
            })
            .unwrap_or_default();
        format!(
            r#"<form class="modal-form" data-command="{}" data-title="{}">{fields}<div class="action-buttons">{danger}<button type="submit" class="btn btn-primary">{}</button></div></form>"#,
            escape(&self.command),
            escape(&self.title),
            escape(&self.submit_label)
        )
    }
}

/// A button that opens the confirmation dialog before dispatching
/// `command` with `args` plus `confirm: true`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmDialog {
    pub title: String,
    pub text: String,
    pub command: String,
    pub args: Value,
}

impl ConfirmDialog {
    pub fn new(title: &str, text: &str, command: &str, args: Value) -> Self {
        Self {
            title: title.to_string(),
            text: text.to_string(),
            command: command.to_string(),
            args,
        }
    }

    pub fn button(&self, class: &str, label: &str) -> String {
        format!(
            r#"<button type="button" class="{}" title="{}" data-command="{}" data-args="{}" data-confirm-title="{}" data-confirm="{}">{}</button>"#,
            escape(class),
            escape(&self.title),
            escape(&self.command),
            escape(&self.args.to_string()),
            escape(&self.title),
            escape(&self.text),
            label
        )
    }
}

/// The empty dialog containers rendered once by the shell.
pub fn dialog_containers() -> &'static str {
    r#"<div id="editModal" class="modal"><div class="modal-content"><div class="modal-header"><h3 class="modal-title" id="editModalTitle"></h3><span class="close" data-close="editModal">&times;</span></div><div id="editModalBody"></div></div></div>
<div id="confirmationModal" class="modal"><div class="modal-content confirm-content"><div class="modal-header"><h3 class="modal-title" id="confirmationModalTitle"></h3></div><p id="confirmationModalText"></p><div class="action-buttons"><button type="button" class="btn btn-secondary" id="cancelDeleteBtn">Cancel</button><button type="button" class="btn btn-danger" id="confirmDeleteBtn">Confirm</button></div></div></div>"#
}
