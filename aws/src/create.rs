//! Standard diagnostic messages for resource operations

use crate::tfresource::Error;
use std::fmt;
use tfplug::Diagnostics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Creating,
    Reading,
    Updating,
    Deleting,
    WaitingForCreation,
    WaitingForUpdate,
    WaitingForDeletion,
    Tagging,
    Importing,
    Setting,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Creating => "creating",
            Action::Reading => "reading",
            Action::Updating => "updating",
            Action::Deleting => "deleting",
            Action::WaitingForCreation => "waiting for creation",
            Action::WaitingForUpdate => "waiting for update",
            Action::WaitingForDeletion => "waiting for deletion",
            Action::Tagging => "tagging",
            Action::Importing => "importing",
            Action::Setting => "setting",
        }
    }

    /// Key in the `timeouts` block that bounds this action.
    fn timeout_key(&self) -> Option<&'static str> {
        match self {
            Action::Creating | Action::WaitingForCreation => Some("create"),
            Action::Updating | Action::WaitingForUpdate => Some("update"),
            Action::Deleting | Action::WaitingForDeletion => Some("delete"),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn subject(service: &str, action: Action, resource: &str, id: &str) -> String {
    if id.is_empty() {
        format!("{action} {service} {resource}")
    } else {
        format!("{action} {service} {resource} ({id})")
    }
}

/// `"creating Athena WorkGroup (primary): <err>"`
pub fn problem_standard_message(
    service: &str,
    action: Action,
    resource: &str,
    id: &str,
    err: impl fmt::Display,
) -> String {
    format!("{}: {err}", subject(service, action, resource, id))
}

/// Records a failed operation. Waiter timeouts get their own summary and
/// point at the `timeouts` block.
pub fn add_error(
    diagnostics: &mut Diagnostics,
    service: &str,
    action: Action,
    resource: &str,
    id: &str,
    err: &Error,
) {
    if err.is_timeout() {
        let hint = match action.timeout_key() {
            Some(key) => format!(
                "{err}\n\nThe operation may still complete in AWS. Consider raising the \"{key}\" value in the resource's timeouts block."
            ),
            None => err.to_string(),
        };
        diagnostics.add_error(
            format!("timeout {}", subject(service, action, resource, id)),
            Some(hint),
        );
        return;
    }

    diagnostics.add_error(
        problem_standard_message(service, action, resource, id, err),
        None::<String>,
    );
}
