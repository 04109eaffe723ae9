// Bulk package actions and comment/category edits. Every action is one form
// post to packages.php covering any number of package ids.

use super::response::package_output_message;
use super::transport::Transport;
use super::{form_value, ApiClient};
use crate::error::{AurError, Result};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Vote,
    Flag,
    Notify,
    Adopt,
    Disown,
    /// Trusted users and developers only.
    Delete,
    Unvote,
    Unflag,
    Unnotify,
}

/// Action symbol and the identifier the packages page expects for it.
const ACTION_TABLE: [(Action, &str, &str); 9] = [
    (Action::Vote, "vote", "do_Vote"),
    (Action::Flag, "flag", "do_Flag"),
    (Action::Notify, "notify", "do_Notify"),
    (Action::Adopt, "adopt", "do_Adopt"),
    (Action::Disown, "disown", "do_Disown"),
    (Action::Delete, "delete", "do_Delete"),
    (Action::Unvote, "unvote", "do_UnVote"),
    (Action::Unflag, "unflag", "do_UnFlag"),
    (Action::Unnotify, "unnotify", "do_UnNotify"),
];

impl Action {
    pub const ALL: [Action; 9] = [
        Action::Vote,
        Action::Flag,
        Action::Notify,
        Action::Adopt,
        Action::Disown,
        Action::Delete,
        Action::Unvote,
        Action::Unflag,
        Action::Unnotify,
    ];

    fn entry(self) -> (Action, &'static str, &'static str) {
        ACTION_TABLE[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.entry().1
    }

    pub fn remote_id(self) -> &'static str {
        self.entry().2
    }
}

impl FromStr for Action {
    type Err = AurError;

    fn from_str(s: &str) -> Result<Self> {
        ACTION_TABLE
            .iter()
            .find(|(_, name, _)| *name == s)
            .map(|(action, _, _)| *action)
            .ok_or_else(|| AurError::UnknownAction(s.to_string()))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the packages page said about an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Message(String),
    /// No status message was found; the caller decides how to report it.
    Unresolved,
}

/// `IDs[<id>]=1` for every id, then `action=<identifier>`.
pub fn action_body(action: Action, ids: &[u64]) -> String {
    ids.iter()
        .map(|id| format!("IDs[{id}]=1"))
        .chain(std::iter::once(format!("action={}", action.remote_id())))
        .collect::<Vec<_>>()
        .join("&")
}

impl<T: Transport> ApiClient<T> {
    /// Run the named action on every id with a single request.
    pub fn perform_action(&self, action_name: &str, ids: &[u64]) -> Result<ActionOutcome> {
        let action = action_name.parse()?;
        self.apply(action, ids)
    }

    pub fn apply(&self, action: Action, ids: &[u64]) -> Result<ActionOutcome> {
        self.require_session()?;
        debug!(%action, count = ids.len(), "package action");
        let res = self.form_post("/packages.php", action_body(action, ids))?;
        Ok(match package_output_message(&res.text()) {
            Some(message) => ActionOutcome::Message(message),
            None => ActionOutcome::Unresolved,
        })
    }

    /// Post a comment. The text is sent as given.
    pub fn add_comment(&self, id: u64, text: &str) -> Result<()> {
        self.require_session()?;
        let body = format!("ID={id}&comment={}", form_value(text));
        self.form_post(&format!("/packages.php?ID={id}"), body)?;
        Ok(())
    }

    pub fn delete_comment(&self, id: u64, comment_id: u64) -> Result<()> {
        self.require_session()?;
        self.get(&format!(
            "/pkgedit.php?del_Comment=1&comment_id={comment_id}&ID={id}"
        ))?;
        Ok(())
    }

    /// Move a package to another category ordinal.
    pub fn change_category(&self, id: u64, category: &str) -> Result<()> {
        self.require_session()?;
        let body = format!(
            "change_Category=1&ID={id}&category_id={}",
            form_value(category)
        );
        self.form_post("/pkgedit.php", body)?;
        Ok(())
    }
}
