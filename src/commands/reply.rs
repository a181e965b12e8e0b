//! Reply rows returned to the host.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Action performed when a row is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Install the package named by the row id.
    Install,
    /// Remove the package named by the row id.
    Remove,
}

impl Action {
    /// The payload string sent back by the host.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Install => "install",
            Action::Remove => "remove",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "install" => Ok(Action::Install),
            "remove" => Ok(Action::Remove),
            other => Err(format!("unknown payload '{}'", other)),
        }
    }
}

/// A result row shown by the host.
///
/// `title` and `desc` may contain `<b>` highlight markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyItem {
    pub id: String,
    pub title: String,
    pub desc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Action>,
    /// Query that replaces the current one when the row is selected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

impl ReplyItem {
    /// Create an informational row.
    pub fn new(id: impl Into<String>, title: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            desc: desc.into(),
            icon: None,
            payload: None,
            redirect: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_payload(mut self, payload: Action) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_redirect(mut self, redirect: impl Into<String>) -> Self {
        self.redirect = Some(redirect.into());
        self
    }
}

/// An update pushed to the host outside the direct search reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReplyUpdate {
    /// Rows to add.
    Items(Vec<ReplyItem>),
    /// Remove the row with this id.
    Remove { remove: String },
}

impl ReplyUpdate {
    pub fn remove(id: impl Into<String>) -> Self {
        ReplyUpdate::Remove { remove: id.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_from_str() {
        assert_eq!("install".parse::<Action>(), Ok(Action::Install));
        assert_eq!("remove".parse::<Action>(), Ok(Action::Remove));
        assert!("upgrade".parse::<Action>().is_err());
    }

    #[test]
    fn test_reply_item_serializes_without_empty_fields() {
        let item = ReplyItem::new("foo", "<b>foo</b> 1.0.0", "plugman");
        let json = serde_json::to_string(&item).unwrap();
        assert_eq!(json, r#"{"id":"foo","title":"<b>foo</b> 1.0.0","desc":"plugman"}"#);
    }

    #[test]
    fn test_reply_item_serializes_payload() {
        let item = ReplyItem::new("foo", "t", "d").with_payload(Action::Install);
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains(r#""payload":"install""#));
    }

    #[test]
    fn test_reply_update_remove_shape() {
        let json = serde_json::to_string(&ReplyUpdate::remove("**")).unwrap();
        assert_eq!(json, r#"{"remove":"**"}"#);
    }

    #[test]
    fn test_reply_update_items_shape() {
        let update = ReplyUpdate::Items(vec![ReplyItem::new("a", "b", "c")]);
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(json, r#"[{"id":"a","title":"b","desc":"c"}]"#);
    }
}
