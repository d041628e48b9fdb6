//! Classification of buffered entries into operation kinds.
//!
//! Flush thresholds are chosen per operation kind, so every entry must map
//! to exactly one kind at sweep time. The mapping is a fixed lookup over the
//! event names the frontend emits and the transport verbs the backend sees;
//! anything unrecognized is `Other`, which is a valid outcome rather than an
//! error.
use serde::{Deserialize, Serialize};

/// The closed set of operation kinds an entry can classify into.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Create,
    Read,
    Update,
    Delete,
    Other,
}

impl OperationKind {
    /// The one-character code stored on persisted records.
    pub fn code(&self) -> &'static str {
        match self {
            OperationKind::Create => "C",
            OperationKind::Read => "R",
            OperationKind::Update => "U",
            OperationKind::Delete => "D",
            OperationKind::Other => "O",
        }
    }
}

/// Maps a frontend event name to its operation kind.
///
/// Matching is case-insensitive. Unknown or empty names yield
/// [`OperationKind::Other`].
pub fn classify_event(name: &str) -> OperationKind {
    match name.trim().to_ascii_lowercase().as_str() {
        "create" | "write" | "upload" | "register" => OperationKind::Create,
        "click" | "view" | "search" | "download" => OperationKind::Read,
        "update" | "edit" | "react" | "like" => OperationKind::Update,
        "delete" | "remove" => OperationKind::Delete,
        _ => OperationKind::Other,
    }
}

/// Maps a transport verb to its operation kind.
///
/// Matching is case-insensitive. Unknown or empty verbs yield
/// [`OperationKind::Other`].
pub fn classify_verb(verb: &str) -> OperationKind {
    match verb.trim().to_ascii_lowercase().as_str() {
        "post" => OperationKind::Create,
        "get" => OperationKind::Read,
        "put" | "patch" => OperationKind::Update,
        "delete" => OperationKind::Delete,
        _ => OperationKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_event_names_classify_case_insensitively() {
        assert_eq!(classify_event("create"), OperationKind::Create);
        assert_eq!(classify_event("Upload"), OperationKind::Create);
        assert_eq!(classify_event("CLICK"), OperationKind::Read);
        assert_eq!(classify_event("Search"), OperationKind::Read);
        assert_eq!(classify_event("download"), OperationKind::Read);
        assert_eq!(classify_event("react"), OperationKind::Update);
        assert_eq!(classify_event("EDIT"), OperationKind::Update);
        assert_eq!(classify_event("delete"), OperationKind::Delete);
        assert_eq!(classify_event("Remove"), OperationKind::Delete);
    }

    #[test]
    fn unknown_or_empty_event_names_are_other() {
        assert_eq!(classify_event("scroll"), OperationKind::Other);
        assert_eq!(classify_event(""), OperationKind::Other);
        assert_eq!(classify_event("   "), OperationKind::Other);
    }

    #[test]
    fn transport_verbs_classify_to_documented_kinds() {
        assert_eq!(classify_verb("POST"), OperationKind::Create);
        assert_eq!(classify_verb("get"), OperationKind::Read);
        assert_eq!(classify_verb("Put"), OperationKind::Update);
        assert_eq!(classify_verb("PATCH"), OperationKind::Update);
        assert_eq!(classify_verb("DELETE"), OperationKind::Delete);
    }

    #[test]
    fn unknown_or_empty_verbs_are_other() {
        assert_eq!(classify_verb("OPTIONS"), OperationKind::Other);
        assert_eq!(classify_verb("HEAD"), OperationKind::Other);
        assert_eq!(classify_verb(""), OperationKind::Other);
    }

    #[test]
    fn kind_codes_are_stable() {
        assert_eq!(OperationKind::Create.code(), "C");
        assert_eq!(OperationKind::Read.code(), "R");
        assert_eq!(OperationKind::Update.code(), "U");
        assert_eq!(OperationKind::Delete.code(), "D");
        assert_eq!(OperationKind::Other.code(), "O");
    }
}
