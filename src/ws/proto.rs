//! Wire envelope shared by the echo and files websocket services.
//!
//! Every frame in both directions is one JSON object:
//! `{type, key, message, value}` with `value` a flattened string-to-string
//! map. The server marks replies `success` or `error`; clients mark requests
//! with the service name (`echo` or `files`).

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// `type` marker on successful server replies.
pub const KIND_SUCCESS: &str = "success";
/// `type` marker on failed server replies; the reason lives in
/// `value.reason`.
pub const KIND_ERROR: &str = "error";
/// `type` marker on echo client frames.
pub const KIND_ECHO: &str = "echo";
/// `type` marker on files client frames.
pub const KIND_FILES: &str = "files";

/// Files operations, carried in the `message` field.
pub const PATH_EACH: &str = "path_each";
pub const PATH_SEARCH: &str = "path_search";
pub const PATH_CREATE: &str = "path_create";
pub const PATH_DELETE: &str = "path_delete";
pub const PATH_END: &str = "path_end";
pub const FILE_OPEN: &str = "file_open";
pub const FILE_SAVE: &str = "file_save";
pub const FILE_END: &str = "file_end";
pub const FILE_READ_LINE: &str = "file_read_line";
pub const FILE_WRITE_LINE: &str = "file_write_line";

/// Keys understood by the files service inside `value`.
pub const PATH_KEY: &str = "path";
pub const COND_KEY: &str = "cond";
pub const VALUE_KEY: &str = "value";
pub const LINE_KEY: &str = "lineNum";
/// Key carrying the failure reason in error replies.
pub const REASON_KEY: &str = "reason";

/// One JSON-framed websocket message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageBody {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub message: String,
    // The echo service replies with an explicit `value: null`.
    #[serde(default, deserialize_with = "null_as_empty_map")]
    pub value: BTreeMap<String, String>,
}

impl MessageBody {
    /// Builds a frame with an empty `key`, the way client pages do.
    pub fn new(
        kind: impl Into<String>,
        message: impl Into<String>,
        value: BTreeMap<String, String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            key: String::new(),
            message: message.into(),
            value,
        }
    }

    /// Frame pushed to the echo service.
    pub fn echo(message: impl Into<String>) -> Self {
        Self::new(KIND_ECHO, message, BTreeMap::new())
    }

    /// Frame pushed to the files service.
    pub fn files(message: impl Into<String>, value: BTreeMap<String, String>) -> Self {
        Self::new(KIND_FILES, message, value)
    }

    /// Successful reply frame, as the server builds it.
    pub fn success(message: impl Into<String>, value: BTreeMap<String, String>) -> Self {
        Self::new(KIND_SUCCESS, message, value)
    }

    /// Error reply frame with the reason flattened into `value`.
    pub fn error(message: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut value = BTreeMap::new();
        value.insert(REASON_KEY.to_string(), reason.into());
        Self::new(KIND_ERROR, message, value)
    }

    pub fn is_error(&self) -> bool {
        self.kind == KIND_ERROR
    }

    /// Failure reason of an error reply, when present.
    pub fn reason(&self) -> Option<&str> {
        self.value.get(REASON_KEY).map(String::as_str)
    }

    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn null_as_empty_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_frame_matches_page_wire_shape() {
        let encoded = MessageBody::echo("hello").to_text().expect("encode");
        let value: serde_json::Value = serde_json::from_str(&encoded).expect("json");

        assert_eq!(value.get("type").and_then(|v| v.as_str()), Some("echo"));
        assert_eq!(value.get("key").and_then(|v| v.as_str()), Some(""));
        assert_eq!(value.get("message").and_then(|v| v.as_str()), Some("hello"));
        assert!(value.get("value").map(|v| v.is_object()).unwrap_or(false));
    }

    #[test]
    fn files_frame_flattens_value_keys() {
        let mut value = BTreeMap::new();
        value.insert(PATH_KEY.to_string(), "/tmp/demo".to_string());
        let frame = MessageBody::files(PATH_CREATE, value);

        let encoded = frame.to_text().expect("encode");
        let decoded = MessageBody::from_text(&encoded).expect("decode");
        assert_eq!(decoded, frame);
        assert_eq!(decoded.value.get(PATH_KEY).map(String::as_str), Some("/tmp/demo"));
    }

    #[test]
    fn null_value_decodes_as_empty_map() {
        // The echo service serializes success replies with `value: null`.
        let decoded =
            MessageBody::from_text(r#"{"type":"success","key":"utf-8","message":"hi","value":null}"#)
                .expect("decode");
        assert!(decoded.value.is_empty());
        assert_eq!(decoded.message, "hi");
    }

    #[test]
    fn missing_fields_default() {
        let decoded = MessageBody::from_text(r#"{"type":"success"}"#).expect("decode");
        assert_eq!(decoded.key, "");
        assert_eq!(decoded.message, "");
        assert!(decoded.value.is_empty());
    }

    #[test]
    fn error_frame_carries_reason() {
        let frame = MessageBody::error("file_open", "no such file");
        assert!(frame.is_error());
        assert_eq!(frame.reason(), Some("no such file"));

        let round = MessageBody::from_text(&frame.to_text().expect("encode")).expect("decode");
        assert_eq!(round.reason(), Some("no such file"));
    }
}
