//! Reply - ローカル API の応答を一度だけデコードしたタグ付き結果
//!
//! The local API answers `{success, files?, user?, error?}`. Clients decode
//! that shape once into [`Reply`], so nothing downstream inspects raw bodies.

use serde::Deserialize;

/// Decoded outcome of a local API call that returned a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply<T> {
    Accepted(T),
    Rejected { message: String },
}

/// Where the payload of an accepted reply lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Payload<'a> {
    /// No payload (e.g. delete); decodes as `()`.
    Empty,
    /// `field` must be present.
    Required(&'a str),
    /// `field` may be left out; a missing field decodes from `null`.
    Optional(&'a str),
}

/// Raw envelope as sent by the local API. Only used while decoding.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

impl Envelope {
    /// Turns the envelope into a [`Reply`], extracting the payload.
    pub(crate) fn into_reply<T: serde::de::DeserializeOwned>(
        mut self,
        payload: Payload<'_>,
    ) -> Result<Reply<T>, String> {
        if !self.success {
            let message = self
                .error
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "request rejected without a message".to_string());
            return Ok(Reply::Rejected { message });
        }

        let value = match payload {
            Payload::Required(name) => self
                .rest
                .remove(name)
                .ok_or_else(|| format!("response is missing `{name}`"))?,
            Payload::Optional(name) => self.rest.remove(name).unwrap_or(serde_json::Value::Null),
            Payload::Empty => serde_json::Value::Null,
        };
        serde_json::from_value(value)
            .map(Reply::Accepted)
            .map_err(|e| format!("malformed response: {e}"))
    }
}
