//! JSON wire messages.
//!
//! Every inbound frame is one [`WireRequest`]: an internally tagged
//! [`WireMessage`] (`"type": "insert"`, ...) plus an optional client
//! correlation `tag`. Missing table, key or values decode to empty
//! defaults so the query handler, not the decoder, reports what is
//! missing. Every outbound frame is one [`WireResponse`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::{ClientRequest, FieldSet, Record, RequestError, RequestId, ServerResponse};

/// One client message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    Insert {
        #[serde(default)]
        table: String,
        #[serde(default)]
        key: String,
        #[serde(default)]
        values: Record,
    },
    Update {
        #[serde(default)]
        table: String,
        #[serde(default)]
        key: String,
        #[serde(default)]
        values: Record,
    },
    Read {
        #[serde(default)]
        table: String,
        #[serde(default)]
        key: String,
        #[serde(default)]
        fields: Option<FieldSet>,
    },
    Scan {
        #[serde(default)]
        table: String,
        #[serde(default)]
        start_key: String,
        #[serde(default)]
        record_count: usize,
        #[serde(default)]
        fields: Option<FieldSet>,
    },
    Delete {
        #[serde(default)]
        table: String,
        #[serde(default)]
        key: String,
    },
    /// Clear one table, or every table when `table` is absent. When
    /// `export` is set, measurements are written there first.
    Cleanup {
        #[serde(default)]
        table: Option<String>,
        #[serde(default)]
        export: Option<PathBuf>,
    },
    /// Close the session. Produces no response.
    EndSession,
}

impl WireMessage {
    /// The engine request for this message, or `None` for `end_session`.
    #[must_use]
    pub fn into_request(self) -> Option<ClientRequest> {
        let request = match self {
            Self::Insert { table, key, values } => ClientRequest::insert(table, key, values),
            Self::Update { table, key, values } => ClientRequest::update(table, key, values),
            Self::Read { table, key, fields } => ClientRequest::read(table, key, fields),
            Self::Scan {
                table,
                start_key,
                record_count,
                fields,
            } => ClientRequest::scan(table, start_key, record_count, fields),
            Self::Delete { table, key } => ClientRequest::delete(table, key),
            Self::Cleanup { table, export } => ClientRequest::cleanup(table.as_deref(), export),
            Self::EndSession => return None,
        };
        Some(request)
    }
}

/// An inbound frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireRequest {
    /// Opaque client correlation value, echoed in the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(flatten)]
    pub message: WireMessage,
}

impl WireRequest {
    /// Decode one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::UnknownMessageType`] if the text is not a
    /// known message.
    pub fn decode(text: &str) -> Result<Self, RequestError> {
        serde_json::from_str(text).map_err(|e| RequestError::UnknownMessageType {
            description: e.to_string(),
        })
    }
}

/// An outbound frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(flatten)]
    pub response: ServerResponse,
}

impl WireResponse {
    #[must_use]
    pub const fn new(tag: Option<String>, response: ServerResponse) -> Self {
        Self { tag, response }
    }

    /// A failure that never reached the engine, under a fresh request id.
    #[must_use]
    pub fn rejected(tag: Option<String>, failure: RequestError) -> Self {
        Self::new(tag, ServerResponse::failure(RequestId::next(), failure))
    }

    /// Encode as a JSON text frame.
    #[must_use]
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!("failed to encode response: {e}");
            format!(
                r#"{{"status":"failed","failure":{{"error":"internal","description":"{}"}}}}"#,
                e.to_string().replace('"', "'")
            )
        })
    }
}
