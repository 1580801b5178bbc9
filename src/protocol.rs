//! Hook Wire Protocol
//!
//! Exactly one JSON document in on stdin, exactly one JSON document out on
//! stdout. Input parsing is lenient: unknown fields are ignored and a
//! malformed or empty document degrades to the all-absent input, which every
//! entry point resolves to a valid allow/no-op output. The stdin read is
//! bounded by a deadline so a hung stream never hangs the surrounding
//! session.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;

use crate::gate::StopSignal;

/// Default stdin deadline in milliseconds.
pub const DEFAULT_INPUT_TIMEOUT_MS: u64 = 5000;

/// The inbound hook document. All fields optional; stop-type calls add
/// `stop_reason` and `user_requested`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HookInput {
    pub prompt: Option<String>,
    pub cwd: Option<PathBuf>,
    pub session_id: Option<String>,
    pub stop_reason: Option<String>,
    pub user_requested: Option<bool>,
}

impl HookInput {
    /// Lenient parse: any failure yields the empty document.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::default();
        }
        match serde_json::from_str(raw) {
            Ok(input) => input,
            Err(e) => {
                tracing::warn!("malformed hook input, treating as empty: {}", e);
                Self::default()
            }
        }
    }

    pub fn stop_signal(&self) -> StopSignal {
        StopSignal {
            user_requested: self.user_requested.unwrap_or(false),
            reason: self.stop_reason.clone(),
        }
    }
}

/// The outbound decision document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookOutput {
    #[serde(rename = "continue")]
    pub continue_: bool,
    #[serde(rename = "additionalContext", skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl HookOutput {
    pub fn allow() -> Self {
        Self {
            continue_: true,
            additional_context: None,
            reason: None,
        }
    }

    pub fn allow_with_context(context: String) -> Self {
        Self {
            continue_: true,
            additional_context: Some(context),
            reason: None,
        }
    }

    pub fn block(reason: String) -> Self {
        Self {
            continue_: false,
            additional_context: None,
            reason: Some(reason),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"continue":true}"#.to_string())
    }
}

/// Read the inbound document from stdin, bounded by `timeout`.
///
/// Deadline expiry and read failure both resolve to the empty document.
pub async fn read_input(timeout: Duration) -> HookInput {
    let read = async {
        let mut raw = String::new();
        tokio::io::stdin().read_to_string(&mut raw).await.map(|_| raw)
    };
    match tokio::time::timeout(timeout, read).await {
        Ok(Ok(raw)) => HookInput::parse(&raw),
        Ok(Err(e)) => {
            tracing::warn!("stdin read failed, treating as empty input: {}", e);
            HookInput::default()
        }
        Err(_) => {
            tracing::warn!("stdin read deadline expired, treating as empty input");
            HookInput::default()
        }
    }
}
