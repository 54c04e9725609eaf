//! Response and tool-call id minting.
//!
//! Ids are UUID-derived and unique for the lifetime of the process.

use uuid::Uuid;

/// Completion id: `chatcmpl-` + 12 hex chars.
pub fn completion_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("chatcmpl-{}", &hex[..12])
}

/// Tool-call id: `call_` + 24 hex chars.
pub fn tool_call_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("call_{}", &hex[..24])
}
