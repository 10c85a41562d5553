//! Crash-stack payload parsing.
//!
//! Frames are validated and handed back unchanged; mapping them through a
//! source map happens elsewhere.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    pub file: String,
    pub line_number: u64,
    pub column: u64,
    pub method_name: String,
}

#[derive(Deserialize)]
struct StackPayload {
    stack: Vec<StackFrame>,
}

pub struct Symbolicator;

impl Symbolicator {
    /// Parse a `{"stack": [...]}` body.
    ///
    /// Any decode or shape error yields `None`; this never fails loudly so
    /// callers can pick their own response.
    pub fn parse(body: &[u8]) -> Option<Vec<StackFrame>> {
        serde_json::from_slice::<StackPayload>(body)
            .ok()
            .map(|payload| payload.stack)
    }
}
