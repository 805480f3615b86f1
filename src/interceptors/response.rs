use serde::{Deserialize, Serialize};

/// Marshalled error response body.
///
/// `debug_message` is serialized even when absent so clients see a stable
/// shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub debug_message: Option<String>,
}
