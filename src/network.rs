//! Uniform response envelope returned by the network port.
//!
//! The transport itself lives outside this crate; it only has to hand back an
//! [`Envelope`]. `code == 0` is success, anything else is a failure that the
//! retry policy may classify.
//!
//! ```rust
//! use gentask::Envelope;
//!
//! let ok = Envelope::success("https://cdn/img.png");
//! assert!(ok.is_success());
//!
//! let busy = Envelope::new(1003, Some("queue full".into()), "");
//! assert!(busy.into_result().is_err());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// `{code, message, data}` response wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(code: i32, message: Option<String>, data: T) -> Self {
        Self {
            code,
            message,
            data,
        }
    }

    /// Envelope with `code = 0` and no message.
    pub fn success(data: T) -> Self {
        Self::new(0, None, data)
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// Unwraps `data` on success, otherwise returns [`TaskError::Remote`].
    pub fn into_result(self) -> Result<T, TaskError> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(TaskError::Remote {
                code: self.code,
                message: self.message,
            })
        }
    }
}
