use serde::Deserialize;

/// Response envelope shared by every verification endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn into_outcome(self) -> ApiOutcome<T> {
        if self.success && !self.error {
            ApiOutcome::Accepted {
                message: self.message,
                data: self.data,
            }
        } else {
            let message = self.message.trim();
            ApiOutcome::Rejected {
                message: (!message.is_empty()).then(|| message.to_string()),
            }
        }
    }
}

/// Outcome of a verification call that reached the backend and was understood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiOutcome<T> {
    Accepted { message: String, data: Option<T> },
    Rejected { message: Option<String> },
}

impl<T> ApiOutcome<T> {
    /// Drop any payload, keeping only accept/reject and the message.
    pub fn without_data<U>(self) -> ApiOutcome<U> {
        match self {
            Self::Accepted { message, .. } => ApiOutcome::Accepted {
                message,
                data: None,
            },
            Self::Rejected { message } => ApiOutcome::Rejected { message },
        }
    }
}
