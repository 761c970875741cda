use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("malformed webhook payload: {message}")]
    MalformedPayload { message: String },
}

impl DomainError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            message: message.into(),
        }
    }
}
