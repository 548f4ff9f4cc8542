//! Error classification and user-facing descriptions.

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    RateLimit,
    Network,
    Timeout,
    Server,
    Api,
    Configuration,
    Serialization,
    Canceled,
}

impl ErrorCategory {
    /// Generic description for categories without an HTTP status.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Authentication => status_message(401),
            Self::RateLimit => status_message(429),
            Self::Network => "Could not reach the AI service. Please check your network connection.",
            Self::Timeout => "The AI service took too long to respond. Please try again.",
            Self::Server => status_message(500),
            Self::Api => "The AI service rejected the request.",
            Self::Configuration => "The assistant is not configured yet.",
            Self::Serialization => "The AI service returned a response that could not be read.",
            Self::Canceled => "The request was canceled.",
        }
    }
}

/// Classified, human-readable message for an HTTP status returned by the provider.
pub fn status_message(status: u16) -> &'static str {
    match status {
        400 => "The request was rejected by the AI service (bad request). Try rephrasing your message.",
        401 => "The API key was rejected. Please check the API key in settings.",
        403 => "Access denied by the AI service. Please check the API key permissions.",
        404 => "The AI service endpoint or model was not found. Please check the model and base URL.",
        408 => "The AI service timed out while reading the request.",
        413 => "The conversation is too long for the AI service. Please start a new conversation.",
        429 => "Too many requests or quota exhausted. Please wait a moment and try again.",
        500 => "The AI service had an internal error. Please try again later.",
        502 => "The AI service gateway failed. Please try again later.",
        503 => "The AI service is temporarily unavailable. Please try again later.",
        504 => "The AI service gateway timed out. Please try again later.",
        400..=499 => "The AI service could not process the request.",
        500..=599 => "The AI service is having trouble right now. Please try again later.",
        _ => "The AI service returned an unexpected response.",
    }
}
