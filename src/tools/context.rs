//! Active book context passed explicitly into each call.

use serde::{Deserialize, Serialize};

/// The ledger a conversation is operating on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookContext {
    pub book_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_name: Option<String>,
}

impl BookContext {
    pub fn new(book_id: impl Into<String>) -> Self {
        Self {
            book_id: book_id.into(),
            book_name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.book_name = Some(name.into());
        self
    }

    /// `name (id)`, or just the id when unnamed.
    pub fn label(&self) -> String {
        match &self.book_name {
            Some(name) => format!("{name} ({})", self.book_id),
            None => self.book_id.clone(),
        }
    }
}

/// Resolves the active book; consulted once per tool batch.
pub trait ContextResolver: Send + Sync {
    fn resolve(&self) -> Option<BookContext>;
}

impl ContextResolver for Option<BookContext> {
    fn resolve(&self) -> Option<BookContext> {
        self.clone()
    }
}

impl ContextResolver for BookContext {
    fn resolve(&self) -> Option<BookContext> {
        Some(self.clone())
    }
}

/// What a tool sees about the call it runs in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolContext {
    pub book: Option<BookContext>,
}

impl ToolContext {
    pub fn new(book: Option<BookContext>) -> Self {
        Self { book }
    }

    pub fn book_id(&self) -> Option<&str> {
        self.book.as_ref().map(|b| b.book_id.as_str())
    }
}
