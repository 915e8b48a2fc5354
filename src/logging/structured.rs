//! Component loggers
//!
//! Every event carries one `fields` value such as
//! `component=engine,cycle=4,phase=fetching`. Child loggers add fields for a
//! narrower scope (one refresh cycle, one phase); the string is rendered once
//! when the logger is built, not per event.

use std::fmt::Display;
use tracing::{debug, error, info, trace, warn};

/// Ordered `key=value` pairs attached to a logger; `component` always comes first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogContext {
    component: String,
    fields: Vec<(String, String)>,
}

impl LogContext {
    pub fn new(component: &str) -> Self {
        Self {
            component: component.to_string(),
            fields: Vec::new(),
        }
    }

    /// Set `key`, replacing an earlier value in place
    pub fn with_field(mut self, key: &str, value: impl Display) -> Self {
        let value = value.to_string();
        match self.fields.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key.to_string(), value)),
        }
        self
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn render(&self) -> String {
        std::iter::once(format!("component={}", self.component))
            .chain(self.fields.iter().map(|(k, v)| format!("{}={}", k, v)))
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[derive(Debug, Clone)]
pub struct StructuredLogger {
    context: LogContext,
    rendered: String,
}

impl StructuredLogger {
    pub fn new(context: LogContext) -> Self {
        let rendered = context.render();
        Self { context, rendered }
    }

    pub fn component(&self) -> &str {
        self.context.component()
    }

    pub fn context(&self) -> &LogContext {
        &self.context
    }

    /// Rendered `fields` value attached to every event
    pub fn fields(&self) -> &str {
        &self.rendered
    }

    /// Child logger with one more (or one replaced) field
    pub fn with_field(&self, key: &str, value: impl Display) -> Self {
        Self::new(self.context.clone().with_field(key, value))
    }

    pub fn info(&self, message: &str) {
        info!(fields = %self.rendered, "{}", message);
    }

    pub fn warn(&self, message: &str) {
        warn!(fields = %self.rendered, "{}", message);
    }

    pub fn error(&self, message: &str) {
        error!(fields = %self.rendered, "{}", message);
    }

    pub fn debug(&self, message: &str) {
        debug!(fields = %self.rendered, "{}", message);
    }

    pub fn trace(&self, message: &str) {
        trace!(fields = %self.rendered, "{}", message);
    }
}

/// Logger for one component
pub fn get_logger(component: &str) -> StructuredLogger {
    StructuredLogger::new(LogContext::new(component))
}

pub fn get_logger_with_context(context: LogContext) -> StructuredLogger {
    StructuredLogger::new(context)
}

/// Mask a secret for logging, keeping only its last four characters
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), tail)
}
