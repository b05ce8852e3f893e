//! Pluggable sinks for security events.

use std::sync::Arc;

use parking_lot::Mutex;

use super::event::SecurityEvent;

/// Receives security events as they are raised.
///
/// Forwarding is best-effort; sinks must not fail the validation that raised
/// the event.
pub trait SecurityLogger: Send + Sync {
    /// Record one event.
    fn log(&self, event: &SecurityEvent);
}

/// Forwards events to `tracing` at warn level, tagged `[SECURITY]`.
#[derive(Debug, Default)]
pub struct TracingSecurityLogger;

impl SecurityLogger for TracingSecurityLogger {
    fn log(&self, event: &SecurityEvent) {
        tracing::warn!(
            event_type = %event.event_type,
            condition_id = %event.condition_id,
            timestamp = %event.timestamp,
            "[SECURITY] {}",
            event.details
        );
    }
}

/// In-memory security logger for testing.
#[derive(Debug, Default, Clone)]
pub struct MemorySecurityLogger {
    events: Arc<Mutex<Vec<SecurityEvent>>>,
}

impl MemorySecurityLogger {
    /// Create a new memory logger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all logged events.
    pub fn events(&self) -> Vec<SecurityEvent> {
        self.events.lock().clone()
    }

    /// Clear all events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Get event count.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl SecurityLogger for MemorySecurityLogger {
    fn log(&self, event: &SecurityEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Discards every event.
#[derive(Debug, Default)]
pub struct NullSecurityLogger;

impl SecurityLogger for NullSecurityLogger {
    fn log(&self, _event: &SecurityEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::event::SecurityEventType;

    #[test]
    fn test_memory_logger_collects() {
        let logger = MemorySecurityLogger::new();
        assert!(logger.is_empty());

        let event = SecurityEvent::new(SecurityEventType::MaxDepthExceeded, "c1", "too deep");
        logger.log(&event);
        logger.log(&event);
        assert_eq!(logger.len(), 2);
        assert_eq!(logger.events()[0].condition_id, "c1");

        logger.clear();
        assert!(logger.is_empty());
    }

    #[test]
    fn test_memory_logger_clones_share_buffer() {
        let logger = MemorySecurityLogger::new();
        let handle: Arc<dyn SecurityLogger> = Arc::new(logger.clone());
        handle.log(&SecurityEvent::new(
            SecurityEventType::StringTooLong,
            "c1",
            "long",
        ));
        assert_eq!(logger.len(), 1);
    }
}
