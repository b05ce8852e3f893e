//! Security limits and telemetry for filter input.
//!
//! This module provides:
//! - Published resource limits ([`MAX_DEPTH`], [`MAX_IN_VALUES`], ...)
//! - Security events raised when adversarial-looking input is rejected
//! - Pluggable sinks for those events
//! - Screening of raw passthrough text
//!
//! Security events never block anything by themselves; the validation error
//! raised alongside them does.

pub mod event;
pub mod limits;
pub mod logger;
pub mod sql;

pub use event::{SecurityEvent, SecurityEventType};
pub use limits::{
    SecurityLimits, MAX_CONDITIONS_PER_GROUP, MAX_DEPTH, MAX_IN_VALUES, MAX_STRING_LENGTH,
};
pub use logger::{MemorySecurityLogger, NullSecurityLogger, SecurityLogger, TracingSecurityLogger};
pub use sql::{count_placeholders, find_dangerous_pattern};
