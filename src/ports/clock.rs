//! Clock port.
//!
//! All engine time reads go through this port so tests can pin "now".

use crate::domain::foundation::Timestamp;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// The current instant, UTC.
    fn now(&self) -> Timestamp;
}
