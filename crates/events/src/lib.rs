//! Post-commit eventing: notice payloads, pub/sub mechanics, the fan-out
//! worker loop, and the audit-trail boundary.
//!
//! Everything in this crate runs *after* a unit of work has committed and is
//! best effort by design: a failure here is logged and never converts a
//! successful sale into a reported failure.

pub mod audit;
pub mod bus;
pub mod in_memory_bus;
pub mod notice;
pub mod worker;

pub use audit::{AuditRecord, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use bus::{EventBus, Subscription};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use notice::{LedgerNotice, NoticeSink};
pub use worker::{NoticeWorker, WorkerHandle};
