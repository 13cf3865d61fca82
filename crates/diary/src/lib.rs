//! Incident diary.
//!
//! Bridges alert events into chat threads: each incident gets exactly one
//! root message whose content tracks the incident state, and every event is
//! posted as a threaded reply beneath it. Users acknowledge incidents from
//! buttons on the root message, optionally picking a root cause in a form.
//!
//! # Components
//!
//! - [`IncidentDispatcher`]: correlates events with incidents and keeps the
//!   root message current
//! - [`AckWorkflow`]: button clicks and reason-form submissions
//! - [`render`]: pure message rendering
//! - [`IncidentStore`]: persistence seam, with [`MemoryStore`] and (feature
//!   `postgres`) `PgStore`
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use diary::{CauseMenu, IncidentDispatcher, MemoryStore, AckWorkflow};
//! use diary_notify::SlackGateway;
//!
//! let store = Arc::new(MemoryStore::new());
//! let gateway = Arc::new(SlackGateway::from_env());
//! let dispatcher = IncidentDispatcher::new(store.clone(), gateway.clone());
//! let ack = AckWorkflow::new(store, gateway, CauseMenu::default());
//! ```

use chrono::{DateTime, Utc};
use std::sync::Arc;

pub mod ack;
pub mod causes;
pub mod dispatcher;
pub mod error;
pub mod locks;
pub mod model;
pub mod render;
pub mod report;
pub mod store;

pub use ack::{AckOutcome, AckReport, AckWorkflow, BlockActionCallback};
pub use causes::{CauseEntry, CauseMenu};
pub use dispatcher::{DispatchPath, DispatchReport, IncidentDispatcher};
pub use error::{AckError, CauseMenuError, DispatchError, StoreError};
pub use model::{
    AckMetadata, AlertEvent, AlertSource, Incident, Labels, RootMessage, ThreadRecord,
};
pub use report::{Step, StepFailure, StepFailures};
pub use store::{IncidentStore, InsertOutcome, MemoryStore};
#[cfg(feature = "postgres")]
pub use store::PgStore;

/// Source of the current time.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Wall clock.
#[must_use]
pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Clock frozen at `at`.
#[must_use]
pub fn fixed_clock(at: DateTime<Utc>) -> Clock {
    Arc::new(move || at)
}
