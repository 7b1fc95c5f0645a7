//! Check-in quiz client: the remote service seam and the session controller
//! that drives identification, questions, feedback and summaries against it.

pub mod error;
pub mod service;
pub mod session;

pub use error::ServiceError;
pub use service::{CheckinService, HttpCheckinService, ServiceConfig};
pub use session::{
    Activity, OperationOutcome, RejectReason, SessionController, SessionEvent, SessionPhase,
    SessionSnapshot,
};
