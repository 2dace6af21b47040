//! Orchestration of one reporting session: pull frames, detect, retain the latest
//! annotated frame, and hand validated reports to a store.
//!
//! The session is driven by discrete events (`start`, `tick`, `stop`, `submit`,
//! `reset`). Each is safe to call on every redraw of a presentation shell; calls that
//! do not apply to the current state leave it untouched.

pub mod session;

pub use session::{
    Progress, Session, SessionState, StartError, StreamEnd, SubmitError, TickOutcome,
};

pub mod prelude {
    pub use crate::session::{
        Progress, Session, SessionState, StartError, StreamEnd, SubmitError, TickOutcome,
    };
}
