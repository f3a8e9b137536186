//! Questionnaire flow: data model and the step state machine.
//!
//! DESIGN
//! ======
//! A session is a single immutable record. Every change goes through
//! [`Session::apply`], which takes an [`Event`] and returns the next record
//! (or a [`FlowError`] leaving the current one untouched). Remote calls are
//! not made here; the controller service applies a "begin" event, performs
//! the call, then applies the matching completion event.

pub mod model;
pub mod session;

pub use model::{Answer, FlowVariant, Gender, Question, UserData};
pub use session::{Event, FlowError, Pending, Session, Step};
