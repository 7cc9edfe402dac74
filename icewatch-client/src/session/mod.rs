//! Screen-level sessions composed from the core services

pub mod map_session;
pub mod report_session;

pub use map_session::{Activation, MapSession, Marker};
pub use report_session::{PickOutcome, ReportSession};
