//! Diff types for converging a child calendar onto its desired set.

mod child_diff;
mod diff_kind;
mod event_diff;

pub use child_diff::ChildDiff;
pub use diff_kind::DiffKind;
pub use event_diff::EventDiff;
