//! Domain logic - pure release rules independent of git operations

pub mod note;
pub mod version;

pub use note::build_note;
pub use version::{next_version, INITIAL_TAG};
