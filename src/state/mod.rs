// State management module.
// Viewer state for the file being browsed.

pub mod viewer;

pub use viewer::{LoadingState, ViewerState};
