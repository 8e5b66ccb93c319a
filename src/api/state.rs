//! Application state for the API server

use crate::CourseSync;

/// Shared state handed to every route handler
///
/// Cloned per request; [`CourseSync`] is a bundle of shared handles.
#[derive(Clone)]
pub struct AppState {
    /// The sync host
    pub sync: CourseSync,
}

impl AppState {
    /// Create a new AppState
    pub fn new(sync: CourseSync) -> Self {
        Self { sync }
    }
}
