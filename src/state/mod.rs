/// State management module
///
/// This module handles all application state, including:
/// - Share records as they come from the store (data.rs)
/// - Workflow phases and photo grouping (phases.rs)
/// - The sign-off state machine (signoff.rs)

pub mod data;
pub mod phases;
pub mod signoff;
