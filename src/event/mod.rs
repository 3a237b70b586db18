// Event-driven architecture components
//
// This module provides the infrastructure for post-commit event
// communication between the scoring pipeline and the notification layer.

// Public API - what other modules can use
pub use bus::EventBus;
pub use events::PipelineEvent;

// Internal modules
mod bus;
mod events;
