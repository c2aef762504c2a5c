//! Core pipeline logic shared by every surface.
//!
//! Nothing here performs I/O: the classifier and aggregator are pure
//! transformations over generation output, and the event type is the wire
//! record transports frame for delivery.

pub mod aggregator;
pub mod classifier;
pub mod event;
pub mod result;

pub use aggregator::ResultAggregator;
pub use classifier::{ClassifierRules, Phase, StreamClassifier, SuppressReason, Verdict};
pub use event::{StepStatus, StreamEvent};
pub use result::{FallbackDefaults, StructuredResult};
