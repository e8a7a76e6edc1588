pub mod detector;
pub mod pipeline;
pub mod render;
pub mod store;

pub use pipeline::{CycleSummary, Pipeline, ProfileOutcome};
pub use render::Renderer;
pub use store::{FileStateStore, StateStore};
