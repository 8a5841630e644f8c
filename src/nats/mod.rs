pub mod client;
pub mod listener;

pub use client::{events_subject, functions_subject, PipelineClient};
pub use listener::spawn_pipeline_listener;
