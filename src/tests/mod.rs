mod pipeline;
pub mod support;
