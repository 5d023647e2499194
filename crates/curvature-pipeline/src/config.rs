//! Pipeline configuration.

use curvature_core::RenderStyle;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Bound of the worker-to-foreground message channel. The worker blocks
    /// when it is full.
    pub channel_capacity: usize,
    /// How component expressions are rendered into records.
    pub render: RenderStyle,
    /// Emit the Christoffel section. The symbols are always computed.
    pub emit_christoffel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            render: RenderStyle::Plain,
            emit_christoffel: true,
        }
    }
}

impl PipelineConfig {
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn with_render(mut self, render: RenderStyle) -> Self {
        self.render = render;
        self
    }

    pub fn with_christoffel(mut self, emit: bool) -> Self {
        self.emit_christoffel = emit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_partial_json() {
        let config: PipelineConfig = serde_json::from_str(r#"{"render":"latex"}"#).unwrap();
        assert_eq!(config.render, RenderStyle::Latex);
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert!(config.emit_christoffel);
    }

    #[test]
    fn test_capacity_never_zero() {
        assert_eq!(PipelineConfig::default().with_channel_capacity(0).channel_capacity, 1);
    }
}
