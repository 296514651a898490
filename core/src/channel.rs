//! Channel configuration for worker telemetry

/// Buffer configuration for the tick record channel (workers -> observer)
///
/// Workers publish with `try_send`; when the buffer is full records are
/// dropped instead of slowing the load down.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Tick record channel buffer size
    pub tick_buffer: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            tick_buffer: 10_000,
        }
    }
}

impl ChannelConfig {
    /// Create a channel config with a custom tick buffer size
    pub fn with_tick_buffer(mut self, size: usize) -> Self {
        self.tick_buffer = size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_config_default() {
        let config = ChannelConfig::default();
        assert_eq!(config.tick_buffer, 10_000);
    }

    #[test]
    fn test_channel_config_builder() {
        let config = ChannelConfig::default().with_tick_buffer(5000);
        assert_eq!(config.tick_buffer, 5000);

        let config = ChannelConfig::default().with_tick_buffer(0);
        assert_eq!(config.tick_buffer, 1);
    }
}
