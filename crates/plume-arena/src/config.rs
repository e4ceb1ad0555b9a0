//! Arena configuration parameters.

use crate::error::ArenaError;
use crate::segment::Segment;

/// Configuration for the segment arena.
///
/// Controls block sizing and the growth limit. Validated when the arena
/// is created.
#[derive(Clone, Debug, PartialEq)]
pub struct ArenaConfig {
    /// Size of each block in bytes.
    ///
    /// Default: 64 000. Converted to a whole number of segment records,
    /// so it must be at least one record wide.
    pub block_bytes: usize,

    /// Maximum number of blocks per pool.
    ///
    /// Default: 65 536, about 4 GB of segments at the default block size.
    pub max_blocks: u32,
}

impl ArenaConfig {
    /// Default block size in bytes.
    pub const DEFAULT_BLOCK_BYTES: usize = 64_000;

    /// Default maximum block count per pool.
    pub const DEFAULT_MAX_BLOCKS: u32 = 65_536;

    /// Segment records that fit in one block.
    pub fn block_len(&self) -> usize {
        self.block_bytes / std::mem::size_of::<Segment>()
    }

    /// Check that a block holds at least one record and at least one block
    /// may be allocated.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.block_len() == 0 {
            return Err(ArenaError::InvalidConfig {
                reason: format!(
                    "block_bytes {} is smaller than one segment ({} bytes)",
                    self.block_bytes,
                    std::mem::size_of::<Segment>()
                ),
            });
        }
        if self.max_blocks == 0 {
            return Err(ArenaError::InvalidConfig {
                reason: "max_blocks must be at least 1".into(),
            });
        }
        Ok(())
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            block_bytes: Self::DEFAULT_BLOCK_BYTES,
            max_blocks: Self::DEFAULT_MAX_BLOCKS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_block_holds_many_segments() {
        let config = ArenaConfig::default();
        assert!(config.block_len() > 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn tiny_block_rejected() {
        let config = ArenaConfig {
            block_bytes: 4,
            ..ArenaConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ArenaError::InvalidConfig { .. })
        ));
    }
}
