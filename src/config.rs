//! Run configuration shared by every rank.

use crate::error::{Error, Result};
use crate::shift::{Exchange, ShiftOptions};

/// Parameters of one distributed shift run.
///
/// Every rank holds an identical copy, so validation fails (or succeeds) on
/// all ranks alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftConfig {
    /// Elements per rank.
    pub block_len: usize,
    /// Signed shift factor.
    pub shift: i64,
    /// Round-pairing strategy.
    pub exchange: Exchange,
    /// Reduce the shift modulo the global length.
    pub reduce_rounds: bool,
}

impl ShiftConfig {
    /// Literal-round, paired-exchange configuration.
    pub fn new(block_len: usize, shift: i64) -> Self {
        ShiftConfig {
            block_len,
            shift,
            exchange: Exchange::default(),
            reduce_rounds: false,
        }
    }

    /// Check the configuration before any rank starts.
    pub fn validate(&self) -> Result<()> {
        if self.block_len == 0 {
            return Err(Error::InvalidBlockLength(self.block_len));
        }
        Ok(())
    }

    /// Options handed to the shift engine.
    pub fn shift_options(&self) -> ShiftOptions {
        ShiftOptions {
            exchange: self.exchange,
            reduce_rounds: self.reduce_rounds,
        }
    }

    /// Length of the global array in a group of `size` ranks.
    pub fn global_len(&self, size: i32) -> usize {
        self.block_len * size.max(0) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_length_blocks_are_rejected() {
        assert_eq!(
            ShiftConfig::new(0, 3).validate(),
            Err(Error::InvalidBlockLength(0))
        );
        assert!(ShiftConfig::new(2, -3).validate().is_ok());
    }

    #[test]
    fn options_follow_config() {
        let config = ShiftConfig {
            exchange: Exchange::SeamOrdered,
            reduce_rounds: true,
            ..ShiftConfig::new(2, 5)
        };
        assert_eq!(
            config.shift_options(),
            ShiftOptions {
                exchange: Exchange::SeamOrdered,
                reduce_rounds: true,
            }
        );
        assert_eq!(config.global_len(4), 8);
    }
}
