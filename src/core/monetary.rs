//! Monetary units for the gossip chain
//!
//! Amounts travel on the wire as integer base units so that every node
//! hashes exactly the same bytes. One coin is 100,000,000 base units.
//!
//! ## Units
//! - **Unit**: the smallest indivisible amount
//! - **Coin**: 100,000,000 units
//! - **Block Reward**: 50 coins, fixed for every block (no halving)

/// Number of base units in one coin
pub const UNITS_PER_COIN: u64 = 100_000_000;

/// Fixed coinbase reward carried by every mined block (50 coins)
pub const BLOCK_REWARD: u64 = 50 * UNITS_PER_COIN;

/// Utility functions for monetary conversions
pub mod conversions {
    use super::*;

    /// Convert a user-entered coin amount to base units
    ///
    /// Returns `None` for non-finite, non-positive or overflowing input.
    ///
    /// # Examples
    /// ```
    /// use gossip_chain::core::monetary::conversions::coins_to_units;
    /// assert_eq!(coins_to_units(1.0), Some(100_000_000));
    /// assert_eq!(coins_to_units(-2.0), None);
    /// ```
    pub fn coins_to_units(coins: f64) -> Option<u64> {
        if !coins.is_finite() || coins <= 0.0 {
            return None;
        }
        let units = (coins * UNITS_PER_COIN as f64).round();
        if units < 1.0 || units > u64::MAX as f64 {
            return None;
        }
        Some(units as u64)
    }

    /// Convert base units to coins
    pub fn units_to_coins(units: u64) -> f64 {
        units as f64 / UNITS_PER_COIN as f64
    }

    /// Format base units as a human-readable string
    ///
    /// # Examples
    /// ```
    /// use gossip_chain::core::monetary::conversions::format_units;
    /// assert_eq!(format_units(100_000_000), "1.00000000 coins");
    /// ```
    pub fn format_units(units: u64) -> String {
        format!("{:.8} coins", units_to_coins(units))
    }
}
