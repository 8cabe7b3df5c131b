use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_RANK: i64 = 1;
pub const MAX_RANK: i64 = 20;

pub fn clamp_rank(rank: i64) -> u8 {
    rank.clamp(MIN_RANK, MAX_RANK) as u8
}

/// Coarse reporting tier; the engine's native threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PriorityTier {
    High,
    Medium,
    Low,
}

impl PriorityTier {
    /// Ranks 1-4 are high, 5-9 medium, 10-20 low. Out of range values are
    /// clamped first.
    pub fn from_rank(rank: i64) -> Self {
        match clamp_rank(rank) {
            1..=4 => PriorityTier::High,
            5..=9 => PriorityTier::Medium,
            _ => PriorityTier::Low,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            PriorityTier::High => "High",
            PriorityTier::Medium => "Medium",
            PriorityTier::Low => "Low",
        }
    }

    pub const fn as_number(self) -> u8 {
        match self {
            PriorityTier::High => 1,
            PriorityTier::Medium => 2,
            PriorityTier::Low => 3,
        }
    }

    /// Smallest rank belonging to the tier.
    pub const fn lowest_rank(self) -> u8 {
        match self {
            PriorityTier::High => 1,
            PriorityTier::Medium => 5,
            PriorityTier::Low => 10,
        }
    }
}

impl fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriorityTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "1" => Ok(PriorityTier::High),
            "medium" | "2" => Ok(PriorityTier::Medium),
            "low" | "3" => Ok(PriorityTier::Low),
            other => Err(format!(
                "invalid priority tier: {other} (expected high|medium|low)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_boundaries_are_exact() {
        assert_eq!(PriorityTier::from_rank(4), PriorityTier::High);
        assert_eq!(PriorityTier::from_rank(5), PriorityTier::Medium);
        assert_eq!(PriorityTier::from_rank(9), PriorityTier::Medium);
        assert_eq!(PriorityTier::from_rank(10), PriorityTier::Low);
        assert_eq!(PriorityTier::from_rank(20), PriorityTier::Low);
    }

    #[test]
    fn out_of_range_ranks_are_clamped() {
        assert_eq!(clamp_rank(0), 1);
        assert_eq!(clamp_rank(-7), 1);
        assert_eq!(clamp_rank(25), 20);
        assert_eq!(PriorityTier::from_rank(0), PriorityTier::High);
        assert_eq!(PriorityTier::from_rank(25), PriorityTier::Low);
    }

    #[test]
    fn parses_names_and_numbers() {
        assert_eq!("Medium".parse::<PriorityTier>(), Ok(PriorityTier::Medium));
        assert_eq!("3".parse::<PriorityTier>(), Ok(PriorityTier::Low));
        assert!("urgent".parse::<PriorityTier>().is_err());
    }
}
