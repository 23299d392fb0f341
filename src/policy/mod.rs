//! Probability -> risk tier -> underwriting action.
//!
//! Pure and total over `[0, 100]`. Each tier's lower bound is inclusive:
//! exactly 5.0 is Moderate, exactly 20.0 is VeryHigh.

use serde::{Deserialize, Serialize};

use crate::domain::RiskTier;
use crate::error::RiskError;

/// Lower bounds (in percent) of the Moderate, High and VeryHigh tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub moderate: f64,
    pub high: f64,
    pub very_high: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            moderate: 5.0,
            high: 10.0,
            very_high: 20.0,
        }
    }
}

impl TierThresholds {
    pub fn new(moderate: f64, high: f64, very_high: f64) -> Result<Self, RiskError> {
        let all = [moderate, high, very_high];
        if !all.iter().all(|t| t.is_finite() && *t > 0.0 && *t <= 100.0) {
            return Err(RiskError::Config(format!(
                "tier thresholds must lie in (0, 100], got {moderate}, {high}, {very_high}"
            )));
        }
        if !(moderate < high && high < very_high) {
            return Err(RiskError::Config(format!(
                "tier thresholds must be strictly ascending, got {moderate}, {high}, {very_high}"
            )));
        }
        Ok(Self {
            moderate,
            high,
            very_high,
        })
    }

    /// Parse `"5,10,20"`.
    pub fn parse(raw: &str) -> Result<Self, RiskError> {
        let parts = raw
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<f64>()
                    .map_err(|e| RiskError::Config(format!("invalid tier threshold '{}': {e}", p.trim())))
            })
            .collect::<Result<Vec<_>, _>>()?;
        match parts.as_slice() {
            [m, h, v] => Self::new(*m, *h, *v),
            _ => Err(RiskError::Config(format!(
                "expected three comma-separated tier thresholds, got '{raw}'"
            ))),
        }
    }
}

/// A tier and the action bound to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskDecision {
    pub tier: RiskTier,
    pub action: &'static str,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RiskPolicy {
    thresholds: TierThresholds,
}

impl RiskPolicy {
    pub fn new(thresholds: TierThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> TierThresholds {
        self.thresholds
    }

    /// NaN compares false against every bound and lands in VeryHigh.
    pub fn tier_for(&self, probability: f64) -> RiskTier {
        let t = &self.thresholds;
        if probability < t.moderate {
            RiskTier::Low
        } else if probability < t.high {
            RiskTier::Moderate
        } else if probability < t.very_high {
            RiskTier::High
        } else {
            RiskTier::VeryHigh
        }
    }

    pub fn decide(&self, probability: f64) -> RiskDecision {
        let tier = self.tier_for(probability);
        RiskDecision {
            tier,
            action: tier.action(),
        }
    }

    /// Probability range `[lo, hi)` covered by a tier (VeryHigh includes 100).
    pub fn band(&self, tier: RiskTier) -> (f64, f64) {
        let t = &self.thresholds;
        match tier {
            RiskTier::Low => (0.0, t.moderate),
            RiskTier::Moderate => (t.moderate, t.high),
            RiskTier::High => (t.high, t.very_high),
            RiskTier::VeryHigh => (t.very_high, 100.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_are_exact() {
        let policy = RiskPolicy::default();
        let cases = [
            (0.0, RiskTier::Low),
            (4.999, RiskTier::Low),
            (5.0, RiskTier::Moderate),
            (9.999, RiskTier::Moderate),
            (10.0, RiskTier::High),
            (19.999, RiskTier::High),
            (20.0, RiskTier::VeryHigh),
            (100.0, RiskTier::VeryHigh),
        ];
        for (p, tier) in cases {
            assert_eq!(policy.tier_for(p), tier, "p = {p}");
        }
    }

    #[test]
    fn extremes_carry_their_actions() {
        let policy = RiskPolicy::default();
        assert_eq!(
            policy.decide(0.0),
            RiskDecision {
                tier: RiskTier::Low,
                action: "Standard premium"
            }
        );
        assert_eq!(policy.decide(100.0).action, "Manual underwriting review");
        assert_eq!(policy.decide(7.5).action, "Monitor customer");
        assert_eq!(policy.decide(12.0).action, "Higher premium");
    }

    #[test]
    fn nan_is_treated_as_very_high() {
        assert_eq!(RiskPolicy::default().tier_for(f64::NAN), RiskTier::VeryHigh);
    }

    #[test]
    fn thresholds_parse_and_validate() {
        let t = TierThresholds::parse(" 2, 4 ,8").unwrap();
        assert_eq!(t, TierThresholds::new(2.0, 4.0, 8.0).unwrap());
        assert!(TierThresholds::parse("5,10").is_err());
        assert!(TierThresholds::parse("10,5,20").is_err());
        assert!(TierThresholds::parse("5,10,abc").is_err());
        assert!(TierThresholds::new(0.0, 10.0, 20.0).is_err());
    }

    #[test]
    fn custom_thresholds_move_boundaries() {
        let policy = RiskPolicy::new(TierThresholds::new(2.0, 4.0, 8.0).unwrap());
        assert_eq!(policy.tier_for(3.0), RiskTier::Moderate);
        assert_eq!(policy.tier_for(8.0), RiskTier::VeryHigh);
        assert_eq!(policy.band(RiskTier::High), (4.0, 8.0));
    }
}
