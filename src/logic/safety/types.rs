//! Safety Tier Types
//!
//! CHỈ chứa types - không có logic classify, không có rule constants.

use serde::{Deserialize, Serialize};

// ============================================================================
// SAFETY TIER
// ============================================================================

/// Tier quyết định hành động nào được phép với một process.
///
/// Totally ordered: Safe < Caution < Critical. Gating compares tiers, so the
/// derive order here is load-bearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SafetyTier {
    Safe,
    Caution,
    Critical,
}

impl SafetyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyTier::Safe => "Safe",
            SafetyTier::Caution => "Caution",
            SafetyTier::Critical => "Critical",
        }
    }
}

// ============================================================================
// VERDICT
// ============================================================================

/// Kết quả phân loại: tier + giải thích impact khi kill.
/// Computed fresh per record per cycle, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SafetyVerdict {
    pub tier: SafetyTier,
    /// What terminating this process would do, in user-facing terms
    pub impact: String,
    /// Which rule produced the tier (for explainability)
    pub rule: &'static str,
}

impl SafetyVerdict {
    pub fn new(tier: SafetyTier, impact: impl Into<String>, rule: &'static str) -> Self {
        Self { tier, impact: impact.into(), rule }
    }

    /// Monotone merge: tiers never downgrade within one evaluation.
    /// Keeps the explanation of whichever rule set the highest tier first.
    pub fn raise_to(&mut self, other: SafetyVerdict) {
        if other.tier > self.tier {
            *self = other;
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
