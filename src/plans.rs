//! Subscription plans and their annual record quotas.

use crate::error::PlanError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A subscription plan. Ordered from most to least restricted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Basic,
    Pro,
    /// Filing-season pass; same quota as `Pro`.
    Season,
}

/// Where a user stands against their plan's quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quota {
    /// Another record may be added.
    Within { remaining: u32 },
    /// The yearly limit has been reached.
    Exhausted { limit: u32 },
    /// The plan has no limit.
    Unlimited,
}

impl Quota {
    pub fn allows_another(&self) -> bool {
        !matches!(self, Quota::Exhausted { .. })
    }
}

impl Plan {
    pub const ALL: [Plan; 4] = [Plan::Free, Plan::Basic, Plan::Pro, Plan::Season];

    /// Stable identifier used in storage and billing metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Basic => "basic",
            Plan::Pro => "pro",
            Plan::Season => "season",
        }
    }

    /// Display name shown to users.
    pub fn label(&self) -> &'static str {
        match self {
            Plan::Free => "無料",
            Plan::Basic => "ベーシック",
            Plan::Pro => "プロ",
            Plan::Season => "シーズンパス",
        }
    }

    /// Records allowed per year; `None` means unlimited.
    pub fn annual_record_limit(&self) -> Option<u32> {
        match self {
            Plan::Free => Some(10),
            Plan::Basic => Some(100),
            Plan::Pro | Plan::Season => None,
        }
    }

    /// Check `used` records (this year) against the quota.
    pub fn check_quota(&self, used: u32) -> Quota {
        match self.annual_record_limit() {
            None => Quota::Unlimited,
            Some(limit) if used >= limit => Quota::Exhausted { limit },
            Some(limit) => Quota::Within { remaining: limit - used },
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Plan::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| PlanError::Unknown(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_identifiers() {
        for plan in Plan::ALL {
            assert_eq!(plan.as_str().parse::<Plan>().unwrap(), plan);
        }
        assert_eq!("gold".parse::<Plan>(), Err(PlanError::Unknown("gold".into())));
        assert!("Free".parse::<Plan>().is_err());
    }

    #[test]
    fn quota_at_the_limit_is_exhausted() {
        assert_eq!(Plan::Free.check_quota(9), Quota::Within { remaining: 1 });
        assert_eq!(Plan::Free.check_quota(10), Quota::Exhausted { limit: 10 });
        assert_eq!(Plan::Free.check_quota(11), Quota::Exhausted { limit: 10 });
        assert!(!Plan::Free.check_quota(10).allows_another());
    }

    #[test]
    fn unlimited_plans_never_exhaust() {
        assert_eq!(Plan::Pro.check_quota(u32::MAX), Quota::Unlimited);
        assert!(Plan::Season.check_quota(1_000_000).allows_another());
    }

    #[test]
    fn serde_uses_lowercase_ids() {
        assert_eq!(serde_json::to_string(&Plan::Season).unwrap(), "\"season\"");
        let p: Plan = serde_json::from_str("\"basic\"").unwrap();
        assert_eq!(p, Plan::Basic);
    }
}
