use crate::models::subscription::{SubscriptionStatus, SubscriptionTier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeTier {
    Free,
    Basic,
    Professional,
    Premium,
    Trial,
    Enterprise,
    AssessmentBundle,
    SingleAssessment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierBadge {
    pub tier: BadgeTier,
    pub label: &'static str,
    pub color: &'static str,
}

impl BadgeTier {
    /// Collapses the `<vendor>_premium` family into `premium`. Unknown tiers
    /// are shown with the free style.
    pub fn from_raw(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        if normalized != "premium" && normalized.ends_with("_premium") {
            return Self::Premium;
        }

        match SubscriptionTier::from(normalized.as_str()) {
            SubscriptionTier::Free => Self::Free,
            SubscriptionTier::Basic => Self::Basic,
            SubscriptionTier::Professional => Self::Professional,
            SubscriptionTier::Premium => Self::Premium,
            SubscriptionTier::Trial => Self::Trial,
            SubscriptionTier::Enterprise => Self::Enterprise,
            SubscriptionTier::AssessmentBundle => Self::AssessmentBundle,
            SubscriptionTier::SingleAssessment => Self::SingleAssessment,
            SubscriptionTier::Other(_) => Self::Free,
        }
    }

    pub fn badge(self) -> TierBadge {
        let (label, color) = match self {
            BadgeTier::Free => ("Free", "slate"),
            BadgeTier::Basic => ("Basic", "blue"),
            BadgeTier::Professional => ("Professional", "indigo"),
            BadgeTier::Premium => ("Premium", "amber"),
            BadgeTier::Trial => ("Trial", "emerald"),
            BadgeTier::Enterprise => ("Enterprise", "purple"),
            BadgeTier::AssessmentBundle => ("Assessment Bundle", "cyan"),
            BadgeTier::SingleAssessment => ("Single Assessment", "teal"),
        };
        TierBadge {
            tier: self,
            label,
            color,
        }
    }
}

pub fn badge_for_tier(raw: &str) -> TierBadge {
    BadgeTier::from_raw(raw).badge()
}

/// `None` while the status is still loading; the badge renders nothing.
pub fn badge_for_status(status: Option<&SubscriptionStatus>) -> Option<TierBadge> {
    status.map(|status| badge_for_tier(status.tier.as_str()))
}
