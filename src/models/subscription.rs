use core::fmt;

use serde::{Deserialize, Serialize};

/// User id served by the sandbox/demo flows. Never hits the billing backend.
pub const MOCK_COMPANY_USER_ID: &str = "mock_company_id";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubscriptionTier {
    Free,
    Basic,
    Professional,
    Premium,
    Trial,
    Enterprise,
    AssessmentBundle,
    SingleAssessment,
    /// Anything the billing backend sends that we don't model, including the
    /// `<vendor>_premium` family. Kept verbatim so it round-trips through the cache.
    Other(String),
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Basic => "basic",
            SubscriptionTier::Professional => "professional",
            SubscriptionTier::Premium => "premium",
            SubscriptionTier::Trial => "trial",
            SubscriptionTier::Enterprise => "enterprise",
            SubscriptionTier::AssessmentBundle => "assessment_bundle",
            SubscriptionTier::SingleAssessment => "single_assessment",
            SubscriptionTier::Other(raw) => raw.as_str(),
        }
    }
}

impl From<&str> for SubscriptionTier {
    fn from(raw: &str) -> Self {
        match raw {
            "free" => SubscriptionTier::Free,
            "basic" => SubscriptionTier::Basic,
            "professional" => SubscriptionTier::Professional,
            "premium" => SubscriptionTier::Premium,
            "trial" => SubscriptionTier::Trial,
            "enterprise" => SubscriptionTier::Enterprise,
            "assessment_bundle" => SubscriptionTier::AssessmentBundle,
            "single_assessment" => SubscriptionTier::SingleAssessment,
            other => SubscriptionTier::Other(other.to_string()),
        }
    }
}

impl From<String> for SubscriptionTier {
    fn from(raw: String) -> Self {
        SubscriptionTier::from(raw.as_str())
    }
}

impl From<SubscriptionTier> for String {
    fn from(tier: SubscriptionTier) -> Self {
        tier.as_str().to_string()
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of a user's plan as reported by the billing backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    pub tier: SubscriptionTier,
    #[serde(default)]
    pub tier_name: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_period_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_until_renewal: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canceled_at: Option<String>,
    #[serde(default)]
    pub assessments_available: i64,
    #[serde(default)]
    pub assessments_used: i64,
    #[serde(default)]
    pub job_postings_available: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe_subscription_id: Option<String>,
}

impl SubscriptionStatus {
    /// Fallback handed out whenever nothing better is known.
    pub fn free() -> Self {
        Self {
            tier: SubscriptionTier::Free,
            tier_name: "Free".into(),
            status: "inactive".into(),
            expires_at: None,
            current_period_start: None,
            days_until_renewal: None,
            canceled_at: None,
            assessments_available: 0,
            assessments_used: 0,
            job_postings_available: 0,
            stripe_subscription_id: None,
        }
    }

    /// Fixed status for [`MOCK_COMPANY_USER_ID`].
    pub fn mock_professional() -> Self {
        Self {
            tier: SubscriptionTier::Professional,
            tier_name: "Professional".into(),
            status: "active".into(),
            assessments_available: 10,
            assessments_used: 0,
            job_postings_available: 5,
            ..Self::free()
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case("active") || self.status.eq_ignore_ascii_case("trialing")
    }

    pub fn assessments_remaining(&self) -> i64 {
        (self.assessments_available - self.assessments_used).max(0)
    }
}

impl Default for SubscriptionStatus {
    fn default() -> Self {
        Self::free()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_billing_payload_with_missing_counters() {
        let status: SubscriptionStatus = serde_json::from_value(json!({
            "tier": "basic",
            "tierName": "Basic",
            "status": "active",
            "expiresAt": "2026-11-01T00:00:00Z",
            "daysUntilRenewal": 16,
            "stripeSubscriptionId": "sub_123"
        }))
        .unwrap();

        assert_eq!(status.tier, SubscriptionTier::Basic);
        assert_eq!(status.days_until_renewal, Some(16));
        assert_eq!(status.assessments_available, 0);
        assert_eq!(status.job_postings_available, 0);
        assert_eq!(status.stripe_subscription_id.as_deref(), Some("sub_123"));
        assert!(status.is_active());
    }

    #[test]
    fn unknown_tiers_survive_serialization() {
        let status: SubscriptionStatus = serde_json::from_value(json!({
            "tier": "acme_premium",
            "tierName": "Acme Premium",
            "status": "active"
        }))
        .unwrap();

        assert_eq!(status.tier, SubscriptionTier::Other("acme_premium".into()));
        let encoded = serde_json::to_value(&status).unwrap();
        assert_eq!(encoded["tier"], "acme_premium");
        assert_eq!(encoded["tierName"], "Acme Premium");
        assert!(encoded.get("expiresAt").is_none());
    }

    #[test]
    fn free_default_has_zeroed_usage() {
        let status = SubscriptionStatus::default();
        assert_eq!(status.tier, SubscriptionTier::Free);
        assert_eq!(status.status, "inactive");
        assert_eq!(status.assessments_available, 0);
        assert_eq!(status.assessments_used, 0);
        assert_eq!(status.job_postings_available, 0);
        assert!(!status.is_active());
    }

    #[test]
    fn remaining_assessments_never_negative() {
        let mut status = SubscriptionStatus::mock_professional();
        assert_eq!(status.assessments_remaining(), 10);
        status.assessments_used = 12;
        assert_eq!(status.assessments_remaining(), 0);
    }
}
