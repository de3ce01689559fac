//! Vocabulary shared by leave, makeup, and transfer requests.

use crate::{
    core::status::RequestStatus,
    errors::{Error, Result},
};
use serde::{Deserialize, Serialize};

/// A reviewer's answer to a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    /// Accept the request
    Approve,
    /// Refuse the request
    Reject,
}

impl ReviewDecision {
    /// Status a request takes after this decision.
    #[must_use]
    pub const fn resulting_status(self) -> RequestStatus {
        match self {
            Self::Approve => RequestStatus::Approved,
            Self::Reject => RequestStatus::Rejected,
        }
    }
}

/// Filter for the `list_*_requests` functions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestFilter {
    /// Only requests of this member
    pub user_id: Option<String>,
    /// Only requests in this status
    pub status: Option<RequestStatus>,
}

/// How much of a per-course quota a member has used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaUsage {
    /// Pending plus approved requests
    pub used: u64,
    /// Allowed requests
    pub quota: i64,
    /// Requests still available
    pub remaining: u64,
}

impl QuotaUsage {
    /// Builds the usage from a count and the course quota.
    #[must_use]
    pub fn new(used: u64, quota: i64) -> Self {
        let allowed = u64::try_from(quota).unwrap_or(0);
        Self {
            used,
            quota,
            remaining: allowed.saturating_sub(used),
        }
    }

    /// Fails with [`Error::QuotaExceeded`] when nothing remains.
    pub fn ensure_available(self) -> Result<()> {
        if self.remaining == 0 {
            return Err(Error::QuotaExceeded {
                used: self.used,
                quota: self.quota,
            });
        }
        Ok(())
    }
}

/// Fails unless a request is still pending.
pub fn ensure_pending(status: &str) -> Result<()> {
    if status != RequestStatus::Pending.as_str() {
        return Err(Error::InvalidState {
            expected: RequestStatus::Pending.to_string(),
            actual: status.to_string(),
        });
    }
    Ok(())
}

/// Database values of the statuses that count against quotas.
#[must_use]
pub fn active_status_values() -> [&'static str; 2] {
    RequestStatus::ACTIVE.map(RequestStatus::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_usage() {
        let usage = QuotaUsage::new(1, 2);
        assert_eq!(usage.remaining, 1);
        assert!(usage.ensure_available().is_ok());

        let usage = QuotaUsage::new(2, 2);
        assert!(matches!(
            usage.ensure_available(),
            Err(Error::QuotaExceeded { used: 2, quota: 2 })
        ));

        // A zero or negative quota allows nothing
        assert_eq!(QuotaUsage::new(0, 0).remaining, 0);
        assert_eq!(QuotaUsage::new(0, -1).remaining, 0);
    }

    #[test]
    fn test_ensure_pending() {
        assert!(ensure_pending("pending").is_ok());
        assert!(matches!(
            ensure_pending("approved"),
            Err(Error::InvalidState { .. })
        ));
    }

    #[test]
    fn test_decision_status() {
        assert_eq!(
            ReviewDecision::Approve.resulting_status(),
            RequestStatus::Approved
        );
        assert_eq!(
            ReviewDecision::Reject.resulting_status(),
            RequestStatus::Rejected
        );
    }
}
