//! Rate budget snapshots from `GET /rate_limit`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One quota bucket as reported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateBudget {
    /// Requests used in the current window.
    pub used: u32,
    /// Requests allowed per window.
    pub limit: u32,
    /// Requests left in the current window.
    pub remaining: u32,
    /// Unix timestamp at which the window resets.
    pub reset: i64,
}

impl RateBudget {
    /// The reset instant.
    pub fn reset_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.reset, 0).unwrap_or_else(Utc::now)
    }

    /// Extract the core REST bucket from a full `/rate_limit` response.
    pub fn from_response(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        let response: RateLimitResponse = serde_json::from_value(value.clone())?;
        Ok(response.resources.core)
    }
}

#[derive(Deserialize)]
struct RateLimitResponse {
    resources: RateLimitResources,
}

#[derive(Deserialize)]
struct RateLimitResources {
    core: RateBudget,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_core_bucket() {
        let value = serde_json::json!({
            "resources": {
                "core": { "limit": 5000, "used": 1, "remaining": 4999, "reset": 1691591363 },
                "search": { "limit": 30, "used": 12, "remaining": 18, "reset": 1691591091 }
            },
            "rate": { "limit": 5000, "used": 1, "remaining": 4999, "reset": 1372700873 }
        });

        let budget = RateBudget::from_response(&value).unwrap();
        assert_eq!(budget.remaining, 4999);
        assert_eq!(budget.limit, 5000);
        assert_eq!(budget.reset_at().timestamp(), 1691591363);
    }

    #[test]
    fn missing_core_is_an_error() {
        let value = serde_json::json!({ "resources": {} });
        assert!(RateBudget::from_response(&value).is_err());
    }
}
