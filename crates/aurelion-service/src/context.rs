//! Request context carrying the authenticated owner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aurelion_core::types::UserId;

/// Context for the current authenticated request.
///
/// Built from verified bearer-token claims and passed into service methods
/// so that every operation knows *whose* files it is acting on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// The authenticated user's ID.
    pub user_id: UserId,
    /// Email claim, for logging.
    pub email: String,
    /// Display name claim.
    pub name: String,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a new request context.
    pub fn new(user_id: UserId, email: String, name: String) -> Self {
        Self {
            user_id,
            email,
            name,
            request_time: Utc::now(),
        }
    }

    /// A context for `user_id` with empty profile claims.
    pub fn for_user(user_id: UserId) -> Self {
        Self::new(user_id, String::new(), String::new())
    }
}
