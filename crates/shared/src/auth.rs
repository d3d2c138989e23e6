//! Identity claims carried by bearer tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CompanyId, UserId};

/// JWT claims for access tokens.
///
/// This is everything the identity provider vouches for: who the caller is,
/// which company they act in, and the role they held when the token was issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: UserId,
    /// Company the user belongs to.
    pub company: CompanyId,
    /// User's role at issue time.
    pub role: String,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a user.
    #[must_use]
    pub fn new(
        user_id: UserId,
        company_id: CompanyId,
        role: &str,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub: user_id,
            company: company_id,
            role: role.to_string(),
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the user ID from claims.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.sub
    }

    /// Returns the company ID from claims.
    #[must_use]
    pub const fn company_id(&self) -> CompanyId {
        self.company
    }
}
