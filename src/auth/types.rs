//! Authentication identity types.

use crate::db::AccountProfile;
use crate::jwt::Claims;

/// Identity resolved by the authentication middleware and handed to handlers.
/// The profile is loaded without password hash or refresh token.
#[derive(Debug, Clone)]
pub struct AuthenticatedAccount {
    /// JWT claims from the access token
    pub claims: Claims,
    /// Account projection loaded from the store
    pub account: AccountProfile,
}
