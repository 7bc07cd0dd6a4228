//! Caller identity.

use tienda_core::UserId;

/// Resolves the signed-in user for the current request.
///
/// Session handling lives in the web layer; the storefront only asks who is
/// calling. A plain `Option<UserId>` works as a provider.
pub trait IdentityProvider {
    /// The signed-in user, or `None` for anonymous callers.
    fn current_user_id(&self) -> Option<UserId>;
}

impl IdentityProvider for Option<UserId> {
    fn current_user_id(&self) -> Option<UserId> {
        *self
    }
}

impl IdentityProvider for UserId {
    fn current_user_id(&self) -> Option<UserId> {
        Some(*self)
    }
}

impl<T: IdentityProvider + ?Sized> IdentityProvider for &T {
    fn current_user_id(&self) -> Option<UserId> {
        (**self).current_user_id()
    }
}
