//! Location permission gating.
//!
//! The session never attempts acquisition when the platform has denied
//! access to location. The check lives behind a trait so hosts with a real
//! permission model (mobile shells, sandboxed desktops) can inject theirs,
//! while plain deployments use [`AllowAll`].

use super::{BoxFuture, LocationFix, LocationSource};

/// Reports whether the host allows location access.
///
/// Queried on every tick: a grant that arrives while a session is active
/// takes effect on the next tick without a restart.
pub trait PermissionProvider: Send + Sync {
    /// Whether location access is currently granted.
    fn location_allowed(&self) -> bool;
}

/// Permission provider for platforms without a permission model.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl PermissionProvider for AllowAll {
    fn location_allowed(&self) -> bool {
        true
    }
}

/// Decorator that consults a [`PermissionProvider`] before acquisition.
///
/// When permission is denied the inner source is not touched at all - the
/// outcome is [`LocationFix::PermissionDenied`], reported rather than
/// fatal, and the session keeps ticking.
pub struct PermissionGated<S> {
    inner: S,
    provider: Box<dyn PermissionProvider>,
}

impl<S: LocationSource> PermissionGated<S> {
    /// Wrap `inner` with the given permission provider.
    pub fn new(inner: S, provider: Box<dyn PermissionProvider>) -> Self {
        Self { inner, provider }
    }
}

impl<S: LocationSource> LocationSource for PermissionGated<S> {
    fn acquire(&self) -> BoxFuture<'_, LocationFix> {
        Box::pin(async move {
            if !self.provider.location_allowed() {
                return LocationFix::PermissionDenied;
            }
            self.inner.acquire().await
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::location::tests::MockLocationSource;
    use crate::location::LocationSample;

    /// Permission provider that always denies.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct DenyAll;

    impl PermissionProvider for DenyAll {
        fn location_allowed(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_denied_short_circuits_inner_source() {
        let inner = MockLocationSource::always(LocationFix::Fix(LocationSample::new(1.0, 2.0)));
        let gated = PermissionGated::new(inner, Box::new(DenyAll));

        assert_eq!(gated.acquire().await, LocationFix::PermissionDenied);
        assert_eq!(gated.inner.calls(), 0, "Inner source must not be queried");
    }

    #[tokio::test]
    async fn test_allowed_passes_through() {
        let inner = MockLocationSource::always(LocationFix::NoFix);
        let gated = PermissionGated::new(inner, Box::new(AllowAll));

        assert_eq!(gated.acquire().await, LocationFix::NoFix);
        assert_eq!(gated.inner.calls(), 1);
    }
}
