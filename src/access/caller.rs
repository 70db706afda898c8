//! Request extractors that authenticate the caller and check their capabilities.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use crate::{
    Error,
    access::{ApiTokens, Capabilities, RolePolicy},
};

/// The state needed to authenticate and authorize requests.
#[derive(Debug, Clone)]
pub struct AccessControl {
    policy: Arc<RolePolicy>,
    tokens: Arc<ApiTokens>,
}

impl AccessControl {
    /// Create the access control from the role `policy` and the issued `tokens`.
    pub fn new(policy: RolePolicy, tokens: ApiTokens) -> Self {
        Self {
            policy: Arc::new(policy),
            tokens: Arc::new(tokens),
        }
    }

    /// Identify the caller holding `token`.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::Unauthenticated] if `token` is not a configured token,
    /// - or [Error::InvalidRole] if the token's role is not in the policy.
    pub fn authenticate(&self, token: &str) -> Result<Caller, Error> {
        let role = self.tokens.role_for(token).ok_or(Error::Unauthenticated)?;
        let capabilities = self.policy.resolve_role(role)?;

        Ok(Caller {
            role: role.to_owned(),
            capabilities,
        })
    }
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Caller {
    /// The role the caller's token was issued for.
    pub role: String,
    /// What the role allows.
    pub capabilities: Capabilities,
}

impl Caller {
    /// # Errors
    /// Returns [Error::PermissionDenied] if the caller may not view data.
    pub fn require_view(&self) -> Result<(), Error> {
        if self.capabilities.can_view {
            Ok(())
        } else {
            tracing::warn!("Role \"{}\" tried to view without permission", self.role);
            Err(Error::PermissionDenied)
        }
    }

    /// # Errors
    /// Returns [Error::PermissionDenied] if the caller may not edit data.
    pub fn require_edit(&self) -> Result<(), Error> {
        if self.capabilities.can_edit {
            Ok(())
        } else {
            tracing::warn!("Role \"{}\" tried to edit without permission", self.role);
            Err(Error::PermissionDenied)
        }
    }
}

impl<S> FromRequestParts<S> for Caller
where
    AccessControl: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|rejection| {
                    tracing::debug!("Rejected request without a bearer token: {rejection}");
                    Error::Unauthenticated
                })?;

        AccessControl::from_ref(state).authenticate(bearer.token())
    }
}

/// A caller that may view data.
///
/// Extraction fails with a 403 response before the handler runs if the
/// caller's role lacks the view capability.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewer(pub Caller);

impl<S> FromRequestParts<S> for Viewer
where
    AccessControl: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let caller = Caller::from_request_parts(parts, state).await?;
        caller.require_view()?;

        Ok(Self(caller))
    }
}

/// A caller that may edit data.
///
/// Extraction fails with a 403 response before the request body is read if
/// the caller's role lacks the edit capability.
#[derive(Debug, Clone, PartialEq)]
pub struct Editor(pub Caller);

impl<S> FromRequestParts<S> for Editor
where
    AccessControl: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let caller = Caller::from_request_parts(parts, state).await?;
        caller.require_edit()?;

        Ok(Self(caller))
    }
}
