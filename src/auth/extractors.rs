//! Request guards. [`AuthUser`] authenticates the bearer token and resolves
//! the caller; [`EmployerUser`] and [`CandidateUser`] add a role check on top.
//! A failing guard rejects the request before the handler body runs.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use serde::Serialize;
use tracing::warn;

use super::jwt::JwtKeys;
use crate::{
    db::{
        models::{Role, User},
        object_id::ObjectId,
        Database,
    },
    error::ApiError,
};

pub const NO_TOKEN: &str = "Not authorized, no token";
/// Shared by every verification and lookup failure so callers can't tell them apart.
pub const TOKEN_FAILED: &str = "Not authorized, token failed";

/// Authenticated caller; never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<User> for Identity {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role,
        }
    }
}

/// Token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::unauthenticated(NO_TOKEN))
}

pub fn authorize(identity: &Identity, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&identity.role) {
        Ok(())
    } else {
        warn!(user_id = %identity.id, role = %identity.role, "role not allowed");
        Err(ApiError::forbidden(format!(
            "User role {} is not authorized to access this route",
            identity.role
        )))
    }
}

async fn authenticate<S>(parts: &mut Parts, state: &S) -> Result<Identity, ApiError>
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
    Database: FromRef<S>,
{
    if let Some(identity) = parts.extensions.get::<Identity>() {
        return Ok(identity.clone());
    }

    let token = bearer_token(&parts.headers)?;
    let keys = JwtKeys::from_ref(state);
    let claims = keys.verify_access(token).map_err(|e| {
        warn!(error = %e, "token rejected");
        ApiError::unauthenticated(TOKEN_FAILED)
    })?;

    let db = Database::from_ref(state);
    let user = db
        .find_user_by_id(claims.sub.as_str())
        .await?
        .ok_or_else(|| {
            warn!(user_id = %claims.sub, "token subject no longer exists");
            ApiError::unauthenticated(TOKEN_FAILED)
        })?;

    let identity = Identity::from(user);
    parts.extensions.insert(identity.clone());
    Ok(identity)
}

/// Any authenticated user.
pub struct AuthUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
    Database: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await.map(AuthUser)
    }
}

/// Authenticated user with the `employer` role.
pub struct EmployerUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for EmployerUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
    Database: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = authenticate(parts, state).await?;
        authorize(&identity, &[Role::Employer])?;
        Ok(EmployerUser(identity))
    }
}

/// Authenticated user with the `candidate` role.
pub struct CandidateUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for CandidateUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
    Database: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = authenticate(parts, state).await?;
        authorize(&identity, &[Role::Candidate])?;
        Ok(CandidateUser(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use axum::http::{HeaderValue, Request, StatusCode};

    #[derive(Clone)]
    struct TestState {
        keys: JwtKeys,
        db: Database,
    }

    impl FromRef<TestState> for JwtKeys {
        fn from_ref(s: &TestState) -> Self {
            s.keys.clone()
        }
    }

    impl FromRef<TestState> for Database {
        fn from_ref(s: &TestState) -> Self {
            s.db.clone()
        }
    }

    fn state() -> TestState {
        TestState {
            keys: JwtKeys::from(&JwtConfig {
                secret: "test-secret".into(),
                issuer: "iss".into(),
                audience: "aud".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            }),
            db: Database::ephemeral(),
        }
    }

    fn parts_with(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(v) = auth {
            builder = builder.header(AUTHORIZATION, v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn message(err: &ApiError) -> String {
        err.to_string()
    }

    #[test]
    fn bearer_token_requires_scheme() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_err());
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(bearer_token(&headers).is_err());
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(bearer_token(&headers).is_err());
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn authorize_names_the_rejected_role() {
        let identity = Identity {
            id: ObjectId::new(),
            name: "Carol".into(),
            email: "carol@example.com".into(),
            role: Role::Candidate,
        };
        assert!(authorize(&identity, &[Role::Candidate]).is_ok());
        let err = authorize(&identity, &[Role::Employer]).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert!(message(&err).contains("candidate"));
    }

    #[tokio::test]
    async fn missing_header_is_unauthenticated() {
        let st = state();
        let mut parts = parts_with(None);
        let err = AuthUser::from_request_parts(&mut parts, &st).await.err().unwrap();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(message(&err), NO_TOKEN);
    }

    #[tokio::test]
    async fn garbage_token_is_unauthenticated() {
        let st = state();
        let mut parts = parts_with(Some("Bearer not-a-jwt"));
        let err = AuthUser::from_request_parts(&mut parts, &st).await.err().unwrap();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(message(&err), TOKEN_FAILED);
    }

    #[tokio::test]
    async fn valid_token_for_unknown_user_is_unauthenticated() {
        let st = state();
        let token = st.keys.sign_access(&ObjectId::new()).unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {token}")));
        let err = AuthUser::from_request_parts(&mut parts, &st).await.err().unwrap();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(message(&err), TOKEN_FAILED);
    }

    #[tokio::test]
    async fn refresh_token_is_not_accepted_for_requests() {
        let st = state();
        let user = st
            .db
            .create_user("Erin", "erin@corp.io", "hash", Role::Employer)
            .await
            .unwrap();
        let token = st.keys.sign_refresh(&user.id).unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {token}")));
        assert!(AuthUser::from_request_parts(&mut parts, &st).await.is_err());
    }

    #[tokio::test]
    async fn resolves_identity_and_checks_role() {
        let st = state();
        let user = st
            .db
            .create_user("Carol", "carol@example.com", "hash", Role::Candidate)
            .await
            .unwrap();
        let header = format!("Bearer {}", st.keys.sign_access(&user.id).unwrap());

        let mut parts = parts_with(Some(&header));
        let AuthUser(identity) = AuthUser::from_request_parts(&mut parts, &st).await.ok().unwrap();
        assert_eq!(identity.id, user.id);
        assert_eq!(identity.role, Role::Candidate);

        let mut parts = parts_with(Some(&header));
        let CandidateUser(identity) = CandidateUser::from_request_parts(&mut parts, &st)
            .await
            .ok()
            .unwrap();
        assert_eq!(identity.email, "carol@example.com");

        let mut parts = parts_with(Some(&header));
        let err = EmployerUser::from_request_parts(&mut parts, &st).await.err().unwrap();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            message(&err),
            "User role candidate is not authorized to access this route"
        );
    }
}
