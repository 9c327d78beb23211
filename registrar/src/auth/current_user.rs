use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{debug, trace};

use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::session,
    errors::{Error, Result},
};

/// Extract user from a Bearer token in the Authorization header if present.
/// Returns:
/// - None: No Authorization header or not a Bearer token
/// - Some(Ok(user)): Valid session token found and verified
/// - Some(Err(error)): Bearer token present but invalid/expired
fn try_bearer_auth(parts: &Parts, config: &crate::config::Config) -> Option<Result<CurrentUser>> {
    let auth_header = parts.headers.get(axum::http::header::AUTHORIZATION)?;

    let auth_str = match auth_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid authorization header: {e}"),
            }));
        }
    };

    let token = auth_str.strip_prefix("Bearer ")?;

    Some(session::verify_session_token(token, config))
}

/// Extract user from the session cookie if present and valid.
/// Returns:
/// - None: No session cookie present
/// - Some(Ok(user)): Valid session token found and verified
/// - Some(Err(error)): Cookie header present but malformed
fn try_cookie_auth(parts: &Parts, config: &crate::config::Config) -> Option<Result<CurrentUser>> {
    let cookie_header = parts.headers.get(axum::http::header::COOKIE)?;

    let cookie_str = match cookie_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid cookie header: {e}"),
            }));
        }
    };
    let cookie_name = &config.auth.native.session.cookie_name;

    for cookie in cookie_str.split(';') {
        let cookie = cookie.trim();
        if let Some((name, value)) = cookie.split_once('=')
            && name == cookie_name
        {
            match session::verify_session_token(value, config) {
                Ok(user) => return Some(Ok(user)),
                Err(_) => {
                    // Invalid/expired token; expected for stale cookies, keep looking
                    continue;
                }
            }
        }
    }
    None
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        // Bearer token first (API clients), then the browser session cookie.
        // A request with an invalid Bearer token but a valid cookie still
        // authenticates.
        match try_bearer_auth(parts, &state.config) {
            Some(Ok(user)) => {
                debug!("Found bearer-token authenticated user: {}", user.id);
                return Ok(user);
            }
            Some(Err(e)) => {
                trace!("Bearer token authentication failed: {:?}", e);
            }
            None => {
                trace!("No bearer token authentication attempted");
            }
        }

        match try_cookie_auth(parts, &state.config) {
            Some(Ok(user)) => {
                debug!("Found session-cookie authenticated user: {}", user.id);
                return Ok(user);
            }
            Some(Err(e)) => {
                trace!("Session cookie authentication failed: {:?}", e);
            }
            None => {
                trace!("No session cookie authentication attempted");
            }
        }

        Err(Error::Unauthenticated { message: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;
    use crate::auth::session::create_session_token;
    use uuid::Uuid;

    fn test_config() -> crate::config::Config {
        crate::config::Config {
            secret_key: Some("test-secret-key-for-testing-only".to_string()),
            ..Default::default()
        }
    }

    fn test_user() -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            username: "bursar1".to_string(),
            email: "bursar1@example.com".to_string(),
            role: Role::Bursar,
            is_admin: false,
        }
    }

    fn parts_with_header(name: &str, value: &str) -> Parts {
        let request = axum::http::Request::builder()
            .uri("http://localhost/test")
            .header(name, value)
            .body(())
            .unwrap();
        let (parts, _body) = request.into_parts();
        parts
    }

    #[test]
    fn bearer_token_round_trip() {
        let config = test_config();
        let user = test_user();
        let token = create_session_token(&user, &config).unwrap();

        let parts = parts_with_header("authorization", &format!("Bearer {token}"));
        let extracted = try_bearer_auth(&parts, &config).unwrap().unwrap();
        assert_eq!(extracted.id, user.id);
        assert_eq!(extracted.role, Role::Bursar);
    }

    #[test]
    fn cookie_round_trip() {
        let config = test_config();
        let user = test_user();
        let token = create_session_token(&user, &config).unwrap();

        let cookie = format!("{}={token}; other=1", config.auth.native.session.cookie_name);
        let parts = parts_with_header("cookie", &cookie);
        let extracted = try_cookie_auth(&parts, &config).unwrap().unwrap();
        assert_eq!(extracted.id, user.id);
    }

    #[test]
    fn missing_credentials_yield_none() {
        let config = test_config();
        let request = axum::http::Request::builder().uri("http://localhost/test").body(()).unwrap();
        let (parts, _body) = request.into_parts();

        assert!(try_bearer_auth(&parts, &config).is_none());
        assert!(try_cookie_auth(&parts, &config).is_none());
    }

    #[test]
    fn garbage_bearer_token_is_an_error() {
        let config = test_config();
        let parts = parts_with_header("authorization", "Bearer not.a.token");
        let result = try_bearer_auth(&parts, &config).unwrap();
        assert!(result.is_err());
    }
}
