use std::sync::Arc;

use warp::{reject::Rejection, Filter};

use crate::error::HtmlError;

use super::jwt::{verify_jwt_session, SessionData};

/// Extracts the token from `Token <jwt>` or `Bearer <jwt>`.
fn parse_authorization(header: &str) -> Option<&str> {
    let header = header.trim();
    let token = header
        .strip_prefix("Token ")
        .or_else(|| header.strip_prefix("Bearer "))?
        .trim();

    (!token.is_empty()).then_some(token)
}

pub fn with_session(
    secret: Arc<str>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let secret = secret.clone();
        async move {
            let token = header
                .as_deref()
                .and_then(parse_authorization)
                .ok_or_else(|| Rejection::from(HtmlError::Unauthorized.default()))?;

            verify_jwt_session(token, secret.as_bytes())
                .map(SessionData::from)
                .map_err(Rejection::from)
        }
    })
}

pub fn with_possible_session(
    secret: Arc<str>,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").map(move |header: Option<String>| {
        let token = header.as_deref().and_then(parse_authorization)?;

        match verify_jwt_session(token, secret.as_bytes()) {
            Ok(data) => Some(SessionData::from(data)),
            Err(e) => {
                log::debug!("> Ignoring session: {e}");
                None
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{jwt::generate_jwt_session, jwt::tests::user, schema::UserRole};

    fn secret() -> Arc<str> {
        Arc::from("secret")
    }

    #[test]
    fn parses_token_schemes() {
        assert_eq!(parse_authorization("Token abc"), Some("abc"));
        assert_eq!(parse_authorization("Bearer abc "), Some("abc"));
        assert_eq!(parse_authorization("Token "), None);
        assert_eq!(parse_authorization("Basic abc"), None);
    }

    #[tokio::test]
    async fn session_is_required() {
        let result = warp::test::request()
            .filter(&with_session(secret()))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn valid_token_yields_session() {
        let token = generate_jwt_session(&user(9, UserRole::Guest), b"secret", 1).unwrap();
        let session = warp::test::request()
            .header("authorization", format!("Token {token}"))
            .filter(&with_session(secret()))
            .await
            .unwrap();
        assert_eq!(session.user_id, 9);
    }

    #[tokio::test]
    async fn invalid_token_is_anonymous_when_optional() {
        let session = warp::test::request()
            .header("authorization", "Token forged")
            .filter(&with_possible_session(secret()))
            .await
            .unwrap();
        assert!(session.is_none());

        let session = warp::test::request()
            .filter(&with_possible_session(secret()))
            .await
            .unwrap();
        assert!(session.is_none());
    }
}
