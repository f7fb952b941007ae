use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    /// Expiry, in seconds since the Unix epoch.
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnauthorizedError {
    #[error("missing authorization header")]
    MissingHeader,
    #[error("authorization header is not a bearer token")]
    MalformedHeader,
    #[error("invalid access token: {0}")]
    InvalidToken(String),
    #[error("access token expired at {exp}")]
    Expired { exp: i64 },
}

/// Checks a token's signature and returns its claims. Expiry is checked
/// separately by `decode_access_token`.
pub trait AccessTokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<AccessTokenClaims, UnauthorizedError>;
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(authorization: Option<&str>) -> Result<&str, UnauthorizedError> {
    let header = authorization.ok_or(UnauthorizedError::MissingHeader)?;
    let (scheme, token) = header
        .trim()
        .split_once(' ')
        .ok_or(UnauthorizedError::MalformedHeader)?;

    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(UnauthorizedError::MalformedHeader);
    }
    Ok(token)
}

pub fn decode_access_token(
    verifier: &dyn AccessTokenVerifier,
    authorization: Option<&str>,
    now: DateTime<Utc>,
) -> Result<AccessTokenClaims, UnauthorizedError> {
    let token = bearer_token(authorization)?;
    let claims = verifier.verify(token)?;

    if claims.exp <= now.timestamp() {
        return Err(UnauthorizedError::Expired { exp: claims.exp });
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SingleToken;

    impl AccessTokenVerifier for SingleToken {
        fn verify(&self, token: &str) -> Result<AccessTokenClaims, UnauthorizedError> {
            match token {
                "valid" => Ok(AccessTokenClaims {
                    sub: "3f1c".to_string(),
                    email: "jane@example.gouv.fr".to_string(),
                    organization: Some("DINUM".to_string()),
                    exp: 2_000_000_000,
                }),
                _ => Err(UnauthorizedError::InvalidToken("bad signature".to_string())),
            }
        }
    }

    fn at(timestamp: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(timestamp, 0).unwrap()
    }

    #[test]
    fn parses_bearer_header() {
        assert_eq!(bearer_token(Some("Bearer abc.def")), Ok("abc.def"));
        assert_eq!(bearer_token(Some("bearer  abc ")), Ok("abc"));
        assert_eq!(bearer_token(None), Err(UnauthorizedError::MissingHeader));
        assert_eq!(
            bearer_token(Some("Basic dXNlcg==")),
            Err(UnauthorizedError::MalformedHeader)
        );
        assert_eq!(
            bearer_token(Some("Bearer")),
            Err(UnauthorizedError::MalformedHeader)
        );
    }

    #[test]
    fn decodes_valid_token() {
        let claims = decode_access_token(&SingleToken, Some("Bearer valid"), at(1_700_000_000))
            .unwrap();
        assert_eq!(claims.email, "jane@example.gouv.fr");
    }

    #[test]
    fn rejects_expired_token() {
        assert_eq!(
            decode_access_token(&SingleToken, Some("Bearer valid"), at(2_000_000_000)),
            Err(UnauthorizedError::Expired { exp: 2_000_000_000 })
        );
    }

    #[test]
    fn rejects_unverified_token() {
        assert!(matches!(
            decode_access_token(&SingleToken, Some("Bearer forged"), at(0)),
            Err(UnauthorizedError::InvalidToken(_))
        ));
    }
}
