use argon2::{
    password_hash::{
        rand_core::OsRng,
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString
    },
    Argon2
};
use jsonwebtoken::{encode, decode, Header, Algorithm, EncodingKey, DecodingKey, Validation};
use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc, Duration};
use anyhow::{Result, Context};
use lazy_static::lazy_static;
use log::debug;

/// Sessions are valid for a week from issuance and are never revoked early.
pub const SESSION_TTL_DAYS: i64 = 7;

const BEARER_PREFIX: &str = "Bearer ";

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let algo = Argon2::default();
    let password_hash = algo
        .hash_password(password.as_bytes(), &salt)
        .context("Failed to hash password")?;
    Ok(password_hash.to_string())
}

pub fn verify_password(hash: &str, password: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash).context("Failed to parse password hash")?;
    let algo = Argon2::default();
    match algo.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false), // Incorrect password
        Err(e) => Err(e).context("Failed to verify password"),
    }
}

lazy_static! {
    // Stands in for the stored hash when the email is unknown, so both login
    // failures pay for one Argon2 verification.
    static ref DUMMY_HASH: String =
        hash_password("autofounder-dummy-credential").expect("Failed to hash dummy credential");
}

/// Checks a login attempt. `stored_hash` is `None` when no account matched;
/// the verifier still runs against a dummy hash and the answer is `false`.
pub fn verify_login(stored_hash: Option<&str>, password: &str) -> Result<bool> {
    match stored_hash {
        Some(hash) => verify_password(hash, password),
        None => {
            verify_password(&DUMMY_HASH, password)?;
            Ok(false)
        }
    }
}

/// The authenticated principal. Every data access is scoped by `user_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaim {
    pub user_id: i64,
    pub email: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Claims {
    user_id: i64,
    email: String,
    iat: i64,
    exp: i64,
}

/// Issues and checks HS256 session tokens with a key fixed at construction.
pub struct SessionAuthenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl SessionAuthenticator {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl: Duration::days(SESSION_TTL_DAYS),
        }
    }

    pub fn issue_token(&self, identity: &IdentityClaim) -> Result<String> {
        self.issue_token_at(identity, Utc::now())
    }

    pub fn issue_token_at(&self, identity: &IdentityClaim, issued_at: DateTime<Utc>) -> Result<String> {
        let expiration = issued_at
            .checked_add_signed(self.ttl)
            .context("Session expiry out of range")?;

        let claims = Claims {
            user_id: identity.user_id,
            email: identity.email.clone(),
            iat: issued_at.timestamp(),
            exp: expiration.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .context("Failed to create JWT")?;
        Ok(token)
    }

    /// Returns the identity carried by `token`, or `None` for any failure.
    /// Callers cannot tell a forged token from an expired one.
    pub fn verify_token(&self, token: &str) -> Option<IdentityClaim> {
        let token_data = match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => data,
            Err(err) => {
                debug!("Rejected session token: {}", err);
                return None;
            }
        };

        let claims = token_data.claims;
        if claims.user_id <= 0 || claims.email.is_empty() {
            debug!("Rejected session token: incomplete identity");
            return None;
        }

        Some(IdentityClaim {
            user_id: claims.user_id,
            email: claims.email,
        })
    }

    /// NoToken -> TokenPresent -> Authenticated | Rejected, collapsed to an Option.
    pub fn authenticate(&self, header: Option<&str>) -> Option<IdentityClaim> {
        extract_token(header).and_then(|token| self.verify_token(token))
    }
}

/// Pulls the token out of a `Bearer <token>` header value.
pub fn extract_token(header: Option<&str>) -> Option<&str> {
    header?
        .strip_prefix(BEARER_PREFIX)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn identity(user_id: i64) -> IdentityClaim {
        IdentityClaim {
            user_id,
            email: format!("founder{}@example.com", user_id),
        }
    }

    #[test]
    fn password_hash_verifies_and_is_salted() {
        let first = hash_password("correct horse battery").unwrap();
        let second = hash_password("correct horse battery").unwrap();

        assert_ne!(first, second);
        assert!(verify_password(&first, "correct horse battery").unwrap());
        assert!(verify_password(&second, "correct horse battery").unwrap());
    }

    #[test]
    fn wrong_password_is_false_not_error() {
        let hash = hash_password("hunter2hunter2").unwrap();
        assert!(!verify_password(&hash, "hunter3hunter3").unwrap());
    }

    #[test]
    fn garbage_hash_is_an_error() {
        assert!(verify_password("not-a-phc-string", "whatever").is_err());
    }

    #[test]
    fn unknown_account_never_verifies() {
        assert!(!verify_login(None, "autofounder-dummy-credential").unwrap());
        assert!(!verify_login(None, "anything at all").unwrap());
        assert!(PasswordHash::new(&DUMMY_HASH).is_ok());
    }

    #[test]
    fn known_account_checks_stored_hash() {
        let hash = hash_password("password123").unwrap();
        assert!(verify_login(Some(&hash), "password123").unwrap());
        assert!(!verify_login(Some(&hash), "password124").unwrap());
        assert!(verify_login(Some("not-a-phc-string"), "password123").is_err());
    }

    #[test]
    fn issued_token_round_trips() {
        let auth = SessionAuthenticator::new(b"test-secret");
        let token = auth.issue_token(&identity(42)).unwrap();
        assert_eq!(auth.verify_token(&token), Some(identity(42)));
    }

    #[test]
    fn token_within_window_is_accepted() {
        let auth = SessionAuthenticator::new(b"test-secret");
        let issued = Utc::now() - Duration::days(SESSION_TTL_DAYS - 1);
        let token = auth.issue_token_at(&identity(1), issued).unwrap();
        assert_eq!(auth.verify_token(&token), Some(identity(1)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let auth = SessionAuthenticator::new(b"test-secret");
        let issued = Utc::now() - Duration::days(SESSION_TTL_DAYS) - Duration::minutes(1);
        let token = auth.issue_token_at(&identity(1), issued).unwrap();
        assert_eq!(auth.verify_token(&token), None);
    }

    #[test]
    fn token_from_other_key_is_rejected() {
        let ours = SessionAuthenticator::new(b"test-secret");
        let theirs = SessionAuthenticator::new(b"another-secret");
        let token = theirs.issue_token(&identity(7)).unwrap();
        assert_eq!(ours.verify_token(&token), None);
    }

    #[test]
    fn swapped_payload_is_rejected() {
        let auth = SessionAuthenticator::new(b"test-secret");
        let victim = auth.issue_token(&identity(1)).unwrap();
        let attacker = auth.issue_token(&identity(2)).unwrap();

        let victim_parts: Vec<&str> = victim.split('.').collect();
        let attacker_parts: Vec<&str> = attacker.split('.').collect();
        let forged = format!("{}.{}.{}", victim_parts[0], attacker_parts[1], victim_parts[2]);

        assert_eq!(auth.verify_token(&forged), None);
    }

    #[test]
    fn malformed_token_is_rejected() {
        let auth = SessionAuthenticator::new(b"test-secret");
        assert_eq!(auth.verify_token(""), None);
        assert_eq!(auth.verify_token("abc123"), None);
        assert_eq!(auth.verify_token("a.b.c"), None);
    }

    #[test]
    fn non_positive_user_id_is_rejected() {
        let auth = SessionAuthenticator::new(b"test-secret");
        let token = auth.issue_token(&identity(0)).unwrap();
        assert_eq!(auth.verify_token(&token), None);
    }

    #[test]
    fn empty_email_is_rejected() {
        let auth = SessionAuthenticator::new(b"test-secret");
        let claim = IdentityClaim { user_id: 3, email: String::new() };
        let token = auth.issue_token(&claim).unwrap();
        assert_eq!(auth.verify_token(&token), None);
    }

    #[test]
    fn extract_token_requires_bearer_prefix() {
        assert_eq!(extract_token(Some("Bearer abc123")), Some("abc123"));
        assert_eq!(extract_token(Some("abc123")), None);
        assert_eq!(extract_token(Some("bearer abc123")), None);
        assert_eq!(extract_token(Some("Bearer ")), None);
        assert_eq!(extract_token(None), None);
    }

    #[test]
    fn authenticate_walks_header_to_identity() {
        let auth = SessionAuthenticator::new(b"test-secret");
        let token = auth.issue_token(&identity(9)).unwrap();
        let header = format!("Bearer {}", token);

        assert_eq!(auth.authenticate(Some(&header)), Some(identity(9)));
        assert_eq!(auth.authenticate(Some(&token)), None);
        assert_eq!(auth.authenticate(None), None);
    }

    #[test]
    fn concurrent_verification_keeps_claims_distinct() {
        let auth = Arc::new(SessionAuthenticator::new(b"test-secret"));
        let tokens: Vec<(i64, String)> = (1..=16)
            .map(|id| (id, auth.issue_token(&identity(id)).unwrap()))
            .collect();

        std::thread::scope(|scope| {
            for (id, token) in &tokens {
                let auth = Arc::clone(&auth);
                scope.spawn(move || {
                    assert_eq!(auth.verify_token(token), Some(identity(*id)));
                });
            }
        });
    }
}
