use jsonwebtoken::{DecodingKey, Validation, decode};

use ridebuddy_types::api::Claims;

/// Decode and validate a session token (signature and expiry).
pub fn verify_token(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use uuid::Uuid;

    fn token(secret: &str, exp: i64) -> String {
        let claims = Claims {
            sub: Uuid::new_v4(),
            name: "Alice".into(),
            exp: exp as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn accepts_valid_token() {
        let exp = (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp();
        let claims = verify_token("s3cret", &token("s3cret", exp)).unwrap();
        assert_eq!(claims.name, "Alice");
    }

    #[test]
    fn rejects_wrong_secret_and_expired() {
        let exp = (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp();
        assert!(verify_token("other", &token("s3cret", exp)).is_none());

        let past = (chrono::Utc::now() - chrono::Duration::hours(1)).timestamp();
        assert!(verify_token("s3cret", &token("s3cret", past)).is_none());
        assert!(verify_token("s3cret", "not-a-jwt").is_none());
    }
}
