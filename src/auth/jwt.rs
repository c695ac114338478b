use crate::models::Claims;
use jsonwebtoken::{DecodingKey, Validation, decode};

/// Tokens are issued by the HR identity service; this side only verifies them.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
pub mod testing {
    use std::time::{SystemTime, UNIX_EPOCH};

    use jsonwebtoken::{EncodingKey, Header, encode};
    use uuid::Uuid;

    use crate::model::role::Role;
    use crate::models::{Claims, TokenType};

    fn now() -> usize {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as usize
    }

    pub fn token(role: Role, employee_id: Option<&str>, token_type: TokenType, secret: &str) -> String {
        let claims = Claims {
            user_id: 7,
            sub: format!("{role}@company.com"),
            role: role as u8,
            exp: now() + 900,
            jti: Uuid::new_v4().to_string(),
            token_type,
            employee_id: employee_id.map(str::to_string),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    pub fn bearer(role: Role, employee_id: Option<&str>) -> (&'static str, String) {
        let token = token(role, employee_id, TokenType::Access, "test-secret");
        ("Authorization", format!("Bearer {token}"))
    }
}

#[cfg(test)]
mod tests {
    use super::testing::token;
    use super::*;
    use crate::model::role::Role;
    use crate::models::TokenType;

    #[test]
    fn verifies_own_tokens_and_rejects_foreign_ones() {
        let signed = token(Role::Hr, Some("EMP-1"), TokenType::Access, "secret-a");

        let claims = verify_token(&signed, "secret-a").unwrap();
        assert_eq!(claims.role, Role::Hr as u8);
        assert_eq!(claims.employee_id.as_deref(), Some("EMP-1"));

        assert!(verify_token(&signed, "secret-b").is_err());
        assert!(verify_token("not-a-token", "secret-a").is_err());
    }
}
