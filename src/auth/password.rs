use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_use_phc_format_and_fresh_salts() {
        let first = hash_password("Tr1cky!pass").expect("hash");
        let second = hash_password("Tr1cky!pass").expect("hash");
        assert!(first.starts_with("$argon2"));
        assert_ne!(first, second);
        assert!(verify_password("Tr1cky!pass", &first).expect("verify"));
        assert!(verify_password("Tr1cky!pass", &second).expect("verify"));
    }

    #[test]
    fn mismatched_password_does_not_verify() {
        let hash = hash_password("Tr1cky!pass").expect("hash");
        assert!(!verify_password("tr1cky!pass", &hash).expect("verify"));
        assert!(!verify_password("", &hash).expect("verify"));
    }

    #[test]
    fn malformed_hash_is_an_error_not_a_mismatch() {
        assert!(verify_password("whatever", "plainly-not-a-hash").is_err());
    }
}
