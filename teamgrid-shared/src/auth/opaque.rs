/// Opaque token generation and salted hashing
///
/// Invitation tokens and refresh-token secrets are random alphanumeric
/// strings from a CSPRNG. Predictability or collision here directly
/// compromises a tenant boundary, so the key space is kept large
/// (62^48 for invites) and the generator is `rand::thread_rng()`.
///
/// Refresh secrets are stored as `salt$sha256(salt || secret)` in hex, so a
/// leaked table never yields usable credentials.
///
/// # Example
///
/// ```
/// use teamgrid_shared::auth::opaque::{generate_token, salted_hash, verify_salted_hash, INVITE_TOKEN_LENGTH};
///
/// let token = generate_token(INVITE_TOKEN_LENGTH);
/// assert_eq!(token.len(), INVITE_TOKEN_LENGTH);
///
/// let stored = salted_hash(&token);
/// assert!(verify_salted_hash(&token, &stored));
/// assert!(!verify_salted_hash("something-else", &stored));
/// ```

use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of invitation tokens (characters)
pub const INVITE_TOKEN_LENGTH: usize = 48;

/// Length of refresh-token secrets (characters)
pub const REFRESH_SECRET_LENGTH: usize = 48;

/// Length of the random salt prepended to stored hashes (characters)
const SALT_LENGTH: usize = 16;

/// Generates a random alphanumeric token
///
/// Uses base62 (A-Z, a-z, 0-9) so tokens are URL-safe and can travel in
/// invitation links without encoding.
pub fn generate_token(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Hashes a secret with a fresh random salt
///
/// Output form: `{salt}${hex(sha256(salt || secret))}`.
pub fn salted_hash(secret: &str) -> String {
    let salt = generate_token(SALT_LENGTH);
    format!("{}${}", salt, digest_hex(&salt, secret))
}

/// Verifies a secret against a stored salted hash
///
/// Malformed stored values verify as false rather than erroring.
pub fn verify_salted_hash(secret: &str, stored: &str) -> bool {
    let Some((salt, expected)) = stored.split_once('$') else {
        return false;
    };

    constant_time_eq(&digest_hex(salt, secret), expected)
}

fn digest_hex(salt: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(secret.as_bytes());
    let digest = hasher.finalize();

    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Constant-time string comparison to prevent timing attacks
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_token_shape() {
        let token = generate_token(INVITE_TOKEN_LENGTH);
        assert_eq!(token.len(), INVITE_TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generated_tokens_are_unique() {
        let tokens: HashSet<String> = (0..100).map(|_| generate_token(48)).collect();
        assert_eq!(tokens.len(), 100);
    }

    #[test]
    fn test_salted_hash_round_trip() {
        let stored = salted_hash("secret-value");
        assert!(verify_salted_hash("secret-value", &stored));
        assert!(!verify_salted_hash("other-value", &stored));
    }

    #[test]
    fn test_salted_hash_differs_per_call() {
        // Same secret, different salts, different stored forms.
        assert_ne!(salted_hash("secret"), salted_hash("secret"));
    }

    #[test]
    fn test_verify_rejects_malformed_stored_value() {
        assert!(!verify_salted_hash("secret", "no-dollar-separator"));
        assert!(!verify_salted_hash("secret", ""));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
    }
}
