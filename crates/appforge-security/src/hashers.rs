//! Password hashing for appforge.
//!
//! Two backends: [`Argon2Hasher`] (primary, used for all new passwords) and
//! [`Pbkdf2Hasher`] (PBKDF2-HMAC-SHA256, verification of legacy hashes). All
//! hashing operations are async, delegating CPU-bound work to
//! `tokio::task::spawn_blocking` to avoid blocking the async runtime.

use async_trait::async_trait;
use appforge_core::error::{ForgeError, ForgeResult};

/// Marker prefix for unusable passwords (externally authenticated accounts).
const UNUSABLE_PASSWORD_PREFIX: &str = "!";

/// Trait for password hashing backends.
///
/// Implementations must be `Send + Sync`. Hashing and verification are async,
/// using `spawn_blocking` internally for the key derivation work.
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    /// Returns the algorithm identifier (e.g., "argon2", "`pbkdf2_sha256`").
    fn algorithm(&self) -> &str;

    /// Hashes a password and returns the encoded hash string.
    ///
    /// The returned string includes algorithm metadata so the hasher can
    /// be identified during verification.
    async fn hash(&self, password: &str) -> ForgeResult<String>;

    /// Verifies a password against an encoded hash.
    async fn verify(&self, password: &str, hash: &str) -> ForgeResult<bool>;
}

/// Argon2id password hasher (primary).
#[derive(Debug, Clone)]
pub struct Argon2Hasher;

#[async_trait]
impl PasswordHasher for Argon2Hasher {
    fn algorithm(&self) -> &'static str {
        "argon2"
    }

    async fn hash(&self, password: &str) -> ForgeResult<String> {
        let password = password.to_string();
        tokio::task::spawn_blocking(move || {
            use argon2::password_hash::{rand_core::OsRng, PasswordHasher as _, SaltString};
            use argon2::Argon2;

            let salt = SaltString::generate(&mut OsRng);
            let argon2 = Argon2::default();
            let hash = argon2
                .hash_password(password.as_bytes(), &salt)
                .map_err(|e| ForgeError::Hashing(format!("Argon2 hash error: {e}")))?;
            Ok(hash.to_string())
        })
        .await
        .map_err(|e| ForgeError::InternalServerError(format!("Task join error: {e}")))?
    }

    async fn verify(&self, password: &str, hash: &str) -> ForgeResult<bool> {
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || {
            use argon2::password_hash::PasswordHash;
            use argon2::password_hash::PasswordVerifier;
            use argon2::Argon2;

            let parsed_hash = PasswordHash::new(&hash)
                .map_err(|e| ForgeError::Hashing(format!("Invalid hash: {e}")))?;
            Ok(Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok())
        })
        .await
        .map_err(|e| ForgeError::InternalServerError(format!("Task join error: {e}")))?
    }
}

/// PBKDF2-HMAC-SHA256 password hasher (legacy hash verification).
#[derive(Debug, Clone)]
pub struct Pbkdf2Hasher {
    /// The number of PBKDF2 iterations (default: `600_000`).
    pub iterations: u32,
}

impl Default for Pbkdf2Hasher {
    fn default() -> Self {
        Self {
            iterations: 600_000,
        }
    }
}

#[async_trait]
impl PasswordHasher for Pbkdf2Hasher {
    fn algorithm(&self) -> &'static str {
        "pbkdf2_sha256"
    }

    async fn hash(&self, password: &str) -> ForgeResult<String> {
        let password = password.to_string();
        let iterations = self.iterations;
        tokio::task::spawn_blocking(move || {
            use base64::Engine;
            use hmac::Hmac;
            use rand::RngCore;
            use sha2::Sha256;

            let mut salt = [0u8; 16];
            rand::thread_rng().fill_bytes(&mut salt);
            let salt_b64 = base64::engine::general_purpose::STANDARD.encode(salt);

            let mut dk = [0u8; 32];
            pbkdf2_hmac::<Hmac<Sha256>>(password.as_bytes(), salt_b64.as_bytes(), iterations, &mut dk);
            let hash_b64 = base64::engine::general_purpose::STANDARD.encode(dk);

            // Format: algorithm$iterations$salt$hash
            Ok(format!("pbkdf2_sha256${iterations}${salt_b64}${hash_b64}"))
        })
        .await
        .map_err(|e| ForgeError::InternalServerError(format!("Task join error: {e}")))?
    }

    async fn verify(&self, password: &str, hash: &str) -> ForgeResult<bool> {
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || {
            use base64::Engine;
            use hmac::Hmac;
            use sha2::Sha256;

            let parts: Vec<&str> = hash.splitn(4, '$').collect();
            if parts.len() != 4 || parts[0] != "pbkdf2_sha256" {
                return Ok(false);
            }

            let iterations: u32 = parts[1]
                .parse()
                .map_err(|_| ForgeError::Hashing("Invalid iterations in hash".to_string()))?;
            let salt = parts[2];
            let stored_hash = parts[3];

            let mut dk = [0u8; 32];
            pbkdf2_hmac::<Hmac<Sha256>>(password.as_bytes(), salt.as_bytes(), iterations, &mut dk);
            let computed = base64::engine::general_purpose::STANDARD.encode(dk);

            Ok(constant_time_eq(computed.as_bytes(), stored_hash.as_bytes()))
        })
        .await
        .map_err(|e| ForgeError::InternalServerError(format!("Task join error: {e}")))?
    }
}

/// PBKDF2 key derivation over an HMAC.
fn pbkdf2_hmac<M: hmac::Mac + hmac::digest::KeyInit + Clone>(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    output: &mut [u8],
) {
    let dk_len = output.len();
    // Finalize a dummy MAC to learn the PRF output size.
    let dummy = <M as hmac::digest::KeyInit>::new_from_slice(password).expect("HMAC key init");
    let h_len = dummy.finalize().into_bytes().len();
    let blocks_needed = dk_len.div_ceil(h_len);

    for block_num in 1..=blocks_needed {
        let offset = (block_num - 1) * h_len;
        let end = std::cmp::min(offset + h_len, dk_len);

        // U_1 = PRF(password, salt || INT_32_BE(i))
        let mut mac =
            <M as hmac::digest::KeyInit>::new_from_slice(password).expect("HMAC key init");
        mac.update(salt);
        #[allow(clippy::cast_possible_truncation)]
        let block_idx = block_num as u32;
        mac.update(&block_idx.to_be_bytes());
        let u1 = mac.finalize().into_bytes();

        let mut result = u1.to_vec();
        let mut prev = u1;

        for _ in 1..iterations {
            let mut mac =
                <M as hmac::digest::KeyInit>::new_from_slice(password).expect("HMAC key init");
            mac.update(&prev);
            let u_i = mac.finalize().into_bytes();
            for (r, u) in result.iter_mut().zip(u_i.iter()) {
                *r ^= u;
            }
            prev = u_i;
        }

        output[offset..end].copy_from_slice(&result[..end - offset]);
    }
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Identifies the hasher for a given encoded hash.
fn identify_hasher(encoded: &str) -> Option<Box<dyn PasswordHasher>> {
    if encoded.starts_with("$argon2") {
        Some(Box::new(Argon2Hasher))
    } else if encoded.starts_with("pbkdf2_sha256$") {
        Some(Box::new(Pbkdf2Hasher::default()))
    } else {
        None
    }
}

/// Hashes a password using the preferred hasher (Argon2id).
pub async fn make_password(password: &str) -> ForgeResult<String> {
    Argon2Hasher.hash(password).await
}

/// Checks a password against an encoded hash.
///
/// Automatically identifies the hasher from the hash format. Returns `false`
/// for unusable password hashes.
pub async fn check_password(password: &str, hash: &str) -> ForgeResult<bool> {
    if !is_password_usable(hash) {
        return Ok(false);
    }

    let hasher = identify_hasher(hash).ok_or_else(|| {
        ForgeError::Hashing(format!(
            "Unknown password hashing algorithm for hash: {}",
            hash.chars().take(20).collect::<String>()
        ))
    })?;

    hasher.verify(password, hash).await
}

/// Returns `true` if the encoded hash represents a usable password.
///
/// Passwords prefixed with `!` (or empty) are unusable. Accounts
/// authenticated through LDAP, OpenID, or OAuth carry such hashes and cannot
/// log in with a password.
pub fn is_password_usable(hash: &str) -> bool {
    !hash.is_empty() && !hash.starts_with(UNUSABLE_PASSWORD_PREFIX)
}

/// Returns the hash marking an account as having no usable password.
pub fn unusable_password() -> String {
    UNUSABLE_PASSWORD_PREFIX.to_string()
}
