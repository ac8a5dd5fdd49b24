/*!
Credential digests and per-user salts.

The registry stores a derived digest in place of each password: the
base64 text of a SHA-256 over the user's salt followed by the password.
Checks recompute and compare; plaintext is never written anywhere.
*/
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::{distributions, Rng};
use sha2::{Digest, Sha256};

use crate::user::User;

/// Shortest password `SessionStore::sign_up()` will accept.
pub const MIN_PASSWORD_LEN: usize = 6;

const DEFAULT_SALT_LENGTH: usize = 16;
const DEFAULT_SALT_CHARS: &str =
"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Outcome of a credential check. `BadPassword` and `NoSuchUser` must
/// be collapsed into one indistinguishable failure before anything
/// user-facing sees them.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthResult {
    Ok,
    BadPassword,
    NoSuchUser,
}

pub struct Salter {
    salt_chars: Vec<char>,
    salt_length: usize,
}

impl Salter {
    pub fn new() -> Self {
        let salt_chars: Vec<char> = DEFAULT_SALT_CHARS.chars().collect();
        let salt_length = DEFAULT_SALT_LENGTH;

        Self { salt_chars, salt_length }
    }

    /// Set characters to use when generating user salt strings.
    ///
    /// Will quietly do nothing if `new_chars` has zero length.
    pub fn set_salt_chars(&mut self, new_chars: &str) {
        if !new_chars.is_empty() {
            self.salt_chars = new_chars.chars().collect();
        }
    }

    /// Set the length of salt strings to generate.
    ///
    /// Will quietly do nothing if set to zero.
    pub fn set_salt_length(&mut self, new_length: usize) {
        if new_length > 0 {
            self.salt_length = new_length;
        }
    }

    /// Generate a new user salt based on the current values of
    /// self.salt_chars and self.salt_length.
    pub fn generate_salt(&self) -> String {
        // self.salt_chars should never have zero length.
        let dist = distributions::Slice::new(&self.salt_chars).unwrap();
        let rng = rand::thread_rng();
        let new_salt: String = rng.sample_iter(&dist)
            .take(self.salt_length)
            .collect();
        new_salt
    }
}

impl Default for Salter {
    fn default() -> Self { Self::new() }
}

/// Derive the stored digest for `password` under `salt`.
pub fn derive_digest(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// Check `password` against the record a lookup produced, if any.
///
/// Takes the lookup result itself so both failure causes flow out of
/// one place and a caller can't forget to handle the missing-user case
/// separately from the bad-password case.
pub fn check_password(user: Option<&User>, password: &str) -> AuthResult {
    let user = match user {
        Some(u) => u,
        None => { return AuthResult::NoSuchUser; },
    };

    if derive_digest(password, &user.salt) == user.digest {
        AuthResult::Ok
    } else {
        AuthResult::BadPassword
    }
}
