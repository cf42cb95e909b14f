use core::fmt::{self, Debug};

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use campus_directory_config::PasswordHashingConfig;
use campus_directory_database::models::PasswordHash;
use serde::Deserialize;

/// A plaintext password on its way to the hasher. Redacted in `Debug` and never serialized.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    #[must_use]
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(..)")
    }
}

impl From<&str> for Password {
    fn from(password: &str) -> Self {
        Self::new(password)
    }
}

pub trait CredentialHasher: Send + Sync {
    /// Salted hash in PHC string format.
    fn hash(&self, password: &Password) -> Result<PasswordHash, password_hash::Error>;

    fn verify(
        &self,
        password: &Password,
        hash: &PasswordHash,
    ) -> Result<bool, password_hash::Error>;
}

#[derive(Clone)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn from_config(config: &PasswordHashingConfig) -> Result<Self, argon2::Error> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl Debug for Argon2Hasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Argon2Hasher").finish_non_exhaustive()
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &Password) -> Result<PasswordHash, password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.expose().as_bytes(), &salt)?;
        Ok(PasswordHash::new(hash.to_string()))
    }

    fn verify(
        &self,
        password: &Password,
        hash: &PasswordHash,
    ) -> Result<bool, password_hash::Error> {
        let parsed = password_hash::PasswordHash::new(hash.as_str())?;
        match self
            .argon2
            .verify_password(password.expose().as_bytes(), &parsed)
        {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(error) => Err(error),
        }
    }
}

#[cfg(test)]
pub(crate) fn cheap_hasher() -> Argon2Hasher {
    Argon2Hasher::from_config(&PasswordHashingConfig {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_are_salted_and_verifiable() {
        let hasher = cheap_hasher();
        let password = Password::from("correct horse");
        let first = hasher.hash(&password).unwrap();
        let second = hasher.hash(&password).unwrap();

        assert_ne!(first, second);
        assert!(first.as_str().starts_with("$argon2id$"));
        assert!(!first.as_str().contains("correct horse"));
        assert!(hasher.verify(&password, &first).unwrap());
        assert!(!hasher.verify(&Password::from("wrong"), &first).unwrap());
    }

    #[test]
    fn configured_parameters_end_up_in_the_hash() {
        let hasher = cheap_hasher();
        let hash = hasher.hash(&Password::from("secret")).unwrap();
        assert!(hash.as_str().contains("m=8,t=1,p=1"), "{}", hash.as_str());
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(Argon2Hasher::from_config(&PasswordHashingConfig {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        })
        .is_err());
    }

    #[test]
    fn passwords_are_redacted() {
        assert_eq!(format!("{:?}", Password::from("secret")), "Password(..)");
    }
}
