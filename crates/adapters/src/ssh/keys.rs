// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-use key material for one transfer session.

use std::fmt;

use rand::rngs::OsRng;
use ssh_key::{Algorithm, HashAlg, LineEnding, PrivateKey};

use super::TransportError;

/// Ed25519 key pair generated per job and kept only in memory.
pub struct KeyPair {
    private: PrivateKey,
    /// `ssh-ed25519 AAAA...` line for `authorized_keys`
    authorized_key: String,
    /// OpenSSH PEM encoding handed to libssh2 for the handshake
    private_pem: String,
}

impl KeyPair {
    pub fn generate() -> Result<Self, TransportError> {
        let private = PrivateKey::random(&mut OsRng, Algorithm::Ed25519)?;
        let authorized_key = private.public_key().to_openssh()?;
        let private_pem = private.to_openssh(LineEnding::LF)?.to_string();
        Ok(Self {
            private,
            authorized_key,
            private_pem,
        })
    }

    pub fn authorized_key(&self) -> &str {
        &self.authorized_key
    }

    pub fn private_pem(&self) -> &str {
        &self.private_pem
    }

    /// SHA-256 fingerprint, safe to log.
    pub fn fingerprint(&self) -> String {
        self.private
            .public_key()
            .fingerprint(HashAlg::Sha256)
            .to_string()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("fingerprint", &self.fingerprint())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "keys_tests.rs"]
mod tests;
