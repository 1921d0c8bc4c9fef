//! Named Ed25519 keys for signing checkpoint notes.
//!
//! Keys travel as text, in the same encoding as Go's `sumdb/note` package so
//! that independently built verifiers interoperate:
//!
//! - verifier key: `<name>+<hash>+<base64(0x01 || public key)>`
//! - signer key: `PRIVATE+KEY+<name>+<hash>+<base64(0x01 || seed)>`
//!
//! `<hash>` is the 8-digit hex key id: the first four bytes, big-endian, of
//! `SHA-256(name || "\n" || 0x01 || public key)`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::KeyError;

/// Algorithm byte for Ed25519 keys.
pub const ALG_ED25519: u8 = 0x01;

const PRIVATE_KEY_PREFIX: &str = "PRIVATE+KEY+";

/// Whether `name` can identify a key in a signed note.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(|c| c == '+' || c.is_whitespace())
}

/// Compute the key id binding `name` to the encoded key (algorithm byte
/// followed by the public key).
pub fn key_hash(name: &str, encoded_key: &[u8]) -> u32 {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(b"\n");
    hasher.update(encoded_key);
    let digest = hasher.finalize();
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

fn encode_public(verifying_key: &VerifyingKey) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(33);
    encoded.push(ALG_ED25519);
    encoded.extend_from_slice(verifying_key.as_bytes());
    encoded
}

/// Split `<name>+<hash>+<base64>` into its parts.
fn split_key(text: &str) -> Result<(&str, u32, Vec<u8>), KeyError> {
    let mut parts = text.splitn(3, '+');
    let (Some(name), Some(hash16), Some(key64)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(KeyError::MalformedKey("expected <name>+<hash>+<key>".into()));
    };
    if !is_valid_name(name) {
        return Err(KeyError::InvalidName(name.to_string()));
    }
    if hash16.len() != 8 || !hash16.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(KeyError::MalformedKey(format!("bad key hash {hash16:?}")));
    }
    let hash = u32::from_str_radix(hash16, 16)
        .map_err(|e| KeyError::MalformedKey(format!("bad key hash: {e}")))?;
    let key = STANDARD
        .decode(key64)
        .map_err(|e| KeyError::MalformedKey(format!("bad key encoding: {e}")))?;
    Ok((name, hash, key))
}

/// Split the algorithm byte off and check the 32-byte Ed25519 body.
fn ed25519_body(key: &[u8]) -> Result<[u8; 32], KeyError> {
    let (&alg, body) = key
        .split_first()
        .ok_or_else(|| KeyError::MalformedKey("empty key".into()))?;
    if alg != ALG_ED25519 {
        return Err(KeyError::UnsupportedAlgorithm(alg));
    }
    body.try_into()
        .map_err(|_| KeyError::MalformedKey(format!("ed25519 key must be 32 bytes, got {}", body.len())))
}

/// A freshly generated key pair in text form, bound to a name.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub name: String,
    /// Verifier key text.
    pub public_key: String,
    /// Signer key text. Secret.
    pub private_key: String,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("name", &self.name)
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Generate a fresh Ed25519 key pair bound to `name` from the OS CSPRNG.
pub fn generate_key_pair(name: &str) -> Result<KeyPair, KeyError> {
    if !is_valid_name(name) {
        return Err(KeyError::InvalidName(name.to_string()));
    }
    let signer = NoteSigner::from_signing_key(name, SigningKey::generate(&mut OsRng))?;
    Ok(KeyPair {
        name: name.to_string(),
        public_key: signer.verifier().to_string(),
        private_key: signer.to_private_key(),
    })
}

/// Signs note text under a named identity.
#[derive(Clone)]
pub struct NoteSigner {
    name: String,
    key_hash: u32,
    signing_key: SigningKey,
}

impl NoteSigner {
    /// Parse a `PRIVATE+KEY+...` signer key.
    pub fn from_private_key(text: &str) -> Result<Self, KeyError> {
        let rest = text
            .strip_prefix(PRIVATE_KEY_PREFIX)
            .ok_or_else(|| KeyError::MalformedKey("missing PRIVATE+KEY+ prefix".into()))?;
        let (name, hash, key) = split_key(rest)?;
        let seed = ed25519_body(&key)?;
        let signer = Self::from_signing_key(name, SigningKey::from_bytes(&seed))?;
        if signer.key_hash != hash {
            return Err(KeyError::KeyHashMismatch {
                expected: signer.key_hash,
                found: hash,
            });
        }
        Ok(signer)
    }

    /// Build a signer from a 32-byte seed.
    pub fn from_seed(name: &str, seed: &[u8; 32]) -> Result<Self, KeyError> {
        Self::from_signing_key(name, SigningKey::from_bytes(seed))
    }

    fn from_signing_key(name: &str, signing_key: SigningKey) -> Result<Self, KeyError> {
        if !is_valid_name(name) {
            return Err(KeyError::InvalidName(name.to_string()));
        }
        let key_hash = key_hash(name, &encode_public(&signing_key.verifying_key()));
        Ok(Self {
            name: name.to_string(),
            key_hash,
            signing_key,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key_hash(&self) -> u32 {
        self.key_hash
    }

    /// Sign a message (deterministic Ed25519).
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    /// The verifier matching this signer.
    pub fn verifier(&self) -> NoteVerifier {
        NoteVerifier {
            name: self.name.clone(),
            key_hash: self.key_hash,
            verifying_key: self.signing_key.verifying_key(),
        }
    }

    /// Encode as signer key text.
    pub fn to_private_key(&self) -> String {
        let mut encoded = Vec::with_capacity(33);
        encoded.push(ALG_ED25519);
        encoded.extend_from_slice(self.signing_key.as_bytes());
        format!(
            "{PRIVATE_KEY_PREFIX}{}+{:08x}+{}",
            self.name,
            self.key_hash,
            STANDARD.encode(encoded)
        )
    }
}

impl fmt::Debug for NoteSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NoteSigner({}+{:08x})", self.name, self.key_hash)
    }
}

/// Verifies note signatures made under a named identity.
#[derive(Clone, PartialEq, Eq)]
pub struct NoteVerifier {
    name: String,
    key_hash: u32,
    verifying_key: VerifyingKey,
}

impl NoteVerifier {
    /// Parse a `<name>+<hash>+<key>` verifier key.
    pub fn from_public_key(text: &str) -> Result<Self, KeyError> {
        let (name, hash, key) = split_key(text)?;
        let expected = key_hash(name, &key);
        if expected != hash {
            return Err(KeyError::KeyHashMismatch {
                expected,
                found: hash,
            });
        }
        let body = ed25519_body(&key)?;
        let verifying_key =
            VerifyingKey::from_bytes(&body).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self {
            name: name.to_string(),
            key_hash: hash,
            verifying_key,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key_hash(&self) -> u32 {
        self.key_hash
    }

    /// Check an Ed25519 signature over `message`.
    pub fn verify(&self, message: &[u8], signature: &[u8; 64]) -> bool {
        let signature = Signature::from_bytes(signature);
        self.verifying_key.verify(message, &signature).is_ok()
    }
}

impl fmt::Display for NoteVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}+{:08x}+{}",
            self.name,
            self.key_hash,
            STANDARD.encode(encode_public(&self.verifying_key))
        )
    }
}

impl fmt::Debug for NoteVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NoteVerifier({}+{:08x})", self.name, self.key_hash)
    }
}
