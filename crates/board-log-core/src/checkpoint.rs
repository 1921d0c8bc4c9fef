//! Checkpoints: the authenticated state of a log at one point in time.
//!
//! Canonical text, three `\n`-terminated lines:
//!
//! ```text
//! <origin>
//! <size, decimal>
//! <root hash, standard base64>
//! ```
//!
//! A checkpoint is only ever stored or exchanged as a signed note over that
//! text (see [`crate::note`]). Parsing is strict: anything that would not be
//! reproduced byte-for-byte by [`Checkpoint::marshal`] is rejected.

use serde::{Deserialize, Serialize};

use crate::error::CheckpointError;
use crate::keys::{NoteSigner, NoteVerifier};
use crate::note::{open_note, sign_note};
use crate::types::Hash;

/// The (origin, size, root) triple committed to by a signed checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Identifies the log instance.
    pub origin: String,
    /// Number of entries integrated into the tree.
    pub size: u64,
    /// Root of the tree over entries `[0, size)`.
    pub root_hash: Hash,
}

/// Check that `origin` can head a checkpoint.
pub fn validate_origin(origin: &str) -> Result<(), CheckpointError> {
    if origin.is_empty() {
        return Err(CheckpointError::EmptyOrigin);
    }
    if origin.chars().any(char::is_control) {
        return Err(CheckpointError::InvalidOrigin(origin.to_string()));
    }
    Ok(())
}

impl Checkpoint {
    pub fn new(origin: impl Into<String>, size: u64, root_hash: Hash) -> Self {
        Self {
            origin: origin.into(),
            size,
            root_hash,
        }
    }

    /// Render the canonical text.
    pub fn marshal(&self) -> String {
        format!(
            "{}\n{}\n{}\n",
            self.origin,
            self.size,
            self.root_hash.to_base64()
        )
    }

    /// Parse canonical text.
    pub fn unmarshal(text: &str) -> Result<Self, CheckpointError> {
        let body = text
            .strip_suffix('\n')
            .ok_or_else(|| CheckpointError::Malformed("text must end in newline".into()))?;
        let lines: Vec<&str> = body.split('\n').collect();
        let [origin, size, root] = lines.as_slice() else {
            return Err(CheckpointError::Malformed(format!(
                "expected 3 lines, got {}",
                lines.len()
            )));
        };

        validate_origin(origin)?;

        let canonical_size = !size.is_empty()
            && size.bytes().all(|b| b.is_ascii_digit())
            && (size.len() == 1 || !size.starts_with('0'));
        if !canonical_size {
            return Err(CheckpointError::Malformed(format!("bad size {size:?}")));
        }
        let size: u64 = size
            .parse()
            .map_err(|_| CheckpointError::Malformed(format!("bad size {size:?}")))?;

        let root_hash = Hash::from_base64(root)
            .ok_or_else(|| CheckpointError::Malformed(format!("bad root hash {root:?}")))?;

        let checkpoint = Self::new(*origin, size, root_hash);
        if checkpoint.marshal() != text {
            return Err(CheckpointError::Malformed("non-canonical encoding".into()));
        }
        Ok(checkpoint)
    }
}

/// A checkpoint together with its signed note text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedCheckpoint {
    pub checkpoint: Checkpoint,
    pub note: String,
}

impl SignedCheckpoint {
    /// Serialize and sign `checkpoint`.
    pub fn sign(checkpoint: Checkpoint, signer: &NoteSigner) -> Result<Self, CheckpointError> {
        validate_origin(&checkpoint.origin)?;
        let note = sign_note(&checkpoint.marshal(), &[signer])?;
        Ok(Self { checkpoint, note })
    }

    /// Verify a signed note and parse the checkpoint it carries, requiring
    /// the checkpoint to belong to `origin`.
    pub fn open(
        note: &[u8],
        origin: &str,
        verifier: &NoteVerifier,
    ) -> Result<Self, CheckpointError> {
        let opened = open_note(note, &[verifier])?;
        let checkpoint = Checkpoint::unmarshal(&opened.text)?;
        if checkpoint.origin != origin {
            return Err(CheckpointError::OriginMismatch {
                expected: origin.to_string(),
                found: checkpoint.origin,
            });
        }
        // open_note succeeded, so the bytes are UTF-8.
        let note = String::from_utf8_lossy(note).into_owned();
        Ok(Self { checkpoint, note })
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.note.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NoteError;
    use crate::hasher::{Rfc6962Hasher, TreeHasher};
    use crate::keys::generate_key_pair;

    fn signer(name: &str) -> NoteSigner {
        NoteSigner::from_private_key(&generate_key_pair(name).unwrap().private_key).unwrap()
    }

    #[test]
    fn test_marshal_layout() {
        let cp = Checkpoint::new("test-log", 0, Rfc6962Hasher.empty_root());
        assert_eq!(
            cp.marshal(),
            "test-log\n0\n47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=\n"
        );
        assert_eq!(Checkpoint::unmarshal(&cp.marshal()).unwrap(), cp);
    }

    #[test]
    fn test_unmarshal_is_strict() {
        let root = Hash::from_bytes([1; 32]).to_base64();
        for bad in [
            format!("log\n1\n{root}"),
            format!("log\n1\n{root}\nextension\n"),
            format!("\n1\n{root}\n"),
            format!("log\n01\n{root}\n"),
            format!("log\n+1\n{root}\n"),
            format!("log\n-1\n{root}\n"),
            format!("log\n18446744073709551616\n{root}\n"),
            "log\n1\nAAAA\n".to_string(),
            "log\n1\n".to_string(),
        ] {
            assert!(Checkpoint::unmarshal(&bad).is_err(), "{bad:?} should fail");
        }
    }

    #[test]
    fn test_sign_and_open() {
        let s = signer("board");
        let cp = Checkpoint::new("test-log", 3, Hash::from_bytes([9; 32]));
        let signed = SignedCheckpoint::sign(cp.clone(), &s).unwrap();
        let opened = SignedCheckpoint::open(signed.as_bytes(), "test-log", &s.verifier()).unwrap();
        assert_eq!(opened.checkpoint, cp);
        assert_eq!(opened, signed);
    }

    #[test]
    fn test_open_rejects_wrong_origin() {
        let s = signer("board");
        let cp = Checkpoint::new("test-log", 3, Hash::from_bytes([9; 32]));
        let signed = SignedCheckpoint::sign(cp, &s).unwrap();
        assert!(matches!(
            SignedCheckpoint::open(signed.as_bytes(), "other-log", &s.verifier()),
            Err(CheckpointError::OriginMismatch { .. })
        ));
    }

    #[test]
    fn test_open_rejects_tampered_size_and_root() {
        let s = signer("board");
        let root = Hash::from_bytes([9; 32]);
        let signed = SignedCheckpoint::sign(Checkpoint::new("test-log", 3, root), &s).unwrap();

        let bigger = signed.note.replacen("\n3\n", "\n4\n", 1);
        assert!(matches!(
            SignedCheckpoint::open(bigger.as_bytes(), "test-log", &s.verifier()),
            Err(CheckpointError::Note(NoteError::InvalidSignature { .. }))
        ));

        let mut flipped = root;
        flipped.0[0] ^= 0x01;
        let other_root = signed.note.replacen(&root.to_base64(), &flipped.to_base64(), 1);
        assert!(SignedCheckpoint::open(other_root.as_bytes(), "test-log", &s.verifier()).is_err());
    }

    #[test]
    fn test_sign_rejects_bad_origin() {
        let s = signer("board");
        let root = Hash::from_bytes([0; 32]);
        assert_eq!(
            SignedCheckpoint::sign(Checkpoint::new("", 0, root), &s),
            Err(CheckpointError::EmptyOrigin)
        );
        assert!(matches!(
            SignedCheckpoint::sign(Checkpoint::new("a\nb", 0, root), &s),
            Err(CheckpointError::InvalidOrigin(_))
        ));
    }
}
