//! Signed notes: text plus detached signatures from named keys.
//!
//! Wire format:
//!
//! ```text
//! <text, one or more '\n'-terminated lines>
//!
//! — <name> <base64(key hash, 4 bytes BE || signature)>
//! ```
//!
//! The blank line separates text from signatures; every signature line
//! starts with an em dash and a space. Signatures cover the text bytes
//! exactly, including the final newline.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::NoteError;
use crate::keys::{is_valid_name, NoteSigner, NoteVerifier};

/// Prefix of every signature line (U+2014 EM DASH, then a space).
pub const SIGNATURE_PREFIX: &str = "\u{2014} ";

/// Upper bound on signature lines accepted when opening a note.
pub const MAX_SIGNATURES: usize = 100;

/// One signature line of a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteSignature {
    pub name: String,
    pub key_hash: u32,
    /// Raw signature bytes (64 for Ed25519).
    pub signature: Vec<u8>,
}

impl NoteSignature {
    fn to_line(&self) -> String {
        let mut blob = Vec::with_capacity(4 + self.signature.len());
        blob.extend_from_slice(&self.key_hash.to_be_bytes());
        blob.extend_from_slice(&self.signature);
        format!("{SIGNATURE_PREFIX}{} {}\n", self.name, STANDARD.encode(blob))
    }
}

/// An opened note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub text: String,
    /// Signatures checked against one of the supplied verifiers.
    pub verified: Vec<NoteSignature>,
    /// Signatures from keys nobody asked about.
    pub unverified: Vec<NoteSignature>,
}

fn check_text(text: &str) -> Result<(), NoteError> {
    if !text.ends_with('\n') {
        return Err(NoteError::Malformed("text must end in newline".into()));
    }
    if text.chars().any(|c| c != '\n' && c.is_control()) {
        return Err(NoteError::Malformed("text contains control characters".into()));
    }
    Ok(())
}

/// Sign `text` with every signer and render the full note.
pub fn sign_note(text: &str, signers: &[&NoteSigner]) -> Result<String, NoteError> {
    check_text(text)?;
    if signers.is_empty() {
        return Err(NoteError::Malformed("no signers".into()));
    }

    let mut out = String::with_capacity(text.len() + 1 + signers.len() * 110);
    out.push_str(text);
    out.push('\n');
    for signer in signers {
        let signature = NoteSignature {
            name: signer.name().to_string(),
            key_hash: signer.key_hash(),
            signature: signer.sign(text.as_bytes()).to_vec(),
        };
        out.push_str(&signature.to_line());
    }
    Ok(out)
}

fn parse_signature_line(line: &str) -> Result<NoteSignature, NoteError> {
    let rest = line
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or_else(|| NoteError::Malformed(format!("bad signature line {line:?}")))?;
    let (name, encoded) = rest
        .split_once(' ')
        .ok_or_else(|| NoteError::Malformed(format!("bad signature line {line:?}")))?;
    if !is_valid_name(name) {
        return Err(NoteError::Malformed(format!("invalid signer name {name:?}")));
    }
    let blob = STANDARD
        .decode(encoded)
        .map_err(|e| NoteError::Malformed(format!("bad signature encoding: {e}")))?;
    if blob.len() < 5 {
        return Err(NoteError::Malformed("signature too short".into()));
    }
    Ok(NoteSignature {
        name: name.to_string(),
        key_hash: u32::from_be_bytes([blob[0], blob[1], blob[2], blob[3]]),
        signature: blob[4..].to_vec(),
    })
}

/// Parse a signed note and check its signatures.
///
/// Signatures from keys not in `verifiers` are kept as unverified. A
/// signature that claims a verifier's identity but does not verify is an
/// error, and at least one signature must verify.
pub fn open_note(message: &[u8], verifiers: &[&NoteVerifier]) -> Result<Note, NoteError> {
    let message = std::str::from_utf8(message)
        .map_err(|_| NoteError::Malformed("note is not valid UTF-8".into()))?;
    if message.chars().any(|c| c != '\n' && c.is_control()) {
        return Err(NoteError::Malformed("note contains control characters".into()));
    }

    let split = message
        .rfind("\n\n")
        .ok_or_else(|| NoteError::Malformed("missing signature block".into()))?;
    let text = &message[..split + 1];
    let block = &message[split + 2..];
    let lines = block
        .strip_suffix('\n')
        .ok_or_else(|| NoteError::Malformed("signature block must end in newline".into()))?;
    if lines.is_empty() {
        return Err(NoteError::Malformed("no signatures".into()));
    }

    let mut verified = Vec::new();
    let mut unverified = Vec::new();
    let mut seen: Vec<(String, u32)> = Vec::new();

    for (count, line) in lines.split('\n').enumerate() {
        if count >= MAX_SIGNATURES {
            return Err(NoteError::Malformed("too many signatures".into()));
        }
        let signature = parse_signature_line(line)?;
        let id = (signature.name.clone(), signature.key_hash);
        if seen.contains(&id) {
            return Err(NoteError::Malformed(format!(
                "duplicate signature by {}+{:08x}",
                id.0, id.1
            )));
        }
        seen.push(id);

        let verifier = verifiers
            .iter()
            .find(|v| v.name() == signature.name && v.key_hash() == signature.key_hash);
        match verifier {
            Some(verifier) => {
                let ok = <&[u8; 64]>::try_from(signature.signature.as_slice())
                    .map(|sig| verifier.verify(text.as_bytes(), sig))
                    .unwrap_or(false);
                if !ok {
                    return Err(NoteError::InvalidSignature {
                        name: signature.name,
                        key_hash: signature.key_hash,
                    });
                }
                verified.push(signature);
            }
            None => unverified.push(signature),
        }
    }

    if verified.is_empty() {
        return Err(NoteError::Unverified);
    }

    Ok(Note {
        text: text.to_string(),
        verified,
        unverified,
    })
}
