//! Reversible name obfuscation for backend keys.
//!
//! Maps each `/`-delimited segment of a name through a keyed 6-bit
//! transform whose output stays inside the SSM parameter-name character
//! set, so `/` separators remain structural and prefix listing still
//! works. This is obfuscation, not encryption: anyone holding the key can
//! reverse it, and it must never be treated as a security boundary.

use thiserror::Error;

/// The 64 characters allowed in an obfuscated segment. A character's
/// index in this string is its 6-bit value.
const ALPHABET: &[u8; 64] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-_";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("obfuscation key must not be empty")]
    EmptyKey,
    #[error("obfuscation key contains invalid character {0:?}")]
    InvalidKeyCharacter(char),
    #[error("invalid character {0:?} in obfuscated name")]
    InvalidCharacter(char),
    #[error("deobfuscated name is not valid UTF-8")]
    NotUtf8,
}

fn char_value(c: u8) -> Option<u8> {
    ALPHABET.iter().position(|&a| a == c).map(|i| i as u8)
}

fn key_value(key: &[u8], index: usize) -> Result<u8, CodecError> {
    let kc = key[index % key.len()];
    char_value(kc).ok_or(CodecError::InvalidKeyCharacter(kc as char))
}

/// Whether `key` is non-empty and drawn entirely from the codec
/// alphabet, i.e. usable for both directions.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| char_value(b).is_some())
}

/// Obfuscate `name`, one `/`-delimited segment at a time. Empty segments
/// (leading or doubled slashes) are preserved literally.
pub fn obfuscate(name: &str, key: &str) -> Result<String, CodecError> {
    if key.is_empty() {
        return Err(CodecError::EmptyKey);
    }
    let parts: Result<Vec<String>, CodecError> = name
        .split('/')
        .map(|part| {
            if part.is_empty() {
                Ok(String::new())
            } else {
                obfuscate_segment(part, key)
            }
        })
        .collect();
    Ok(parts?.join("/"))
}

/// Build the backend key for `name` under the configured root path.
/// The root is stored as-is; only the name is obfuscated.
pub fn obfuscate_path(root: &str, name: &str, key: &str) -> Result<String, CodecError> {
    Ok(format!("{}/{}", root, obfuscate(name, key)?))
}

fn obfuscate_segment(segment: &str, key: &str) -> Result<String, CodecError> {
    // Segment bytes become a bitstream, most-significant bit first,
    // zero-padded to a multiple of 6.
    let mut bits = Vec::with_capacity(segment.len() * 8 + 5);
    for &b in segment.as_bytes() {
        for j in (0..8).rev() {
            bits.push((b >> j) & 1);
        }
    }
    while bits.len() % 6 != 0 {
        bits.push(0);
    }

    // Each 6-bit group is XORed with the cycling key schedule; the key
    // index restarts at 0 for every segment.
    let key_bytes = key.as_bytes();
    let mut out = String::with_capacity(bits.len() / 6);
    for (i, group) in bits.chunks(6).enumerate() {
        let mut v = 0u8;
        for &bit in group {
            v = (v << 1) | bit;
        }
        let kv = key_value(key_bytes, i)?;
        out.push(ALPHABET[(v ^ kv) as usize] as char);
    }
    Ok(out)
}

/// Reverse [`obfuscate`]: decode each `/`-delimited segment back to the
/// original name. Empty segments are preserved literally.
pub fn deobfuscate(name: &str, key: &str) -> Result<String, CodecError> {
    if key.is_empty() {
        return Err(CodecError::EmptyKey);
    }
    let parts: Result<Vec<String>, CodecError> = name
        .split('/')
        .map(|part| {
            if part.is_empty() {
                Ok(String::new())
            } else {
                deobfuscate_segment(part, key)
            }
        })
        .collect();
    Ok(parts?.join("/"))
}

fn deobfuscate_segment(segment: &str, key: &str) -> Result<String, CodecError> {
    let key_bytes = key.as_bytes();
    let mut bits = Vec::with_capacity(segment.len() * 6);
    for (i, c) in segment.bytes().enumerate() {
        let v = char_value(c).ok_or(CodecError::InvalidCharacter(c as char))?;
        let x = v ^ key_value(key_bytes, i)?;
        for j in (0..6).rev() {
            bits.push((x >> j) & 1);
        }
    }

    // Regroup into bytes; a trailing incomplete byte is the padding added
    // during obfuscation and is dropped.
    let mut out = Vec::with_capacity(bits.len() / 8);
    for group in bits.chunks_exact(8) {
        let mut b = 0u8;
        for &bit in group {
            b = (b << 1) | bit;
        }
        out.push(b);
    }
    String::from_utf8(out).map_err(|_| CodecError::NotUtf8)
}
