//! Password decoding
//!
//! Passwords are passed on the command line in an encoded form so they do
//! not show up verbatim in shell history or process listings at a glance.
//! This is obfuscation, not protection.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::ValueEnum;
use thiserror::Error;

/// How the password argument is encoded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Encoding {
    #[default]
    Base64,
    Hex,
    Plain,
}

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Failed to decode base64 password: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Failed to decode hex password: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("Decoded password is not valid UTF-8")]
    NotUtf8(#[from] std::string::FromUtf8Error),
}

/// A decoded password. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Decode an encoded password argument
pub fn decode(encoded: &str, encoding: Encoding) -> Result<Secret, CredentialError> {
    // Encoded forms never contain whitespace, plain passwords may
    let bytes = match encoding {
        Encoding::Base64 => STANDARD.decode(encoded.trim())?,
        Encoding::Hex => hex::decode(encoded.trim())?,
        Encoding::Plain => return Ok(Secret::new(encoded)),
    };

    Ok(Secret(String::from_utf8(bytes)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base64() {
        let secret = decode("aHVudGVyMg==", Encoding::Base64).unwrap();
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_decode_base64_invalid() {
        let err = decode("VjJoTWFXNW=", Encoding::Base64).unwrap_err();
        assert!(matches!(err, CredentialError::Base64(_)));
        assert!(err.to_string().starts_with("Failed to decode base64 password"));
    }

    #[test]
    fn test_decode_hex() {
        let secret = decode("68756e74657232", Encoding::Hex).unwrap();
        assert_eq!(secret.expose(), "hunter2");

        assert!(matches!(
            decode("6875zz", Encoding::Hex),
            Err(CredentialError::Hex(_))
        ));
    }

    #[test]
    fn test_decode_plain_keeps_whitespace() {
        assert_eq!(
            decode("  pass word  ", Encoding::Plain).unwrap().expose(),
            "  pass word  "
        );
        assert_eq!(decode("hunter2\n", Encoding::Plain).unwrap().expose(), "hunter2\n");
    }

    #[test]
    fn test_decode_encoded_ignores_surrounding_whitespace() {
        assert_eq!(
            decode("aHVudGVyMg==\n", Encoding::Base64).unwrap().expose(),
            "hunter2"
        );
        assert_eq!(
            decode(" 68756e74657232 ", Encoding::Hex).unwrap().expose(),
            "hunter2"
        );
        // Whitespace inside the decoded value survives
        assert_eq!(
            decode("ICBwYXNzIHdvcmQgIA==", Encoding::Base64).unwrap().expose(),
            "  pass word  "
        );
    }

    #[test]
    fn test_decode_not_utf8() {
        // 0xff 0xfe
        assert!(matches!(
            decode("//4=", Encoding::Base64),
            Err(CredentialError::NotUtf8(_))
        ));
    }

    #[test]
    fn test_secret_is_redacted() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{:?}", secret), "Secret(***)");
        assert_eq!(secret.to_string(), "***");
    }
}
