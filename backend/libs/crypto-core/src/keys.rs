//! PEM key loading
//!
//! Signing keys stay on the issuing side, verification keys are registered
//! per identity on the server. Both are RSA; jsonwebtoken accepts PKCS#1 and
//! PKCS#8 private keys and SPKI / PKCS#1 public keys.

use jsonwebtoken::{DecodingKey, EncodingKey};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Source label used for keys that did not come from a file
const IN_MEMORY: &str = "<memory>";

/// Failure reading or parsing key material
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("unable to read key file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse key '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: jsonwebtoken::errors::Error,
    },
}

/// Parse an RSA private key from PEM bytes
pub fn parse_private_key_pem(pem: &[u8]) -> Result<EncodingKey, KeyError> {
    EncodingKey::from_rsa_pem(pem).map_err(|source| KeyError::Parse {
        path: PathBuf::from(IN_MEMORY),
        source,
    })
}

/// Parse an RSA public key from PEM bytes
pub fn parse_public_key_pem(pem: &[u8]) -> Result<DecodingKey, KeyError> {
    DecodingKey::from_rsa_pem(pem).map_err(|source| KeyError::Parse {
        path: PathBuf::from(IN_MEMORY),
        source,
    })
}

/// Read and parse an RSA private key file
///
/// ## Errors
///
/// - `KeyError::Read` if the file cannot be read
/// - `KeyError::Parse` if the content is not an RSA private key in PEM form
pub fn load_private_key(path: impl AsRef<Path>) -> Result<EncodingKey, KeyError> {
    let path = path.as_ref();
    let pem = read_pem(path)?;
    EncodingKey::from_rsa_pem(&pem).map_err(|source| KeyError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Read and parse an RSA public key file
pub fn load_public_key(path: impl AsRef<Path>) -> Result<DecodingKey, KeyError> {
    let path = path.as_ref();
    let pem = read_pem(path)?;
    DecodingKey::from_rsa_pem(&pem).map_err(|source| KeyError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn read_pem(path: &Path) -> Result<Vec<u8>, KeyError> {
    std::fs::read(path).map_err(|source| KeyError::Read {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOE_PRIVATE_KEY: &str = include_str!("../tests/fixtures/joe_id.pem");
    const JOE_PUBLIC_KEY: &str = include_str!("../tests/fixtures/joe_id.pub.pem");

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    #[test]
    fn test_parse_pem_keys() {
        assert!(parse_private_key_pem(JOE_PRIVATE_KEY.as_bytes()).is_ok());
        assert!(parse_public_key_pem(JOE_PUBLIC_KEY.as_bytes()).is_ok());
    }

    #[test]
    fn test_parse_garbage_is_parse_error() {
        let err = parse_public_key_pem(b"not a key").err().expect("key should not parse");
        assert!(matches!(err, KeyError::Parse { .. }));
        assert!(err.to_string().contains("<memory>"));
    }

    #[test]
    fn test_load_key_files() {
        assert!(load_private_key(fixture("joe_id.pem")).is_ok());
        assert!(load_public_key(fixture("joe_id.pub.pem")).is_ok());
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let err = load_public_key(fixture("nobody.pub.pem")).err().expect("file should not exist");
        assert!(matches!(err, KeyError::Read { .. }));
        assert!(err.to_string().contains("nobody.pub.pem"));
    }

    #[test]
    fn test_truncated_private_key_is_parse_error() {
        let truncated = &JOE_PRIVATE_KEY[..40];
        let err = parse_private_key_pem(truncated.as_bytes()).err().expect("key should not parse");
        assert!(matches!(err, KeyError::Parse { .. }));
    }
}
