//! Base64 codecs for the JSON key form.
//!
//! The URL-safe engine encodes without padding and accepts optional
//! padding on decode; characters outside the table (including `+`, `/`,
//! and whitespace) are rejected.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

use crate::error::CryptoError;

const CONFIG: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_encode_padding(false)
    .with_decode_padding_mode(DecodePaddingMode::Indifferent);

const BASE64_URL: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, CONFIG);
const BASE64_STD: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, CONFIG);

/// RFC 4648 §5 alphabet, no padding.
pub fn base64url_encode(data: &[u8]) -> String {
    BASE64_URL.encode(data)
}

/// RFC 4648 §5 alphabet; padding optional.
pub fn base64url_decode(s: &str) -> Result<Vec<u8>, CryptoError> {
    BASE64_URL
        .decode(s)
        .map_err(|e| CryptoError::Decode(e.to_string()))
}

/// Standard alphabet; padding optional.
pub fn base64_decode(s: &str) -> Result<Vec<u8>, CryptoError> {
    BASE64_STD
        .decode(s)
        .map_err(|e| CryptoError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        let data = hex::decode("53e9363b2962fcaf").unwrap();
        assert_eq!(base64url_encode(&data), "U-k2Oyli_K8");
        assert_eq!(base64url_decode("U-k2Oyli_K8").unwrap(), data);
        // Padded form is accepted.
        assert_eq!(base64url_decode("U-k2Oyli_K8=").unwrap(), data);
    }

    #[test]
    fn test_alphabet_separation() {
        let data = hex::decode("53e9363b2962fcaf").unwrap();
        // Standard-alphabet input is rejected by the URL-safe decoder..
        assert!(base64url_decode("U+k2Oyli/K8=").is_err());
        // ..and accepted by the standard one.
        assert_eq!(base64_decode("U+k2Oyli/K8=").unwrap(), data);
    }

    #[test]
    fn test_rejects_whitespace() {
        assert!(base64url_decode("U-k2 Oyli_K8").is_err());
        assert!(base64url_decode("U-k2\nOyli_K8").is_err());
    }

    #[test]
    fn test_empty() {
        assert_eq!(base64url_encode(&[]), "");
        assert!(base64url_decode("").unwrap().is_empty());
    }
}
