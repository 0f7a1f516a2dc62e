//! EMSA-PKCS1-v1_5 encoding (RFC 8017 §9.2).

use crate::error::CryptoError;

/// Precomputed DigestInfo prefixes, keyed by digest id. `T = prefix || H`.
/// MD5-SHA1 is the bare TLS 1.1 concatenation and carries no prefix.
pub(crate) fn digest_info_prefix(id: &str) -> Option<&'static [u8]> {
    Some(match id {
        "MD5" => &[
            0x30, 0x20, 0x30, 0x0c, 0x06, 0x08, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x02, 0x05,
            0x05, 0x00, 0x04, 0x10,
        ],
        "RIPEMD160" => &[
            0x30, 0x21, 0x30, 0x09, 0x06, 0x05, 0x2b, 0x24, 0x03, 0x02, 0x01, 0x05, 0x00, 0x04,
            0x14,
        ],
        "SHA1" => &[
            0x30, 0x21, 0x30, 0x09, 0x06, 0x05, 0x2b, 0x0e, 0x03, 0x02, 0x1a, 0x05, 0x00, 0x04,
            0x14,
        ],
        "SHA224" => &[
            0x30, 0x2d, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02,
            0x04, 0x05, 0x00, 0x04, 0x1c,
        ],
        "SHA256" => &[
            0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02,
            0x01, 0x05, 0x00, 0x04, 0x20,
        ],
        "SHA384" => &[
            0x30, 0x41, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02,
            0x02, 0x05, 0x00, 0x04, 0x30,
        ],
        "SHA512" => &[
            0x30, 0x51, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02,
            0x03, 0x05, 0x00, 0x04, 0x40,
        ],
        "MD5SHA1" => &[],
        _ => return None,
    })
}

/// `EM = 0x00 || 0x01 || PS || 0x00 || DigestInfo || H`, `len(EM) = em_len`,
/// `PS` at least eight 0xff bytes.
pub(crate) fn emsa_pkcs1_v15(
    digest_id: &str,
    digest: &[u8],
    em_len: usize,
) -> Result<Vec<u8>, CryptoError> {
    let prefix = digest_info_prefix(digest_id)
        .ok_or(CryptoError::InvalidParameter("unknown digest algorithm"))?;
    let t_len = prefix.len() + digest.len();
    if t_len + 11 > em_len {
        return Err(CryptoError::MessageTooLong);
    }
    let mut em = Vec::with_capacity(em_len);
    em.push(0x00);
    em.push(0x01);
    em.resize(em_len - t_len - 1, 0xff);
    em.push(0x00);
    em.extend_from_slice(prefix);
    em.extend_from_slice(digest);
    debug_assert_eq!(em.len(), em_len);
    Ok(em)
}
