use subtle::ConstantTimeEq;

/// Canonical field-buffer form: leading zero bytes stripped, empty is zero.
pub(crate) fn trim_leading_zeros(bytes: &[u8]) -> Vec<u8> {
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    bytes[skip..].to_vec()
}

/// Constant-time comparison of two byte slices.
///
/// The length check is variable-time; lengths here are public (modulus
/// and digest widths).
#[inline]
pub(crate) fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim() {
        assert_eq!(trim_leading_zeros(&[0, 0, 1, 0]), vec![1, 0]);
        assert_eq!(trim_leading_zeros(&[1, 2]), vec![1, 2]);
        assert!(trim_leading_zeros(&[0, 0]).is_empty());
    }

    #[test]
    fn test_ct_eq() {
        assert!(ct_eq(b"abc", b"abc"));
        assert!(!ct_eq(b"abc", b"abd"));
        assert!(!ct_eq(b"abc", b"abcd"));
    }
}
