//! JSON key form: `{ "kty": "RSA"|"DSA", <fields>, "ext": true }` with
//! every field as URL-safe base64 of its canonical trimmed bytes,
//! unpadded on encode, padding accepted on decode.

use serde::{Deserialize, Serialize};

use crate::dsa::{DsaParams, DsaPrivateKey, DsaPublicKey};
use crate::encoding::{base64url_decode, base64url_encode};
use crate::error::CryptoError;
use crate::rsa::{RsaPrivateKey, RsaPublicKey};

#[derive(Serialize, Deserialize)]
struct RsaJwk {
    kty: String,
    n: String,
    e: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    d: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    p: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dq: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    qi: Option<String>,
    ext: bool,
}

#[derive(Serialize, Deserialize)]
struct DsaJwk {
    kty: String,
    p: String,
    q: String,
    g: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    y: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    x: Option<String>,
    ext: bool,
}

fn parse<'a, T: Deserialize<'a>>(json: &'a str) -> Result<T, CryptoError> {
    serde_json::from_str(json).map_err(|e| CryptoError::Decode(e.to_string()))
}

fn render<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).expect("jwk structs always serialize")
}

fn check_kty(got: &str, expected: &str) -> Result<(), CryptoError> {
    if got == expected {
        Ok(())
    } else {
        Err(CryptoError::Decode(format!("unexpected kty {got:?}")))
    }
}

fn required(field: &Option<String>, name: &'static str) -> Result<Vec<u8>, CryptoError> {
    match field {
        Some(v) => base64url_decode(v),
        None => Err(CryptoError::Decode(format!("missing field {name}"))),
    }
}

impl RsaPublicKey {
    pub fn to_json(&self) -> String {
        render(&RsaJwk {
            kty: "RSA".into(),
            n: base64url_encode(self.n()),
            e: base64url_encode(self.e()),
            d: None,
            p: None,
            q: None,
            dp: None,
            dq: None,
            qi: None,
            ext: true,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, CryptoError> {
        let jwk: RsaJwk = parse(json)?;
        check_kty(&jwk.kty, "RSA")?;
        Ok(Self::from_parts(
            &base64url_decode(&jwk.n)?,
            &base64url_decode(&jwk.e)?,
        ))
    }
}

impl RsaPrivateKey {
    pub fn to_json(&self) -> String {
        render(&RsaJwk {
            kty: "RSA".into(),
            n: base64url_encode(self.n()),
            e: base64url_encode(self.e()),
            d: Some(base64url_encode(self.d())),
            p: Some(base64url_encode(self.p())),
            q: Some(base64url_encode(self.q())),
            dp: Some(base64url_encode(self.dp())),
            dq: Some(base64url_encode(self.dq())),
            qi: Some(base64url_encode(self.qi())),
            ext: true,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, CryptoError> {
        let jwk: RsaJwk = parse(json)?;
        check_kty(&jwk.kty, "RSA")?;
        Ok(Self::from_parts(
            &base64url_decode(&jwk.n)?,
            &base64url_decode(&jwk.e)?,
            &required(&jwk.d, "d")?,
            &required(&jwk.p, "p")?,
            &required(&jwk.q, "q")?,
            &required(&jwk.dp, "dp")?,
            &required(&jwk.dq, "dq")?,
            &required(&jwk.qi, "qi")?,
        ))
    }
}

impl DsaParams {
    pub fn to_json(&self) -> String {
        render(&DsaJwk {
            kty: "DSA".into(),
            p: base64url_encode(self.p()),
            q: base64url_encode(self.q()),
            g: base64url_encode(self.g()),
            y: None,
            x: None,
            ext: true,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, CryptoError> {
        let jwk: DsaJwk = parse(json)?;
        check_kty(&jwk.kty, "DSA")?;
        Ok(Self::from_parts(
            &base64url_decode(&jwk.p)?,
            &base64url_decode(&jwk.q)?,
            &base64url_decode(&jwk.g)?,
        ))
    }
}

impl DsaPublicKey {
    pub fn to_json(&self) -> String {
        render(&DsaJwk {
            kty: "DSA".into(),
            p: base64url_encode(self.params().p()),
            q: base64url_encode(self.params().q()),
            g: base64url_encode(self.params().g()),
            y: Some(base64url_encode(self.y())),
            x: None,
            ext: true,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, CryptoError> {
        let jwk: DsaJwk = parse(json)?;
        check_kty(&jwk.kty, "DSA")?;
        let params = DsaParams::from_parts(
            &base64url_decode(&jwk.p)?,
            &base64url_decode(&jwk.q)?,
            &base64url_decode(&jwk.g)?,
        );
        Ok(Self::from_parts(params, &required(&jwk.y, "y")?))
    }
}

impl DsaPrivateKey {
    pub fn to_json(&self) -> String {
        render(&DsaJwk {
            kty: "DSA".into(),
            p: base64url_encode(self.params().p()),
            q: base64url_encode(self.params().q()),
            g: base64url_encode(self.params().g()),
            y: Some(base64url_encode(self.public_key().y())),
            x: Some(base64url_encode(self.x())),
            ext: true,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, CryptoError> {
        let jwk: DsaJwk = parse(json)?;
        check_kty(&jwk.kty, "DSA")?;
        let params = DsaParams::from_parts(
            &base64url_decode(&jwk.p)?,
            &base64url_decode(&jwk.q)?,
            &base64url_decode(&jwk.g)?,
        );
        Ok(Self::from_parts(
            params,
            &required(&jwk.y, "y")?,
            &required(&jwk.x, "x")?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsa_public_roundtrip() {
        let key = RsaPublicKey::from_parts(&[0xab; 64], &[0x01, 0x00, 0x01]);
        let json = key.to_json();
        assert!(json.contains("\"kty\":\"RSA\""));
        assert!(json.contains("\"ext\":true"));
        assert!(!json.contains("\"d\""));
        assert_eq!(RsaPublicKey::from_json(&json).unwrap(), key);
    }

    #[test]
    fn test_kty_mismatch() {
        let key = RsaPublicKey::from_parts(&[0xab; 64], &[0x01, 0x00, 0x01]);
        let json = key.to_json().replace("RSA", "DSA");
        assert!(RsaPublicKey::from_json(&json).is_err());
    }

    #[test]
    fn test_missing_private_field() {
        let json = RsaPublicKey::from_parts(&[0xab; 64], &[0x01, 0x00, 0x01]).to_json();
        assert!(RsaPrivateKey::from_json(&json).is_err());
    }

    #[test]
    fn test_padded_base64_accepted() {
        // "qg==" is padded base64url for 0xaa.
        let json =
            r#"{"kty":"DSA","p":"qg==","q":"qg==","g":"qg==","y":"qg==","ext":true}"#;
        let key = DsaPublicKey::from_json(json).unwrap();
        assert_eq!(key.y(), &[0xaa]);
    }

    #[test]
    fn test_standard_alphabet_rejected() {
        let json = r#"{"kty":"RSA","n":"U+k2Oyli/K8=","e":"AQAB","ext":true}"#;
        assert!(RsaPublicKey::from_json(json).is_err());
    }

    #[test]
    fn test_malformed_json_shape() {
        assert!(RsaPublicKey::from_json("not json").is_err());
        assert!(RsaPublicKey::from_json(r#"{"kty":"RSA"}"#).is_err());
    }
}
