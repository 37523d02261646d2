//! Wire codec for gateway identity tokens.
//!
//! A token is three base64url segments joined by `.`: a JSON header, a JSON
//! claim set and an opaque signature. Producing and checking the signature
//! is left to the security provider; this type only moves tokens on and off
//! the wire and reads their claims.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Claim carrying the authenticated principal.
pub const PRINCIPAL: &str = "prn";
/// Claim carrying the token issuer.
pub const ISSUER: &str = "iss";
/// Claim carrying the intended audience.
pub const AUDIENCE: &str = "aud";
/// Claim carrying the expiry in epoch seconds.
pub const EXPIRES: &str = "exp";

/// Unpadded on encode, padding optional on decode.
const WIRE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Error decoding a token from the wire.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token does not have exactly three segments.
    #[error("expected 3 token segments, found {0}")]
    Malformed(usize),
    /// A segment is not valid base64url.
    #[error("invalid base64url in token {segment}: {source}")]
    Base64 {
        segment: &'static str,
        #[source]
        source: base64::DecodeError,
    },
    /// The header or claims are not UTF-8.
    #[error("token {0} is not valid UTF-8")]
    Utf8(&'static str),
}

/// Claim values used to create a token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JwtClaims {
    pub issuer: String,
    pub principal: String,
    pub audience: String,
    /// Expiry in epoch seconds.
    pub expires: String,
}

/// A gateway identity token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwtToken {
    header: String,
    claims: String,
    signature: Vec<u8>,
}

impl JwtToken {
    /// Create an unsigned token for `alg`.
    pub fn new(alg: &str, claims: &JwtClaims) -> Self {
        let header = format!("{{\"alg\": {}}}", json_string(alg));
        let claims = format!(
            "{{\"{}\": {}, \"{}\": {}, \"{}\": {}, \"{}\": {}}}",
            ISSUER,
            json_string(&claims.issuer),
            PRINCIPAL,
            json_string(&claims.principal),
            AUDIENCE,
            json_string(&claims.audience),
            EXPIRES,
            json_string(&claims.expires),
        );
        Self {
            header,
            claims,
            signature: Vec::new(),
        }
    }

    /// Decode a token off the wire.
    pub fn parse(wire: &str) -> Result<Self, TokenError> {
        let parts: Vec<&str> = wire.split('.').collect();
        let [header, claims, signature] = parts.as_slice() else {
            return Err(TokenError::Malformed(parts.len()));
        };

        Ok(Self {
            header: decode_text(header, "header")?,
            claims: decode_text(claims, "claims")?,
            signature: decode(signature, "signature")?,
        })
    }

    /// Header JSON text.
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Claims JSON text.
    pub fn claims(&self) -> &str {
        &self.claims
    }

    /// Signature bytes, empty until set.
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Attach a signature produced over [`JwtToken::payload_to_sign`].
    pub fn set_signature(&mut self, signature: impl Into<Vec<u8>>) {
        self.signature = signature.into();
    }

    /// The `header.claims` text a signer signs.
    pub fn payload_to_sign(&self) -> String {
        format!(
            "{}.{}",
            WIRE.encode(self.header.as_bytes()),
            WIRE.encode(self.claims.as_bytes())
        )
    }

    /// Encode the token for the wire.
    pub fn to_wire(&self) -> String {
        format!("{}.{}", self.payload_to_sign(), WIRE.encode(&self.signature))
    }

    /// Read claim `name`, i.e. the JSON path `$.name`.
    pub fn claim(&self, name: &str) -> Option<String> {
        self.claim_at(&format!("$.{}", name))
    }

    /// Read the claim at a dotted JSON path such as `$.ctx.tenant`.
    ///
    /// String values are returned as-is, other scalars in their JSON form.
    /// Objects, arrays, nulls and missing paths give `None`.
    pub fn claim_at(&self, path: &str) -> Option<String> {
        let mut value: Value = serde_json::from_str(&self.claims).ok()?;
        let path = path.strip_prefix('$').unwrap_or(path);
        for key in path.split('.').filter(|key| !key.is_empty()) {
            value = value.get_mut(key)?.take();
        }
        match value {
            Value::String(s) => Some(s),
            Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// The `prn` claim.
    pub fn principal(&self) -> Option<String> {
        self.claim(PRINCIPAL)
    }

    /// The `iss` claim.
    pub fn issuer(&self) -> Option<String> {
        self.claim(ISSUER)
    }

    /// The `aud` claim.
    pub fn audience(&self) -> Option<String> {
        self.claim(AUDIENCE)
    }

    /// The `exp` claim.
    pub fn expires(&self) -> Option<String> {
        self.claim(EXPIRES)
    }
}

impl fmt::Display for JwtToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

fn json_string(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

fn decode(segment: &str, name: &'static str) -> Result<Vec<u8>, TokenError> {
    WIRE.decode(segment).map_err(|source| TokenError::Base64 {
        segment: name,
        source,
    })
}

fn decode_text(segment: &str, name: &'static str) -> Result<String, TokenError> {
    String::from_utf8(decode(segment, name)?).map_err(|_| TokenError::Utf8(name))
}
