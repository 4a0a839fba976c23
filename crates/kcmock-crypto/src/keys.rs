//! Signing key loading and inspection.
//!
//! Keys are loaded from PEM pairs (PKCS#8 private key plus SPKI public key).
//! The public key is parsed once at load time to determine the signing
//! algorithm, derive a stable key ID and extract the raw parameters needed
//! for JWKS publication.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Error type for key loading.
#[derive(Debug, Error)]
pub enum KeyError {
    /// Key material could not be parsed.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// Key type or curve has no supported signing algorithm.
    #[error("unsupported key: {0}")]
    UnsupportedKey(String),
}

const DEFAULT_RSA_PRIVATE_PEM: &str = include_str!("../resources/rsa_private.pem");
const DEFAULT_RSA_PUBLIC_PEM: &str = include_str!("../resources/rsa_public.pem");

// Algorithm and curve OIDs as they appear inside a SubjectPublicKeyInfo.
const OID_RSA_ENCRYPTION: &[u8] = &[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x01, 0x01];
const OID_EC_PUBLIC_KEY: &[u8] = &[0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x02, 0x01];
const OID_CURVE_P256: &[u8] = &[0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x03, 0x01, 0x07];
const OID_CURVE_P384: &[u8] = &[0x2B, 0x81, 0x04, 0x00, 0x22];
const OID_CURVE_P521: &[u8] = &[0x2B, 0x81, 0x04, 0x00, 0x23];

/// Public key parameters in the raw form needed for a JWK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKeyComponents {
    /// RSA modulus and exponent, big-endian without leading zeros.
    Rsa {
        /// Modulus.
        n: Vec<u8>,
        /// Public exponent.
        e: Vec<u8>,
    },
    /// EC curve name and affine point coordinates.
    Ec {
        /// Curve name as used in JWKs, e.g. `P-256`.
        curve: &'static str,
        /// X coordinate.
        x: Vec<u8>,
        /// Y coordinate.
        y: Vec<u8>,
    },
}

/// A signing key pair with its derived metadata.
///
/// The signing algorithm is determined by the key type: RSA keys sign with
/// RS256, P-256 keys with ES256 and P-384 keys with ES384. P-521 keys are
/// rejected because the signing backend has no ES512 support.
pub struct KeyPair {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    key_id: String,
    components: PublicKeyComponents,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .field("encoding_key", &"[REDACTED]")
            .field("decoding_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    /// Loads a key pair from a PKCS#8 private key PEM and an SPKI public key PEM.
    ///
    /// # Errors
    ///
    /// Returns an error if either PEM cannot be parsed or the key type has no
    /// supported signing algorithm.
    pub fn from_pem(private_pem: &str, public_pem: &str) -> Result<Self, KeyError> {
        let spki = pem_body(public_pem)?;
        let (algorithm, components) = parse_spki(&spki)?;

        let (encoding_key, decoding_key) = match algorithm {
            Algorithm::RS256 => (
                EncodingKey::from_rsa_pem(private_pem.as_bytes())
                    .map_err(|e| KeyError::InvalidKey(format!("invalid RSA private key: {e}")))?,
                DecodingKey::from_rsa_pem(public_pem.as_bytes())
                    .map_err(|e| KeyError::InvalidKey(format!("invalid RSA public key: {e}")))?,
            ),
            _ => (
                EncodingKey::from_ec_pem(private_pem.as_bytes())
                    .map_err(|e| KeyError::InvalidKey(format!("invalid EC private key: {e}")))?,
                DecodingKey::from_ec_pem(public_pem.as_bytes())
                    .map_err(|e| KeyError::InvalidKey(format!("invalid EC public key: {e}")))?,
            ),
        };

        Ok(Self {
            encoding_key,
            decoding_key,
            algorithm,
            key_id: generate_key_id(&spki),
            components,
        })
    }

    /// Loads the embedded default RSA 2048 key pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded key material is corrupt.
    pub fn default_rsa() -> Result<Self, KeyError> {
        Self::from_pem(DEFAULT_RSA_PRIVATE_PEM, DEFAULT_RSA_PUBLIC_PEM)
    }

    /// Returns the key ID.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Returns the signing algorithm.
    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Returns the JWA name of the signing algorithm.
    #[must_use]
    pub const fn algorithm_name(&self) -> &'static str {
        match self.algorithm {
            Algorithm::ES256 => "ES256",
            Algorithm::ES384 => "ES384",
            _ => "RS256",
        }
    }

    /// Returns the key used for signing.
    #[must_use]
    pub const fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    /// Returns the key used for signature verification.
    #[must_use]
    pub const fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// Returns the raw public key parameters.
    #[must_use]
    pub const fn public_components(&self) -> &PublicKeyComponents {
        &self.components
    }
}

/// Generates a key ID from the public key bytes.
fn generate_key_id(spki: &[u8]) -> String {
    let hash = Sha256::digest(spki);
    URL_SAFE_NO_PAD.encode(&hash[..8])
}

/// Strips the PEM armor and decodes the base64 body.
fn pem_body(pem: &str) -> Result<Vec<u8>, KeyError> {
    let body: String = pem
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with("-----"))
        .collect();
    STANDARD
        .decode(body)
        .map_err(|e| KeyError::InvalidKey(format!("PEM body is not valid base64: {e}")))
}

/// Parses a `SubjectPublicKeyInfo`, returning the signing algorithm for the
/// key type and the raw public key parameters.
fn parse_spki(spki: &[u8]) -> Result<(Algorithm, PublicKeyComponents), KeyError> {
    // SubjectPublicKeyInfo is ASN.1 DER encoded:
    // SEQUENCE {
    //   SEQUENCE { OID algorithm, parameters }
    //   BIT STRING (the key itself)
    // }
    let mut pos = 0;

    if spki.get(pos) != Some(&0x30) {
        return Err(KeyError::InvalidKey("expected SPKI SEQUENCE".to_string()));
    }
    pos += 1;
    pos = skip_length(spki, pos)?;

    if spki.get(pos) != Some(&0x30) {
        return Err(KeyError::InvalidKey(
            "expected algorithm SEQUENCE".to_string(),
        ));
    }
    pos += 1;
    let alg_len = read_length(spki, pos)?;
    pos = skip_length(spki, pos)?;
    let alg_end = pos + alg_len;

    if spki.get(pos) != Some(&0x06) {
        return Err(KeyError::InvalidKey("expected algorithm OID".to_string()));
    }
    pos += 1;
    let oid_len = read_length(spki, pos)?;
    pos = skip_length(spki, pos)?;
    let alg_oid = read_bytes(spki, pos, oid_len)?;
    pos += oid_len;

    if alg_oid == OID_RSA_ENCRYPTION {
        let (n, e) = read_rsa_key(spki, alg_end)?;
        Ok((Algorithm::RS256, PublicKeyComponents::Rsa { n, e }))
    } else if alg_oid == OID_EC_PUBLIC_KEY {
        // The curve OID follows as the algorithm parameters.
        if spki.get(pos) != Some(&0x06) {
            return Err(KeyError::InvalidKey("expected curve OID".to_string()));
        }
        pos += 1;
        let curve_len = read_length(spki, pos)?;
        pos = skip_length(spki, pos)?;
        let curve_oid = read_bytes(spki, pos, curve_len)?;

        let (algorithm, curve, coord_size) = match curve_oid {
            oid if oid == OID_CURVE_P256 => (Algorithm::ES256, "P-256", 32),
            oid if oid == OID_CURVE_P384 => (Algorithm::ES384, "P-384", 48),
            oid if oid == OID_CURVE_P521 => {
                return Err(KeyError::UnsupportedKey(
                    "P-521 keys have no supported signing algorithm".to_string(),
                ));
            }
            _ => {
                return Err(KeyError::UnsupportedKey("unknown EC curve".to_string()));
            }
        };

        let (x, y) = read_ec_point(spki, alg_end, coord_size)?;
        Ok((algorithm, PublicKeyComponents::Ec { curve, x, y }))
    } else {
        Err(KeyError::UnsupportedKey(
            "only RSA and EC keys are supported".to_string(),
        ))
    }
}

/// Reads modulus and exponent from the BIT STRING following the algorithm
/// identifier of an RSA `SubjectPublicKeyInfo`.
fn read_rsa_key(spki: &[u8], mut pos: usize) -> Result<(Vec<u8>, Vec<u8>), KeyError> {
    // BIT STRING containing RSAPublicKey ::= SEQUENCE { modulus, exponent }
    if spki.get(pos) != Some(&0x03) {
        return Err(KeyError::InvalidKey("expected key BIT STRING".to_string()));
    }
    pos += 1;
    pos = skip_length(spki, pos)?;

    // Skip unused bits byte
    pos += 1;

    if spki.get(pos) != Some(&0x30) {
        return Err(KeyError::InvalidKey(
            "expected RSAPublicKey SEQUENCE".to_string(),
        ));
    }
    pos += 1;
    pos = skip_length(spki, pos)?;

    let (n, n_len) = read_integer(spki, pos)?;
    pos += n_len;
    let (e, _) = read_integer(spki, pos)?;

    Ok((n, e))
}

/// Reads an ASN.1 INTEGER, stripping the sign padding byte. Returns the value
/// and the total encoded size.
fn read_integer(data: &[u8], mut pos: usize) -> Result<(Vec<u8>, usize), KeyError> {
    let start = pos;
    if data.get(pos) != Some(&0x02) {
        return Err(KeyError::InvalidKey("expected INTEGER".to_string()));
    }
    pos += 1;
    let len = read_length(data, pos)?;
    pos = skip_length(data, pos)?;
    let mut value = read_bytes(data, pos, len)?.to_vec();
    if !value.is_empty() && value[0] == 0 {
        value.remove(0);
    }
    Ok((value, pos + len - start))
}

/// Reads the uncompressed EC point from the BIT STRING following the
/// algorithm identifier of an EC `SubjectPublicKeyInfo`.
fn read_ec_point(
    spki: &[u8],
    mut pos: usize,
    coord_size: usize,
) -> Result<(Vec<u8>, Vec<u8>), KeyError> {
    if spki.get(pos) != Some(&0x03) {
        return Err(KeyError::InvalidKey("expected key BIT STRING".to_string()));
    }
    pos += 1;
    pos = skip_length(spki, pos)?;

    // Skip unused bits byte
    pos += 1;

    // Uncompressed point: 0x04 || x || y
    if spki.get(pos) != Some(&0x04) {
        return Err(KeyError::InvalidKey(
            "expected uncompressed EC point".to_string(),
        ));
    }
    pos += 1;

    let x = read_bytes(spki, pos, coord_size)?.to_vec();
    let y = read_bytes(spki, pos + coord_size, coord_size)?.to_vec();
    Ok((x, y))
}

/// Reads an ASN.1 length field and returns the length value.
fn read_length(data: &[u8], pos: usize) -> Result<usize, KeyError> {
    let first = *data
        .get(pos)
        .ok_or_else(|| KeyError::InvalidKey("unexpected end of data".to_string()))?;

    if first < 0x80 {
        Ok(first as usize)
    } else {
        let num_bytes = (first & 0x7F) as usize;
        if num_bytes > 4 {
            return Err(KeyError::InvalidKey("length too large".to_string()));
        }
        let mut len = 0usize;
        for i in 0..num_bytes {
            let byte = *data
                .get(pos + 1 + i)
                .ok_or_else(|| KeyError::InvalidKey("unexpected end of length".to_string()))?;
            len = (len << 8) | (byte as usize);
        }
        Ok(len)
    }
}

/// Skips an ASN.1 length field and returns the new position.
fn skip_length(data: &[u8], pos: usize) -> Result<usize, KeyError> {
    let first = *data
        .get(pos)
        .ok_or_else(|| KeyError::InvalidKey("unexpected end of data".to_string()))?;

    if first < 0x80 {
        Ok(pos + 1)
    } else {
        let num_bytes = (first & 0x7F) as usize;
        Ok(pos + 1 + num_bytes)
    }
}

fn read_bytes(data: &[u8], pos: usize, len: usize) -> Result<&[u8], KeyError> {
    data.get(pos..pos + len)
        .ok_or_else(|| KeyError::InvalidKey("unexpected end of data".to_string()))
}
