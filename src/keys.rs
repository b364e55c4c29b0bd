// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Issuer key material: secret scalars, public points and their pairing.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use p384::{elliptic_curve::Field, NonZeroScalar, ProjectivePoint, Scalar};
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{
    Error, BAD_BASE64, BAD_CURVE, BAD_FIELD_LENGTH, BAD_KEY_TYPE, BAD_SCALAR, KEY_PAIR_MISMATCH,
    OFF_CURVE, ZERO_SECRET,
};
use crate::group::{decode_point, decode_scalar, point_bytes, scalar_bytes, POINT_LEN, SCALAR_LEN};

/// Key expiry as microseconds since the Unix epoch.
///
/// Constructed with an explicit unit. Nothing in this crate guesses whether
/// a raw integer is seconds, milliseconds or microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Zeroize)]
pub struct Expiry(u64);

impl Expiry {
    pub const fn from_unix_micros(micros: u64) -> Self {
        Self(micros)
    }

    pub const fn from_unix_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(1_000))
    }

    pub const fn from_unix_seconds(seconds: u64) -> Self {
        Self(seconds.saturating_mul(1_000_000))
    }

    pub const fn micros(self) -> u64 {
        self.0
    }
}

/// Issuer secret key: a nonzero P-384 scalar with its key id and expiry.
///
/// Zeroed on drop. The scalar is immutable after construction; the id and
/// expiry are rewritten only through the owning [`KeyPair`].
#[derive(Clone, Debug, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    pub(crate) id: u32,
    pub(crate) scalar: Scalar,
    pub(crate) expiry: Expiry,
}

impl SecretKey {
    /// Construct from a raw scalar. The zero scalar is rejected.
    pub fn new(id: u32, scalar: Scalar, expiry: Expiry) -> Result<Self, Error> {
        if bool::from(scalar.is_zero()) {
            return Err(Error::InvalidKey(ZERO_SECRET));
        }
        Ok(Self { id, scalar, expiry })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn expiry(&self) -> Expiry {
        self.expiry
    }

    /// The secret scalar.
    pub fn scalar(&self) -> &Scalar {
        &self.scalar
    }
}

/// Issuer public key: a non-identity point with its id, expiry and a cache
/// of its uncompressed encoding.
///
/// For a well-formed pair the point is the secret scalar times the base
/// generator. The relation is not enforced on import, but every consumer of
/// the pair relies on it.
#[derive(Clone, Debug, PartialEq)]
pub struct PublicKey {
    pub(crate) id: u32,
    pub(crate) point: ProjectivePoint,
    pub(crate) encoded: [u8; POINT_LEN],
    pub(crate) expiry: Expiry,
}

impl PublicKey {
    pub fn new(id: u32, point: ProjectivePoint, expiry: Expiry) -> Self {
        let encoded = point_bytes(&point);
        Self { id, point, encoded, expiry }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn expiry(&self) -> Expiry {
        self.expiry
    }

    pub fn point(&self) -> &ProjectivePoint {
        &self.point
    }

    /// The cached uncompressed encoding.
    pub fn as_bytes(&self) -> &[u8; POINT_LEN] {
        &self.encoded
    }

    /// `u32 id ‖ point`, the value advertised in key commitment documents.
    pub fn commitment_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + POINT_LEN);
        out.extend_from_slice(&self.id.to_be_bytes());
        out.extend_from_slice(&self.encoded);
        out
    }

    pub fn commitment_base64(&self) -> String {
        STANDARD.encode(self.commitment_bytes())
    }
}

/// A secret/public key pair sharing one id and expiry.
#[derive(Clone, Debug)]
pub struct KeyPair {
    public: PublicKey,
    secret: SecretKey,
}

impl KeyPair {
    /// Generate a fresh key pair under the given id and expiry.
    pub fn generate(id: u32, expiry: Expiry, rng: &mut impl CryptoRngCore) -> Self {
        let scalar = *NonZeroScalar::random(rng).as_ref();
        let public = PublicKey::new(id, ProjectivePoint::GENERATOR * scalar, expiry);
        let secret = SecretKey { id, scalar, expiry };
        Self { public, secret }
    }

    /// Build a pair from a secret scalar, deriving the public point.
    pub fn from_secret_scalar(id: u32, scalar: Scalar, expiry: Expiry) -> Result<Self, Error> {
        let secret = SecretKey::new(id, scalar, expiry)?;
        let public = PublicKey::new(id, ProjectivePoint::GENERATOR * scalar, expiry);
        Ok(Self { public, secret })
    }

    /// Assemble a pair from existing halves. The ids and expiries must
    /// agree; the discrete-log relation between them is the caller's
    /// responsibility.
    pub fn new(secret: SecretKey, public: PublicKey) -> Result<Self, Error> {
        if secret.id != public.id || secret.expiry != public.expiry {
            return Err(Error::InvalidKey(KEY_PAIR_MISMATCH));
        }
        Ok(Self { public, secret })
    }

    /// Import from a JWK-shaped record.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self, Error> {
        jwk.to_key_pair()
    }

    pub fn id(&self) -> u32 {
        self.public.id
    }

    pub fn expiry(&self) -> Expiry {
        self.public.expiry
    }

    pub fn public(&self) -> &PublicKey {
        &self.public
    }

    pub fn secret(&self) -> &SecretKey {
        &self.secret
    }

    /// Rewrite the key id on both halves.
    pub fn set_id(&mut self, id: u32) {
        self.public.id = id;
        self.secret.id = id;
    }

    /// Rewrite the expiry on both halves.
    pub fn set_expiry(&mut self, expiry: Expiry) {
        self.public.expiry = expiry;
        self.secret.expiry = expiry;
    }
}

/// JWK-shaped issuer key record.
///
/// `x`, `y` and `d` are unpadded base64url values, 48 bytes each after
/// decoding; `exp` is seconds since the Unix epoch. The public point is
/// taken from `0x04 ‖ x ‖ y` as supplied, it is not rederived from `d`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub crv: String,
    pub kid: u32,
    pub x: String,
    pub y: String,
    pub d: String,
    pub exp: u64,
}

impl Jwk {
    /// Serialize a key pair into the JWK shape.
    pub fn from_key_pair(pair: &KeyPair) -> Self {
        let encoded = pair.public.as_bytes();
        Self {
            kty: "EC".into(),
            crv: "P-384".into(),
            kid: pair.id(),
            x: URL_SAFE_NO_PAD.encode(&encoded[1..1 + SCALAR_LEN]),
            y: URL_SAFE_NO_PAD.encode(&encoded[1 + SCALAR_LEN..]),
            d: URL_SAFE_NO_PAD.encode(scalar_bytes(&pair.secret.scalar)),
            exp: pair.expiry().micros() / 1_000_000,
        }
    }

    fn to_key_pair(&self) -> Result<KeyPair, Error> {
        if self.kty != "EC" {
            return Err(Error::InvalidKey(BAD_KEY_TYPE));
        }
        if self.crv != "P-384" {
            return Err(Error::InvalidKey(BAD_CURVE));
        }
        let x = decode_coordinate(&self.x)?;
        let y = decode_coordinate(&self.y)?;
        let d = decode_coordinate(&self.d)?;

        let mut uncompressed = [0u8; POINT_LEN];
        uncompressed[0] = 0x04;
        uncompressed[1..1 + SCALAR_LEN].copy_from_slice(&x);
        uncompressed[1 + SCALAR_LEN..].copy_from_slice(&y);
        let (point, _) = decode_point(&uncompressed);
        let point =
            Option::<ProjectivePoint>::from(point).ok_or(Error::InvalidKey(OFF_CURVE))?;

        let (scalar, _) = decode_scalar(&d);
        let scalar = Option::<Scalar>::from(scalar).ok_or(Error::InvalidKey(BAD_SCALAR))?;

        let expiry = Expiry::from_unix_seconds(self.exp);
        let secret = SecretKey::new(self.kid, scalar, expiry)?;
        Ok(KeyPair { public: PublicKey::new(self.kid, point, expiry), secret })
    }
}

fn decode_coordinate(value: &str) -> Result<[u8; SCALAR_LEN], Error> {
    let bytes = URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|_| Error::InvalidKey(BAD_BASE64))?;
    bytes.try_into().map_err(|_| Error::InvalidKey(BAD_FIELD_LENGTH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::OsRng;

    fn expiry() -> Expiry {
        Expiry::from_unix_seconds(1_893_456_000)
    }

    #[test]
    fn test_generate() {
        let pair = KeyPair::generate(7, expiry(), &mut OsRng);
        assert_eq!(pair.id(), 7);
        assert_eq!(pair.secret().id(), 7);
        assert_eq!(pair.public().id(), 7);
        assert!(!bool::from(pair.secret().scalar().is_zero()));
        assert_eq!(
            *pair.public().point(),
            ProjectivePoint::GENERATOR * pair.secret().scalar()
        );
        assert_eq!(pair.public().as_bytes(), &point_bytes(pair.public().point()));
    }

    #[test]
    fn test_zero_secret_rejected() {
        assert_eq!(
            SecretKey::new(0, Scalar::ZERO, expiry()).unwrap_err(),
            Error::InvalidKey(ZERO_SECRET)
        );
    }

    #[test]
    fn test_id_and_expiry_propagate() {
        let mut pair = KeyPair::generate(1, expiry(), &mut OsRng);
        pair.set_id(9);
        pair.set_expiry(Expiry::from_unix_micros(42));
        assert_eq!(pair.id(), 9);
        assert_eq!(pair.secret().id(), 9);
        assert_eq!(pair.public().id(), 9);
        assert_eq!(pair.expiry().micros(), 42);
        assert_eq!(pair.secret().expiry().micros(), 42);
        assert_eq!(pair.public().expiry().micros(), 42);
    }

    #[test]
    fn test_pair_halves_must_agree() {
        let a = KeyPair::generate(1, expiry(), &mut OsRng);
        let b = KeyPair::generate(2, expiry(), &mut OsRng);
        let err = KeyPair::new(a.secret().clone(), b.public().clone()).unwrap_err();
        assert_eq!(err, Error::InvalidKey(KEY_PAIR_MISMATCH));
    }

    #[test]
    fn test_expiry_units() {
        assert_eq!(Expiry::from_unix_seconds(5).micros(), 5_000_000);
        assert_eq!(Expiry::from_unix_millis(5).micros(), 5_000);
        assert_eq!(Expiry::from_unix_micros(5).micros(), 5);
    }

    #[test]
    fn test_jwk_round_trip() {
        let pair = KeyPair::generate(3, expiry(), &mut OsRng);
        let jwk = Jwk::from_key_pair(&pair);
        assert_eq!(jwk.kty, "EC");
        assert_eq!(jwk.crv, "P-384");
        assert_eq!(jwk.exp, 1_893_456_000);

        let imported = KeyPair::from_jwk(&jwk).unwrap();
        assert_eq!(imported.id(), pair.id());
        assert_eq!(imported.expiry(), pair.expiry());
        assert_eq!(imported.public().as_bytes(), pair.public().as_bytes());
        assert_eq!(imported.secret().scalar(), pair.secret().scalar());
    }

    #[test]
    fn test_jwk_serde_round_trip() {
        let pair = KeyPair::generate(3, expiry(), &mut OsRng);
        let jwk = Jwk::from_key_pair(&pair);
        let json = serde_json::to_string(&jwk).unwrap();
        let parsed: Jwk = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, jwk);
    }

    #[test]
    fn test_jwk_rejects_bad_material() {
        let pair = KeyPair::generate(0, expiry(), &mut OsRng);
        let jwk = Jwk::from_key_pair(&pair);

        let mut wrong_kty = jwk.clone();
        wrong_kty.kty = "OKP".into();
        assert_eq!(
            KeyPair::from_jwk(&wrong_kty).unwrap_err(),
            Error::InvalidKey(BAD_KEY_TYPE)
        );

        let mut wrong_crv = jwk.clone();
        wrong_crv.crv = "P-256".into();
        assert_eq!(
            KeyPair::from_jwk(&wrong_crv).unwrap_err(),
            Error::InvalidKey(BAD_CURVE)
        );

        let mut short_x = jwk.clone();
        short_x.x = URL_SAFE_NO_PAD.encode([0u8; 16]);
        assert_eq!(
            KeyPair::from_jwk(&short_x).unwrap_err(),
            Error::InvalidKey(BAD_FIELD_LENGTH)
        );

        let mut off_curve = jwk.clone();
        let mut y = URL_SAFE_NO_PAD.decode(&off_curve.y).unwrap();
        y[SCALAR_LEN - 1] ^= 0x01;
        off_curve.y = URL_SAFE_NO_PAD.encode(y);
        assert_eq!(
            KeyPair::from_jwk(&off_curve).unwrap_err(),
            Error::InvalidKey(OFF_CURVE)
        );

        let mut zero_d = jwk.clone();
        zero_d.d = URL_SAFE_NO_PAD.encode([0u8; SCALAR_LEN]);
        assert_eq!(
            KeyPair::from_jwk(&zero_d).unwrap_err(),
            Error::InvalidKey(ZERO_SECRET)
        );
    }

    #[test]
    fn test_commitment_bytes() {
        let pair = KeyPair::generate(0x0102_0304, expiry(), &mut OsRng);
        let bytes = pair.public().commitment_bytes();
        assert_eq!(bytes.len(), 4 + POINT_LEN);
        assert_eq!(&bytes[..4], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(&bytes[4..], pair.public().as_bytes());
        assert_eq!(
            STANDARD.decode(pair.public().commitment_base64()).unwrap(),
            bytes
        );
    }
}
