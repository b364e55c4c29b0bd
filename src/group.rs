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

//! P-384 group primitives and the protocol version constants.
//!
//! Points travel as 97-byte X9.62 uncompressed encodings, scalars as
//! 48-byte big-endian values. Hash-to-curve and hash-to-scalar instantiate
//! the `P384_XMD:SHA-XXX_SSWU_RO_` suites with the version's domain
//! separation tags; the trailing NUL bytes are part of every tag.

use elliptic_curve::generic_array::typenum::Unsigned;
use elliptic_curve::hash2curve::{ExpandMsgXmd, GroupDigest};
use p384::{
    elliptic_curve::{
        sec1::{FromEncodedPoint, ModulusSize, ToEncodedPoint},
        subtle::{Choice, CtOption},
        FieldBytesSize, PrimeField,
    },
    EncodedPoint, FieldBytes, NistP384, ProjectivePoint, Scalar,
};
use sha2::{Sha384, Sha512};

/// Canonical big-endian scalar encoding.
pub const SCALAR_LEN: usize = FieldBytesSize::<NistP384>::USIZE;
/// X9.62 uncompressed point encoding: `0x04 ‖ X(48) ‖ Y(48)`.
pub const POINT_LEN: usize =
    <FieldBytesSize<NistP384> as ModulusSize>::UncompressedPointSize::USIZE;
/// Fixed token nonce length in redeem requests.
pub const NONCE_LEN: usize = 64;
/// A DLEQ proof is two serialized scalars.
pub const PROOF_LEN: usize = 2 * SCALAR_LEN;

const V1_HASH_TO_GROUP_DST: &[u8] = b"HashToGroup-OPRFV1-\x01-P384-SHA384\0";
const V1_HASH_TO_SCALAR_DST: &[u8] = b"HashToScalar-OPRFV1-\x01-P384-SHA384\0";
const V3_HASH_TO_GROUP_DST: &[u8] = b"TrustToken VOPRF Experiment V2 HashToGroup\0";
const V3_HASH_TO_SCALAR_DST: &[u8] = b"TrustToken VOPRF Experiment V2 HashToScalar\0";

// Helper to encode a point and append its uncompressed encoding to a byte
// vector.
pub(crate) fn encode_point(point: &ProjectivePoint, out: &mut Vec<u8>) {
    out.extend_from_slice(point.to_affine().to_encoded_point(false).as_bytes());
}

/// Serialize a point to its fixed-width uncompressed encoding.
pub fn point_bytes(point: &ProjectivePoint) -> [u8; POINT_LEN] {
    let encoded = point.to_affine().to_encoded_point(false);
    let mut bytes = [0u8; POINT_LEN];
    bytes.copy_from_slice(encoded.as_bytes());
    bytes
}

// Helper to decode a point from the head of a byte slice. Returns a CtOption
// of the resulting point and the remaining input. Off-curve encodings and
// wrong SEC1 tags decode to none. Panics if the input is too small.
pub(crate) fn decode_point(input: &[u8]) -> (CtOption<ProjectivePoint>, &[u8]) {
    let (head, rest) = input.split_at(POINT_LEN);
    let point = EncodedPoint::from_bytes(head)
        .map(|encoded| ProjectivePoint::from_encoded_point(&encoded))
        .unwrap_or_else(|_| CtOption::new(ProjectivePoint::IDENTITY, Choice::from(0u8)));
    (point, rest)
}

// Helper to encode a scalar and append it to a byte vector.
pub(crate) fn encode_scalar(scalar: &Scalar, out: &mut Vec<u8>) {
    out.extend_from_slice(scalar.to_bytes().as_ref());
}

/// Serialize a scalar to its fixed-width big-endian encoding.
pub fn scalar_bytes(scalar: &Scalar) -> [u8; SCALAR_LEN] {
    let mut bytes = [0u8; SCALAR_LEN];
    bytes.copy_from_slice(&scalar.to_bytes());
    bytes
}

// Helper to decode a scalar from the head of a byte slice. The input is
// interpreted as canonical big-endian; values at or above the group order
// decode to none, nothing is reduced. Panics if the input is too small.
pub(crate) fn decode_scalar(input: &[u8]) -> (CtOption<Scalar>, &[u8]) {
    (
        Scalar::from_repr(*FieldBytes::from_slice(&input[..SCALAR_LEN])),
        &input[SCALAR_LEN..],
    )
}

/// Protocol profile selecting the hash function and domain separation tags.
///
/// Both profiles share the P-384 group and wire formats; they differ only in
/// hash and DSTs, so signatures and proofs produced under one never verify
/// under the other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
    /// `PrivateStateTokenV1VOPRF`: SHA-384 with the OPRF(P-384, SHA-384)
    /// ciphersuite tags.
    V1Voprf,
    /// `PrivateStateTokenV3VOPRF`: SHA-512 with the TrustToken experiment
    /// tags.
    #[default]
    V3Voprf,
}

impl ProtocolVersion {
    /// Protocol name as it appears in key commitment documents.
    pub const fn name(self) -> &'static str {
        match self {
            ProtocolVersion::V1Voprf => "PrivateStateTokenV1VOPRF",
            ProtocolVersion::V3Voprf => "PrivateStateTokenV3VOPRF",
        }
    }

    /// Hash-to-curve suite identifier.
    pub const fn suite(self) -> &'static str {
        match self {
            ProtocolVersion::V1Voprf => "P384_XMD:SHA-384_SSWU_RO_",
            ProtocolVersion::V3Voprf => "P384_XMD:SHA-512_SSWU_RO_",
        }
    }

    /// Lookup by protocol name, for the transport boundary only.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "PrivateStateTokenV1VOPRF" => Some(ProtocolVersion::V1Voprf),
            "PrivateStateTokenV3VOPRF" => Some(ProtocolVersion::V3Voprf),
            _ => None,
        }
    }

    /// Domain separation tag for hash-to-group, NUL terminator included.
    pub const fn hash_to_group_dst(self) -> &'static [u8] {
        match self {
            ProtocolVersion::V1Voprf => V1_HASH_TO_GROUP_DST,
            ProtocolVersion::V3Voprf => V3_HASH_TO_GROUP_DST,
        }
    }

    /// Domain separation tag for hash-to-scalar, NUL terminator included.
    pub const fn hash_to_scalar_dst(self) -> &'static [u8] {
        match self {
            ProtocolVersion::V1Voprf => V1_HASH_TO_SCALAR_DST,
            ProtocolVersion::V3Voprf => V3_HASH_TO_SCALAR_DST,
        }
    }

    /// Hash an arbitrary byte string to a group element.
    ///
    /// Instantiates the version's `P384_XMD:SHA-XXX_SSWU_RO_` suite. The
    /// output is never the identity by construction.
    pub fn hash_to_group(self, msg: &[u8]) -> ProjectivePoint {
        let msgs: &[&[u8]] = &[msg];
        let dst: &[&[u8]] = &[self.hash_to_group_dst()];
        // Safety (see docs for ExpandMsgXmd)
        // - the DST is not empty
        // - the requested output is two 72-byte field elements, far below
        //   the 255-block expansion limit of either hash
        match self {
            ProtocolVersion::V1Voprf => {
                NistP384::hash_from_bytes::<ExpandMsgXmd<Sha384>>(msgs, dst).unwrap()
            }
            ProtocolVersion::V3Voprf => {
                NistP384::hash_from_bytes::<ExpandMsgXmd<Sha512>>(msgs, dst).unwrap()
            }
        }
    }

    /// Hash the concatenation of `msgs` to a scalar.
    ///
    /// This is `hash_to_field` with `m = 1` and `L = 72` over the group
    /// order, using `expand_message_xmd` with the version's hash.
    pub fn hash_to_scalar(self, msgs: &[&[u8]]) -> Scalar {
        let dst: &[&[u8]] = &[self.hash_to_scalar_dst()];
        // Safety: as for hash_to_group, a single 72-byte element.
        match self {
            ProtocolVersion::V1Voprf => {
                NistP384::hash_to_scalar::<ExpandMsgXmd<Sha384>>(msgs, dst).unwrap()
            }
            ProtocolVersion::V3Voprf => {
                NistP384::hash_to_scalar::<ExpandMsgXmd<Sha512>>(msgs, dst).unwrap()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p384::elliptic_curve::Field;
    use rand_core::OsRng;

    #[test]
    fn test_scalar_round_trip() {
        let scalar = Scalar::random(&mut OsRng);
        let mut bytes = vec![];
        encode_scalar(&scalar, &mut bytes);
        assert_eq!(bytes.len(), SCALAR_LEN);
        let (decoded, rest) = decode_scalar(&bytes);
        assert!(rest.is_empty());
        assert_eq!(decoded.unwrap(), scalar);
    }

    #[test]
    fn test_scalar_decode_rejects_non_canonical() {
        // The all-ones value exceeds the group order.
        let bytes = [0xff; SCALAR_LEN];
        let (decoded, _) = decode_scalar(&bytes);
        assert!(bool::from(decoded.is_none()));
    }

    #[test]
    fn test_point_round_trip() {
        let point = ProjectivePoint::GENERATOR * Scalar::random(&mut OsRng);
        let mut bytes = vec![];
        encode_point(&point, &mut bytes);
        assert_eq!(bytes.len(), POINT_LEN);
        assert_eq!(bytes.as_slice(), point_bytes(&point).as_slice());
        let (decoded, rest) = decode_point(&bytes);
        assert!(rest.is_empty());
        assert_eq!(decoded.unwrap(), point);
    }

    #[test]
    fn test_point_decode_rejects_bad_tag() {
        let mut bytes = point_bytes(&ProjectivePoint::GENERATOR);
        bytes[0] = 0x05;
        let (decoded, _) = decode_point(&bytes);
        assert!(bool::from(decoded.is_none()));
    }

    #[test]
    fn test_point_decode_rejects_off_curve() {
        // Flipping the low bit of Y leaves neither of the two roots of the
        // curve equation, so the encoding cannot be on the curve.
        let mut bytes = point_bytes(&ProjectivePoint::GENERATOR);
        bytes[POINT_LEN - 1] ^= 0x01;
        let (decoded, _) = decode_point(&bytes);
        assert!(bool::from(decoded.is_none()));
    }

    #[test]
    fn test_versions_produce_disjoint_group_elements() {
        let msg = b"version separation";
        assert_ne!(
            ProtocolVersion::V1Voprf.hash_to_group(msg),
            ProtocolVersion::V3Voprf.hash_to_group(msg)
        );
    }

    #[test]
    fn test_versions_produce_disjoint_scalars() {
        let msgs: &[&[u8]] = &[b"version separation"];
        assert_ne!(
            ProtocolVersion::V1Voprf.hash_to_scalar(msgs),
            ProtocolVersion::V3Voprf.hash_to_scalar(msgs)
        );
    }

    #[test]
    fn test_hash_to_scalar_part_boundaries_do_not_matter() {
        let joined = ProtocolVersion::V3Voprf.hash_to_scalar(&[b"ab", b"cd"]);
        let whole = ProtocolVersion::V3Voprf.hash_to_scalar(&[b"abcd"]);
        assert_eq!(joined, whole);
    }

    #[test]
    fn test_version_names() {
        assert_eq!(ProtocolVersion::default(), ProtocolVersion::V3Voprf);
        for version in [ProtocolVersion::V1Voprf, ProtocolVersion::V3Voprf] {
            assert_eq!(ProtocolVersion::from_name(version.name()), Some(version));
        }
        assert_eq!(ProtocolVersion::from_name("PrivateStateTokenV2PMB"), None);
        assert_eq!(ProtocolVersion::V1Voprf.suite(), "P384_XMD:SHA-384_SSWU_RO_");
        assert_eq!(ProtocolVersion::V3Voprf.suite(), "P384_XMD:SHA-512_SSWU_RO_");
    }

    #[test]
    fn test_dsts_are_nul_terminated() {
        for version in [ProtocolVersion::V1Voprf, ProtocolVersion::V3Voprf] {
            assert_eq!(version.hash_to_group_dst().last(), Some(&0u8));
            assert_eq!(version.hash_to_scalar_dst().last(), Some(&0u8));
        }
    }
}
