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

//! Wire formats for the protocol messages.
//!
//! All multi-byte integers are big-endian and every variable-length field
//! carries a length prefix. Messages cross the transport boundary as padded
//! standard-alphabet base64 strings.
//!
//! Decoders require the full encoded prefix and ignore trailing bytes. The
//! one deliberate leniency is inside [`IssueRequest`]: an element that is
//! not a valid curve point is dropped and counted rather than failing the
//! whole request.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use p384::ProjectivePoint;

use crate::dleq::DleqProof;
use crate::error::{
    Error, BAD_BASE64, BAD_PROOF_LENGTH, BAD_TOKEN_LENGTH, DECODING_ERROR, INPUT_TOO_SHORT,
};
use crate::group::{decode_point, encode_point, NONCE_LEN, POINT_LEN, PROOF_LEN};

/// Serialized length of a [`Token`].
pub const TOKEN_LEN: usize = 4 + NONCE_LEN + POINT_LEN;

/// Types with a canonical byte encoding.
pub trait Encodable {
    /// Append the encoding of `self` to `out`.
    fn encode(&self, out: &mut Vec<u8>);

    /// The encoding as a fresh byte vector.
    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode(&mut out);
        out
    }

    /// The encoding as a padded standard-alphabet base64 string.
    fn encode_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }
}

/// Types decodable from their canonical byte encoding.
pub trait Decodable: Sized {
    /// Decode from the head of `input`.
    fn decode(input: &[u8]) -> Result<Self, Error>;

    /// Decode from a padded standard-alphabet base64 string.
    fn decode_base64(input: &str) -> Result<Self, Error> {
        let bytes = STANDARD.decode(input).map_err(|_| Error::Decode(BAD_BASE64))?;
        Self::decode(&bytes)
    }
}

fn read_u16(input: &[u8]) -> Result<(u16, &[u8]), Error> {
    if input.len() < 2 {
        return Err(Error::Decode(INPUT_TOO_SHORT));
    }
    let (head, rest) = input.split_at(2);
    Ok((u16::from_be_bytes([head[0], head[1]]), rest))
}

fn read_u32(input: &[u8]) -> Result<(u32, &[u8]), Error> {
    if input.len() < 4 {
        return Err(Error::Decode(INPUT_TOO_SHORT));
    }
    let (head, rest) = input.split_at(4);
    Ok((u32::from_be_bytes([head[0], head[1], head[2], head[3]]), rest))
}

/// A batch of blinded elements to sign: `u16 count ‖ point[count]`.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueRequest {
    /// Blinded nonces that survived decoding, in request order.
    pub nonces: Vec<ProjectivePoint>,
    /// Elements dropped during decoding because they were not valid curve
    /// points. The response index space matches `nonces` only.
    pub skipped: u16,
}

impl IssueRequest {
    pub fn new(nonces: Vec<ProjectivePoint>) -> Self {
        Self { nonces, skipped: 0 }
    }
}

impl Encodable for IssueRequest {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.nonces.len() as u16).to_be_bytes());
        for nonce in &self.nonces {
            encode_point(nonce, out);
        }
    }
}

impl Decodable for IssueRequest {
    fn decode(input: &[u8]) -> Result<Self, Error> {
        let (count, mut input) = read_u16(input)?;
        let mut nonces = Vec::with_capacity(count as usize);
        let mut skipped = 0u16;
        for index in 0..count {
            if input.len() < POINT_LEN {
                return Err(Error::Decode(INPUT_TOO_SHORT));
            }
            let (point, rest) = decode_point(input);
            input = rest;
            match Option::<ProjectivePoint>::from(point) {
                Some(point) => nonces.push(point),
                None => {
                    tracing::debug!(index = index as u32, "dropping malformed blinded element");
                    skipped += 1;
                }
            }
        }
        Ok(Self { nonces, skipped })
    }
}

/// Signed batch plus the DLEQ proof binding it to the issuer's public key:
/// `u16 issued ‖ u32 key_id ‖ point[issued] ‖ u16 proof_len ‖ proof`.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueResponse {
    pub key_id: u32,
    /// `signed[i]` is the secret scalar times the i-th surviving nonce of
    /// the request.
    pub signed: Vec<ProjectivePoint>,
    pub proof: DleqProof,
}

impl Encodable for IssueResponse {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.signed.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.key_id.to_be_bytes());
        for point in &self.signed {
            encode_point(point, out);
        }
        out.extend_from_slice(&(PROOF_LEN as u16).to_be_bytes());
        self.proof.encode(out);
    }
}

impl Decodable for IssueResponse {
    fn decode(input: &[u8]) -> Result<Self, Error> {
        let (issued, input) = read_u16(input)?;
        let (key_id, mut input) = read_u32(input)?;
        let mut signed = Vec::with_capacity(issued as usize);
        for _ in 0..issued {
            if input.len() < POINT_LEN {
                return Err(Error::Decode(INPUT_TOO_SHORT));
            }
            let (point, rest) = decode_point(input);
            input = rest;
            signed.push(Option::from(point).ok_or(Error::Decode(DECODING_ERROR))?);
        }
        let (proof_len, input) = read_u16(input)?;
        if proof_len as usize != PROOF_LEN {
            return Err(Error::Decode(BAD_PROOF_LENGTH));
        }
        let proof = DleqProof::decode(input)?;
        Ok(Self { key_id, signed, proof })
    }
}

/// An unblinded token presented at redemption:
/// `u32 key_id ‖ nonce[64] ‖ point`.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub key_id: u32,
    pub nonce: [u8; NONCE_LEN],
    pub point: ProjectivePoint,
}

impl Encodable for Token {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.key_id.to_be_bytes());
        out.extend_from_slice(&self.nonce);
        encode_point(&self.point, out);
    }
}

impl Decodable for Token {
    fn decode(input: &[u8]) -> Result<Self, Error> {
        let (key_id, input) = read_u32(input)?;
        if input.len() < NONCE_LEN + POINT_LEN {
            return Err(Error::Decode(INPUT_TOO_SHORT));
        }
        let (nonce_bytes, input) = input.split_at(NONCE_LEN);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(nonce_bytes);
        let (point, _) = decode_point(input);
        let point = Option::from(point).ok_or(Error::Decode(DECODING_ERROR))?;
        Ok(Self { key_id, nonce, point })
    }
}

/// A token redemption:
/// `u16 token_len ‖ token ‖ u16 client_data_len ‖ client_data`.
#[derive(Debug, Clone, PartialEq)]
pub struct RedeemRequest {
    pub token: Token,
    /// Opaque blob, conventionally CBOR. Not interpreted here.
    pub client_data: Vec<u8>,
}

impl Encodable for RedeemRequest {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(TOKEN_LEN as u16).to_be_bytes());
        self.token.encode(out);
        out.extend_from_slice(&(self.client_data.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.client_data);
    }
}

impl Decodable for RedeemRequest {
    fn decode(input: &[u8]) -> Result<Self, Error> {
        let (token_len, input) = read_u16(input)?;
        if token_len as usize != TOKEN_LEN {
            return Err(Error::Decode(BAD_TOKEN_LENGTH));
        }
        if input.len() < TOKEN_LEN {
            return Err(Error::Decode(INPUT_TOO_SHORT));
        }
        let token = Token::decode(&input[..TOKEN_LEN])?;
        let input = &input[TOKEN_LEN..];
        let (client_data_len, input) = read_u16(input)?;
        if input.len() < client_data_len as usize {
            return Err(Error::Decode(INPUT_TOO_SHORT));
        }
        let client_data = input[..client_data_len as usize].to_vec();
        Ok(Self { token, client_data })
    }
}

/// The redemption record released on success. Pass-through payload; any
/// outer framing is the transport's concern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedeemResponse {
    pub record: Vec<u8>,
}

impl Encodable for RedeemResponse {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.record);
    }
}

impl Decodable for RedeemResponse {
    fn decode(input: &[u8]) -> Result<Self, Error> {
        Ok(Self { record: input.to_vec() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{point_bytes, ProtocolVersion};
    use p384::elliptic_curve::Field;
    use p384::Scalar;
    use rand_core::OsRng;

    fn sample_points(count: usize) -> Vec<ProjectivePoint> {
        (0..count)
            .map(|i| ProtocolVersion::V3Voprf.hash_to_group(&(i as u32).to_be_bytes()))
            .collect()
    }

    fn sample_proof() -> DleqProof {
        DleqProof { c: Scalar::ONE, u: -Scalar::ONE }
    }

    #[test]
    fn test_issue_request_round_trip() {
        let request = IssueRequest::new(sample_points(3));
        let bytes = request.to_bytes();
        assert_eq!(bytes.len(), 2 + 3 * POINT_LEN);
        assert_eq!(&bytes[..2], &[0, 3]);
        assert_eq!(IssueRequest::decode(&bytes).unwrap(), request);
    }

    #[test]
    fn test_issue_request_empty_round_trip() {
        let request = IssueRequest::new(vec![]);
        let bytes = request.to_bytes();
        assert_eq!(bytes, vec![0, 0]);
        assert_eq!(IssueRequest::decode(&bytes).unwrap(), request);
    }

    #[test]
    fn test_issue_request_drops_malformed_elements() {
        let points = sample_points(3);
        let mut bytes = vec![0, 3];
        bytes.extend_from_slice(&point_bytes(&points[0]));
        let mut bad = point_bytes(&points[1]);
        bad[0] = 0x05;
        bytes.extend_from_slice(&bad);
        bytes.extend_from_slice(&point_bytes(&points[2]));

        let decoded = IssueRequest::decode(&bytes).unwrap();
        assert_eq!(decoded.skipped, 1);
        assert_eq!(decoded.nonces, vec![points[0], points[2]]);
    }

    #[test]
    fn test_issue_request_short_read_is_fatal() {
        let mut bytes = vec![0, 2];
        bytes.extend_from_slice(&point_bytes(&sample_points(1)[0]));
        assert_eq!(
            IssueRequest::decode(&bytes).unwrap_err(),
            Error::Decode(INPUT_TOO_SHORT)
        );
    }

    #[test]
    fn test_issue_request_count_prefix_is_big_endian() {
        let request = IssueRequest::new(vec![ProjectivePoint::GENERATOR; 300]);
        let bytes = request.to_bytes();
        assert_eq!(&bytes[..2], &[0x01, 0x2c]);
        let decoded = IssueRequest::decode(&bytes).unwrap();
        assert_eq!(decoded.nonces.len(), 300);
        assert_eq!(decoded.skipped, 0);
    }

    #[test]
    fn test_issue_request_count_ceiling_does_not_overflow() {
        // A count prefix at the u16 ceiling with no body is a short read,
        // not an arithmetic failure.
        assert_eq!(
            IssueRequest::decode(&[0xff, 0xff]).unwrap_err(),
            Error::Decode(INPUT_TOO_SHORT)
        );
    }

    #[test]
    fn test_issue_response_round_trip() {
        let response = IssueResponse {
            key_id: 0xdead_beef,
            signed: sample_points(2),
            proof: sample_proof(),
        };
        let bytes = response.to_bytes();
        assert_eq!(bytes.len(), 2 + 4 + 2 * POINT_LEN + 2 + PROOF_LEN);
        assert_eq!(IssueResponse::decode(&bytes).unwrap(), response);
    }

    #[test]
    fn test_issue_response_rejects_malformed_point() {
        let response = IssueResponse {
            key_id: 1,
            signed: sample_points(1),
            proof: sample_proof(),
        };
        let mut bytes = response.to_bytes();
        // Inside a response a malformed point is a hard error, there is no
        // issue-request style leniency.
        bytes[6] = 0x05;
        assert_eq!(
            IssueResponse::decode(&bytes).unwrap_err(),
            Error::Decode(DECODING_ERROR)
        );
    }

    #[test]
    fn test_issue_response_rejects_wrong_proof_length() {
        let response = IssueResponse {
            key_id: 1,
            signed: sample_points(1),
            proof: sample_proof(),
        };
        let mut bytes = response.to_bytes();
        let proof_len_offset = 2 + 4 + POINT_LEN;
        bytes[proof_len_offset + 1] = 95;
        assert_eq!(
            IssueResponse::decode(&bytes).unwrap_err(),
            Error::Decode(BAD_PROOF_LENGTH)
        );
    }

    #[test]
    fn test_token_round_trip() {
        let token = Token {
            key_id: 5,
            nonce: [0xab; NONCE_LEN],
            point: sample_points(1)[0],
        };
        let bytes = token.to_bytes();
        assert_eq!(bytes.len(), TOKEN_LEN);
        assert_eq!(Token::decode(&bytes).unwrap(), token);
    }

    #[test]
    fn test_redeem_request_round_trip() {
        let request = RedeemRequest {
            token: Token {
                key_id: 5,
                nonce: [0; NONCE_LEN],
                point: sample_points(1)[0],
            },
            client_data: b"{\"redemption\":1}".to_vec(),
        };
        let bytes = request.to_bytes();
        assert_eq!(&bytes[..2], &[0, TOKEN_LEN as u8]);
        assert_eq!(RedeemRequest::decode(&bytes).unwrap(), request);
    }

    #[test]
    fn test_redeem_request_rejects_wrong_token_length() {
        let request = RedeemRequest {
            token: Token {
                key_id: 5,
                nonce: [0; NONCE_LEN],
                point: sample_points(1)[0],
            },
            client_data: vec![],
        };
        let mut bytes = request.to_bytes();
        bytes[1] = (TOKEN_LEN - 1) as u8;
        assert_eq!(
            RedeemRequest::decode(&bytes).unwrap_err(),
            Error::Decode(BAD_TOKEN_LENGTH)
        );
    }

    #[test]
    fn test_redeem_request_truncated_client_data_is_fatal() {
        let request = RedeemRequest {
            token: Token {
                key_id: 5,
                nonce: [0; NONCE_LEN],
                point: sample_points(1)[0],
            },
            client_data: vec![1, 2, 3, 4],
        };
        let bytes = request.to_bytes();
        assert_eq!(
            RedeemRequest::decode(&bytes[..bytes.len() - 2]).unwrap_err(),
            Error::Decode(INPUT_TOO_SHORT)
        );
    }

    #[test]
    fn test_redeem_response_is_passthrough() {
        let response = RedeemResponse { record: b"record".to_vec() };
        assert_eq!(response.to_bytes(), b"record");
        assert_eq!(RedeemResponse::decode(b"record").unwrap(), response);
    }

    #[test]
    fn test_base64_round_trip() {
        let request = IssueRequest::new(sample_points(2));
        let encoded = request.encode_base64();
        assert_eq!(IssueRequest::decode_base64(&encoded).unwrap(), request);
        assert_eq!(
            IssueRequest::decode_base64("not base64!").unwrap_err(),
            Error::Decode(BAD_BASE64)
        );
    }

    #[test]
    fn test_random_scalar_proof_round_trip() {
        let proof = DleqProof {
            c: Scalar::random(&mut OsRng),
            u: Scalar::random(&mut OsRng),
        };
        let bytes = proof.to_bytes();
        assert_eq!(bytes.len(), PROOF_LEN);
        assert_eq!(DleqProof::decode(&bytes).unwrap(), proof);
    }
}
