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

//! Batched discrete-log-equality proofs.
//!
//! A single 96-byte proof binds every signed element of a batch to the
//! issuer's advertised public key: the pairs `(Tᵢ, Zᵢ)` are folded into a
//! random linear combination and one Chaum-Pedersen style statement is
//! proven on the composites. The coefficients are derived from a transcript
//! committing to the public key and the whole batch, so they cannot be
//! chosen after the fact.

use p384::{
    elliptic_curve::subtle::ConstantTimeEq, NonZeroScalar, ProjectivePoint, Scalar,
};
use rand_core::CryptoRngCore;

use crate::error::{Error, DECODING_ERROR, INPUT_TOO_SHORT};
use crate::group::{
    decode_scalar, encode_point, encode_scalar, point_bytes, ProtocolVersion, POINT_LEN, PROOF_LEN,
};
use crate::wire::{Decodable, Encodable};

// Transcript labels. The NUL terminators are part of the label bytes.
const BATCH_LABEL: &[u8] = b"DLEQ BATCH\0";
const CHALLENGE_LABEL: &[u8] = b"DLEQ\0";

/// A batched DLEQ proof: challenge `c` and response `u = r + c·sk`,
/// serialized as `c(48) ‖ u(48)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DleqProof {
    pub c: Scalar,
    pub u: Scalar,
}

impl Encodable for DleqProof {
    fn encode(&self, out: &mut Vec<u8>) {
        encode_scalar(&self.c, out);
        encode_scalar(&self.u, out);
    }
}

impl Decodable for DleqProof {
    fn decode(input: &[u8]) -> Result<Self, Error> {
        if input.len() < PROOF_LEN {
            return Err(Error::Decode(INPUT_TOO_SHORT));
        }
        let (c, input) = decode_scalar(input);
        let (u, _input) = decode_scalar(input);
        let c = Option::<Scalar>::from(c).ok_or(Error::Decode(DECODING_ERROR))?;
        let u = Option::<Scalar>::from(u).ok_or(Error::Decode(DECODING_ERROR))?;
        Ok(Self { c, u })
    }
}

// The batch transcript commits to the public key and every (input, output)
// pair in batch order: `pk ‖ T₀ ‖ Z₀ ‖ T₁ ‖ Z₁ ‖ …`.
fn batch_transcript(
    pk: &[u8; POINT_LEN],
    inputs: &[ProjectivePoint],
    outputs: &[ProjectivePoint],
) -> Vec<u8> {
    let mut transcript = Vec::with_capacity(POINT_LEN * (1 + 2 * inputs.len()));
    transcript.extend_from_slice(pk);
    for (input, output) in inputs.iter().zip(outputs) {
        encode_point(input, &mut transcript);
        encode_point(output, &mut transcript);
    }
    transcript
}

// Random-linear-combination composites `T* = Σ eᵢ·Tᵢ` and `Z* = Σ eᵢ·Zᵢ`.
// The coefficient for index i appends the big-endian index to the shared
// transcript, so every position gets a distinct scalar even for repeated
// batch elements.
fn composites(
    version: ProtocolVersion,
    pk: &[u8; POINT_LEN],
    inputs: &[ProjectivePoint],
    outputs: &[ProjectivePoint],
) -> (ProjectivePoint, ProjectivePoint) {
    let transcript = batch_transcript(pk, inputs, outputs);
    let mut t_star = ProjectivePoint::IDENTITY;
    let mut z_star = ProjectivePoint::IDENTITY;
    for (i, (input, output)) in inputs.iter().zip(outputs).enumerate() {
        let coefficient =
            version.hash_to_scalar(&[BATCH_LABEL, &transcript, &(i as u16).to_be_bytes()]);
        t_star += *input * coefficient;
        z_star += *output * coefficient;
    }
    (t_star, z_star)
}

// Challenge over the composite statement:
// `hash_to_scalar("DLEQ\0" ‖ pk ‖ T* ‖ Z* ‖ k0 ‖ k1)`.
fn challenge(
    version: ProtocolVersion,
    pk: &[u8; POINT_LEN],
    t_star: &ProjectivePoint,
    z_star: &ProjectivePoint,
    k0: &ProjectivePoint,
    k1: &ProjectivePoint,
) -> Scalar {
    version.hash_to_scalar(&[
        CHALLENGE_LABEL,
        pk,
        &point_bytes(t_star),
        &point_bytes(z_star),
        &point_bytes(k0),
        &point_bytes(k1),
    ])
}

/// Prove that every `outputs[i]` equals `sk·inputs[i]` and that `pk` is
/// `sk·G`, drawing the proof nonce from `rng`.
///
/// The sequences must be the same length and in the same order as the batch
/// transcript the verifier will reconstruct.
pub fn prove(
    version: ProtocolVersion,
    sk: &Scalar,
    pk: &[u8; POINT_LEN],
    inputs: &[ProjectivePoint],
    outputs: &[ProjectivePoint],
    rng: &mut impl CryptoRngCore,
) -> DleqProof {
    let r = *NonZeroScalar::random(rng).as_ref();
    prove_with_nonce(version, sk, pk, inputs, outputs, r)
}

// Deterministic-nonce body shared by `prove` and the fixture entry points.
// A predictable nonce reveals the secret key from the proof, so this is
// reachable outside the crate only through the `fixtures` feature.
pub(crate) fn prove_with_nonce(
    version: ProtocolVersion,
    sk: &Scalar,
    pk: &[u8; POINT_LEN],
    inputs: &[ProjectivePoint],
    outputs: &[ProjectivePoint],
    r: Scalar,
) -> DleqProof {
    debug_assert_eq!(inputs.len(), outputs.len());
    let (t_star, z_star) = composites(version, pk, inputs, outputs);
    let k0 = ProjectivePoint::GENERATOR * r;
    let k1 = t_star * r;
    let c = challenge(version, pk, &t_star, &z_star, &k0, &k1);
    let u = r + c * sk;
    DleqProof { c, u }
}

/// Verify a batched proof against the statement `(G, pk)` and the pairs
/// `(inputs, outputs)`.
///
/// This is the check a client runs on an issue response; the issuer itself
/// uses it only in tests and the vector tools.
pub fn verify(
    version: ProtocolVersion,
    pk: &ProjectivePoint,
    inputs: &[ProjectivePoint],
    outputs: &[ProjectivePoint],
    proof: &DleqProof,
) -> bool {
    if inputs.len() != outputs.len() || inputs.is_empty() {
        return false;
    }
    let pk_bytes = point_bytes(pk);
    let (t_star, z_star) = composites(version, &pk_bytes, inputs, outputs);
    let k0 = ProjectivePoint::GENERATOR * proof.u - *pk * proof.c;
    let k1 = t_star * proof.u - z_star * proof.c;
    let expected = challenge(version, &pk_bytes, &t_star, &z_star, &k0, &k1);
    proof.c.ct_eq(&expected).into()
}
