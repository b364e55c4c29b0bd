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

//! The issuer façade: key management, issuance, redemption and key
//! commitments.

use std::collections::BTreeMap;

use p384::elliptic_curve::subtle::ConstantTimeEq;
use p384::ProjectivePoint;
use rand_core::CryptoRngCore;

use crate::dleq;
use crate::error::Error;
use crate::group::{point_bytes, ProtocolVersion};
use crate::keys::{Expiry, Jwk, KeyPair, PublicKey};
use crate::wire::{IssueRequest, IssueResponse, RedeemRequest, RedeemResponse};

// Commitment id pinned by the document format.
const COMMITMENT_ID: u32 = 1;

/// A token issuer: an origin, an advertised batch size and a keyed set of
/// key pairs.
///
/// `issue` and `redeem` take `&self` and are safe to run concurrently once
/// the key set is populated; `add_key` and `add_jwk` take `&mut self`, so
/// the borrow checker serializes mutation against in-flight calls.
/// Deployments that rotate keys under load should swap in a rebuilt issuer
/// rather than put the hot path behind a lock.
#[derive(Debug, Clone)]
pub struct Issuer {
    host: String,
    max_batch_size: u16,
    keys: BTreeMap<u32, KeyPair>,
}

impl Issuer {
    /// An issuer with no keys yet.
    pub fn new(host: impl Into<String>, max_batch_size: u16) -> Self {
        Self { host: host.into(), max_batch_size, keys: BTreeMap::new() }
    }

    /// An issuer holding a single freshly generated key pair.
    pub fn generate(
        host: impl Into<String>,
        max_batch_size: u16,
        id: u32,
        expiry: Expiry,
        rng: &mut impl CryptoRngCore,
    ) -> Self {
        let mut issuer = Self::new(host, max_batch_size);
        issuer.add_key(KeyPair::generate(id, expiry, rng));
        issuer
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Advertised batch size. The engine itself does not reject oversize
    /// requests; enforcing the advertisement is the transport's policy.
    pub fn max_batch_size(&self) -> u16 {
        self.max_batch_size
    }

    /// Insert or replace the key pair stored under this pair's id.
    pub fn add_key(&mut self, pair: KeyPair) {
        self.keys.insert(pair.id(), pair);
    }

    /// Import a JWK-shaped record and upsert it under its `kid`.
    pub fn add_jwk(&mut self, jwk: &Jwk) -> Result<(), Error> {
        self.add_key(KeyPair::from_jwk(jwk)?);
        Ok(())
    }

    pub fn key_pair(&self, id: u32) -> Option<&KeyPair> {
        self.keys.get(&id)
    }

    /// Public keys in ascending key-id order.
    pub fn public_keys(&self) -> Vec<&PublicKey> {
        self.keys.values().map(KeyPair::public).collect()
    }

    /// Sign a batch of blinded elements under the key `key_id`.
    ///
    /// Each surviving nonce `Tᵢ` is multiplied by the secret scalar, and one
    /// batched DLEQ proof binds the whole batch to the advertised public
    /// key. `signed[i]` corresponds positionally to `request.nonces[i]`.
    pub fn issue(
        &self,
        key_id: u32,
        request: &IssueRequest,
        version: ProtocolVersion,
        rng: &mut impl CryptoRngCore,
    ) -> Result<IssueResponse, Error> {
        let (sk, pk, signed) = self.evaluate_batch(key_id, request)?;
        let proof = dleq::prove(version, &sk, pk, &request.nonces, &signed, rng);
        Ok(IssueResponse { key_id, signed, proof })
    }

    /// Issuance with a caller-chosen proof nonce, for vectors and fixtures.
    ///
    /// A predictable nonce reveals the secret key from the proof; this
    /// exists only so deterministic test vectors can be produced.
    #[cfg(any(test, feature = "fixtures"))]
    pub fn issue_with_proof_nonce(
        &self,
        key_id: u32,
        request: &IssueRequest,
        version: ProtocolVersion,
        proof_nonce: p384::Scalar,
    ) -> Result<IssueResponse, Error> {
        let (sk, pk, signed) = self.evaluate_batch(key_id, request)?;
        let proof = dleq::prove_with_nonce(version, &sk, pk, &request.nonces, &signed, proof_nonce);
        Ok(IssueResponse { key_id, signed, proof })
    }

    // Shared evaluation leg: key lookup, batch rejection, and the
    // per-element scalar multiplications, in request order.
    fn evaluate_batch(
        &self,
        key_id: u32,
        request: &IssueRequest,
    ) -> Result<(p384::Scalar, &[u8; crate::group::POINT_LEN], Vec<ProjectivePoint>), Error> {
        let pair = self.keys.get(&key_id).ok_or_else(|| {
            tracing::warn!(key_id, "issue request for unknown key");
            Error::UnknownKey(key_id)
        })?;
        if request.nonces.is_empty() {
            return Err(Error::EmptyBatch);
        }
        let sk = *pair.secret().scalar();
        let signed = request.nonces.iter().map(|nonce| *nonce * sk).collect();
        Ok((sk, pair.public().as_bytes(), signed))
    }

    /// Verify an unblinded token and release the caller's redemption record.
    ///
    /// Recomputes the expected element from the token nonce under the
    /// version's hash-to-group DST and compares it with the supplied point
    /// in constant time on the canonical encoding. A mismatch reports
    /// nothing beyond the rejection itself.
    pub fn redeem(
        &self,
        request: &RedeemRequest,
        record: &[u8],
        version: ProtocolVersion,
    ) -> Result<RedeemResponse, Error> {
        let token = &request.token;
        let pair = self.keys.get(&token.key_id).ok_or_else(|| {
            tracing::warn!(key_id = token.key_id, "redemption against unknown key");
            Error::UnknownKey(token.key_id)
        })?;
        let expected = version.hash_to_group(&token.nonce) * *pair.secret().scalar();
        let matches = point_bytes(&expected)[..].ct_eq(&point_bytes(&token.point)[..]);
        if bool::from(matches) {
            Ok(RedeemResponse { record: record.to_vec() })
        } else {
            Err(Error::RedeemMismatch)
        }
    }

    /// The key commitment document advertising this issuer's keys for
    /// `version`, keyed by host and protocol name.
    ///
    /// `expiry` is emitted as a decimal string of microseconds since the
    /// Unix epoch; keys appear in ascending key-id order.
    pub fn key_commitment(&self, version: ProtocolVersion) -> serde_json::Value {
        let mut keys = serde_json::Map::new();
        for pair in self.keys.values() {
            keys.insert(
                pair.id().to_string(),
                serde_json::json!({
                    "Y": pair.public().commitment_base64(),
                    "expiry": pair.expiry().micros().to_string(),
                }),
            );
        }
        let body = serde_json::json!({
            "protocol_version": version.name(),
            "id": COMMITMENT_ID,
            "batchsize": self.max_batch_size,
            "keys": keys,
        });
        let mut per_protocol = serde_json::Map::new();
        per_protocol.insert(version.name().to_owned(), body);
        let mut document = serde_json::Map::new();
        document.insert(self.host.clone(), serde_json::Value::Object(per_protocol));
        serde_json::Value::Object(document)
    }
}
