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

//! Issuer-side cryptographic core for Private State Tokens.
//!
//! The issuer accepts batches of blinded P-384 elements, signs each one
//! under its secret VOPRF key and emits a single batched DLEQ proof binding
//! the batch to its advertised public key. At redemption it recomputes the
//! issued element from the token nonce and releases the caller's redemption
//! record only if the token verifies.
//!
//! Two protocol profiles are implemented: [`ProtocolVersion::V1Voprf`]
//! (SHA-384, OPRF ciphersuite tags) and [`ProtocolVersion::V3Voprf`]
//! (SHA-512, TrustToken experiment tags). They differ only in hash function
//! and domain separation; V3 is the default.
//!
//! Client-side blinding is out of scope, as are transport, storage and key
//! rotation policy: requests arrive here as base64 blobs and leave the same
//! way.
//!
//! # Example
//!
//! ```
//! use pst_issuer::{Decodable, Encodable, Expiry, IssueRequest, Issuer, ProtocolVersion};
//! use rand_core::OsRng;
//!
//! let mut rng = OsRng;
//! let expiry = Expiry::from_unix_seconds(2_000_000_000);
//! let issuer = Issuer::generate("issuer.example", 64, 0, expiry, &mut rng);
//!
//! // Clients send blinded elements; any valid group element works here.
//! let nonce = ProtocolVersion::default().hash_to_group(b"blinded nonce");
//! let encoded = IssueRequest::new(vec![nonce]).encode_base64();
//!
//! let request = IssueRequest::decode_base64(&encoded).unwrap();
//! let response = issuer
//!     .issue(0, &request, ProtocolVersion::default(), &mut rng)
//!     .unwrap();
//! assert_eq!(response.signed.len(), 1);
//! ```

pub mod dleq;
mod error;
pub mod group;
pub mod issuer;
pub mod keys;
pub mod wire;

pub use dleq::DleqProof;
pub use error::Error;
pub use group::{
    point_bytes, scalar_bytes, ProtocolVersion, NONCE_LEN, POINT_LEN, PROOF_LEN, SCALAR_LEN,
};
pub use issuer::Issuer;
pub use keys::{Expiry, Jwk, KeyPair, PublicKey, SecretKey};
pub use wire::{
    Decodable, Encodable, IssueRequest, IssueResponse, RedeemRequest, RedeemResponse, Token,
    TOKEN_LEN,
};
