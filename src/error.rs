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

//! Error types surfaced by the issuer core.

use thiserror::Error;

pub(crate) const INPUT_TOO_SHORT: &str = "input is too short";
pub(crate) const DECODING_ERROR: &str = "decoding failed";
pub(crate) const BAD_BASE64: &str = "invalid base64";
pub(crate) const BAD_TOKEN_LENGTH: &str = "token length prefix mismatch";
pub(crate) const BAD_PROOF_LENGTH: &str = "proof length prefix mismatch";

pub(crate) const BAD_KEY_TYPE: &str = "unsupported key type";
pub(crate) const BAD_CURVE: &str = "unsupported curve";
pub(crate) const BAD_FIELD_LENGTH: &str = "field element has wrong length";
pub(crate) const OFF_CURVE: &str = "public point is not on the curve";
pub(crate) const BAD_SCALAR: &str = "secret scalar is not canonical";
pub(crate) const ZERO_SECRET: &str = "secret scalar is zero";
pub(crate) const KEY_PAIR_MISMATCH: &str = "secret and public halves disagree";

/// Failures surfaced to the transport layer.
///
/// Cryptographic failures are never retried inside the core; the transport
/// decides on the client-visible semantics. A malformed curve point inside an
/// issue request is deliberately not represented here: the offending element
/// is dropped during decoding and counted on the request instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Malformed wire message: short read or invalid framing. No partial
    /// state is retained.
    #[error("malformed message: {0}")]
    Decode(&'static str),

    /// The requested key id is not present in the issuer's key map.
    #[error("unknown key id {0}")]
    UnknownKey(u32),

    /// An issuance request with no surviving blinded elements.
    #[error("issuance batch is empty")]
    EmptyBatch,

    /// The redeemed token does not verify under the selected key. Carries no
    /// detail about which part of the recomputation disagreed.
    #[error("token does not verify")]
    RedeemMismatch,

    /// Malformed key material on import.
    #[error("invalid key material: {0}")]
    InvalidKey(&'static str),
}
