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

//! Emits deterministic protocol vectors as JSON on stdout.
//!
//! Every vector is reproducible: the issuer key is the fixture scalar
//! `n - 1`, the DLEQ proof nonce is fixed to the same value, and the one
//! generated key pair is drawn from a seeded ChaCha20 stream.

use std::collections::BTreeMap;

use p384::elliptic_curve::Field;
use p384::{ProjectivePoint, Scalar};
use pst_issuer::{
    Encodable, Expiry, IssueRequest, Issuer, Jwk, KeyPair, ProtocolVersion, RedeemRequest, Token,
    NONCE_LEN,
};
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;
use serde::Serialize;

const FIXTURE_EXPIRY_SECONDS: u64 = 1_893_456_000;
const KEY_GEN_SEED: &str = "0101010101010101010101010101010101010101010101010101010101010101";

#[derive(Serialize)]
struct TestVector {
    procedure: &'static str,
    args: BTreeMap<&'static str, String>,
    output: BTreeMap<&'static str, String>,
}

trait ToHex {
    fn to_hex(&self) -> String;
}

impl<T: Encodable> ToHex for T {
    fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

fn main() {
    let expiry = Expiry::from_unix_seconds(FIXTURE_EXPIRY_SECONDS);

    // Fixture key pair: the secret scalar is the group order minus one.
    let pair = KeyPair::from_secret_scalar(0, -Scalar::ONE, expiry).unwrap();
    let jwk = Jwk::from_key_pair(&pair);
    let secret = *pair.secret().scalar();
    let mut issuer = Issuer::new("issuer.example", 16);
    issuer.add_key(pair);

    let mut test_vectors = vec![];

    test_vectors.push(TestVector {
        procedure: "key_commitment",
        args: BTreeMap::from([("jwk", serde_json::to_string(&jwk).unwrap())]),
        output: BTreeMap::from([(
            "document",
            issuer.key_commitment(ProtocolVersion::V3Voprf).to_string(),
        )]),
    });

    // One batch issued under each protocol version with the fixed proof
    // nonce n - 1.
    let request = IssueRequest::new(vec![
        ProjectivePoint::GENERATOR,
        ProtocolVersion::V3Voprf.hash_to_group(b"pst vector nonce"),
    ]);
    for (procedure, version) in [
        ("issue_v1", ProtocolVersion::V1Voprf),
        ("issue_v3", ProtocolVersion::V3Voprf),
    ] {
        let response = issuer
            .issue_with_proof_nonce(0, &request, version, -Scalar::ONE)
            .unwrap();
        test_vectors.push(TestVector {
            procedure,
            args: BTreeMap::from([
                ("version", version.name().to_string()),
                ("request", request.to_hex()),
            ]),
            output: BTreeMap::from([("response", response.to_hex())]),
        });
    }

    // Redemption of a token over the all-zero nonce.
    let nonce = [0u8; NONCE_LEN];
    let token = Token {
        key_id: 0,
        nonce,
        point: ProtocolVersion::V3Voprf.hash_to_group(&nonce) * secret,
    };
    let redeem_request = RedeemRequest { token, client_data: b"vector client data".to_vec() };
    let record = b"vector redemption record";
    let response = issuer
        .redeem(&redeem_request, record, ProtocolVersion::V3Voprf)
        .unwrap();
    test_vectors.push(TestVector {
        procedure: "redeem",
        args: BTreeMap::from([
            ("version", ProtocolVersion::V3Voprf.name().to_string()),
            ("request", redeem_request.to_hex()),
            ("record", hex::encode(record)),
        ]),
        output: BTreeMap::from([("response", response.to_hex())]),
    });

    // Key generation from a seeded stream.
    let mut rng = ChaCha20Rng::from_seed(hex::decode(KEY_GEN_SEED).unwrap().try_into().unwrap());
    let generated = KeyPair::generate(1, expiry, &mut rng);
    test_vectors.push(TestVector {
        procedure: "key_gen",
        args: BTreeMap::from([("rng_seed", KEY_GEN_SEED.to_string())]),
        output: BTreeMap::from([
            ("public_key", hex::encode(generated.public().commitment_bytes())),
            ("jwk", serde_json::to_string(&Jwk::from_key_pair(&generated)).unwrap()),
        ]),
    });

    println!("{}", serde_json::to_string_pretty(&test_vectors).unwrap());
}
