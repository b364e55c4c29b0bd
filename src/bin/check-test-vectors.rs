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

//! Re-derives the vectors emitted by `generate-test-vectors` and fails on
//! any mismatch. Pass the vector file path as the first argument.

use std::collections::BTreeMap;

use p384::elliptic_curve::Field;
use p384::Scalar;
use pst_issuer::{
    dleq, Decodable, Encodable, Issuer, IssueRequest, IssueResponse, Jwk, KeyPair,
    ProtocolVersion, RedeemRequest, RedeemResponse,
};
use serde::Deserialize;

#[derive(Deserialize)]
struct TestVector {
    procedure: String,
    args: BTreeMap<String, String>,
    output: BTreeMap<String, String>,
}

trait FromHex {
    fn from_hex(input: &str) -> Result<Self, String>
    where
        Self: Sized;
}

impl<T: Decodable> FromHex for T {
    fn from_hex(input: &str) -> Result<T, String> {
        T::decode(&hex::decode(input).map_err(|e| format!("failed to decode hex: {}", e))?)
            .map_err(|e| format!("failed to decode message: {}", e))
    }
}

fn main() {
    let json_file = std::env::args().nth(1).unwrap_or("test_vectors.json".to_string());
    let test_vectors: Vec<TestVector> = serde_json::from_reader(
        std::fs::File::open(&json_file)
            .map_err(|e| format!("failed to open file {}: {}", &json_file, e))
            .unwrap(),
    )
    .map_err(|e| format!("failed to parse JSON: {}", e))
    .unwrap();

    // Rebuild the fixture issuer from the commitment vector's JWK.
    let commitment_tv = test_vectors.iter().find(|tv| tv.procedure == "key_commitment").unwrap();
    let jwk: Jwk = serde_json::from_str(commitment_tv.args.get("jwk").unwrap()).unwrap();
    let pair = KeyPair::from_jwk(&jwk).unwrap();
    let public_point = *pair.public().point();
    let mut issuer = Issuer::new("issuer.example", 16);
    issuer.add_key(pair);

    let document: serde_json::Value =
        serde_json::from_str(commitment_tv.output.get("document").unwrap()).unwrap();
    assert_eq!(document, issuer.key_commitment(ProtocolVersion::V3Voprf));

    for tv in &test_vectors {
        match tv.procedure.as_str() {
            "key_commitment" => {}
            "issue_v1" | "issue_v3" => {
                let version =
                    ProtocolVersion::from_name(tv.args.get("version").unwrap()).unwrap();
                let request = IssueRequest::from_hex(tv.args.get("request").unwrap()).unwrap();
                let response = issuer
                    .issue_with_proof_nonce(0, &request, version, -Scalar::ONE)
                    .unwrap();
                assert_eq!(hex::encode(response.to_bytes()), *tv.output.get("response").unwrap());

                let decoded =
                    IssueResponse::from_hex(tv.output.get("response").unwrap()).unwrap();
                assert!(dleq::verify(
                    version,
                    &public_point,
                    &request.nonces,
                    &decoded.signed,
                    &decoded.proof,
                ));
            }
            "redeem" => {
                let version =
                    ProtocolVersion::from_name(tv.args.get("version").unwrap()).unwrap();
                let request = RedeemRequest::from_hex(tv.args.get("request").unwrap()).unwrap();
                let record = hex::decode(tv.args.get("record").unwrap()).unwrap();
                let response = issuer.redeem(&request, &record, version).unwrap();
                assert_eq!(
                    response,
                    RedeemResponse::from_hex(tv.output.get("response").unwrap()).unwrap()
                );
            }
            "key_gen" => {
                let jwk: Jwk = serde_json::from_str(tv.output.get("jwk").unwrap()).unwrap();
                let generated = KeyPair::from_jwk(&jwk).unwrap();
                assert_eq!(
                    hex::encode(generated.public().commitment_bytes()),
                    *tv.output.get("public_key").unwrap()
                );
            }
            other => panic!("unknown procedure {}", other),
        }
    }

    println!("all vectors check out");
}
