//! RS256 tokens signed with the fixture keys under `tests/fixtures`.

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::Value;

pub const KID: &str = "test-key-1";

const SIGNING_KEY: &str = include_str!("../../tests/fixtures/signing_key.pem");
const ROGUE_KEY: &str = include_str!("../../tests/fixtures/rogue_key.pem");

/// Signed with the key published in `tests/fixtures/jwks.json`.
pub fn sign(claims: Value) -> String {
    sign_with(SIGNING_KEY, claims)
}

/// Same `kid`, different key: the signature will not verify.
pub fn sign_with_rogue_key(claims: Value) -> String {
    sign_with(ROGUE_KEY, claims)
}

fn sign_with(pem: &str, mut claims: Value) -> String {
    if claims.get("exp").is_none() {
        claims["exp"] = Value::from(Utc::now().timestamp() + 3600);
    }

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(KID.to_string());

    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).expect("fixture key");
    encode(&header, &claims, &key).expect("sign token")
}
