//! Common test utilities for integration tests
//!
//! A wiremock-backed authorization server exposing a JWKS endpoint and an
//! introspection endpoint, plus RSA fixtures and token signing helpers.

#![allow(dead_code)]

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::{Value, json};
use std::time::Duration;
use tokenguard::{
    IntrospectionConfig, IntrospectionConfigBuilder, RuntimeEnvironment, SignedTokenConfig,
    SignedTokenConfigBuilder,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ISSUER: &str = "https://issuer.example";
pub const AUDIENCE: &str = "https://api.example";

pub const PRIMARY_PRIVATE_PEM: &str = include_str!("../fixtures/primary_private.pem");
pub const PRIMARY_PUBLIC_PEM: &str = include_str!("../fixtures/primary_public.pem");
pub const ATTACKER_PRIVATE_PEM: &str = include_str!("../fixtures/attacker_private.pem");
pub const ATTACKER_PUBLIC_PEM: &str = include_str!("../fixtures/attacker_public.pem");

const PRIMARY_N: &str = "sHdgVuVv5OsHKAeXAAfhyCVXfvuz4xf2B2Slb_9Th-GNLvLi8hYZKtCAIuhbRsO38IgX3fw4w7z9NTeA9TJ9pFlc1BKp1KcwRIRvEoWTDRuZcQ553-7nXdwvULe-vIxorVrF1rc-8Thxc654wn2Ypgm9_6gacYW5xail52iYmp3mt-9EllzAt-3kqx3mby9zNDWJp4uWYNXtSg4_RhnFwMQmiwWhr7_M3I0yjkGeU-8uawJH8TXyB2OGHiCzxtmfsl4912nToOrMTof-cFSZSCG10YvyTbhuO86HW5vKsCoy7IJalcK2OtrbOy1XhMmrTvB-x8CU9nD4DM3zmJAAuw";
const ATTACKER_N: &str = "lUFMzIAQXIiwFiDyxCeFSH2RkJY2YB1f_yBRRkGh8f7qAXx_Ic2ci1nQLUTEkVzL8lH29xhLQYTeMN4332goXhvylrglpx7yp3asZ5lNbguEcKH_OHvO7TIj4z9CJi_OEMGVk9vsJuJvtRc8jzm_vsgCV5Skk1MoD9vJRzO293gxMGGpt2LSyIJIrTeREC76pQd1Y77ptY2lyjG04P2Qvcpl8NHWZuTTT7si5ffJ-vyUlWG2O_rCFQ8l_vF1Zb5yaouX_T91AabtJPV3swz6nmko9bpAafkObRmMlJ4B_3mFWr10kILqR4hJJcikLNaYUWL48i1VIKKvPlwx2A2rxQ";

/// Public JWK for the primary signing key
pub fn primary_jwk(kid: &str) -> Value {
    rsa_jwk(kid, PRIMARY_N)
}

/// Public JWK for the attacker's key (a real key the issuer never published)
pub fn attacker_jwk(kid: &str) -> Value {
    rsa_jwk(kid, ATTACKER_N)
}

fn rsa_jwk(kid: &str, n: &str) -> Value {
    json!({
        "kty": "RSA",
        "kid": kid,
        "use": "sig",
        "alg": "RS256",
        "n": n,
        "e": "AQAB",
    })
}

/// Mock authorization server
pub struct MockAuthServer {
    pub server: MockServer,
    pub jwks_endpoint: String,
    pub introspection_endpoint: String,
}

impl MockAuthServer {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let base_url = server.uri();

        Self {
            server,
            jwks_endpoint: format!("{}/jwks", base_url),
            introspection_endpoint: format!("{}/introspect", base_url),
        }
    }

    /// Serve `keys` from the JWKS endpoint
    pub async fn mock_jwks(&self, keys: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })))
            .mount(&self.server)
            .await;
    }

    /// Serve `keys` and assert the endpoint is hit exactly `times` times
    pub async fn mock_jwks_expecting(&self, keys: Vec<Value>, times: u64) {
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Serve `keys` for at most `times` requests
    pub async fn mock_jwks_limited(&self, keys: Vec<Value>, times: u64) {
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })))
            .up_to_n_times(times)
            .mount(&self.server)
            .await;
    }

    /// JWKS endpoint failing with `status`
    pub async fn mock_jwks_error(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Introspection endpoint answering every request with `body`
    pub async fn mock_introspection(&self, body: Value) {
        Mock::given(method("POST"))
            .and(path("/introspect"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Introspection endpoint answering with an arbitrary template
    pub async fn mock_introspection_response(&self, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/introspect"))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// Introspection endpoint answering with `body`, hit exactly `times` times
    pub async fn mock_introspection_expecting(&self, body: Value, times: u64) {
        Mock::given(method("POST"))
            .and(path("/introspect"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Answer every request on `endpoint_path` with a redirect to `location`
    pub async fn mock_redirect(&self, endpoint_path: &str, status: u16, location: &str) {
        Mock::given(path(endpoint_path))
            .respond_with(ResponseTemplate::new(status).insert_header("Location", location))
            .mount(&self.server)
            .await;
    }

    /// JWT config against this server's JWKS endpoint
    pub fn jwt_config(&self) -> SignedTokenConfigBuilder {
        SignedTokenConfig::builder()
            .jwks_uri(&self.jwks_endpoint)
            .issuer(ISSUER)
            .audience(AUDIENCE)
            .algorithm("RS256")
            .environment(RuntimeEnvironment::development())
    }

    /// Introspection config against this server
    pub fn introspection_config(&self) -> IntrospectionConfigBuilder {
        IntrospectionConfig::builder()
            .endpoint(&self.introspection_endpoint)
            .client_credentials("resource-server", "rs-secret")
            .timeout(Duration::from_secs(2))
            .environment(RuntimeEnvironment::development())
    }
}

/// Sign `claims` with an RSA private key in PEM form
pub fn sign_rs256(claims: &Value, private_pem: &str, kid: Option<&str>) -> String {
    let key = EncodingKey::from_rsa_pem(private_pem.as_bytes()).expect("Invalid RSA key");
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    encode(&header, claims, &key).expect("Failed to encode test JWT")
}

/// Sign `claims` with an HMAC secret
pub fn sign_hmac(claims: &Value, algorithm: Algorithm, secret: &[u8], kid: Option<&str>) -> String {
    let mut header = Header::new(algorithm);
    header.kid = kid.map(str::to_string);
    encode(&header, claims, &EncodingKey::from_secret(secret)).expect("Failed to encode test JWT")
}

/// Current Unix timestamp
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Claims accepted by [`MockAuthServer::jwt_config`]
pub fn valid_claims(sub: &str, scope: &str) -> Value {
    let now = now();
    json!({
        "sub": sub,
        "iss": ISSUER,
        "aud": AUDIENCE,
        "iat": now,
        "nbf": now,
        "exp": now + 300,
        "scope": scope,
    })
}
