//! The uniform verifier contract across all three strategies
//!
//! Callers hold `Arc<dyn TokenVerifier>` and must see identical result
//! semantics whichever strategy sits behind it.

mod common;

use common::*;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokenguard::{
    AuthSettings, JwtVerifier, RuntimeEnvironment, StaticTokenConfig, StaticTokenVerifier,
    TokenVerifier, ValidationResult,
};

async fn all_strategies(server: &MockAuthServer) -> Vec<(Arc<dyn TokenVerifier>, String)> {
    server.mock_jwks(vec![primary_jwk("key-1")]).await;
    server
        .mock_introspection(json!({"active": true, "sub": "alice", "scope": "read"}))
        .await;

    let jwt: Arc<dyn TokenVerifier> =
        Arc::new(JwtVerifier::new(server.jwt_config().required_scopes(["read"]).build().unwrap()).unwrap());
    let introspection: Arc<dyn TokenVerifier> = Arc::new(
        tokenguard::IntrospectionVerifier::new(
            server.introspection_config().required_scopes(["read"]).build().unwrap(),
        )
        .unwrap(),
    );
    let static_tokens: Arc<dyn TokenVerifier> = Arc::new(StaticTokenVerifier::new(
        StaticTokenConfig::builder()
            .token("dev-alice", json!({"sub": "alice", "scope": "read"}))
            .required_scopes(["read"])
            .environment(RuntimeEnvironment::development())
            .build()
            .unwrap(),
    ));

    let signed = sign_rs256(&valid_claims("alice", "read"), PRIMARY_PRIVATE_PEM, Some("key-1"));
    vec![
        (jwt, signed),
        (introspection, "opaque-alice".to_string()),
        (static_tokens, "dev-alice".to_string()),
    ]
}

fn assert_uniform_success(result: &ValidationResult, verifier: &dyn TokenVerifier) {
    assert!(result.success(), "{} rejected: {:?}", verifier.name(), result.rejection());
    assert_eq!(result.error(), None);
    assert_eq!(result.error_description(), None);
    assert_eq!(result.error_code(), None);
    assert_eq!(result.www_authenticate(), None);

    let claims = result.claims().unwrap();
    assert_eq!(claims.identity(), "alice");
    assert!(verifier.verify_scopes(claims, verifier.required_scopes()));
}

#[tokio::test]
async fn test_every_strategy_honours_the_contract() {
    let server = MockAuthServer::start().await;

    for (verifier, token) in all_strategies(&server).await {
        let header = format!("Bearer {token}");
        assert_eq!(verifier.extract_bearer_token(Some(&header)), Some(token.as_str()));

        let result = verifier.authenticate(Some(&header)).await;
        assert_uniform_success(&result, verifier.as_ref());

        let missing = verifier.authenticate(None).await;
        assert_eq!(missing.error_code(), Some(401), "{}", verifier.name());
        assert!(missing.claims().is_none());
        assert!(
            missing
                .www_authenticate()
                .unwrap()
                .starts_with("Bearer error=\"invalid_token\"")
        );
    }
}

#[tokio::test]
async fn test_results_convert_into_std_result() {
    let verifier = StaticTokenVerifier::new(
        StaticTokenConfig::builder()
            .token("dev-alice", json!({"sub": "alice"}))
            .environment(RuntimeEnvironment::development())
            .build()
            .unwrap(),
    );

    let claims = verifier.verify("dev-alice").await.into_result().unwrap();
    assert_eq!(claims.identity(), "alice");

    let rejection = verifier.verify("nope").await.into_result().unwrap_err();
    assert_eq!(rejection.status_code(), 401);
    assert_eq!(rejection.error(), "invalid_token");
}

#[tokio::test]
async fn test_settings_from_environment_build_working_verifiers() {
    let server = MockAuthServer::start().await;
    server.mock_jwks(vec![primary_jwk("key-1")]).await;
    server
        .mock_introspection(json!({"active": true, "client_id": "svc", "scope": "read"}))
        .await;

    let jwt_env: HashMap<&str, String> = HashMap::from([
        ("AUTH_PROVIDER", "jwt".to_string()),
        ("AUTH_JWKS_URI", server.jwks_endpoint.clone()),
        ("AUTH_JWT_ISSUER", ISSUER.to_string()),
        ("AUTH_JWT_AUDIENCE", AUDIENCE.to_string()),
        ("AUTH_REQUIRED_SCOPES", "read".to_string()),
    ]);
    let jwt = AuthSettings::from_lookup(|name| jwt_env.get(name).cloned())
        .unwrap()
        .expect("jwt selected")
        .into_verifier()
        .unwrap();
    assert_eq!(jwt.name(), "jwt");
    assert_eq!(jwt.required_scopes(), ["read".to_string()]);

    let token = sign_rs256(&valid_claims("alice", "read"), PRIMARY_PRIVATE_PEM, Some("key-1"));
    assert!(jwt.verify(&token).await.success());

    let introspection_env: HashMap<&str, String> = HashMap::from([
        ("AUTH_PROVIDER", "introspection".to_string()),
        ("AUTH_INTROSPECTION_URL", server.introspection_endpoint.clone()),
        ("AUTH_INTROSPECTION_CLIENT_ID", "resource-server".to_string()),
        ("AUTH_INTROSPECTION_CLIENT_SECRET", "rs-secret".to_string()),
    ]);
    let introspection = AuthSettings::from_lookup(|name| introspection_env.get(name).cloned())
        .unwrap()
        .expect("introspection selected")
        .into_verifier()
        .unwrap();
    assert_eq!(introspection.name(), "introspection");

    let result = introspection.verify("opaque").await;
    assert_eq!(result.claims().map(|c| c.identity()), Some("svc"));
}

#[test]
fn test_orchestrated_environment_refuses_plaintext_loopback() {
    let env: HashMap<&str, &str> = HashMap::from([
        ("AUTH_PROVIDER", "jwt"),
        ("AUTH_JWKS_URI", "http://127.0.0.1:8080/jwks"),
        ("KUBERNETES_SERVICE_HOST", "10.0.0.1"),
    ]);
    let err = AuthSettings::from_lookup(|name| env.get(name).map(|v| v.to_string())).unwrap_err();
    assert!(matches!(err, tokenguard::ConfigError::InsecureTransport { .. }));
}
