//! Integration tests for the Keycloak admin client using wiremock.
//!
//! These tests verify URL layout, authentication, `Location` parsing and
//! status mapping against a mock Keycloak server.

use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kos_keycloak::{
    ClientRepresentation, GroupRepresentation, IdpAdmin, KeycloakAdminClient, KeycloakAuth,
    KeycloakConfig, KeycloakError, RoleRepresentation,
};

// =============================================================================
// Test Helpers
// =============================================================================

fn bearer_client(server: &MockServer) -> KeycloakAdminClient {
    let config = KeycloakConfig::new(server.uri()).with_auth(KeycloakAuth::bearer("test-token"));
    KeycloakAdminClient::new(config).unwrap()
}

async fn mount_token_endpoint(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/realms/master/protocol/openid-connect/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=kos-admin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "issued-token",
            "expires_in": 300,
            "token_type": "Bearer"
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_client_credentials_token_is_cached() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, 1).await;

    Mock::given(method("DELETE"))
        .and(path("/admin/realms/acme/groups/g-1"))
        .and(header("authorization", "Bearer issued-token"))
        .respond_with(ResponseTemplate::new(204))
        .expect(2)
        .mount(&server)
        .await;

    let config = KeycloakConfig::new(server.uri())
        .with_auth(KeycloakAuth::client_credentials("kos-admin", "s3cret"));
    let client = KeycloakAdminClient::new(config).unwrap();

    client.delete_group("acme", "g-1").await.unwrap();
    client.delete_group("acme", "g-1").await.unwrap();
}

#[tokio::test]
async fn test_token_endpoint_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/realms/master/protocol/openid-connect/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "invalid_client"})))
        .mount(&server)
        .await;

    let config = KeycloakConfig::new(server.uri())
        .with_auth(KeycloakAuth::client_credentials("kos-admin", "wrong"));
    let client = KeycloakAdminClient::new(config).unwrap();

    let err = client.delete_client("acme", "c-1").await.unwrap_err();
    assert!(matches!(err, KeycloakError::AuthenticationFailed { .. }));
}

// =============================================================================
// Clients
// =============================================================================

#[tokio::test]
async fn test_create_client_returns_location_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/realms/acme/clients"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(201).insert_header(
            "Location",
            format!("{}/admin/realms/acme/clients/8f0e-new", server.uri()).as_str(),
        ))
        .mount(&server)
        .await;

    let client = bearer_client(&server);
    let id = client
        .create_client("acme", &ClientRepresentation::new("acme-web"))
        .await
        .unwrap();
    assert_eq!(id, "8f0e-new");
}

#[tokio::test]
async fn test_create_without_location_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/realms/acme/groups"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let err = bearer_client(&server)
        .create_group("acme", &GroupRepresentation::top_level("ops"))
        .await
        .unwrap_err();
    assert!(matches!(err, KeycloakError::MissingLocation { .. }));
}

#[tokio::test]
async fn test_update_client_sends_representation() {
    let server = MockServer::start().await;
    let mut rep = ClientRepresentation::new("acme-web");
    rep.public_client = true;

    Mock::given(method("PUT"))
        .and(path("/admin/realms/acme/clients/c-1"))
        .and(body_json(serde_json::to_value(&rep).unwrap()))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    bearer_client(&server)
        .update_client("acme", "c-1", &rep)
        .await
        .unwrap();
}

// =============================================================================
// Status mapping
// =============================================================================

#[tokio::test]
async fn test_not_found_maps_to_typed_error() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/admin/realms/acme/clients/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = bearer_client(&server)
        .delete_client("acme", "missing")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_conflict_and_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/realms/acme/roles"))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/admin/realms/acme/roles/viewer"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let client = bearer_client(&server);
    let err = client
        .create_realm_role("acme", &RoleRepresentation::new("viewer", None))
        .await
        .unwrap_err();
    assert!(matches!(err, KeycloakError::Conflict { .. }));

    let err = client.delete_realm_role("acme", "viewer").await.unwrap_err();
    match err {
        KeycloakError::HttpError { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "maintenance");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

// =============================================================================
// Roles
// =============================================================================

#[tokio::test]
async fn test_get_realm_role() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/realms/acme/roles/viewer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "r-42",
            "name": "viewer",
            "composite": false,
            "clientRole": false,
            "containerId": "acme"
        })))
        .mount(&server)
        .await;

    let role = bearer_client(&server)
        .get_realm_role("acme", "viewer")
        .await
        .unwrap();
    assert_eq!(role.id.as_deref(), Some("r-42"));
}

#[tokio::test]
async fn test_client_role_paths() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/realms/acme/clients/c-1/roles"))
        .and(body_json(json!({"name": "editor", "description": "Can edit", "composite": false, "clientRole": false})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/admin/realms/acme/clients/c-1/roles/editor"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = bearer_client(&server);
    client
        .create_client_role(
            "acme",
            "c-1",
            &RoleRepresentation::new("editor", Some("Can edit".to_string())),
        )
        .await
        .unwrap();
    client
        .delete_client_role("acme", "c-1", "editor")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_update_realm_role_addresses_current_name() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/admin/realms/acme/roles/auditor"))
        .and(body_json(json!({"name": "viewer", "composite": false, "clientRole": false})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    bearer_client(&server)
        .update_realm_role("acme", "auditor", &RoleRepresentation::new("viewer", None))
        .await
        .unwrap();
}

// =============================================================================
// Groups
// =============================================================================

#[tokio::test]
async fn test_group_create_and_update() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/realms/acme/groups"))
        .and(body_json(json!({"name": "ops", "path": "/ops"})))
        .respond_with(
            ResponseTemplate::new(201).insert_header("Location", "/admin/realms/acme/groups/g-9"),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/admin/realms/acme/groups/g-9"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = bearer_client(&server);
    let id = client
        .create_group("acme", &GroupRepresentation::top_level("ops"))
        .await
        .unwrap();
    assert_eq!(id, "g-9");

    client
        .update_group("acme", &id, &GroupRepresentation::top_level("platform"))
        .await
        .unwrap();
}
