//! End-to-end tests for the ACL engine and directory clients.
//!
//! These tests verify that the reqwest clients send the request shapes the
//! platform expects and that the engine surfaces remote outcomes
//! explicitly. We use wiremock to simulate the organization API and the
//! external directory graph.
//!
//! Covered flows:
//! 1. ACE upsert: request body, identity re-prefixing, auth header
//! 2. Rejected writes surface as errors (never swallowed)
//! 3. Disable-inheritance read-modify-write
//! 4. Namespace catalog fetch feeding the bit calculator
//! 5. Group, origin-id, and entitlement resolution
//! 6. Federated membership walk across both backends

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crewbase_directory::{
    GroupKind, GroupNaming, MembershipResolver, OriginId, ProjectContext, ScopeDescriptor,
    SubjectDescriptor,
};
use crewbase_rights::{compute_bits, AccessBits, NamespaceCatalog, ObjectPermission};
use crewbase_security::acl::{AceWriter, AclError, SecurityError};
use crewbase_security::clients::{
    ExternalGraphClient, ExternalGraphConfig, OrgApiClient, OrgEndpoints,
};
use crewbase_security::retry::RetryConfig;
use crewbase_security::PolicyEngine;

const NAMESPACE_ID: &str = "5a27515b-ccd7-42c9-84f1-54c998f03866";

/// Test fixture providing mock servers for both backends.
struct TestFixture {
    /// Mock organization API server.
    org_server: MockServer,
    /// Mock external directory graph server.
    graph_server: MockServer,
}

impl TestFixture {
    /// Create a new test fixture with mock servers.
    async fn new() -> Self {
        Self {
            org_server: MockServer::start().await,
            graph_server: MockServer::start().await,
        }
    }

    /// Get an organization client pointed at the mock server.
    fn org_client(&self) -> OrgApiClient {
        let endpoints = OrgEndpoints {
            organization_url: self.org_server.uri(),
            graph_url: self.org_server.uri(),
            entitlements_url: self.org_server.uri(),
            personal_access_token: Some("test-pat".to_string()),
        };
        OrgApiClient::new(endpoints, Duration::from_secs(5))
    }

    /// Get an external graph client pointed at the mock server.
    fn graph_client(&self) -> ExternalGraphClient {
        let config = ExternalGraphConfig {
            token_endpoint: format!("{}/oauth2/token", self.graph_server.uri()),
            client_id: "test-app".to_string(),
            client_secret: Some("test-secret".to_string()),
            scope: "graph/.default".to_string(),
            graph_url: self.graph_server.uri(),
        };
        ExternalGraphClient::new(config, Duration::from_secs(5))
    }
}

fn namespace_id() -> Uuid {
    NAMESPACE_ID.parse().unwrap()
}

fn catalog() -> Arc<NamespaceCatalog> {
    let json = serde_json::json!([{
        "namespaceId": NAMESPACE_ID,
        "name": "Git Repositories",
        "displayName": "Git Repositories",
        "dataspaceCategory": "Git",
        "actions": [
            { "name": "Read", "displayName": "Read", "bit": 1 },
            { "name": "Write", "displayName": "Write", "bit": 2 }
        ]
    }]);
    let namespaces = serde_json::from_value(json).unwrap();
    Arc::new(NamespaceCatalog::from_namespaces(namespaces).unwrap())
}

fn descriptor_for(tag: &str, sid: &str) -> SubjectDescriptor {
    SubjectDescriptor::new(format!("{}.{}", tag, STANDARD_NO_PAD.encode(sid)))
}

fn fast_propagation() -> RetryConfig {
    RetryConfig {
        max_attempts: 2,
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(10),
        exponential_base: 2.0,
    }
}

// =============================================================================
// Test 1: ACE upsert request shape
// =============================================================================

/// The writer decodes the descriptor, re-prefixes the SID with the identity
/// routing tag, and sends the bits with the merge flag under PAT auth.
#[tokio::test]
async fn test_upsert_entry_request_shape() {
    let fixture = TestFixture::new().await;

    Mock::given(method("POST"))
        .and(path(format!("/_apis/accesscontrolentries/{}", NAMESPACE_ID)))
        .and(query_param("api-version", "5.0"))
        .and(header("Authorization", "Basic OnRlc3QtcGF0"))
        .and(body_partial_json(serde_json::json!({
            "token": "repoV2/proj-1/repo-1",
            "merge": true,
            "accessControlEntries": [{
                "descriptor": "Microsoft.TeamFoundation.Identity;S-1-9-100",
                "allow": 3,
                "deny": 0
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&fixture.org_server)
        .await;

    let writer = AceWriter::new(fixture.org_client(), catalog());
    writer
        .upsert_entry(
            namespace_id(),
            "repoV2/proj-1/repo-1",
            &descriptor_for("vssgp", "S-1-9-100"),
            AccessBits::new(3, 0),
            true,
        )
        .await
        .unwrap();
}

// =============================================================================
// Test 2: rejected writes surface as errors
// =============================================================================

/// A non-2xx answer from a write endpoint is an explicit error, never a
/// log-and-continue.
#[tokio::test]
async fn test_rejected_write_is_explicit() {
    let fixture = TestFixture::new().await;

    Mock::given(method("POST"))
        .and(path(format!("/_apis/accesscontrolentries/{}", NAMESPACE_ID)))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .expect(1)
        .mount(&fixture.org_server)
        .await;

    let writer = AceWriter::new(fixture.org_client(), catalog());
    let err = writer
        .upsert_entry(
            namespace_id(),
            "repoV2/proj-1",
            &descriptor_for("vssgp", "S-1-9-100"),
            AccessBits::new(1, 0),
            true,
        )
        .await
        .unwrap_err();

    match err {
        SecurityError::Acl(AclError::Rejected { status, message }) => {
            assert_eq!(status, 403);
            assert_eq!(message, "forbidden");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

// =============================================================================
// Test 3: disable-inheritance read-modify-write
// =============================================================================

/// The writer reads the current ACL, flips the inheritance flag off, and
/// writes the same ACL back.
#[tokio::test]
async fn test_disable_inheritance_flow() {
    let fixture = TestFixture::new().await;

    Mock::given(method("GET"))
        .and(path(format!("/_apis/accesscontrollists/{}", NAMESPACE_ID)))
        .and(query_param("token", "lib/proj-1/vg-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "count": 1,
            "value": [{
                "token": "lib/proj-1/vg-1",
                "inheritPermissions": true,
                "acesDictionary": {
                    "Microsoft.TeamFoundation.Identity;S-1-9-7": {
                        "descriptor": "Microsoft.TeamFoundation.Identity;S-1-9-7",
                        "allow": 1,
                        "deny": 0
                    }
                }
            }]
        })))
        .expect(1)
        .mount(&fixture.org_server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/_apis/accesscontrollists/{}", NAMESPACE_ID)))
        .and(body_partial_json(serde_json::json!({
            "value": [{
                "token": "lib/proj-1/vg-1",
                "inheritPermissions": false
            }]
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&fixture.org_server)
        .await;

    let writer = AceWriter::new(fixture.org_client(), catalog());
    writer
        .disable_inheritance(namespace_id(), "lib/proj-1/vg-1")
        .await
        .unwrap();
}

/// When the store never shows an ACL for the token, the propagation wait
/// ends in an explicit NotReady error.
#[tokio::test]
async fn test_disable_inheritance_not_ready() {
    let fixture = TestFixture::new().await;

    Mock::given(method("GET"))
        .and(path(format!("/_apis/accesscontrollists/{}", NAMESPACE_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "count": 0,
            "value": []
        })))
        .expect(2)
        .mount(&fixture.org_server)
        .await;

    let writer =
        AceWriter::new(fixture.org_client(), catalog()).with_propagation(fast_propagation());
    let err = writer
        .disable_inheritance(namespace_id(), "lib/proj-1/vg-9")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SecurityError::Acl(AclError::NotReady { ref token }) if token == "lib/proj-1/vg-9"
    ));
}

// =============================================================================
// Test 4: catalog fetch feeding the bit calculator
// =============================================================================

/// The one-shot namespace fetch produces a catalog the bit calculator
/// resolves action names against.
#[tokio::test]
async fn test_catalog_fetch_and_compute_bits() {
    let fixture = TestFixture::new().await;

    Mock::given(method("GET"))
        .and(path("/_apis/securitynamespaces"))
        .and(query_param("api-version", "5.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "count": 1,
            "value": [{
                "namespaceId": NAMESPACE_ID,
                "name": "Git Repositories",
                "displayName": "Git Repositories",
                "dataspaceCategory": "Git",
                "actions": [
                    { "name": "Read", "displayName": "Read", "bit": 1 },
                    { "name": "Write", "displayName": "Write", "bit": 2 }
                ]
            }]
        })))
        .expect(1)
        .mount(&fixture.org_server)
        .await;

    let namespaces = fixture.org_client().security_namespaces().await.unwrap();
    let catalog = NamespaceCatalog::from_namespaces(namespaces).unwrap();

    assert_eq!(catalog.namespace_id("Git").unwrap(), namespace_id());
    let bits = compute_bits(
        &catalog,
        namespace_id(),
        &["Read".to_string(), "Write".to_string()],
        &[],
    )
    .unwrap();
    assert_eq!(bits, AccessBits::new(3, 0));
}

// =============================================================================
// Test 5: group and entitlement resolution
// =============================================================================

/// Group resolution matches by exact display name within the scope and
/// reports a descriptive error otherwise.
#[tokio::test]
async fn test_group_descriptor_resolution() {
    let fixture = TestFixture::new().await;
    let readers = descriptor_for("vssgp", "S-1-9-10");

    Mock::given(method("GET"))
        .and(path("/_apis/graph/groups"))
        .and(query_param("scopeDescriptor", "scp.proj-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "count": 2,
            "value": [
                {
                    "displayName": "Readers",
                    "descriptor": readers.as_str(),
                    "originId": "11111111-1111-1111-1111-111111111111"
                },
                {
                    "displayName": "Readers Plus",
                    "descriptor": descriptor_for("vssgp", "S-1-9-11").as_str(),
                    "originId": "22222222-2222-2222-2222-222222222222"
                }
            ]
        })))
        .mount(&fixture.org_server)
        .await;

    let client = fixture.org_client();
    let scope = ScopeDescriptor::new("scp.proj-1");

    let resolved = client.group_descriptor(&scope, "Readers", true).await.unwrap();
    assert_eq!(resolved, readers);

    let err = client
        .group_descriptor(&scope, "Reader", true)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("'Reader' does not exist"));
}

/// Entitlement lookup returns the first match and errors when nothing
/// matches the principal name.
#[tokio::test]
async fn test_user_entitlement_lookup() {
    let fixture = TestFixture::new().await;

    Mock::given(method("GET"))
        .and(path("/_apis/userentitlements"))
        .and(query_param("$filter", "(name eq 'casey@example.com')"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "members": [{
                "id": "a3f2c2f1-4f5e-4b7a-9d3a-0c7c1d2e3f40",
                "lastAccessedDate": "2024-11-05T08:30:00Z",
                "user": {
                    "descriptor": descriptor_for("aad", "S-1-9-500").as_str(),
                    "originId": "u-500"
                }
            }]
        })))
        .mount(&fixture.org_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/_apis/userentitlements"))
        .and(query_param("$filter", "(name eq 'ghost@example.com')"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "members": [] })),
        )
        .mount(&fixture.org_server)
        .await;

    let client = fixture.org_client();

    let user = client.user_identity("casey@example.com").await.unwrap();
    assert_eq!(user.origin_id, OriginId::new("u-500"));
    assert_eq!(user.principal_name, "casey@example.com");
    assert!(user.last_accessed.is_some());

    let err = client.user_identity("ghost@example.com").await.unwrap_err();
    assert!(err.to_string().contains("ghost@example.com"));
}

// =============================================================================
// Test 6: federated membership walk
// =============================================================================

/// A user reachable through a native group whose child is an external
/// group is found: the walk fetches native members, maps the external
/// child to its origin id, and asks the external graph one direct
/// question.
#[tokio::test]
async fn test_federated_membership_walk() {
    let fixture = TestFixture::new().await;
    let team = descriptor_for("vssgp", "S-1-9-20");
    let external = descriptor_for("aadgp", "S-1-9-21");

    Mock::given(method("GET"))
        .and(path(format!("/_apis/graph/Memberships/{}", team.as_str())))
        .and(query_param("direction", "down"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "count": 1,
            "value": [{ "memberDescriptor": external.as_str() }]
        })))
        .mount(&fixture.org_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/_apis/graph/groups"))
        .and(query_param("scopeDescriptor", "scp.proj-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "count": 1,
            "value": [{
                "displayName": "External Devs",
                "descriptor": external.as_str(),
                "originId": "ext-1"
            }]
        })))
        .mount(&fixture.org_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "graph-token",
            "token_type": "Bearer"
        })))
        .mount(&fixture.graph_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/groups/ext-1/members"))
        .and(header("Authorization", "Bearer graph-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [{ "id": "u1" }, { "id": "u2" }]
        })))
        .mount(&fixture.graph_server)
        .await;

    let resolver = MembershipResolver::new(fixture.org_client(), fixture.graph_client());
    let scope = ScopeDescriptor::new("scp.proj-1");

    assert!(resolver
        .is_member(&scope, &team, &OriginId::new("u1"))
        .await
        .unwrap());
    assert!(!resolver
        .is_member(&scope, &team, &OriginId::new("u3"))
        .await
        .unwrap());
}

/// The engine wrapper resolves the user's entitlement, qualifies the group
/// name with the team prefix, and walks the federated graph.
#[tokio::test]
async fn test_is_user_member_of_group() {
    let fixture = TestFixture::new().await;
    let team = descriptor_for("vssgp", "S-1-9-40");
    let external = descriptor_for("aadgp", "S-1-9-41");

    Mock::given(method("GET"))
        .and(path("/_apis/userentitlements"))
        .and(query_param("$filter", "(name eq 'casey@example.com')"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "members": [{
                "id": "a3f2c2f1-4f5e-4b7a-9d3a-0c7c1d2e3f40",
                "user": {
                    "descriptor": descriptor_for("aad", "S-1-9-500").as_str(),
                    "originId": "u1"
                }
            }]
        })))
        .mount(&fixture.org_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/_apis/graph/groups"))
        .and(query_param("scopeDescriptor", "scp.proj-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "count": 2,
            "value": [
                {
                    "displayName": "TEAM-Atlas",
                    "descriptor": team.as_str(),
                    "originId": "44444444-4444-4444-4444-444444444444"
                },
                {
                    "displayName": "External Devs",
                    "descriptor": external.as_str(),
                    "originId": "ext-1"
                }
            ]
        })))
        .mount(&fixture.org_server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/_apis/graph/Memberships/{}", team.as_str())))
        .and(query_param("direction", "down"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "count": 1,
            "value": [{ "memberDescriptor": external.as_str() }]
        })))
        .mount(&fixture.org_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "graph-token"
        })))
        .mount(&fixture.graph_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/groups/ext-1/members"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [{ "id": "u1" }]
        })))
        .mount(&fixture.graph_server)
        .await;

    let engine = PolicyEngine::new(
        fixture.org_client(),
        fixture.org_client(),
        fixture.graph_client(),
        catalog(),
        GroupNaming {
            team_prefix: "TEAM-".to_string(),
            ..GroupNaming::default()
        },
    );
    let project = ProjectContext::new(
        "7c27e9b4-7c82-4b52-9b7d-3a8f0d7e3c11".parse().unwrap(),
        "proj-1",
        ScopeDescriptor::new("scp.proj-1"),
    );

    assert!(engine
        .is_user_member_of_group(&project, "casey@example.com", "Atlas", GroupKind::Team)
        .await
        .unwrap());
}

/// External group lookup authenticates with the client-credentials grant
/// and filters by display name.
#[tokio::test]
async fn test_external_group_lookup() {
    let fixture = TestFixture::new().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "graph-token"
        })))
        .mount(&fixture.graph_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/groups"))
        .and(query_param("$filter", "displayName eq 'External Devs'"))
        .and(header("Authorization", "Bearer graph-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [{ "id": "ext-1", "displayName": "External Devs" }]
        })))
        .mount(&fixture.graph_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/groups"))
        .and(query_param("$filter", "displayName eq 'Nobody Here'"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "value": [] })))
        .mount(&fixture.graph_server)
        .await;

    let client = fixture.graph_client();

    let found = client
        .group_id_by_display_name("External Devs")
        .await
        .unwrap();
    assert_eq!(found, Some(OriginId::new("ext-1")));

    let missing = client.group_id_by_display_name("Nobody Here").await.unwrap();
    assert_eq!(missing, None);
}

// =============================================================================
// Test 7: template application end to end
// =============================================================================

/// Applying an object-permission template resolves the group in the
/// project scope, computes bits from action names, and writes one merged
/// entry.
#[tokio::test]
async fn test_apply_object_permissions_end_to_end() {
    let fixture = TestFixture::new().await;
    let owners = descriptor_for("vssgp", "S-1-9-30");

    Mock::given(method("GET"))
        .and(path("/_apis/graph/groups"))
        .and(query_param("scopeDescriptor", "scp.proj-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "count": 1,
            "value": [{
                "displayName": "Owners",
                "descriptor": owners.as_str(),
                "originId": "33333333-3333-3333-3333-333333333333"
            }]
        })))
        .mount(&fixture.org_server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/_apis/accesscontrolentries/{}", NAMESPACE_ID)))
        .and(body_partial_json(serde_json::json!({
            "token": "repoV2/proj-1",
            "merge": true,
            "accessControlEntries": [{
                "descriptor": "Microsoft.TeamFoundation.Identity;S-1-9-30",
                "allow": 3,
                "deny": 0
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&fixture.org_server)
        .await;

    let engine = PolicyEngine::new(
        fixture.org_client(),
        fixture.org_client(),
        fixture.graph_client(),
        catalog(),
        GroupNaming::default(),
    );
    let project = ProjectContext::new(
        "7c27e9b4-7c82-4b52-9b7d-3a8f0d7e3c11".parse().unwrap(),
        "proj-1",
        ScopeDescriptor::new("scp.proj-1"),
    );

    let roles = vec![ObjectPermission {
        group: Some("Owners".to_string()),
        group_scope: crewbase_rights::GroupScope::ProjectGroup,
        extra_notes: None,
        merge: true,
        allow: vec!["Read".to_string(), "Write".to_string()],
        deny: Vec::new(),
    }];

    engine
        .apply_object_permissions(&project, namespace_id(), "repoV2/proj-1", &roles, None)
        .await
        .unwrap();
}
