use serde_json::json;
use vmsync_vsphere::{ManagedRef, RestClient, RestConfig, SourceApi, SourceError};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SESSION_HEADER: &str = "vmware-api-session-id";

fn client(server: &MockServer) -> RestClient {
    RestClient::new(RestConfig::new(server.uri(), "admin", "secret")).unwrap()
}

async fn mount_api_session(server: &MockServer, id: &str) {
    Mock::given(method("POST"))
        .and(path("/api/session"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!(id)))
        .expect(1)
        .mount(server)
        .await;
}

fn vm_list() -> serde_json::Value {
    json!([
        { "vm": "vm-1", "name": "web01", "power_state": "POWERED_ON",
          "cpu_count": 2, "memory_size_MiB": 4096 },
        { "vm": "vm-2", "name": "db01", "power_state": "POWERED_OFF" }
    ])
}

#[tokio::test]
async fn test_session_is_created_once_and_reused() {
    let server = MockServer::start().await;
    mount_api_session(&server, "sess-1").await;

    Mock::given(method("GET"))
        .and(path("/api/vcenter/vm"))
        .and(header(SESSION_HEADER, "sess-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vm_list()))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server);
    let vms = client.list_objects().await.unwrap();
    assert_eq!(vms.len(), 2);
    assert_eq!(vms[0].name, "web01");
    assert_eq!(vms[0].memory_size_mib, Some(4096));
    assert_eq!(vms[1].cpu_count, None);

    client.list_objects().await.unwrap();
    assert_eq!(client.endpoint(), "127.0.0.1");
}

#[tokio::test]
async fn test_rejected_session_is_renewed_once() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/session"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!("stale")))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/session"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!("fresh")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/vcenter/vm"))
        .and(header(SESSION_HEADER, "stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/vcenter/vm"))
        .and(header(SESSION_HEADER, "fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vm_list()))
        .expect(1)
        .mount(&server)
        .await;

    let vms = client(&server).list_objects().await.unwrap();
    assert_eq!(vms.len(), 2);
}

#[tokio::test]
async fn test_bad_credentials_are_authentication_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/session"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client(&server).check_connection().await.unwrap_err();
    assert!(matches!(err, SourceError::Authentication { .. }));
    assert!(err.is_connectivity());
}

#[tokio::test]
async fn test_unreachable_endpoint_is_connectivity_error() {
    let client = RestClient::new(RestConfig::new("http://127.0.0.1:1", "u", "p")).unwrap();
    let err = client.list_objects().await.unwrap_err();
    assert!(err.is_connectivity());
}

#[tokio::test]
async fn test_object_details_and_status_mapping() {
    let server = MockServer::start().await;
    mount_api_session(&server, "sess-1").await;

    Mock::given(method("GET"))
        .and(path("/api/vcenter/vm/vm-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "guest": { "host_name": "web01.lab", "ip_address": "10.0.0.5" },
            "config": { "num_cpu": 2, "template": false }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/vcenter/vm/vm-404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/vcenter/vm/vm-500"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = client(&server);
    let details = client.object_details(&ManagedRef::vm("vm-1")).await.unwrap();
    assert_eq!(
        details.guest.unwrap().host_name.as_deref(),
        Some("web01.lab")
    );
    assert!(details.runtime.is_none());

    let err = client
        .object_details(&ManagedRef::vm("vm-404"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = client
        .object_details(&ManagedRef::vm("vm-500"))
        .await
        .unwrap_err();
    match err {
        SourceError::Http { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_parent_folder_lookup() {
    let server = MockServer::start().await;
    mount_api_session(&server, "sess-1").await;

    Mock::given(method("GET"))
        .and(path("/api/vcenter/folder"))
        .and(query_param("vms", "vm-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "folder": "group-v3", "name": "Finance", "type": "VIRTUAL_MACHINE" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let parent = client
        .parent_of(&ManagedRef::vm("vm-1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(parent.name, "Finance");
    assert_eq!(parent.reference.id, "group-v3");
    assert!(!parent.reference.is_vm());

    // Folders are not walked further.
    assert!(client.parent_of(&parent.reference).await.unwrap().is_none());
}

#[tokio::test]
async fn test_tagging_uses_cis_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/com/vmware/cis/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": "cis-1" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/com/vmware/cis/tagging/tag"))
        .and(header(SESSION_HEADER, "cis-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": ["tag-1"] })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/com/vmware/cis/tagging/tag-association/id:tag-1"))
        .and(query_param("~action", "list-attached-objects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                { "type": "VirtualMachine", "id": "vm-1" },
                { "type": "HostSystem", "id": "host-1" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/com/vmware/cis/tagging/tag/id:tag-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": { "id": "tag-1", "name": "prod", "description": "production" }
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let tags = client.list_tags().await.unwrap();
    assert_eq!(tags, vec!["tag-1"]);

    let attached = client.tag_attachments("tag-1").await.unwrap();
    assert_eq!(attached.len(), 2);
    assert!(attached[0].is_vm());
    assert!(!attached[1].is_vm());

    let info = client.tag_info("tag-1").await.unwrap();
    assert_eq!(info.name, "prod");
    assert_eq!(info.description, "production");
}

#[tokio::test]
async fn test_custom_values_are_read_only_over_rest() {
    let server = MockServer::start().await;
    let client = client(&server);

    assert!(client.custom_field_catalog().await.unwrap().is_empty());
    let err = client
        .set_custom_value(&ManagedRef::vm("vm-1"), "owner", "ops")
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::Unsupported { .. }));
}
