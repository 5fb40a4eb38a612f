#![cfg(not(coverage))]

use super::test_support::*;
use super::*;
use httpmock::prelude::*;
use serde_json::json;
use std::time::Duration;

fn auth_client(server: &MockServer) -> ApiClient {
    ApiClient::new_with_base_url(server.url("/api"))
}

fn resource_client(server: &MockServer) -> ApiClient {
    ApiClient::new_with_base_url(server.base_url())
}

#[tokio::test]
async fn get_adds_cache_buster_request_id_and_bearer() {
    let server = MockServer::start_async().await;
    let info = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/user/info")
                .query_param_exists(CACHE_BUST_PARAM)
                .header_exists(REQUEST_ID_HEADER)
                .header("authorization", "Bearer t1");
            then.status(200).json_body(flag_ok(user_json("u1", "demo")));
        })
        .await;

    let client = auth_client(&server);
    client.set_token(Some("t1".into()));
    let user = client.get_user_info().await.unwrap();
    assert_eq!(user.username, "demo");
    assert_eq!(user.roles, vec!["member".to_string()]);
    assert_eq!(info.hits_async().await, 1);
}

#[tokio::test]
async fn success_flag_false_is_business_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/user/info");
            then.status(200).json_body(flag_err("E100", "User disabled"));
        })
        .await;

    let error = auth_client(&server).get_user_info().await.unwrap_err();
    assert_eq!(error.kind, ErrorKind::Business);
    assert_eq!(error.code.as_deref(), Some("E100"));
    assert_eq!(error.message, "User disabled");
    assert!(!error.is_auth_failure());
}

#[tokio::test]
async fn envelope_without_flag_is_malformed() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/user/info");
            then.status(200).json_body(json!({"data": {"id": "u1"}}));
        })
        .await;

    let error = auth_client(&server).get_user_info().await.unwrap_err();
    assert_eq!(error.code.as_deref(), Some("MALFORMED_RESPONSE"));
}

#[tokio::test]
async fn http_status_uses_default_message_without_server_text() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/user/info");
            then.status(404);
        })
        .await;

    let error = auth_client(&server).get_user_info().await.unwrap_err();
    assert_eq!(error.kind, ErrorKind::HttpStatus(404));
    assert_eq!(error.message, "The requested resource does not exist");
}

#[tokio::test]
async fn http_status_prefers_server_message() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/token/refresh");
            then.status(500)
                .json_body(json!({"success": false, "errMessage": "database offline"}));
        })
        .await;

    let error = auth_client(&server).refresh_token().await.unwrap_err();
    assert_eq!(error.status(), Some(500));
    assert_eq!(error.message, "database offline");
}

#[tokio::test]
async fn unreachable_host_is_network_error() {
    let client = ApiClient::new_with_base_url("http://127.0.0.1:9/api");
    let error = client.get_user_info().await.unwrap_err();
    assert_eq!(error.kind, ErrorKind::Network);
    assert_eq!(
        error.message,
        "Network connection failed, please check your network"
    );
}

#[tokio::test]
async fn slow_response_is_timeout() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/user/info");
            then.status(200)
                .delay(Duration::from_millis(500))
                .json_body(flag_ok(user_json("u1", "demo")));
        })
        .await;

    let client = auth_client(&server).with_timeout(Duration::from_millis(50));
    let error = client.get_user_info().await.unwrap_err();
    assert_eq!(error.kind, ErrorKind::Timeout);
}

#[tokio::test]
async fn blob_download_skips_envelope() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/users/export");
            then.status(200)
                .header("content-type", "text/csv")
                .body("id,username\nu1,demo\n");
        })
        .await;

    let bytes = resource_client(&server)
        .download(HttpMethod::Get, "/api/v1/users/export", Some(&json!({"status": "active"})))
        .await
        .unwrap();
    assert_eq!(bytes, b"id,username\nu1,demo\n".to_vec());
}

#[tokio::test]
async fn status_code_dialect_unwraps_and_rejects() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/user/info");
            then.status(200).json_body(code_ok(user_json("u1", "demo")));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/token/refresh");
            then.status(200).json_body(code_err(401, "Token expired"));
        })
        .await;

    let client = auth_client(&server).with_dialect(DialectKind::StatusCode);
    assert_eq!(client.get_user_info().await.unwrap().id, "u1");

    let error = client.refresh_token().await.unwrap_err();
    assert_eq!(error.kind, ErrorKind::Business);
    assert_eq!(error.code.as_deref(), Some("401"));
    assert_eq!(error.message, "Token expired");
    assert!(error.is_auth_failure());
}

#[tokio::test]
async fn list_users_reads_pagination_metadata() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/users")
                .query_param("pageNum", "2")
                .query_param("pageSize", "20")
                .query_param("username", "de");
            then.status(200).json_body(json!({
                "success": true,
                "data": [
                    {"id": "u1", "username": "demo", "roleIds": ["r1"]},
                    {"id": "u2", "username": "dev"}
                ],
                "totalCount": 22,
                "pageSize": 20,
                "pageIndex": 2,
                "totalPages": 2
            }));
        })
        .await;

    let page = resource_client(&server)
        .list_users(&GetUsersParams {
            username: Some("de".into()),
            page: PageQuery::new(2, 20),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].role_ids, vec!["r1".to_string()]);
    assert_eq!(page.total_count, 22);
    assert_eq!(page.page_index, Some(2));
    assert_eq!(page.total_pages, Some(2));
}

#[tokio::test]
async fn update_role_sends_id_in_body() {
    let server = MockServer::start_async().await;
    let update = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/api/v1/roles/r1")
                .json_body(json!({"id": "r1", "roleName": "Operators"}));
            then.status(200).json_body(flag_ok(role_json("r1", "ops")));
        })
        .await;

    let role = resource_client(&server)
        .update_role(
            "r1",
            &UpdateRoleRequest {
                role_name: "Operators".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(role.role_code, "ops");
    assert_eq!(update.hits_async().await, 1);
}

#[tokio::test]
async fn relation_assignments_post_expected_bodies() {
    let server = MockServer::start_async().await;
    let roles = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/users/u1/roles")
                .json_body(json!({"roleIds": ["r1", "r2"]}));
            then.status(200).json_body(flag_ok(json!(true)));
        })
        .await;
    let permissions = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/roles/r1/permissions")
                .json_body(json!({"roleId": "r1", "permissionIds": ["p1"]}));
            then.status(200).json_body(flag_ok(json!(null)));
        })
        .await;
    let apis = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/permissions/p1/apis")
                .json_body(json!({"permissionId": "p1", "apiIds": ["a1", "a2"]}));
            then.status(200).json_body(flag_ok(json!({})));
        })
        .await;

    let client = resource_client(&server);
    client
        .assign_user_roles(
            "u1",
            &AssignUserRoleRequest {
                role_ids: vec!["r1".into(), "r2".into()],
            },
        )
        .await
        .unwrap();
    client
        .assign_role_permissions("r1", vec!["p1".into()])
        .await
        .unwrap();
    client
        .assign_permission_apis("p1", vec!["a1".into(), "a2".into()])
        .await
        .unwrap();

    assert_eq!(roles.hits_async().await, 1);
    assert_eq!(permissions.hits_async().await, 1);
    assert_eq!(apis.hits_async().await, 1);
}

#[tokio::test]
async fn delete_ignores_returned_payload() {
    let server = MockServer::start_async().await;
    let delete = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/v1/apis/a1");
            then.status(200).json_body(flag_ok(json!({"deleted": 1})));
        })
        .await;

    resource_client(&server).delete_api("a1").await.unwrap();
    assert_eq!(delete.hits_async().await, 1);
}

#[tokio::test]
async fn logout_uses_given_token() {
    let server = MockServer::start_async().await;
    let logout = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/logout")
                .header("authorization", "Bearer old");
            then.status(200).json_body(flag_ok(json!(null)));
        })
        .await;

    let client = auth_client(&server);
    client.set_token(None);
    client.logout(Some("old".into())).await.unwrap();
    assert_eq!(logout.hits_async().await, 1);
}
