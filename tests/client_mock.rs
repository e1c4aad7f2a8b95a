use mockito::{Matcher, Server};
use todobin::client::{ClientError, TodoClient};
use todobin::model::{SearchQuery, UpdateListRequest};

const LIST_JSON: &str = r#"{
    "id": "abc",
    "title": "Mocked",
    "items": [{
        "id": "i1",
        "content": "one",
        "completed": false,
        "order": 0,
        "priority": "high",
        "created_at": "2025-01-01T00:00:00Z"
    }],
    "tags": ["mock"],
    "created_at": "2025-01-01T00:00:00Z",
    "expires_at": "2025-01-02T00:00:00Z",
    "view_count": 3,
    "like_count": 1
}"#;

#[tokio::test]
async fn update_sends_token_and_client_id() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PUT", "/api/v1/todos/abc")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("token".into(), "t o/k".into()),
            Matcher::UrlEncoded("client_id".into(), "me".into()),
        ]))
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJsonString(r#"{"items": []}"#.into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(LIST_JSON)
        .create_async()
        .await;

    let client = TodoClient::new(&server.url(), false).unwrap();
    let list = client
        .update("abc", "t o/k", Some("me"), &UpdateListRequest::default())
        .await
        .unwrap();
    assert_eq!(list.title, "Mocked");
    assert_eq!(list.items[0].priority, todobin::model::Priority::High);
    mock.assert_async().await;
}

#[tokio::test]
async fn server_errors_keep_generic_message_and_detail() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/v1/todos")
        .with_status(400)
        .with_body(r#"{"error":"Invalid request body"}"#)
        .create_async()
        .await;

    let client = TodoClient::new(&server.url(), false).unwrap();
    let err = client.create(&Default::default()).await.unwrap_err();
    match err {
        ClientError::Status {
            status,
            message,
            detail,
        } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Failed to create todo list");
            assert_eq!(detail.as_deref(), Some("Invalid request body"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn search_encodes_query_parameters() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v1/todos")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("search".into(), "milk & eggs".into()),
            Matcher::UrlEncoded("tags".into(), "home,food".into()),
            Matcher::UrlEncoded("limit".into(), "5".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"lists": [], "next_cursor": null}"#)
        .create_async()
        .await;

    let client = TodoClient::new(&server.url(), false).unwrap();
    let page = client
        .search(&SearchQuery {
            search: Some("milk & eggs".to_string()),
            tags: vec!["home".to_string(), "food".to_string()],
            cursor: None,
            limit: Some(5),
        })
        .await
        .unwrap();
    assert!(page.lists.is_empty());
    assert!(page.next_cursor.is_none());
    mock.assert_async().await;
}

#[tokio::test]
async fn malformed_bodies_are_decode_errors() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/v1/todos/abc")
        .with_status(200)
        .with_body("<html>")
        .create_async()
        .await;

    let client = TodoClient::new(&server.url(), false).unwrap();
    assert!(matches!(
        client.get("abc").await,
        Err(ClientError::Decode(_))
    ));
}
