//! Query outcomes over HTTP.

use crate::integration::mock_server::MockServerFixture;
use futures::StreamExt;
use mockito::Matcher;
use overpass_lib_rust::prelude::*;
use overpass_lib_rust::RequestOptions;

const QUERY: &str = "[out:json];node(1);out;";

const CAFE_DOC: &str = r#"{
  "version": 0.6,
  "generator": "Overpass API 0.7.62.1 084b4234",
  "osm3s": {
    "timestamp_osm_base": "2024-05-01T09:58:10Z",
    "copyright": "The data included in this document is from www.openstreetmap.org. The data is made available under ODbL."
  },
  "elements": [
    {"type": "node", "id": 1, "lat": 51.5007, "lon": -0.1246, "tags": {"amenity": "cafe", "name": "Corner Cafe"}},
    {"type": "way", "id": 2, "nodes": [1, 3, 4], "center": {"lat": 51.5008, "lon": -0.1247}}
  ]
}"#;

#[tokio::test]
async fn test_json_query_posts_form_encoded_data() {
    let fixture = MockServerFixture::new().await;
    let _status = fixture.mock_idle_status().await;
    let mock = fixture
        .mock_query_matching(
            Matcher::UrlEncoded("data".into(), QUERY.into()),
            200,
            "application/json",
            CAFE_DOC,
        )
        .await;

    let endpoint = fixture.endpoint();
    let doc = endpoint.query_json(QUERY).await.expect("query succeeds");

    mock.assert_async().await;
    assert_eq!(doc.elements.len(), 2);
    let cafe = doc.nodes().next().expect("one node");
    assert_eq!(
        cafe.meta.tags.as_ref().and_then(|t| t.get("name")).map(String::as_str),
        Some("Corner Cafe")
    );
    assert_eq!(doc.ways().next().map(|w| w.nodes.len()), Some(3));
    assert_eq!(endpoint.signals().status, "known");
    assert_eq!(endpoint.signals().rate_limit, Some(2));
}

#[tokio::test]
async fn test_user_agent_and_custom_headers_are_sent() {
    let fixture = MockServerFixture::new().await;
    let _status = fixture.mock_idle_status().await;
    let mock = {
        let mut server = fixture.server.lock().await;
        server
            .mock("POST", "/api/interpreter")
            .match_header("user-agent", "survey-tool/1.0")
            .match_header("x-survey", "42")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(CAFE_DOC)
            .create_async()
            .await
    };

    let request = QueryRequest::json(QUERY).with_options(
        RequestOptions::default()
            .with_user_agent("survey-tool/1.0")
            .with_header("x-survey", "42"),
    );
    fixture.endpoint().submit(request).await.expect("query succeeds");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_bad_request_reports_every_error() {
    let fixture = MockServerFixture::new().await;
    let _status = fixture.mock_idle_status().await;
    let page = r#"<!DOCTYPE html>
<html><body>
<p>The data included in this document is from www.openstreetmap.org.</p>
<p><strong style="color:#FF0000">Error</strong>: line 1: parse error: Unknown type &quot;nod&quot; </p>
<p><strong style="color:#FF0000">Error</strong>: line 1: parse error: An empty query is not allowed </p>
</body></html>"#;
    let mock = fixture.mock_query_times(1, 400, "text/html", page).await;

    let err = fixture
        .endpoint()
        .query_json("nod(1);out;")
        .await
        .expect_err("bad request");
    mock.assert_async().await;

    match &err {
        Error::BadRequest { query, errors } => {
            assert_eq!(query, "nod(1);out;");
            assert_eq!(
                errors,
                &vec![
                    r#"line 1: parse error: Unknown type "nod""#.to_string(),
                    "line 1: parse error: An empty query is not allowed".to_string(),
                ]
            );
        }
        other => panic!("expected bad request, got {:?}", other),
    }
    assert!(err.to_string().starts_with("400 Bad Request"));
}

#[tokio::test]
async fn test_json_remark_is_a_runtime_error() {
    let fixture = MockServerFixture::new().await;
    let _status = fixture.mock_idle_status().await;
    let body = r#"{"version":0.6,"generator":"Overpass API","elements":[],
      "remark":"runtime error: Query timed out in \"query\" at line 1 after 26 seconds."}"#;
    let _mock = fixture.mock_query(200, "application/json", body).await;

    let err = fixture.endpoint().query_json(QUERY).await.unwrap_err();
    assert_eq!(
        err.server_messages(),
        &[r#"runtime error: Query timed out in "query" at line 1 after 26 seconds."#.to_string()]
    );
}

#[tokio::test]
async fn test_xml_remark_is_a_runtime_error() {
    let fixture = MockServerFixture::new().await;
    let _status = fixture.mock_idle_status().await;
    let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6" generator="Overpass API 0.7.62.1">
<note>The data included in this document is from www.openstreetmap.org.</note>
<meta osm_base="2024-05-01T09:58:10Z"/>
  <remark> runtime error: Query ran out of memory in "query" at line 1. </remark>
</osm>
"#;
    let _mock = fixture.mock_query(200, "application/osm3s+xml", body).await;

    let err = fixture.endpoint().query_xml("node(1);out;").await.unwrap_err();
    assert!(matches!(err, Error::QueryRuntime { .. }));
    assert_eq!(err.server_messages().len(), 1);
}

#[tokio::test]
async fn test_csv_and_stream_outputs() {
    let fixture = MockServerFixture::new().await;
    let _status = fixture.mock_idle_status().await;
    let csv = "@id\tname\n1\tCorner Cafe\n";
    let _mock = fixture.mock_query(200, "text/csv", csv).await;
    let endpoint = fixture.endpoint();

    assert_eq!(endpoint.query_csv("[out:csv(::id,name)];node(1);out;").await.unwrap(), csv);

    let mut stream = endpoint.query_stream("[out:csv(::id,name)];node(1);out;").await.unwrap();
    let mut collected = Vec::new();
    while let Some(chunk) = stream.next().await {
        collected.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(collected, csv.as_bytes());
    assert_eq!(endpoint.signals().pending(), 0);
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let fixture = MockServerFixture::new().await;
    let _status = fixture.mock_idle_status().await;
    let mock = fixture
        .mock_query_times(1, 503, "text/html", "<html>busy</html>")
        .await;

    let err = fixture.endpoint().query(QUERY).await.unwrap_err();
    mock.assert_async().await;
    match err {
        Error::Remote { status, reason } => {
            assert_eq!(status, 503);
            assert_eq!(reason, "Service Unavailable");
        }
        other => panic!("expected remote error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_undecodable_json_is_a_serialization_error() {
    let fixture = MockServerFixture::new().await;
    let _status = fixture.mock_idle_status().await;
    let _mock = fixture
        .mock_query(200, "application/json", "<html>definitely not json</html>")
        .await;

    let err = fixture.endpoint().query_json(QUERY).await.unwrap_err();
    assert_eq!(err.class(), "serialization");
}
