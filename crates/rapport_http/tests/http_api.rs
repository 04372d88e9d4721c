use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use rapport_core::llm::chain::ProviderChain;
use rapport_http::{router, AppState};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    _dir: TempDir,
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let state = AppState::new(
            dir.path().join("rapport.db"),
            ProviderChain::new(),
            ProviderChain::new(),
        );
        Self {
            router: router(state),
            _dir: dir,
        }
    }

    async fn call(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request should build");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should read");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("body should be JSON")
        };
        (status, value)
    }
}

fn new_person_request(name: &str, job: &str) -> Value {
    json!({
        "original_text": "",
        "is_new_person": true,
        "profile": {
            "name": name,
            "job": job,
            "events": [{"date": "2026-02-20", "description": "吃饭"}]
        },
        "annotations": [{"time": "2026-03", "description": "一起去上海出差"}],
        "developments": [{"content": "AI芯片"}],
        "relations": [{"name": "李四", "relation_type": "同事"}]
    })
}

#[tokio::test]
async fn root_and_health_report_service_state() {
    let app = TestApp::new();
    let (status, body) = app.call("GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["version"].is_string());

    let (status, body) = app.call("GET", "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["schema_version"], 3);
    assert_eq!(body["llm_configured"], false);
}

#[tokio::test]
async fn confirm_new_person_then_read_back() {
    let app = TestApp::new();
    let (status, body) = app
        .call("POST", "/confirm", Some(new_person_request("张三", "teacher")))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    let person_id = body["person_id"].as_i64().unwrap();

    let (status, person) = app.call("GET", &format!("/persons/{person_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(person["name"], "张三");
    assert_eq!(person["profile"]["job"], "teacher");
    assert_eq!(person["events"].as_array().unwrap().len(), 1);
    assert_eq!(person["developments"][0]["type"], "resource");

    let (_, persons) = app.call("GET", "/persons", None).await;
    assert_eq!(persons.as_array().unwrap().len(), 2, "stub for 李四 is created");

    let (status, body) = app
        .call("POST", "/confirm", Some(new_person_request("张三", "teacher")))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");
}

#[tokio::test]
async fn compare_and_merge_existing_person() {
    let app = TestApp::new();
    let (_, created) = app
        .call("POST", "/confirm", Some(new_person_request("张三", "teacher")))
        .await;
    let person_id = created["person_id"].as_i64().unwrap();

    let extracted = json!({
        "profile": {
            "name": "张三",
            "job": "engineer",
            "events": [{"date": "2026-02-20", "description": "和朋友吃晚饭"}]
        },
        "annotations": [],
        "developments": [],
        "relations": []
    });
    let (status, preview) = app
        .call(
            "POST",
            "/extract/compare",
            Some(json!({"person_id": person_id, "extracted_data": extracted})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{preview}");
    assert_eq!(preview["profile"]["job"], "engineer");
    assert_eq!(preview["event_replacements"].as_array().unwrap().len(), 1);
    assert_eq!(preview["conflicts"].as_array().unwrap().len(), 2);

    let mut confirm = extracted.clone();
    confirm["is_new_person"] = json!(false);
    confirm["person_id"] = json!(person_id);
    let (status, body) = app.call("POST", "/confirm", Some(confirm)).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (_, person) = app.call("GET", &format!("/persons/{person_id}"), None).await;
    assert_eq!(person["profile"]["job"], "engineer");
    let events = person["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["description"], "和朋友吃晚饭");
}

#[tokio::test]
async fn confirm_existing_without_person_id_is_bad_request() {
    let app = TestApp::new();
    let mut request = new_person_request("张三", "teacher");
    request["is_new_person"] = json!(false);
    let (status, body) = app.call("POST", "/confirm", Some(request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_input");
    assert!(body["detail"].as_str().unwrap().contains("person_id"));
}

#[tokio::test]
async fn extract_validates_then_reports_unavailable() {
    let app = TestApp::new();
    let (status, _) = app
        .call("POST", "/extract", Some(json!({"text": "  "})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call("POST", "/extract", Some(json!({"text": "昨天和张三吃饭"})))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "unavailable");
}

#[tokio::test]
async fn malformed_json_uses_error_envelope() {
    let app = TestApp::new();
    let (status, body) = app
        .call("POST", "/extract/check-name", Some(json!({"nom": "x"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_input");
}

#[tokio::test]
async fn check_name_reports_existing_person() {
    let app = TestApp::new();
    app.call("POST", "/confirm", Some(new_person_request("张三", "teacher")))
        .await;

    let (_, body) = app
        .call("POST", "/extract/check-name", Some(json!({"name": " 张三 "})))
        .await;
    assert_eq!(body["exists"], true);
    assert_eq!(body["person"]["job"], "teacher");

    let (_, body) = app
        .call("POST", "/extract/check-name", Some(json!({"name": "王五"})))
        .await;
    assert_eq!(body["exists"], false);
    assert!(body.get("person").is_none());
}

#[tokio::test]
async fn update_and_delete_person_records() {
    let app = TestApp::new();
    let (_, created) = app
        .call("POST", "/confirm", Some(new_person_request("张三", "teacher")))
        .await;
    let person_id = created["person_id"].as_i64().unwrap();

    let (status, person) = app
        .call(
            "PUT",
            &format!("/persons/{person_id}"),
            Some(json!({"avatar": "avatars/zs.png", "events": []})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{person}");
    assert_eq!(person["avatar"], "avatars/zs.png");
    assert!(person["events"].as_array().unwrap().is_empty());
    assert_eq!(person["annotations"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .call("PUT", &format!("/persons/{person_id}"), Some(json!({"name": "李四"})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let annotation_id = person["annotations"][0]["id"].as_i64().unwrap();
    let (status, _) = app
        .call(
            "DELETE",
            &format!("/persons/{person_id}/annotations/{annotation_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .call(
            "DELETE",
            &format!("/persons/{person_id}/annotations/{annotation_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.call("DELETE", &format!("/persons/{person_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.call("GET", &format!("/persons/{person_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn relations_circles_and_graph() {
    let app = TestApp::new();
    let (_, created) = app
        .call("POST", "/confirm", Some(new_person_request("张三", "teacher")))
        .await;
    let zhang = created["person_id"].as_i64().unwrap();
    let (_, wang) = app
        .call(
            "POST",
            "/confirm",
            Some(json!({"is_new_person": true, "profile": {"name": "王五"}})),
        )
        .await;
    let wang = wang["person_id"].as_i64().unwrap();

    let (status, outcome) = app
        .call(
            "POST",
            &format!("/persons/{zhang}/relations"),
            Some(json!({"to_person_id": wang, "relation_type": "朋友"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["created"], true);
    let (_, outcome) = app
        .call(
            "POST",
            &format!("/persons/{wang}/relations"),
            Some(json!({"to_person_id": zhang, "relation_type": "同学"})),
        )
        .await;
    assert_eq!(outcome["created"], false);

    let (status, _) = app
        .call(
            "POST",
            &format!("/persons/{zhang}/relations"),
            Some(json!({"to_person_id": zhang, "relation_type": "自己"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, circle) = app
        .call("POST", "/circles", Some(json!({"name": "大学同学", "color": "#4A7B9C"})))
        .await;
    assert_eq!(status, StatusCode::OK, "{circle}");
    let circle_id = circle["id"].as_i64().unwrap();
    let (status, _) = app
        .call("POST", "/circles", Some(json!({"name": "大学同学", "color": "#fff"})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = app
        .call("POST", "/circles", Some(json!({"name": "家人", "color": "red"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            "POST",
            &format!("/circles/{circle_id}/members"),
            Some(json!({"person_id": zhang})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .call(
            "POST",
            &format!("/circles/{circle_id}/members"),
            Some(json!({"person_id": zhang})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, members) = app.call("GET", "/circles/members", None).await;
    assert_eq!(members[0]["name"], "大学同学");
    assert_eq!(members[0]["members"][0]["name"], "张三");

    let (_, circles) = app.call("GET", &format!("/persons/{zhang}/circles"), None).await;
    assert_eq!(circles[0]["id"], circle_id);

    let (status, graph) = app.call("GET", "/graph", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(graph["nodes"].as_array().unwrap().len(), 3);
    // 张三-李四 from confirm, 张三-王五 from the relation endpoint.
    assert_eq!(graph["edges"].as_array().unwrap().len(), 2);
    let zhang_node = graph["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|node| node["id"] == zhang)
        .unwrap();
    assert_eq!(zhang_node["circle_ids"], json!([circle_id]));

    let (status, _) = app
        .call("DELETE", &format!("/persons/{zhang}/relations/{wang}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, relations) = app
        .call("GET", &format!("/persons/{wang}/relations"), None)
        .await;
    assert!(relations.as_array().unwrap().is_empty());

    let (status, _) = app
        .call("DELETE", &format!("/circles/{circle_id}/members/{zhang}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.call("DELETE", &format!("/circles/{circle_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, circles) = app.call("GET", "/circles", None).await;
    assert!(circles.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn graph_layout_round_trips_opaque_blob() {
    let app = TestApp::new();
    let (status, layout) = app.call("GET", "/graph/layout", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(layout["layout_json"], json!({}));

    let blob = json!({"positions": {"1": {"x": 10.5, "y": -3}}, "zoom": 1.25});
    let (status, saved) = app
        .call("POST", "/graph/layout", Some(json!({"layout_json": blob})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["success"], true);

    let (_, layout) = app.call("GET", "/graph/layout", None).await;
    assert_eq!(layout["layout_json"], blob);
    assert!(layout["updated_at"].is_i64());
}
