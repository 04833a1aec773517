#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use secrecy::Secret;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use binderscan::config::Config;

pub const PLACEHOLDER: &str = "https://placeholder.test/card-back.png";

/// One mock server per upstream.
pub struct Upstreams {
    pub openai: MockServer,
    pub pokemon_tcg: MockServer,
    pub tcgdex: MockServer,
}

impl Upstreams {
    pub async fn start() -> Self {
        Self {
            openai: MockServer::start().await,
            pokemon_tcg: MockServer::start().await,
            tcgdex: MockServer::start().await,
        }
    }

    pub fn config(&self, openai_key: Option<&str>) -> Config {
        let mut config = Config::with_defaults();
        config.openai_api_key = openai_key.map(|k| Secret::new(k.to_string()));
        config.openai_base_url = format!("{}/v1", self.openai.uri());
        config.pokemontcg_base_url = format!("{}/v2", self.pokemon_tcg.uri());
        config.tcgdex_base_url = format!("{}/v2", self.tcgdex.uri());
        config.placeholder_image_url = PLACEHOLDER.to_string();
        config.set_refresh_enabled = false;
        config.request_timeout_secs = 5;
        config.vision_timeout_secs = 5;
        config
    }
}

pub fn set_json(id: &str, name: &str, printed_total: u32) -> Value {
    json!({
        "id": id,
        "name": name,
        "series": "Test",
        "printedTotal": printed_total,
        "total": printed_total,
        "releaseDate": "2023/01/01"
    })
}

pub fn card_json(id: &str, name: &str, number: &str, set: Value) -> Value {
    json!({
        "id": id,
        "name": name,
        "number": number,
        "set": set,
        "images": {
            "small": format!("https://images.test/{}.png", id),
            "large": format!("https://images.test/{}_hires.png", id)
        },
        "tcgplayer": {"prices": {"normal": {"market": 1.5}}}
    })
}

pub fn page(data: Vec<Value>) -> Value {
    let count = data.len();
    json!({ "data": data, "page": 1, "pageSize": 250, "count": count, "totalCount": count })
}

pub async fn mount_sets(server: &MockServer, sets: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path("/v2/sets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(sets)))
        .mount(server)
        .await;
}

pub fn standard_sets() -> Vec<Value> {
    vec![
        set_json("base1", "Base", 102),
        set_json("base4", "Base Set 2", 130),
        set_json("sv3", "Obsidian Flames", 197),
        set_json("sv3pt5", "151", 165),
    ]
}

/// OpenAI chat-completions reply whose message content is `content`.
pub fn chat_reply(content: &Value) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content.to_string()},
            "finish_reason": "stop"
        }]
    })
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub fn json_request(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}
