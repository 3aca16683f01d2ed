//! Shared harness: a router over the in-memory store on an ephemeral port.

use std::sync::Arc;

use reqwest::{Client, RequestBuilder, header::COOKIE};
use restaurant::{
    config::{Config, StoreConfig},
    memory::MemoryStore,
    router,
    state::AppState,
};
use serde_json::{Value, json};

pub const SECRET: &str = "test-secret";

pub struct TestServer {
    pub base: String,
    pub client: Client,
    pub state: Arc<AppState<MemoryStore>>,
}

pub fn config() -> Config {
    Config {
        port: 0,
        store: StoreConfig::Memory,
        token_secret: SECRET.to_string(),
        production: false,
        allowed_origins: vec!["http://localhost:5173".to_string()],
    }
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(config()).await
    }

    pub async fn start_with(config: Config) -> Self {
        let state = AppState::new(config, MemoryStore::new());
        let app = router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base: format!("http://{addr}"),
            client: Client::new(),
            state,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    pub fn token(&self, email: &str) -> String {
        self.state.tokens.issue(email).unwrap()
    }

    /// Attaches a valid token cookie for `email`.
    pub fn signed(&self, request: RequestBuilder, email: &str) -> RequestBuilder {
        request.header(COOKIE, format!("token={}", self.token(email)))
    }

    pub async fn create_food(&self, food: &Value) -> String {
        let body: Value = self
            .client
            .post(self.url("/food"))
            .json(food)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        body["insertedId"].as_str().unwrap().to_string()
    }

    pub async fn purchase(&self, purchase: &Value) -> String {
        let body: Value = self
            .client
            .post(self.url("/foods/purchase"))
            .json(purchase)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        body["insertedId"].as_str().unwrap().to_string()
    }
}

pub fn food(name: &str, email: &str) -> Value {
    json!({
        "foodName": name,
        "image": format!("https://img.example/{name}.png"),
        "category": "Main",
        "quantity": 12,
        "price": 8.5,
        "foodOrigin": "Italy",
        "description": format!("Fresh {name}"),
        "email": email,
        "name": "Chef",
    })
}

pub fn purchase(food_id: &str, quantity: u32, email: &str) -> Value {
    json!({
        "foodId": food_id,
        "foodName": format!("food {food_id}"),
        "price": 4.0,
        "image": "https://img.example/p.png",
        "foodOrigin": "Japan",
        "quantity": quantity,
        "email": email,
    })
}
