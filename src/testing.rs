// Scripted provider used by unit tests.

use crate::client::{ResourceClient, RetryPolicy, Transport};
use crate::error::{AppError, Result};
use crate::pokemon::Entity;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BASE_URL: &str = "https://api.test";

#[derive(Default)]
struct Routes {
    scripted: HashMap<String, VecDeque<Result<Value>>>,
    fixed: HashMap<String, Result<Value>>,
    delays: HashMap<String, Duration>,
    calls: HashMap<String, usize>,
}

#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<Routes>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, value: Value) {
        self.routes.lock().unwrap().fixed.insert(url.to_string(), Ok(value));
    }

    pub fn fail(&self, url: &str, err: AppError) {
        self.routes.lock().unwrap().fixed.insert(url.to_string(), Err(err));
    }

    /// Answers consumed in order before falling back to the fixed answer.
    pub fn script(&self, url: &str, answers: Vec<Result<Value>>) {
        self.routes
            .lock()
            .unwrap()
            .scripted
            .insert(url.to_string(), answers.into());
    }

    pub fn delay(&self, url: &str, delay: Duration) {
        self.routes.lock().unwrap().delays.insert(url.to_string(), delay);
    }

    pub fn calls(&self, url: &str) -> usize {
        self.routes.lock().unwrap().calls.get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.routes.lock().unwrap().calls.values().sum()
    }

    /// Registers the detail document for a creature under both its id and name.
    pub fn add_pokemon(&self, id: u32, name: &str, types: &[&str]) {
        let doc = pokemon_doc(id, name, types);
        self.respond(&format!("{}/pokemon/{}", BASE_URL, id), doc.clone());
        self.respond(&format!("{}/pokemon/{}", BASE_URL, name), doc);
    }

    pub fn add_list(&self, limit: usize, offset: usize, entries: &[(u32, &str)]) {
        let results: Vec<Value> = entries
            .iter()
            .map(|(id, name)| json!({"name": name, "url": format!("{}/pokemon/{}/", BASE_URL, id)}))
            .collect();
        self.respond(
            &format!("{}/pokemon?limit={}&offset={}", BASE_URL, limit, offset),
            json!({"count": 1302, "next": null, "results": results}),
        );
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get_json(&self, url: &str) -> Result<Value> {
        let (answer, delay) = {
            let mut routes = self.routes.lock().unwrap();
            *routes.calls.entry(url.to_string()).or_default() += 1;
            let scripted = routes.scripted.get_mut(url).and_then(|q| q.pop_front());
            let answer = scripted
                .or_else(|| routes.fixed.get(url).cloned())
                .unwrap_or_else(|| Err(AppError::from_status(404, url)));
            (answer, routes.delays.get(url).copied())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        answer
    }
}

pub fn pokemon_doc(id: u32, name: &str, types: &[&str]) -> Value {
    let types: Vec<Value> = types
        .iter()
        .enumerate()
        .map(|(i, t)| json!({"slot": i + 1, "type": {"name": t, "url": ""}}))
        .collect();
    json!({
        "id": id,
        "name": name,
        "height": 7,
        "weight": 69,
        "sprites": {
            "front_default": format!("https://img.test/{}.png", id),
            "other": null
        },
        "abilities": [{"is_hidden": false, "slot": 1, "ability": {"name": "overgrow", "url": ""}}],
        "stats": [{"base_stat": 45, "effort": 0, "stat": {"name": "hp", "url": ""}}],
        "types": types
    })
}

pub fn entity(id: u32, name: &str, types: &[&str]) -> Entity {
    crate::normalize::normalize(&serde_json::from_value(pokemon_doc(id, name, types)).unwrap())
}

pub fn fake_client(transport: Arc<FakeTransport>) -> ResourceClient {
    ResourceClient::new(
        transport,
        BASE_URL,
        Duration::from_secs(15),
        RetryPolicy {
            max_retries: 0,
            base_delay: Duration::from_millis(10),
        },
    )
}
