//! Scripted transport shared by runtime and kiosk tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::FetchError;
use crate::fetch::{FetchRequest, RawPayload, Transport};

type Responder = Arc<dyn Fn(&FetchRequest) -> Result<RawPayload, FetchError> + Send + Sync>;

#[derive(Clone)]
struct Route {
    respond: Responder,
    delay: Duration,
}

/// In-memory content server keyed by request path
///
/// Each path answers with its most recently scripted reply until re-scripted.
/// Unscripted paths answer 404.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, path: &str, reply: Result<RawPayload, FetchError>) {
        self.reply_after(path, Duration::ZERO, reply);
    }

    /// Script a reply that arrives only after `delay`
    pub fn reply_after(&self, path: &str, delay: Duration, reply: Result<RawPayload, FetchError>) {
        self.route(path, delay, Arc::new(move |_: &FetchRequest| reply.clone()));
    }

    /// Script a reply computed from each request
    pub fn respond<F>(&self, path: &str, respond: F)
    where
        F: Fn(&FetchRequest) -> Result<RawPayload, FetchError> + Send + Sync + 'static,
    {
        self.route(path, Duration::ZERO, Arc::new(respond));
    }

    fn route(&self, path: &str, delay: Duration, respond: Responder) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), Route { respond, delay });
    }

    pub fn json(&self, path: &str, value: serde_json::Value) {
        self.reply(path, Ok(RawPayload::Json(value)));
    }

    /// Requests made so far against `path`
    pub fn requests_to(&self, path: &str) -> Vec<FetchRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests_to(path).len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &FetchRequest) -> Result<RawPayload, FetchError> {
        self.requests.lock().unwrap().push(request.clone());
        let route = self.routes.lock().unwrap().get(&request.path).cloned();

        match route {
            Some(route) => {
                if !route.delay.is_zero() {
                    tokio::time::sleep(route.delay).await;
                }
                (route.respond)(request)
            }
            None => Err(FetchError::status(404)),
        }
    }

    async fn get_bytes(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
        Err(FetchError::status(404))
    }
}
