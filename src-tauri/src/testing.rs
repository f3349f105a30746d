//! In-memory transport for unit tests: scripted replies per path, optional
//! delays or manual release, and call/concurrency accounting.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use http::Method;
use tokio::sync::oneshot;

use crate::client::Transport;
use crate::error::{FetchError, FetchErrorKind};

type Reply = Result<serde_json::Value, FetchError>;

enum Step {
    After(Duration, Reply),
    Gated(oneshot::Receiver<Reply>),
}

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    fallback: Mutex<HashMap<String, serde_json::Value>>,
    calls: Mutex<Vec<(Method, String)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    pub fn reply(&self, path: &str, reply: Reply) {
        self.reply_after(path, Duration::ZERO, reply);
    }

    pub fn reply_after(&self, path: &str, delay: Duration, reply: Reply) {
        self.push(path, Step::After(delay, reply));
    }

    /// Queues a reply that is only delivered when the returned sender fires.
    pub fn gate(&self, path: &str) -> oneshot::Sender<Reply> {
        let (tx, rx) = oneshot::channel();
        self.push(path, Step::Gated(rx));
        tx
    }

    /// Reply used whenever the script for `path` is exhausted.
    pub fn always(&self, path: &str, value: serde_json::Value) {
        self.fallback.lock().unwrap().insert(path.to_string(), value);
    }

    pub fn calls(&self, path: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|(_, p)| p == path).count()
    }

    pub fn methods(&self, path: &str) -> Vec<Method> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, p)| p == path)
            .map(|(m, _)| m.clone())
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn push(&self, path: &str, step: Step) {
        self.scripts
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(step);
    }

    async fn serve(&self, method: Method, path: &str) -> Reply {
        self.calls.lock().unwrap().push((method, path.to_string()));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(path)
            .and_then(|queue| queue.pop_front());

        let fallback = self.fallback.lock().unwrap().get(path).cloned();

        let reply = match step {
            Some(Step::After(delay, reply)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                reply
            }
            Some(Step::Gated(rx)) => rx.await.unwrap_or_else(|_| {
                Err(FetchError::new(path, FetchErrorKind::Transport, "gate dropped"))
            }),
            None => match fallback {
                Some(value) => Ok(value),
                None => Err(FetchError::new(path, FetchErrorKind::Transport, "no scripted reply")),
            },
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        reply
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, path: &str) -> Result<serde_json::Value, FetchError> {
        self.serve(Method::GET, path).await
    }

    async fn invoke(&self, method: Method, path: &str) -> Result<serde_json::Value, FetchError> {
        self.serve(method, path).await
    }
}

/// Lets spawned tasks run until they block.
pub(crate) async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
