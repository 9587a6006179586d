use std::{
    collections::VecDeque,
    future::Future,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use shared::{domain::Customer, error::ApiError, protocol::CreateCustomerRequest};
use tokio::sync::oneshot;

use crate::{CollectionFetcher, CustomerCreator};

pub fn customer(first_name: &str, last_name: &str, email: &str) -> Customer {
    Customer {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: email.to_string(),
        business_name: None,
    }
}

/// Polls `check` until it holds, failing the test after five seconds.
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timed out waiting for condition");
}

struct Step<R> {
    result: R,
    release: Option<oneshot::Receiver<()>>,
}

/// Replays queued results in call order. A gated step holds its caller until
/// the returned sender fires (or is dropped).
pub struct Script<R> {
    steps: Mutex<VecDeque<Step<R>>>,
    calls: AtomicUsize,
}

impl<R> Script<R> {
    fn new() -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, result: R) {
        self.steps.lock().expect("script lock").push_back(Step {
            result,
            release: None,
        });
    }

    pub fn push_gated(&self, result: R) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.steps.lock().expect("script lock").push_back(Step {
            result,
            release: Some(rx),
        });
        tx
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn next(&self, missing: R) -> R {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().expect("script lock").pop_front();
        match step {
            Some(Step { result, release }) => {
                if let Some(release) = release {
                    let _ = release.await;
                }
                result
            }
            None => missing,
        }
    }

    /// Waits until at least `expected` calls have started.
    pub async fn wait_for_calls(&self, expected: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.calls() < expected {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for scripted calls");
    }
}

pub struct ScriptedFetcher {
    pub script: Script<Result<Vec<Customer>, ApiError>>,
    keys: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            script: Script::new(),
            keys: Mutex::new(Vec::new()),
        })
    }

    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().expect("keys lock").clone()
    }
}

#[async_trait]
impl CollectionFetcher<Customer> for ScriptedFetcher {
    async fn fetch(&self, key: &str) -> Result<Vec<Customer>, ApiError> {
        self.keys.lock().expect("keys lock").push(key.to_string());
        self.script
            .next(Err(ApiError::new("script", "no scripted fetch response")))
            .await
    }
}

pub struct ScriptedCreator {
    pub script: Script<Result<(), ApiError>>,
    requests: Mutex<Vec<(String, CreateCustomerRequest)>>,
}

impl ScriptedCreator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            script: Script::new(),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<(String, CreateCustomerRequest)> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl CustomerCreator for ScriptedCreator {
    async fn create(&self, key: &str, request: &CreateCustomerRequest) -> Result<(), ApiError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push((key.to_string(), request.clone()));
        self.script.next(Ok(())).await
    }
}
