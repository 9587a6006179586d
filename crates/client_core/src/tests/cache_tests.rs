use super::*;
use std::time::Duration;

use crate::{
    test_support::{customer, eventually, ScriptedFetcher},
    CUSTOMERS_KEY,
};
use shared::domain::Customer;

fn cache_with(fetcher: &Arc<ScriptedFetcher>) -> Arc<CollectionCache<Customer>> {
    CollectionCache::<Customer>::new(CUSTOMERS_KEY, fetcher.clone())
}

#[tokio::test]
async fn initial_fetch_reports_loading_until_first_response() {
    let fetcher = ScriptedFetcher::new();
    let release = fetcher
        .script
        .push_gated(Ok(vec![customer("Ada", "Lovelace", "ada@x.com")]));
    let cache = cache_with(&fetcher);

    let task = tokio::spawn({
        let cache = Arc::clone(&cache);
        async move { cache.initialize().await }
    });
    fetcher.script.wait_for_calls(1).await;

    let loading = cache.current_state().await;
    assert!(loading.is_loading);
    assert!(loading.is_validating);
    assert_eq!(loading.data, None);
    assert_eq!(loading.error, None);

    release.send(()).expect("release fetch");
    let loaded = task.await.expect("join");
    assert!(!loaded.is_loading);
    assert!(!loaded.is_validating);
    assert_eq!(loaded.error, None);
    assert_eq!(
        loaded.data,
        Some(vec![customer("Ada", "Lovelace", "ada@x.com")])
    );
    assert_eq!(fetcher.keys(), vec![CUSTOMERS_KEY.to_string()]);
}

#[tokio::test]
async fn successful_fetch_keeps_payload_order() {
    let fetcher = ScriptedFetcher::new();
    let payload = vec![
        customer("Zed", "Last", "zed@x.com"),
        customer("Ada", "Lovelace", "ada@x.com"),
        customer("Mia", "Middle", "mia@x.com"),
    ];
    fetcher.script.push(Ok(payload.clone()));
    let cache = cache_with(&fetcher);

    let state = cache.initialize().await;

    assert_eq!(state.data.as_ref().map(Vec::len), Some(payload.len()));
    assert_eq!(state.data, Some(payload));
}

#[tokio::test]
async fn initialize_is_deduplicated_while_initial_load_is_in_flight() {
    let fetcher = ScriptedFetcher::new();
    let release = fetcher.script.push_gated(Ok(Vec::new()));
    let cache = cache_with(&fetcher);

    let task = tokio::spawn({
        let cache = Arc::clone(&cache);
        async move { cache.initialize().await }
    });
    fetcher.script.wait_for_calls(1).await;

    let second = cache.initialize().await;
    assert!(second.is_loading);
    assert_eq!(fetcher.script.calls(), 1);

    release.send(()).expect("release fetch");
    task.await.expect("join");

    cache.initialize().await;
    assert_eq!(fetcher.script.calls(), 1);
}

#[tokio::test]
async fn failed_revalidation_keeps_previous_data() {
    let fetcher = ScriptedFetcher::new();
    fetcher
        .script
        .push(Ok(vec![customer("Ada", "Lovelace", "ada@x.com")]));
    fetcher.script.push(Err(ApiError::new("500", "boom")));
    let cache = cache_with(&fetcher);

    cache.initialize().await;
    let state = cache.revalidate().await;

    assert_eq!(state.error, Some(ApiError::new("500", "boom")));
    assert_eq!(
        state.data,
        Some(vec![customer("Ada", "Lovelace", "ada@x.com")])
    );
    assert!(!state.is_loading);
    assert!(!state.is_validating);
}

#[tokio::test]
async fn failed_initial_fetch_reports_error_without_data() {
    let fetcher = ScriptedFetcher::new();
    fetcher.script.push(Err(ApiError::new("500", "boom")));
    let cache = cache_with(&fetcher);

    let state = cache.initialize().await;

    assert_eq!(state.data, None);
    assert!(!state.is_loading);
    assert_eq!(state.error.map(|err| err.message), Some("boom".to_string()));
}

#[tokio::test]
async fn successful_revalidation_clears_previous_error() {
    let fetcher = ScriptedFetcher::new();
    fetcher.script.push(Err(ApiError::new("503", "unavailable")));
    fetcher
        .script
        .push(Ok(vec![customer("Ada", "Lovelace", "ada@x.com")]));
    let cache = cache_with(&fetcher);

    assert!(cache.initialize().await.error.is_some());
    let state = cache.revalidate().await;

    assert_eq!(state.error, None);
    assert_eq!(state.data.map(|data| data.len()), Some(1));
}

#[tokio::test]
async fn revalidation_over_existing_data_is_not_a_loading_state() {
    let fetcher = ScriptedFetcher::new();
    fetcher
        .script
        .push(Ok(vec![customer("Ada", "Lovelace", "ada@x.com")]));
    let release = fetcher.script.push_gated(Ok(vec![
        customer("Ada", "Lovelace", "ada@x.com"),
        customer("Grace", "Hopper", "grace@x.com"),
    ]));
    let cache = cache_with(&fetcher);
    cache.initialize().await;

    let task = tokio::spawn({
        let cache = Arc::clone(&cache);
        async move { cache.revalidate().await }
    });
    fetcher.script.wait_for_calls(2).await;

    let refreshing = cache.current_state().await;
    assert!(!refreshing.is_loading);
    assert!(refreshing.is_validating);
    assert_eq!(refreshing.data.map(|data| data.len()), Some(1));

    release.send(()).expect("release fetch");
    let refreshed = task.await.expect("join");
    assert!(!refreshed.is_validating);
    assert_eq!(refreshed.data.map(|data| data.len()), Some(2));
}

#[tokio::test]
async fn response_older_than_applied_one_is_discarded() {
    let fetcher = ScriptedFetcher::new();
    let release_initial = fetcher
        .script
        .push_gated(Ok(vec![customer("Ada", "Lovelace", "ada@x.com")]));
    let release_revalidate = fetcher.script.push_gated(Ok(vec![
        customer("Ada", "Lovelace", "ada@x.com"),
        customer("Grace", "Hopper", "grace@x.com"),
    ]));
    let cache = cache_with(&fetcher);

    let initial = tokio::spawn({
        let cache = Arc::clone(&cache);
        async move { cache.initialize().await }
    });
    fetcher.script.wait_for_calls(1).await;
    let revalidation = tokio::spawn({
        let cache = Arc::clone(&cache);
        async move { cache.revalidate().await }
    });
    fetcher.script.wait_for_calls(2).await;

    release_revalidate.send(()).expect("release revalidation");
    let newest = revalidation.await.expect("join revalidation");
    assert_eq!(newest.data.as_ref().map(Vec::len), Some(2));
    assert!(newest.is_validating);

    release_initial.send(()).expect("release initial");
    let settled = initial.await.expect("join initial");
    assert_eq!(settled.data.map(|data| data.len()), Some(2));
    assert!(!settled.is_validating);
    assert!(!settled.is_loading);
}

#[tokio::test]
async fn publishes_each_state_transition() {
    let fetcher = ScriptedFetcher::new();
    fetcher
        .script
        .push(Ok(vec![customer("Ada", "Lovelace", "ada@x.com")]));
    let cache = cache_with(&fetcher);
    let mut events = cache.subscribe();

    cache.initialize().await;

    let started = events.recv().await.expect("fetch started event");
    assert!(started.is_loading);
    let finished = events.recv().await.expect("fetch finished event");
    assert!(!finished.is_loading);
    assert_eq!(finished.data.map(|data| data.len()), Some(1));
}

#[tokio::test]
async fn abandoned_initialize_still_settles_when_the_response_arrives() {
    let fetcher = ScriptedFetcher::new();
    let release = fetcher
        .script
        .push_gated(Ok(vec![customer("Ada", "Lovelace", "ada@x.com")]));
    let cache = cache_with(&fetcher);

    let abandoned = tokio::time::timeout(Duration::from_millis(50), cache.initialize()).await;
    assert!(abandoned.is_err());
    assert!(cache.current_state().await.is_loading);

    release.send(()).expect("release fetch");
    let shared = &cache;
    eventually(|| async move { !shared.current_state().await.is_validating }).await;

    let settled = cache.current_state().await;
    assert!(!settled.is_loading);
    assert_eq!(settled.error, None);
    assert_eq!(
        settled.data,
        Some(vec![customer("Ada", "Lovelace", "ada@x.com")])
    );

    let again = cache.initialize().await;
    assert_eq!(again, settled);
    assert_eq!(fetcher.script.calls(), 1);
}
