use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use d_notifier::EntryEvent;
use d_notifier::EventType;
use d_notifier::Listener;
use d_notifier::MemorySnapshotScan;
use d_notifier::NotificationEngine;
use d_notifier::NotifierBuilder;
use d_notifier::Result;
use tracing::debug;

use crate::commons::key;
use crate::commons::node_config;
use crate::commons::populated_store;
use crate::commons::value;
use crate::commons::EventLog;

const INITIAL_KEYS: usize = 10;

fn start_engine(store: Arc<MemorySnapshotScan>) -> Result<Arc<NotificationEngine>> {
    let engine = NotifierBuilder::new(node_config(1)).snapshot_scan(store).build()?;
    engine.start()?;
    Ok(Arc::new(engine))
}

/// Applies one cache write and publishes both of its phases
fn put(
    engine: &NotificationEngine,
    store: &MemorySnapshotScan,
    key: Bytes,
    value: Bytes,
) -> Result<()> {
    match store.get(&key) {
        Some(old) => {
            engine.publish(EntryEvent::modified(
                key.clone(),
                Some(old.clone()),
                value.clone(),
                None,
                None,
                true,
                true,
            ))?;
            store.insert(key.clone(), value.clone(), None);
            engine.publish(EntryEvent::modified(key, Some(old), value, None, None, false, true))
        }
        None => {
            engine.publish(EntryEvent::created(key.clone(), value.clone(), None, true, true))?;
            store.insert(key.clone(), value.clone(), None);
            engine.publish(EntryEvent::created(key, value, None, false, true))
        }
    }
}

fn remove(
    engine: &NotificationEngine,
    store: &MemorySnapshotScan,
    key: Bytes,
) -> Result<()> {
    let old = store.get(&key);
    engine.publish(EntryEvent::removed(key.clone(), old.clone(), None, true, true))?;
    store.remove(&key);
    engine.publish(EntryEvent::removed(key, old, None, false, true))
}

/// Rebuilds the cache contents a listener observed from its post events
fn replay(events: &[EntryEvent]) -> BTreeMap<Bytes, Bytes> {
    let mut view = BTreeMap::new();
    for event in events.iter().filter(|e| !e.is_pre()) {
        match event.event_type() {
            EventType::Created | EventType::Modified => {
                if let Some(value) = event.value() {
                    view.insert(event.key().clone(), value.clone());
                }
            }
            EventType::Removed => {
                view.remove(event.key());
            }
            _ => {}
        }
    }
    view
}

/// Case 1: a listener including current state sees every existing entry
/// exactly once, then the live events
#[tokio::test]
async fn test_current_state_then_live_events_case1() -> Result<()> {
    crate::enable_logger();
    let store = populated_store(INITIAL_KEYS);
    let engine = start_engine(store.clone())?;
    let log = EventLog::default();
    let listener = log.listener(
        Listener::builder().include_current_state(true),
        &[EventType::Created, EventType::Modified, EventType::Removed],
    );

    let handle = engine.add_listener(listener, None, None).await?;

    let events = log.events();
    assert_eq!(events.len(), 2 * INITIAL_KEYS);
    assert!(events.iter().all(|e| e.event_type() == EventType::Created));
    let expected: BTreeMap<Bytes, Bytes> = (0..INITIAL_KEYS).map(|i| (key(i), value(i))).collect();
    assert_eq!(replay(&events), expected);

    put(&engine, &store, key(3), Bytes::from("value-3-v2"))?;
    remove(&engine, &store, key(4))?;
    let events = log.events();
    assert_eq!(events.len(), 2 * INITIAL_KEYS + 4);
    assert_eq!(events[2 * INITIAL_KEYS].event_type(), EventType::Modified);
    assert_eq!(events[2 * INITIAL_KEYS + 3].event_type(), EventType::Removed);

    assert!(engine.remove_listener(&handle));
    put(&engine, &store, key(5), Bytes::from("value-5-v2"))?;
    assert_eq!(log.events().len(), 2 * INITIAL_KEYS + 4);

    engine.stop();
    Ok(())
}

/// Case 2: writes racing with the registration leave the listener with a view
/// equal to the final cache contents
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writes_converge_case2() -> Result<()> {
    crate::enable_logger();
    let store = populated_store(INITIAL_KEYS);
    let engine = start_engine(store.clone())?;
    let log = EventLog::default();
    let listener = log.listener(
        Listener::builder().include_current_state(true),
        &[EventType::Created, EventType::Modified, EventType::Removed],
    );

    let writer = {
        let engine = engine.clone();
        let store = store.clone();
        tokio::spawn(async move {
            for round in 0..5 {
                for i in 0..INITIAL_KEYS + 5 {
                    put(&engine, &store, key(i), Bytes::from(format!("value-{i}-r{round}")))?;
                }
                remove(&engine, &store, key(round))?;
                tokio::task::yield_now().await;
            }
            Ok::<(), d_notifier::Error>(())
        })
    };

    engine.add_listener(listener, None, None).await?;
    writer.await.expect("writer task panicked")?;

    let expected: BTreeMap<Bytes, Bytes> = (0..INITIAL_KEYS + 5)
        .filter_map(|i| store.get(&key(i)).map(|v| (key(i), v)))
        .collect();
    let events = log.events();
    debug!(events = events.len(), "Listener observed events");
    assert_eq!(replay(&events), expected);

    engine.stop();
    Ok(())
}
