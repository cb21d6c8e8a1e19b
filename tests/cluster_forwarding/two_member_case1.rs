use std::sync::Arc;

use async_trait::async_trait;
use d_notifier::ClusterEvent;
use d_notifier::ClusterEventManager;
use d_notifier::EntryEvent;
use d_notifier::EventType;
use d_notifier::Listener;
use d_notifier::MemberId;
use d_notifier::NotificationEngine;
use d_notifier::NotifierBuilder;
use d_notifier::OwnershipOracle;
use d_notifier::RemoteListenerSpec;
use d_notifier::Result;
use tracing::debug;

use crate::commons::key;
use crate::commons::node_config;
use crate::commons::value;
use crate::commons::EventLog;

/// Delivers shipped batches straight into the origin member's engine
struct Loopback {
    origin: Arc<NotificationEngine>,
}

#[async_trait]
impl ClusterEventManager for Loopback {
    async fn send(
        &self,
        batch: Vec<ClusterEvent>,
        audience: MemberId,
    ) -> Result<()> {
        debug!(audience, events = batch.len(), "Loopback shipping batch");
        assert_eq!(audience, self.origin.local_member());
        self.origin.notify_cluster_listeners(batch)
    }
}

/// Member 2 owns nothing
struct NotOwner;

impl OwnershipOracle for NotOwner {
    fn is_primary_owner(
        &self,
        _key: &bytes::Bytes,
    ) -> bool {
        false
    }
}

/// Case 1: a clustered listener on member 1 receives post events for keys
/// written on member 2, via the forwarding registration installed there
#[tokio::test]
async fn test_clustered_listener_receives_remote_events_case1() -> Result<()> {
    crate::enable_logger();
    let origin = Arc::new(NotifierBuilder::new(node_config(1)).build()?);
    origin.start()?;
    let owner = NotifierBuilder::new(node_config(2))
        .cluster_events(Arc::new(Loopback { origin: origin.clone() }))
        .build()?;
    owner.start()?;

    let log = EventLog::default();
    let listener = log.listener(Listener::builder().clustered(true), &[EventType::Created, EventType::Removed]);
    let handle = origin.add_listener(listener, None, None).await?;

    let info = origin
        .list_active_registrations()
        .into_iter()
        .find(|r| r.id == handle.id())
        .expect("registered on origin");
    let remote = owner.install_remote_cluster_listener(RemoteListenerSpec {
        listener_id: info.id,
        origin: info.origin,
        interest: info.interest,
        filter: None,
        converter: None,
    })?;

    for i in 0..5 {
        owner.publish(EntryEvent::created(key(i), value(i), None, true, true))?;
        owner.publish(EntryEvent::created(key(i), value(i), None, false, true))?;
    }
    owner.publish(EntryEvent::removed(key(0), Some(value(0)), None, false, true))?;

    let events = log.wait_for(6).await;
    assert_eq!(events.len(), 6, "post events only");
    assert!(events.iter().all(|e| !e.is_pre()));
    for (i, event) in events.iter().take(5).enumerate() {
        assert_eq!(event.event_type(), EventType::Created);
        assert_eq!(event.key(), &key(i));
        assert_eq!(event.value(), Some(&value(i)));
    }
    assert_eq!(events[5].event_type(), EventType::Removed);

    assert!(owner.remove_listener(&remote));
    owner.publish(EntryEvent::created(key(9), value(9), None, false, true))?;
    assert_eq!(log.wait_for(7).await.len(), 6);

    owner.stop();
    origin.stop();
    Ok(())
}

/// Case 2: a member that is not the primary owner forwards nothing
#[tokio::test]
async fn test_backup_owner_does_not_forward_case2() -> Result<()> {
    let origin = Arc::new(NotifierBuilder::new(node_config(1)).build()?);
    origin.start()?;
    let backup = NotifierBuilder::new(node_config(2))
        .ownership(Arc::new(NotOwner))
        .cluster_events(Arc::new(Loopback { origin: origin.clone() }))
        .build()?;
    backup.start()?;

    let log = EventLog::default();
    let handle = origin
        .add_listener(log.listener(Listener::builder().clustered(true), &[EventType::Created]), None, None)
        .await?;
    backup.install_remote_cluster_listener(RemoteListenerSpec {
        listener_id: handle.id(),
        origin: 1,
        interest: vec![EventType::Created],
        filter: None,
        converter: None,
    })?;

    backup.publish(EntryEvent::created(key(1), value(1), None, false, true))?;
    assert!(log.wait_for(1).await.is_empty());
    Ok(())
}
