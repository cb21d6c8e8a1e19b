use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::EntryEvent;
use crate::EventType;
use crate::Listener;
use crate::ListenerBuilder;

/// Collects every entry event a listener receives
#[derive(Clone, Default)]
pub(crate) struct Recorder {
    events: Arc<Mutex<Vec<EntryEvent>>>,
}

impl Recorder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Binds a recording handler for `types` onto `builder`
    pub(crate) fn listener(
        &self,
        builder: ListenerBuilder,
        types: &[EventType],
    ) -> Listener {
        let events = self.events.clone();
        builder
            .on_entry(types.iter().copied(), move |e| {
                events.lock().push(e.clone());
                Ok(())
            })
            .build()
    }

    pub(crate) fn events(&self) -> Vec<EntryEvent> {
        self.events.lock().clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Polls until `n` events were recorded, for asynchronous listeners
    pub(crate) async fn wait_for(
        &self,
        n: usize,
    ) -> Vec<EntryEvent> {
        for _ in 0..200 {
            if self.len() >= n {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.events()
    }
}
