use std::fmt;
use std::sync::Arc;

use crate::BoxError;
use crate::EntryEvent;
use crate::Event;
use crate::EventShape;
use crate::EventType;
use crate::TopologyEvent;
use crate::TransactionEvent;

pub type EntryHandler = Arc<dyn Fn(&EntryEvent) -> std::result::Result<(), BoxError> + Send + Sync>;
pub type TransactionHandler = Arc<dyn Fn(&TransactionEvent) -> std::result::Result<(), BoxError> + Send + Sync>;
pub type TopologyHandler = Arc<dyn Fn(&TopologyEvent) -> std::result::Result<(), BoxError> + Send + Sync>;

/// Callback bound to one or more event types
#[derive(Clone)]
pub enum Handler {
    Entry(EntryHandler),
    Transaction(TransactionHandler),
    Topology(TopologyHandler),
}

impl Handler {
    pub fn shape(&self) -> EventShape {
        match self {
            Handler::Entry(_) => EventShape::Entry,
            Handler::Transaction(_) => EventShape::Transaction,
            Handler::Topology(_) => EventShape::Topology,
        }
    }

    pub(crate) fn invoke(
        &self,
        event: &Event,
    ) -> std::result::Result<(), BoxError> {
        match (self, event) {
            (Handler::Entry(f), Event::Entry(e)) => f(e),
            (Handler::Transaction(f), Event::Transaction(e)) => f(e),
            (Handler::Topology(f), Event::Topology(e)) => f(e),
            (handler, event) => Err(format!(
                "{:?} handler cannot receive {:?} event",
                handler.shape(),
                event.event_type()
            )
            .into()),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "Handler::{:?}", self.shape())
    }
}

pub(crate) struct ListenerInner {
    pub(crate) name: Option<String>,
    pub(crate) bindings: Vec<(EventType, Handler)>,
    pub(crate) clustered: bool,
    pub(crate) primary_owner_only: bool,
    pub(crate) sync: bool,
    pub(crate) include_current_state: bool,
}

/// A subscriber declaration: the explicit capability set of event type to
/// handler bindings plus its delivery options.
///
/// Cheap to clone. Clones are the same subscriber for registration purposes.
#[derive(Clone)]
pub struct Listener {
    inner: Arc<ListenerInner>,
}

impl Listener {
    pub fn builder() -> ListenerBuilder {
        ListenerBuilder::default()
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    pub fn is_clustered(&self) -> bool {
        self.inner.clustered
    }

    pub fn is_primary_owner_only(&self) -> bool {
        self.inner.primary_owner_only
    }

    pub fn is_sync(&self) -> bool {
        self.inner.sync
    }

    pub fn includes_current_state(&self) -> bool {
        self.inner.include_current_state
    }

    /// Declared event types, sorted and deduplicated
    pub fn interest(&self) -> Vec<EventType> {
        let mut types: Vec<EventType> = self.inner.bindings.iter().map(|(t, _)| *t).collect();
        types.sort();
        types.dedup();
        types
    }

    pub(crate) fn bindings(&self) -> &[(EventType, Handler)] {
        &self.inner.bindings
    }

    pub(crate) fn handlers_for(
        &self,
        event_type: EventType,
    ) -> impl Iterator<Item = &Handler> {
        self.inner
            .bindings
            .iter()
            .filter(move |(t, _)| *t == event_type)
            .map(|(_, h)| h)
    }

    pub(crate) fn same_subscriber(
        &self,
        other: &Listener,
    ) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Listener {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Listener")
            .field("name", &self.inner.name)
            .field("interest", &self.interest())
            .field("clustered", &self.inner.clustered)
            .field("sync", &self.inner.sync)
            .field("include_current_state", &self.inner.include_current_state)
            .finish_non_exhaustive()
    }
}

/// Builds a [`Listener`].
///
/// Defaults: local, synchronous, no initial state. Bindings are not validated
/// here; the engine validates them on registration.
///
/// ```ignore
/// let listener = Listener::builder()
///     .include_current_state(true)
///     .on_entry([EventType::Created, EventType::Removed], |e| {
///         println!("{:?} {:?}", e.event_type(), e.key());
///         Ok(())
///     })
///     .build();
/// ```
pub struct ListenerBuilder {
    name: Option<String>,
    bindings: Vec<(EventType, Handler)>,
    clustered: bool,
    primary_owner_only: bool,
    sync: bool,
    include_current_state: bool,
}

impl Default for ListenerBuilder {
    fn default() -> Self {
        Self {
            name: None,
            bindings: Vec::new(),
            clustered: false,
            primary_owner_only: false,
            sync: true,
            include_current_state: false,
        }
    }
}

impl ListenerBuilder {
    pub fn name(
        mut self,
        name: impl Into<String>,
    ) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn clustered(
        mut self,
        clustered: bool,
    ) -> Self {
        self.clustered = clustered;
        self
    }

    pub fn primary_owner_only(
        mut self,
        primary_owner_only: bool,
    ) -> Self {
        self.primary_owner_only = primary_owner_only;
        self
    }

    pub fn sync(
        mut self,
        sync: bool,
    ) -> Self {
        self.sync = sync;
        self
    }

    pub fn include_current_state(
        mut self,
        include_current_state: bool,
    ) -> Self {
        self.include_current_state = include_current_state;
        self
    }

    /// Bind `handler` to every type in `types`
    pub fn on(
        mut self,
        types: impl IntoIterator<Item = EventType>,
        handler: Handler,
    ) -> Self {
        for t in types {
            self.bindings.push((t, handler.clone()));
        }
        self
    }

    pub fn on_entry<F>(
        self,
        types: impl IntoIterator<Item = EventType>,
        f: F,
    ) -> Self
    where
        F: Fn(&EntryEvent) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.on(types, Handler::Entry(Arc::new(f)))
    }

    pub fn on_transaction<F>(
        self,
        types: impl IntoIterator<Item = EventType>,
        f: F,
    ) -> Self
    where
        F: Fn(&TransactionEvent) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.on(types, Handler::Transaction(Arc::new(f)))
    }

    pub fn on_topology<F>(
        self,
        f: F,
    ) -> Self
    where
        F: Fn(&TopologyEvent) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.on([EventType::TopologyChanged], Handler::Topology(Arc::new(f)))
    }

    pub fn build(self) -> Listener {
        Listener {
            inner: Arc::new(ListenerInner {
                name: self.name,
                bindings: self.bindings,
                clustered: self.clustered,
                primary_owner_only: self.primary_owner_only,
                sync: self.sync,
                include_current_state: self.include_current_state,
            }),
        }
    }
}
