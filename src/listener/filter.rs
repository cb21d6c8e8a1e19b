use bytes::Bytes;
#[cfg(test)]
use mockall::automock;

use crate::EntryEvent;

/// Predicate deciding whether an entry event reaches a listener.
///
/// Evaluated on the member raising the event. For initial transfer the filter
/// is pushed down into the segment scan instead.
#[cfg_attr(test, automock)]
pub trait CacheEventFilter: Send + Sync + 'static {
    fn accept(
        &self,
        event: &EntryEvent,
    ) -> bool;
}

/// Projection of the value observed by a listener.
///
/// Returning `None` delivers the event without a value.
#[cfg_attr(test, automock)]
pub trait CacheEventConverter: Send + Sync + 'static {
    fn convert(
        &self,
        event: &EntryEvent,
    ) -> Option<Bytes>;
}

impl<F> CacheEventFilter for F
where
    F: Fn(&EntryEvent) -> bool + Send + Sync + 'static,
{
    fn accept(
        &self,
        event: &EntryEvent,
    ) -> bool {
        self(event)
    }
}

impl<F> CacheEventConverter for F
where
    F: Fn(&EntryEvent) -> Option<Bytes> + Send + Sync + 'static,
{
    fn convert(
        &self,
        event: &EntryEvent,
    ) -> Option<Bytes> {
        self(event)
    }
}
