//! Typed feeds over raw subscriptions.
//!
//! A subscription delivers `Option<Value>` for an entire subtree and
//! fires on every overlapping write — including writes that don't change
//! the projection a consumer cares about (a title feed doesn't care that
//! a participant picked a card). `map_feed` projects and deduplicates in
//! one hop.

use pointdeck_protocol::Value;
use tokio::sync::watch;

/// Projects a raw subscription feed through `map` into a typed feed that
/// only fires when the projected value actually changes.
///
/// The mapping task ends when either side of the feed goes away.
pub fn map_feed<T, F>(mut source: watch::Receiver<Option<Value>>, map: F) -> watch::Receiver<T>
where
    T: PartialEq + Send + Sync + 'static,
    F: Fn(Option<&Value>) -> T + Send + 'static,
{
    let initial = map(source.borrow().as_ref());
    let (tx, rx) = watch::channel(initial);

    tokio::spawn(async move {
        while source.changed().await.is_ok() {
            let next = {
                let value = source.borrow_and_update();
                map(value.as_ref())
            };
            let sent = tx.send_if_modified(|current| {
                if *current != next {
                    *current = next;
                    true
                } else {
                    false
                }
            });
            let _ = sent;
            if tx.is_closed() {
                break;
            }
        }
    });

    rx
}
