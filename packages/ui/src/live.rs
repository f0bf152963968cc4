//! Bridge between a [`store::Synchronizer`] and Dioxus reactivity.

use dioxus::prelude::*;
use store::{Collection, SyncState, Synchronizer};

/// Run a synchronizer for the lifetime of the calling component.
///
/// Creates the synchronizer once, then spawns its reconciliation loop plus a
/// mirror task that copies every state change into the returned signal. Both
/// tasks are bound to the component scope: unmounting drops them, which
/// releases the change subscription.
pub fn use_collection_sync<C>(
    make: impl FnOnce() -> C,
) -> (Signal<SyncState<C::Item, C::Draft>>, Synchronizer<C>)
where
    C: Collection + 'static,
    C::Item: 'static,
    C::Draft: 'static,
{
    let sync = use_hook(|| Synchronizer::new(make()));
    let mut state = use_signal(|| sync.snapshot());

    let runner = sync.clone();
    use_future(move || {
        let runner = runner.clone();
        async move {
            runner.run().await;
        }
    });

    let mirror = sync.clone();
    use_future(move || {
        let mirror = mirror.clone();
        async move {
            let mut versions = mirror.watch();
            loop {
                state.set(mirror.snapshot());
                if versions.changed().await.is_err() {
                    break;
                }
            }
        }
    });

    (state, sync)
}
