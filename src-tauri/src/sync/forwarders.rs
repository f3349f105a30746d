use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tokio::task::JoinHandle;

/// Tasks that push a subscription's updates to a consumer, keyed by
/// subscription id. Aborting a task drops the subscription it owns.
#[derive(Default)]
pub struct Forwarders {
    tasks: Mutex<HashMap<u64, JoinHandle<()>>>,
}

impl Forwarders {
    fn lock(&self) -> MutexGuard<'_, HashMap<u64, JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Records `task` for `subscription` and prunes tasks that already ended.
    pub fn track(&self, subscription: u64, task: JoinHandle<()>) {
        let mut tasks = self.lock();
        tasks.insert(subscription, task);
        tasks.retain(|_, task| !task.is_finished());
    }

    /// Aborts the task for `subscription`. False if none was tracked.
    pub fn cancel(&self, subscription: u64) -> bool {
        match self.lock().remove(&subscription) {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    /// Called by a task that has ended on its own.
    pub fn forget(&self, subscription: u64) {
        self.lock().remove(&subscription);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::settle;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn cancel_aborts_the_tracked_task() {
        let forwarders = Forwarders::default();
        let task = tokio::spawn(tokio::time::sleep(Duration::from_secs(60)));
        forwarders.track(1, task);

        assert!(forwarders.cancel(1));
        assert!(!forwarders.cancel(1));
        assert!(forwarders.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn task_ending_on_its_own_is_removed() {
        let forwarders = Arc::new(Forwarders::default());
        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn({
            let forwarders = Arc::clone(&forwarders);
            async move {
                let _ = stopped.await;
                forwarders.forget(7);
            }
        });
        forwarders.track(7, task);
        assert_eq!(forwarders.len(), 1);

        stop.send(()).unwrap();
        settle().await;
        assert!(forwarders.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn finished_tasks_are_pruned_on_track() {
        let forwarders = Forwarders::default();
        let done = tokio::spawn(async {});
        settle().await;
        assert!(done.is_finished());

        forwarders.track(1, done);
        forwarders.track(2, tokio::spawn(tokio::time::sleep(Duration::from_secs(60))));
        assert_eq!(forwarders.len(), 1);
        assert!(forwarders.cancel(2));
    }
}
