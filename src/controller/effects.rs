use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::AbortHandle;

use super::{Action, Effect, NoticeKind, Phonebook, Task};
use crate::remote::ContactService;

/// Run one task against `service` and turn its outcome into an action.
pub async fn perform<S: ContactService>(service: &S, task: Task) -> Action {
    match task {
        Task::FetchAll { token } => {
            tracing::debug!(%token, "loading contacts");
            Action::Loaded(service.get_all().await)
        }
        Task::Create(payload) => {
            let result = service.create(&payload).await;
            Action::Created {
                name: payload.name,
                result,
            }
        }
        Task::Delete(contact) => {
            let result = service.delete_number(&contact).await;
            Action::Deleted { contact, result }
        }
        Task::ClearNotice {
            kind,
            generation,
            after,
        } => {
            tokio::time::sleep(after).await;
            Action::NoticeExpired { kind, generation }
        }
    }
}

/// Spawns tasks on the current `LocalSet` and posts their completions to a
/// channel drained by the event loop.
///
/// Each notice channel has at most one pending clear; scheduling another
/// aborts the previous timer.
pub struct Executor<S> {
    service: Rc<S>,
    outbox: UnboundedSender<Action>,
    timers: HashMap<NoticeKind, AbortHandle>,
}

impl<S: ContactService + 'static> Executor<S> {
    pub fn new(service: Rc<S>) -> (Self, UnboundedReceiver<Action>) {
        let (outbox, inbox) = mpsc::unbounded_channel();
        let executor = Self {
            service,
            outbox,
            timers: HashMap::new(),
        };
        (executor, inbox)
    }

    /// Must be called from within a `LocalSet`.
    pub fn spawn(&mut self, task: Task) {
        let timer = match &task {
            Task::ClearNotice { kind, .. } => Some(*kind),
            _ => None,
        };

        let service = Rc::clone(&self.service);
        let outbox = self.outbox.clone();
        let handle = tokio::task::spawn_local(async move {
            let action = perform(service.as_ref(), task).await;
            // receiver gone means the UI is shutting down
            let _ = outbox.send(action);
        });

        if let Some(kind) = timer {
            if let Some(previous) = self.timers.insert(kind, handle.abort_handle()) {
                previous.abort();
            }
        }
    }
}

impl<S> Drop for Executor<S> {
    fn drop(&mut self) {
        for (_, timer) in self.timers.drain() {
            timer.abort();
        }
    }
}

/// What a run to completion left behind for the caller.
#[derive(Debug, Default)]
pub struct Settled {
    pub alerts: Vec<String>,
}

/// Drive `effects` and everything they lead to, one task at a time.
///
/// Notice timers are skipped, so messages stay visible in `book` afterwards.
/// Used by the non-interactive commands.
pub async fn settle<S: ContactService>(
    book: &mut Phonebook,
    service: &S,
    effects: Vec<Effect>,
) -> Settled {
    let mut settled = Settled::default();
    let mut queue: VecDeque<Effect> = effects.into();

    while let Some(effect) = queue.pop_front() {
        match effect {
            Effect::Task(Task::ClearNotice { .. }) | Effect::ResetForm => {}
            Effect::Task(task) => {
                let action = perform(service, task).await;
                queue.extend(book.update(action));
            }
            Effect::Alert(message) => settled.alerts.push(message),
        }
    }

    settled
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::task::LocalSet;
    use tokio::time::Instant;

    use super::*;
    use crate::contact::Contact;
    use crate::remote::testing::MemoryService;

    fn apply(executor: &mut Executor<MemoryService>, effects: Vec<Effect>) {
        for effect in effects {
            if let Effect::Task(task) = effect {
                executor.spawn(task);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_notice_clears_after_timeout() {
        LocalSet::new()
            .run_until(async {
                let service = Rc::new(MemoryService::with_contacts(vec![Contact::new(1, "Ann", "555")]));
                let (mut executor, mut inbox) = Executor::new(Rc::clone(&service));
                let mut book = Phonebook::new(Duration::from_millis(5000));
                let effects = book.mount();
                apply(&mut executor, effects);
                let loaded = inbox.recv().await.unwrap();
                book.update(loaded);

                let start = Instant::now();
                let effects = book.submit("Cy", "111");
                apply(&mut executor, effects);
                let created = inbox.recv().await.unwrap();
                let effects = book.update(created);
                apply(&mut executor, effects);
                assert!(book.notice(NoticeKind::Info).is_some());

                let expired = inbox.recv().await.unwrap();
                assert!(Instant::now() - start >= Duration::from_millis(5000));
                book.update(expired);
                assert!(book.notice(NoticeKind::Info).is_none());
                assert_eq!(book.contacts().len(), 2);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_notice_cancels_pending_clear() {
        LocalSet::new()
            .run_until(async {
                let service = Rc::new(MemoryService::default());
                let (mut executor, mut inbox) = Executor::new(Rc::clone(&service));
                let mut book = Phonebook::new(Duration::from_millis(5000));
                let start = Instant::now();

                let effects = book.submit("Cy", "111");
                apply(&mut executor, effects);
                let created = inbox.recv().await.unwrap();
                let effects = book.update(created);
                apply(&mut executor, effects);

                tokio::time::advance(Duration::from_millis(3000)).await;

                let effects = book.submit("Di", "222");
                apply(&mut executor, effects);
                let created = inbox.recv().await.unwrap();
                let effects = book.update(created);
                apply(&mut executor, effects);

                // the first timer would have fired at 5000ms; only the second arrives
                let expired = inbox.recv().await.unwrap();
                assert!(matches!(
                    expired,
                    Action::NoticeExpired {
                        kind: NoticeKind::Info,
                        generation: 2
                    }
                ));
                assert!(Instant::now() - start >= Duration::from_millis(8000));
                book.update(expired);
                assert!(book.notice(NoticeKind::Info).is_none());
                assert!(inbox.try_recv().is_err());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_channels_have_separate_timers() {
        LocalSet::new()
            .run_until(async {
                let service = Rc::new(MemoryService::default());
                let (mut executor, mut inbox) = Executor::new(Rc::clone(&service));
                let mut book = Phonebook::new(Duration::from_millis(5000));

                let effects = book.submit("Cy", "111");
                apply(&mut executor, effects);
                let created = inbox.recv().await.unwrap();
                let effects = book.update(created);
                apply(&mut executor, effects);

                let effects = book.delete(Contact::new(99, "Ghost", "000"));
                apply(&mut executor, effects);
                let deleted = inbox.recv().await.unwrap();
                let effects = book.update(deleted);
                apply(&mut executor, effects);
                assert!(book.notice(NoticeKind::Error).is_some());

                let first = inbox.recv().await.unwrap();
                let second = inbox.recv().await.unwrap();
                book.update(first);
                book.update(second);
                assert!(book.notice(NoticeKind::Info).is_none());
                assert!(book.notice(NoticeKind::Error).is_none());
            })
            .await;
    }

    #[tokio::test]
    async fn test_settle_collects_alerts() {
        let service = MemoryService::default();
        let mut book = Phonebook::new(Duration::from_millis(5000));
        let effects = book.submit("", "1");
        let settled = settle(&mut book, &service, effects).await;
        assert_eq!(settled.alerts, vec!["Name field is required!".to_string()]);
        assert_eq!(service.creates.get(), 0);
    }
}
