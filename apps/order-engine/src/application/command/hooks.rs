//! Lifecycle hooks of a command.
//!
//! Hooks are advisory callbacks run on the correlation task. They must
//! return quickly and never block.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::domain::order_execution::{Classification, OutcomeEvent, OutcomeKind};
use crate::error::CommandError;

/// Callback run once when a command activates.
pub type StartHook = Arc<dyn Fn() + Send + Sync>;

/// Callback run for an outcome event.
pub type EventHook = Arc<dyn Fn(&OutcomeEvent) + Send + Sync>;

/// Callback run when a command fails.
pub type ErrorHook = Arc<dyn Fn(&CommandError) + Send + Sync>;

/// Named hooks attached to a command. Every hook is optional.
#[derive(Clone, Default)]
pub struct CommandHooks {
    pub(super) on_start: Option<StartHook>,
    pub(super) on_event: Option<EventHook>,
    pub(super) on_done: Option<EventHook>,
    pub(super) on_reject: Option<EventHook>,
    pub(super) on_error: Option<ErrorHook>,
    pub(super) by_kind: HashMap<OutcomeKind, Vec<EventHook>>,
}

impl CommandHooks {
    /// Run the start hook.
    pub(crate) fn started(&self) {
        if let Some(hook) = &self.on_start {
            hook();
        }
    }

    /// Run the hooks for a forwarded event.
    ///
    /// `on_event` and the per-kind hooks run for every forwarded event;
    /// `on_reject` and `on_done` additionally run for their bucket.
    pub(crate) fn forwarded(&self, event: &OutcomeEvent, classification: Classification) {
        if let Some(hook) = &self.on_event {
            hook(event);
        }
        if let Some(hooks) = self.by_kind.get(&event.kind) {
            for hook in hooks {
                hook(event);
            }
        }
        match classification {
            Classification::Done => {
                if let Some(hook) = &self.on_done {
                    hook(event);
                }
            }
            Classification::Reject => {
                if let Some(hook) = &self.on_reject {
                    hook(event);
                }
            }
            Classification::Other | Classification::Ignored => {}
        }
    }

    /// Run the error hook.
    pub(crate) fn failed(&self, error: &CommandError) {
        if let Some(hook) = &self.on_error {
            hook(error);
        }
    }

    pub(super) fn add_kind_hook(&mut self, kind: OutcomeKind, hook: EventHook) {
        self.by_kind.entry(kind).or_default().push(hook);
    }
}

impl fmt::Debug for CommandHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.by_kind.keys().copied().collect();
        kinds.sort();
        f.debug_struct("CommandHooks")
            .field("on_start", &self.on_start.is_some())
            .field("on_event", &self.on_event.is_some())
            .field("on_done", &self.on_done.is_some())
            .field("on_reject", &self.on_reject.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("by_kind", &kinds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::OrderId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_hook(counter: &Arc<AtomicUsize>) -> EventHook {
        let counter = Arc::clone(counter);
        Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn done_event_runs_event_kind_and_done_hooks() {
        let events = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));
        let by_kind = Arc::new(AtomicUsize::new(0));

        let mut hooks = CommandHooks {
            on_event: Some(counting_hook(&events)),
            on_done: Some(counting_hook(&done)),
            ..CommandHooks::default()
        };
        hooks.add_kind_hook(OutcomeKind::CloseOk, counting_hook(&by_kind));

        let event = OutcomeEvent::new(OrderId::new("a"), OutcomeKind::CloseOk);
        hooks.forwarded(&event, Classification::Done);

        assert_eq!(events.load(Ordering::SeqCst), 1);
        assert_eq!(done.load(Ordering::SeqCst), 1);
        assert_eq!(by_kind.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn other_event_skips_done_hook() {
        let done = Arc::new(AtomicUsize::new(0));
        let hooks = CommandHooks {
            on_done: Some(counting_hook(&done)),
            ..CommandHooks::default()
        };

        let event = OutcomeEvent::new(OrderId::new("a"), OutcomeKind::PartialCloseOk);
        hooks.forwarded(&event, Classification::Other);

        assert_eq!(done.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn debug_lists_configured_hooks() {
        let hooks = CommandHooks {
            on_start: Some(Arc::new(|| {})),
            ..CommandHooks::default()
        };
        let rendered = format!("{hooks:?}");
        assert!(rendered.contains("on_start: true"));
        assert!(rendered.contains("on_error: false"));
    }
}
