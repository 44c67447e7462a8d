use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use godl_toolchain::{Observer, PipelineEvent};
use tokio::sync::mpsc;

use crate::commands::AppEvent;

pub(crate) const DEFAULT_EVENT_QUEUE_SIZE: usize = 512;

#[derive(Clone)]
pub(crate) struct UiEventSender {
    inner: Arc<UiEventQueue>,
}

/// Worker-to-interface queue. Progress is lossy; everything else is kept in
/// delivery order.
pub(crate) struct UiEventQueue {
    queue: Mutex<VecDeque<AppEvent>>,
    notify: mpsc::Sender<()>,
    max_len: usize,
}

impl UiEventQueue {
    pub(crate) fn new(max_len: usize) -> (Arc<Self>, mpsc::Receiver<()>) {
        let (notify, notify_rx) = mpsc::channel(1);
        (
            Arc::new(Self {
                queue: Mutex::new(VecDeque::new()),
                notify,
                max_len,
            }),
            notify_rx,
        )
    }

    pub(crate) fn sender(self: &Arc<Self>) -> UiEventSender {
        UiEventSender {
            inner: Arc::clone(self),
        }
    }

    pub(crate) fn drain(&self) -> Vec<AppEvent> {
        self.lock().drain(..).collect()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<AppEvent>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, event: AppEvent) -> bool {
        let mut queue = self.lock();
        let was_empty = queue.is_empty();

        if event.is_progress() {
            if let Some(last) = queue.back_mut().filter(|ev| ev.is_progress()) {
                *last = event;
                return false;
            }
        }

        if queue.len() >= self.max_len {
            if let Some(pos) = queue.iter().position(AppEvent::is_progress) {
                queue.remove(pos);
            } else if event.is_progress() {
                return false;
            }
        }

        queue.push_back(event);
        if was_empty {
            let _ = self.notify.try_send(());
        }
        true
    }
}

impl UiEventSender {
    pub(crate) fn send(&self, event: AppEvent) {
        self.inner.push(event);
    }
}

impl Observer for UiEventSender {
    fn notify(&self, event: PipelineEvent) {
        self.send(match event {
            PipelineEvent::Stage(stage) => AppEvent::Stage(stage),
            PipelineEvent::Progress(fraction) => AppEvent::Progress(fraction),
        });
    }
}
