//! Completion coordination.
//!
//! One invocation runs two racing sub-operations (attachment download,
//! category registration) plus an externally-delivered expiration signal.
//! A single spawned loop owns the draft content, applies every mutation,
//! and delivers to the host at exactly one exit point: sub-operations report
//! over a channel instead of touching the draft, so each draft field has one
//! serialized writer and nothing can mutate content the host already holds.

use std::sync::Arc;

use {
    tokio::{sync::mpsc, task::JoinHandle},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info},
};

use crate::{
    attachment::{Attachment, AttachmentFetch, HttpAttachmentFetcher},
    category::{CategoryRegistrar, CategoryRegistry},
    payload::{self, NotificationRequest},
};

/// Final display content handed to the host.
#[derive(Debug, Clone)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    pub category_id: Option<String>,
    pub attachments: Vec<Attachment>,
}

impl NotificationContent {
    fn from_request(request: &NotificationRequest) -> Self {
        Self {
            title: request.title.clone(),
            body: request.body.clone(),
            category_id: None,
            attachments: Vec::new(),
        }
    }
}

/// Host delivery callback. Invoked exactly once per invocation.
pub type DeliverFn = Box<dyn FnOnce(NotificationContent) + Send + 'static>;

/// Result of one enrichment step, applied to the draft by the coordinator.
enum StepOutcome {
    Category(Option<String>),
    Attachment(Option<Attachment>),
}

/// Which enrichment steps have finished (success, skip, or failure alike).
#[derive(Debug, Clone, Copy, Default)]
struct CompletionState {
    category_done: bool,
    attachment_done: bool,
}

impl CompletionState {
    fn complete(self) -> bool {
        self.category_done && self.attachment_done
    }
}

#[derive(Debug, Clone, Copy)]
enum DeliveryReason {
    Completed,
    Expired,
}

/// Per-process enrichment engine. Invocations are independent; the category
/// registry is the only shared resource.
pub struct EnrichmentProcessor {
    fetcher: Arc<dyn AttachmentFetch>,
    registry: Arc<dyn CategoryRegistry>,
}

/// Handle to a running invocation.
pub struct InvocationHandle {
    expire: CancellationToken,
    task: JoinHandle<()>,
}

impl InvocationHandle {
    /// Host deadline hook: forces immediate delivery of whatever content has
    /// been assembled so far and cancels the in-flight download. Idempotent,
    /// and a no-op once delivery has happened.
    pub fn expire_soon(&self) {
        self.expire.cancel();
    }

    /// Wait until the invocation has delivered.
    pub async fn finished(self) {
        let _ = self.task.await;
    }
}

impl EnrichmentProcessor {
    pub fn new(fetcher: Arc<dyn AttachmentFetch>, registry: Arc<dyn CategoryRegistry>) -> Self {
        Self { fetcher, registry }
    }

    /// Wire the production HTTP fetcher from SDK config.
    pub fn from_config(
        config: &pushmill_config::EnrichConfig,
        registry: Arc<dyn CategoryRegistry>,
    ) -> Self {
        Self::new(Arc::new(HttpAttachmentFetcher::from_config(config)), registry)
    }

    /// Entry point, called once per incoming notification. Must run inside a
    /// tokio runtime. `deliver` is called exactly once: when both enrichment
    /// steps finish, or as soon as [`InvocationHandle::expire_soon`] fires,
    /// whichever comes first.
    pub fn on_receive(&self, request: NotificationRequest, deliver: DeliverFn) -> InvocationHandle {
        let meta = payload::parse_payload(&request.payload);
        info!(
            message_id = meta.message_id.as_deref().unwrap_or(""),
            has_attachment = meta.attachment_url.is_some(),
            buttons = meta.buttons.len(),
            "enrichment started"
        );

        let mut draft = NotificationContent::from_request(&request);
        let mut state = CompletionState::default();

        let expire = CancellationToken::new();
        let cancel_download = CancellationToken::new();
        let (outcome_tx, mut outcome_rx) = mpsc::channel::<StepOutcome>(2);

        // Attachment step. No usable URL: done up front, no task started.
        match meta.attachment_url.clone() {
            None => {
                debug!("no attachment requested");
                state.attachment_done = true;
            },
            Some(url) => {
                let fetcher = Arc::clone(&self.fetcher);
                let cancel = cancel_download.clone();
                let tx = outcome_tx.clone();
                tokio::spawn(async move {
                    let attachment = fetcher.fetch(url, cancel).await;
                    let _ = tx.send(StepOutcome::Attachment(attachment)).await;
                });
            },
        }

        // Category step. The registrar resolves sender-set categories and
        // id-less payloads without registry traffic, so it always runs.
        {
            let registrar = CategoryRegistrar::new(Arc::clone(&self.registry));
            let preset = request.category_id.clone();
            let meta = meta.clone();
            let tx = outcome_tx;
            tokio::spawn(async move {
                let id = registrar.register(preset.as_deref(), &meta).await;
                let _ = tx.send(StepOutcome::Category(id)).await;
            });
        }

        let expire_signal = expire.clone();
        let task = tokio::spawn(async move {
            let reason = loop {
                if state.complete() {
                    break DeliveryReason::Completed;
                }
                tokio::select! {
                    _ = expire_signal.cancelled() => {
                        cancel_download.cancel();
                        break DeliveryReason::Expired;
                    },
                    outcome = outcome_rx.recv() => match outcome {
                        Some(StepOutcome::Category(id)) => {
                            state.category_done = true;
                            if let Some(id) = id {
                                draft.category_id = Some(id);
                            }
                        },
                        Some(StepOutcome::Attachment(attachment)) => {
                            state.attachment_done = true;
                            if let Some(attachment) = attachment {
                                draft.attachments.push(attachment);
                            }
                        },
                        // Step tasks are gone without reporting; nothing more
                        // can arrive.
                        None => break DeliveryReason::Completed,
                    },
                }
            };

            // Dropping the receiver here closes the channel: a step that
            // finishes after this point finds no listener and its result is
            // discarded rather than mutating delivered content.
            drop(outcome_rx);

            let reason = match reason {
                DeliveryReason::Completed => "completed",
                DeliveryReason::Expired => "expired",
            };
            info!(
                reason,
                category = draft.category_id.as_deref().unwrap_or(""),
                attachments = draft.attachments.len(),
                "delivering notification content"
            );
            deliver(draft);
        });

        InvocationHandle { expire, task }
    }
}
