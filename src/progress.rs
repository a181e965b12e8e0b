//! In-progress feedback while an operation holds the status slot.
//!
//! A search issued during a busy status pushes a spinner row right away,
//! then polls the status until it is idle again. At that point the spinner
//! is removed and the real reply for the pending query is pushed.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::commands::{CommandRouter, ReplyItem, ReplyUpdate};
use crate::status::OperationStatus;

/// Id of the spinner row.
pub const SPINNER_ID: &str = "**";

/// Icon of the spinner row.
pub const SPINNER_ICON: &str = "#fa fa-spinner fa-spin";

/// Channel for updates pushed to the host outside the search reply.
pub type ReplySender = mpsc::UnboundedSender<ReplyUpdate>;

/// Polls the status slot and swaps the spinner for the real reply.
///
/// At most one loop runs at a time; starting a new one cancels the previous.
pub struct ProgressLoop {
    status: OperationStatus,
    router: Arc<CommandRouter>,
    interval: Duration,
    plugin_name: String,
    active: Mutex<Option<CancellationToken>>,
}

impl ProgressLoop {
    /// Create an idle progress loop.
    pub fn new(
        status: OperationStatus,
        router: Arc<CommandRouter>,
        interval: Duration,
        plugin_name: impl Into<String>,
    ) -> Self {
        Self {
            status,
            router,
            interval,
            plugin_name: plugin_name.into(),
            active: Mutex::new(None),
        }
    }

    /// The spinner row for the current status.
    pub fn spinner_row(&self) -> ReplyItem {
        ReplyItem::new(SPINNER_ID, self.status.status_message(), &self.plugin_name)
            .with_icon(SPINNER_ICON)
    }

    /// Push the spinner row and start polling for `query`.
    ///
    /// Any previously started loop is cancelled first.
    pub fn start(&self, query: String, reply: ReplySender) -> JoinHandle<()> {
        let token = CancellationToken::new();
        if let Some(previous) = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(token.clone())
        {
            previous.cancel();
        }

        let spinner = self.spinner_row();
        debug!(title = %spinner.title, "Showing progress");
        let _ = reply.send(ReplyUpdate::Items(vec![spinner]));

        let status = self.status.clone();
        let router = Arc::clone(&self.router);
        let interval = self.interval;

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        trace!("Progress loop cancelled");
                        return;
                    }
                    _ = ticker.tick() => {}
                }

                if !status.is_idle() {
                    continue;
                }
                if token.is_cancelled() {
                    return;
                }

                if reply.send(ReplyUpdate::remove(SPINNER_ID)).is_err() {
                    return;
                }
                let rows = router.reply_for(&query).await;
                if token.is_cancelled() {
                    return;
                }
                let _ = reply.send(ReplyUpdate::Items(rows));
                debug!("Progress finished");
                return;
            }
        })
    }

    /// Cancel the running loop, if any. The operation itself keeps running.
    pub fn cancel(&self) {
        if let Some(token) = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            token.cancel();
        }
    }
}
