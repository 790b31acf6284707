//! Inbound event names and the callback fan-out.

use std::sync::Arc;

use serde_json::Value;

/// Inbound event names pushed by the update hub. Wire contract.
pub const ON_JOB_STATS: &str = "OnJobStats";
pub const ON_JOB_STARTED: &str = "OnJobStarted";
pub const ON_JOB_PROGRESS: &str = "OnJobProgress";
pub const ON_JOB_COMPLETED: &str = "OnJobCompleted";
pub const ON_JOB_NAVIGATION: &str = "OnJobNavigation";
pub const ON_JOB_PAGINATION: &str = "OnJobPagination";
pub const ON_JOB_EXTRACTION: &str = "OnJobExtraction";
pub const ON_SYSTEM_METRICS: &str = "OnSystemMetrics";
pub const ON_GROUP_JOB_UPDATE: &str = "OnGroupJobUpdate";
pub const ON_ASSIGNMENT_JOB_UPDATE: &str = "OnAssignmentJobUpdate";
pub const ON_CONVERSATION_JOB_UPDATE: &str = "OnConversationJobUpdate";

/// Every inbound event name, in registration order.
pub(crate) const ALL_EVENTS: [&str; 11] = [
    ON_JOB_STATS,
    ON_JOB_STARTED,
    ON_JOB_PROGRESS,
    ON_JOB_COMPLETED,
    ON_JOB_NAVIGATION,
    ON_JOB_PAGINATION,
    ON_JOB_EXTRACTION,
    ON_SYSTEM_METRICS,
    ON_GROUP_JOB_UPDATE,
    ON_ASSIGNMENT_JOB_UPDATE,
    ON_CONVERSATION_JOB_UPDATE,
];

/// Callback receiving the raw payload of one inbound event.
pub type EventCallback = Arc<dyn Fn(Value) + Send + Sync>;

/// Callback receiving connection up/down transitions.
pub type ConnectedChangeCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// Callback receiving connection failures as display messages.
pub type ErrorCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Caller-supplied hooks, each independently optional.
///
/// Payloads arrive exactly as the hub sent them; the client does not
/// validate, transform or deduplicate. Hooks run on the transport's
/// callback context and must not block; hand heavy work to your own
/// executor.
#[derive(Clone, Default)]
pub struct EventCallbacks {
    /// Channel went up or down, including transport-owned reconnects.
    pub on_connected_change: Option<ConnectedChangeCallback>,
    /// Connection-level failure.
    pub on_error: Option<ErrorCallback>,
    /// Aggregate queue/worker stats.
    pub on_job_stats: Option<EventCallback>,
    pub on_job_started: Option<EventCallback>,
    /// Percent progress of a running job.
    pub on_job_progress: Option<EventCallback>,
    pub on_job_completed: Option<EventCallback>,
    /// Navigation step of an extraction job.
    pub on_job_navigation: Option<EventCallback>,
    pub on_job_pagination: Option<EventCallback>,
    pub on_job_extraction: Option<EventCallback>,
    /// Host-wide metrics sample.
    pub on_system_metrics: Option<EventCallback>,
    pub on_group_job_update: Option<EventCallback>,
    pub on_assignment_job_update: Option<EventCallback>,
    pub on_conversation_job_update: Option<EventCallback>,
}

impl EventCallbacks {
    fn payload_hook(&self, event: &str) -> Option<&EventCallback> {
        match event {
            ON_JOB_STATS => self.on_job_stats.as_ref(),
            ON_JOB_STARTED => self.on_job_started.as_ref(),
            ON_JOB_PROGRESS => self.on_job_progress.as_ref(),
            ON_JOB_COMPLETED => self.on_job_completed.as_ref(),
            ON_JOB_NAVIGATION => self.on_job_navigation.as_ref(),
            ON_JOB_PAGINATION => self.on_job_pagination.as_ref(),
            ON_JOB_EXTRACTION => self.on_job_extraction.as_ref(),
            ON_SYSTEM_METRICS => self.on_system_metrics.as_ref(),
            ON_GROUP_JOB_UPDATE => self.on_group_job_update.as_ref(),
            ON_ASSIGNMENT_JOB_UPDATE => self.on_assignment_job_update.as_ref(),
            ON_CONVERSATION_JOB_UPDATE => self.on_conversation_job_update.as_ref(),
            _ => None,
        }
    }

    /// Forward a payload to the hook registered for `event`, verbatim.
    /// Events without a hook are dropped.
    pub(crate) fn dispatch(&self, event: &str, payload: Value) {
        match self.payload_hook(event) {
            Some(hook) => hook(payload),
            None => tracing::debug!(event, "no callback registered, dropping event"),
        }
    }
}
