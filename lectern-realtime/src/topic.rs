//! Subscription topics and their remote-procedure names.

use serde_json::Value;

/// A logical subscription multiplexed over the update channel.
///
/// The method names and argument arities are a wire contract shared with
/// the update hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topic {
    /// Progress and lifecycle of a single job.
    Job(String),
    /// Job updates rolled up per group.
    GroupJobs(String),
    /// Job updates rolled up per assignment.
    AssignmentJobs(String),
    /// Events in one conversation.
    Conversation(String),
    /// Host-wide system metrics feed.
    SystemMetrics,
    /// Every job on the platform (admin dashboards).
    AllJobs,
}

impl Topic {
    /// Remote procedure that opens this subscription.
    pub fn subscribe_method(&self) -> &'static str {
        match self {
            Topic::Job(_) => "SubscribeToJob",
            Topic::GroupJobs(_) => "SubscribeToGroupJobs",
            Topic::AssignmentJobs(_) => "SubscribeToAssignmentJobs",
            Topic::Conversation(_) => "SubscribeToConversation",
            Topic::SystemMetrics => "SubscribeToSystemMetrics",
            Topic::AllJobs => "SubscribeToAllJobs",
        }
    }

    /// Remote procedure that closes this subscription.
    pub fn unsubscribe_method(&self) -> &'static str {
        match self {
            Topic::Job(_) => "UnsubscribeFromJob",
            Topic::GroupJobs(_) => "UnsubscribeFromGroupJobs",
            Topic::AssignmentJobs(_) => "UnsubscribeFromAssignmentJobs",
            Topic::Conversation(_) => "UnsubscribeFromConversation",
            Topic::SystemMetrics => "UnsubscribeFromSystemMetrics",
            Topic::AllJobs => "UnsubscribeFromAllJobs",
        }
    }

    /// Arguments for either procedure: the scoping id, or nothing for the
    /// global feeds.
    pub fn args(&self) -> Vec<Value> {
        match self {
            Topic::Job(id)
            | Topic::GroupJobs(id)
            | Topic::AssignmentJobs(id)
            | Topic::Conversation(id) => vec![Value::String(id.clone())],
            Topic::SystemMetrics | Topic::AllJobs => Vec::new(),
        }
    }
}
