//! Resource kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of external resource a record declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    Domain,
    MailingList,
    Route,
    Webhook,
    Template,
    SmtpCredential,
    Bounce,
    Complaint,
    Unsubscribe,
}

impl ResourceKind {
    /// All kinds, in declaration order.
    pub const ALL: [ResourceKind; 9] = [
        ResourceKind::Domain,
        ResourceKind::MailingList,
        ResourceKind::Route,
        ResourceKind::Webhook,
        ResourceKind::Template,
        ResourceKind::SmtpCredential,
        ResourceKind::Bounce,
        ResourceKind::Complaint,
        ResourceKind::Unsubscribe,
    ];

    /// Lower-case name used in logs, metrics and operation labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Domain => "domain",
            ResourceKind::MailingList => "mailing list",
            ResourceKind::Route => "route",
            ResourceKind::Webhook => "webhook",
            ResourceKind::Template => "template",
            ResourceKind::SmtpCredential => "smtp credential",
            ResourceKind::Bounce => "bounce",
            ResourceKind::Complaint => "complaint",
            ResourceKind::Unsubscribe => "unsubscribe",
        }
    }

    /// Returns true for kinds whose secret is disclosed only at creation.
    pub fn is_write_once(&self) -> bool {
        matches!(self, ResourceKind::SmtpCredential)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
