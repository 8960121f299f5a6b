//! Record fixtures for every kind
//!
//! Each builder returns a [`Resource`] with the `default` credential
//! reference and no external name, ready for a first pass.

use mailgun_provider::resources::bounce::{Bounce, BounceParameters};
use mailgun_provider::resources::complaint::{Complaint, ComplaintParameters};
use mailgun_provider::resources::domain::{Domain, DomainParameters};
use mailgun_provider::resources::mailing_list::{MailingList, MailingListParameters};
use mailgun_provider::resources::route::{Route, RouteParameters};
use mailgun_provider::resources::smtp_credential::{SmtpCredentialParameters, SmtpCredentialRecord};
use mailgun_provider::resources::template::{Template, TemplateParameters};
use mailgun_provider::resources::unsubscribe::{Unsubscribe, UnsubscribeParameters};
use mailgun_provider::resources::webhook::{Webhook, WebhookEvent, WebhookParameters};
use mailgun_provider::{KindRecord, Resource};
use mailgun_reconcile_common::SecretReference;

/// Sending domain used throughout the fixtures.
pub const DOMAIN: &str = "mg.example.com";

/// API key the default account resolves to.
pub const API_KEY: &str = "key-test-0000";

/// Namespace of fixture secrets.
pub const NAMESPACE: &str = "mail";

pub fn secret(name: &str) -> SecretReference {
    SecretReference::new(name, NAMESPACE)
}

pub fn domain(name: &str) -> Resource {
    KindRecord::<Domain>::new(name, DomainParameters::new(name)).into()
}

pub fn mailing_list(address: &str) -> Resource {
    KindRecord::<MailingList>::new(
        address,
        MailingListParameters {
            address: address.to_string(),
            name: Some("Developers".to_string()),
            description: None,
            access_level: None,
            reply_preference: None,
        },
    )
    .into()
}

pub fn route(name: &str, expression: &str, actions: &[&str]) -> Resource {
    KindRecord::<Route>::new(
        name,
        RouteParameters {
            expression: expression.to_string(),
            actions: actions.iter().map(|a| a.to_string()).collect(),
            priority: None,
            description: None,
        },
    )
    .into()
}

/// Catch-all route forwarding to ops.
pub fn catch_all_route() -> Resource {
    route(
        "catch-all",
        "catch_all()",
        &["forward(\"ops@example.com\")", "stop()"],
    )
}

pub fn webhook(event: WebhookEvent, urls: &[&str]) -> Resource {
    KindRecord::<Webhook>::new(
        event.as_str(),
        WebhookParameters {
            domain: DOMAIN.to_string(),
            event_type: event,
            urls: urls.iter().map(|u| u.to_string()).collect(),
            username: None,
        },
    )
    .into()
}

pub fn template(name: &str, content: &str) -> Resource {
    KindRecord::<Template>::new(
        name,
        TemplateParameters {
            domain: DOMAIN.to_string(),
            name: name.to_string(),
            description: Some("Fixture template".to_string()),
            template: Some(content.to_string()),
            engine: None,
            tag: None,
            comment: None,
        },
    )
    .into()
}

/// SMTP credential publishing to the secret named `<login>-smtp`.
pub fn smtp_credential(login: &str) -> Resource {
    SmtpCredentialRecord::new(
        login,
        SmtpCredentialParameters {
            domain: DOMAIN.to_string(),
            login: login.to_string(),
            password_secret_ref: None,
        },
    )
    .with_connection_secret(secret(&format!("{login}-smtp")))
    .into()
}

pub fn bounce(address: &str) -> Resource {
    KindRecord::<Bounce>::new(
        address,
        BounceParameters {
            domain: DOMAIN.to_string(),
            address: address.to_string(),
            code: Some("550".to_string()),
            error: Some("No such mailbox".to_string()),
        },
    )
    .into()
}

pub fn complaint(address: &str) -> Resource {
    KindRecord::<Complaint>::new(
        address,
        ComplaintParameters {
            domain: DOMAIN.to_string(),
            address: address.to_string(),
        },
    )
    .into()
}

pub fn unsubscribe(address: &str, tags: &[&str]) -> Resource {
    KindRecord::<Unsubscribe>::new(
        address,
        UnsubscribeParameters {
            domain: DOMAIN.to_string(),
            address: address.to_string(),
            tags: Some(tags.iter().map(|t| t.to_string()).collect()),
        },
    )
    .into()
}

/// One record of every kind.
pub fn all_kinds() -> Vec<Resource> {
    vec![
        domain(DOMAIN),
        mailing_list("devs@mg.example.com"),
        catch_all_route(),
        webhook(WebhookEvent::Delivered, &["https://hooks.example.com/mg"]),
        template("welcome", "<p>Hello {{name}}</p>"),
        smtp_credential("alerts"),
        bounce("gone@example.org"),
        complaint("angry@example.org"),
        unsubscribe("quiet@example.org", &["newsletter"]),
    ]
}
