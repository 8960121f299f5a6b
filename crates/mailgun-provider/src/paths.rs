//! Mailgun API path segments and form field names.

/// Current API version for most collections.
pub const V3: &str = "v3";

/// API version used for domain create/read/update.
pub const V4: &str = "v4";

pub const DOMAINS: &str = "domains";
pub const LISTS: &str = "lists";
pub const ROUTES: &str = "routes";
pub const WEBHOOKS: &str = "webhooks";
pub const TEMPLATES: &str = "templates";
pub const VERSIONS: &str = "versions";
pub const CREDENTIALS: &str = "credentials";
pub const BOUNCES: &str = "bounces";
pub const COMPLAINTS: &str = "complaints";
pub const UNSUBSCRIBES: &str = "unsubscribes";

/// Query parameter selecting the active template version.
pub const ACTIVE: &str = "active";

/// Form field names.
pub mod fields {
    pub const NAME: &str = "name";
    pub const ADDRESS: &str = "address";
    pub const DESCRIPTION: &str = "description";

    // Domains
    pub const SPAM_ACTION: &str = "spam_action";
    pub const WILDCARD: &str = "wildcard";
    pub const WEB_SCHEME: &str = "web_scheme";
    pub const DKIM_KEY_SIZE: &str = "dkim_key_size";
    pub const FORCE_DKIM_AUTHORITY: &str = "force_dkim_authority";
    pub const IPS: &str = "ips";

    // Mailing lists
    pub const ACCESS_LEVEL: &str = "access_level";
    pub const REPLY_PREFERENCE: &str = "reply_preference";

    // Routes
    pub const PRIORITY: &str = "priority";
    pub const EXPRESSION: &str = "expression";
    pub const ACTION: &str = "action";

    // Webhooks
    pub const ID: &str = "id";
    pub const URL: &str = "url";
    pub const USERNAME: &str = "username";

    // Templates
    pub const TEMPLATE: &str = "template";
    pub const ENGINE: &str = "engine";
    pub const TAG: &str = "tag";
    pub const COMMENT: &str = "comment";
    pub const ACTIVE: &str = "active";

    // SMTP credentials
    pub const LOGIN: &str = "login";
    pub const PASSWORD: &str = "password";

    // Bounces
    pub const CODE: &str = "code";
    pub const ERROR: &str = "error";
}
