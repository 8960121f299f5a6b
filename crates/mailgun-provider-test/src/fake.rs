//! In-memory Mailgun service.
//!
//! [`FakeMailgun`] answers every request the provider issues, keeps the
//! resulting remote state, and records each call. It implements both
//! [`Transport`] and [`TransportFactory`], so it can back a single client or
//! a whole [`ProviderConnector`](mailgun_provider::ProviderConnector).
//!
//! PUT requests are partial: fields absent from the form keep their remote
//! value, as they do on the real service.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use mailgun_provider::{ResolvedCredentials, TransportFactory};
use mailgun_reconcile_common::ReconcileResult;
use mailgun_transport::{
    ApiRequest, CancellationToken, FormBody, Method, Transport, TransportError, TransportResult,
};
use serde_json::{json, Map, Value};
use tracing::debug;

/// Scope names under which remote objects are stored.
pub mod scope {
    pub const DOMAINS: &str = "domains";
    pub const LISTS: &str = "lists";
    pub const ROUTES: &str = "routes";

    pub fn webhooks(domain: &str) -> String {
        format!("webhooks/{domain}")
    }

    pub fn templates(domain: &str) -> String {
        format!("templates/{domain}")
    }

    pub fn credentials(domain: &str) -> String {
        format!("credentials/{domain}")
    }

    /// `list` is `bounces`, `complaints` or `unsubscribes`.
    pub fn suppressions(list: &str, domain: &str) -> String {
        format!("{list}/{domain}")
    }
}

/// One request as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub form: FormBody,
}

impl Call {
    pub fn is_mutating(&self) -> bool {
        self.method != Method::Get
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

impl From<&ApiRequest> for Call {
    fn from(request: &ApiRequest) -> Self {
        Self {
            method: request.method,
            path: request.path(),
            query: request.query.clone(),
            form: request.form.clone(),
        }
    }
}

struct Injection {
    method: Method,
    path: String,
    error: TransportError,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<(String, String), Value>,
    calls: Vec<Call>,
    injected: Vec<Injection>,
    next_id: u64,
    api_key: Option<String>,
}

/// In-memory Mailgun.
///
/// Clones share state.
#[derive(Clone, Default)]
pub struct FakeMailgun {
    state: Arc<Mutex<State>>,
    presented_key: Option<String>,
}

impl FakeMailgun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects transports built for any other key with 401.
    pub fn with_api_key(self, api_key: impl Into<String>) -> Self {
        self.lock().api_key = Some(api_key.into());
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes the next `method` request to `path` fail with `error`.
    pub fn fail_next(&self, method: Method, path: impl Into<String>, error: TransportError) {
        self.lock().injected.push(Injection {
            method,
            path: path.into(),
            error,
        });
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Calls as `"METHOD /path"` lines.
    pub fn call_log(&self) -> Vec<String> {
        self.lock().calls.iter().map(ToString::to_string).collect()
    }

    /// Calls other than GET.
    pub fn mutating_calls(&self) -> Vec<Call> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.is_mutating())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Stored object, as the service would return it.
    pub fn object(&self, scope: &str, id: &str) -> Option<Value> {
        self.lock()
            .objects
            .get(&(scope.to_string(), id.to_string()))
            .cloned()
    }

    /// Stores an object directly, bypassing the API.
    pub fn put_object(&self, scope: impl Into<String>, id: impl Into<String>, value: Value) {
        self.lock().objects.insert((scope.into(), id.into()), value);
    }

    /// Changes a stored object out of band. Returns false if it does not exist.
    pub fn mutate_object(&self, scope: &str, id: &str, change: impl FnOnce(&mut Value)) -> bool {
        match self
            .lock()
            .objects
            .get_mut(&(scope.to_string(), id.to_string()))
        {
            Some(value) => {
                change(value);
                true
            }
            None => false,
        }
    }

    /// Removes an object out of band.
    pub fn remove_object(&self, scope: &str, id: &str) -> Option<Value> {
        self.lock()
            .objects
            .remove(&(scope.to_string(), id.to_string()))
    }

    /// Number of stored objects in a scope.
    pub fn count(&self, scope: &str) -> usize {
        self.lock()
            .objects
            .keys()
            .filter(|(s, _)| s == scope)
            .count()
    }

    /// Current password of an SMTP credential.
    pub fn credential_password(&self, domain: &str, login: &str) -> Option<String> {
        self.object(&scope::credentials(domain), login)
            .and_then(|c| c.get("password").and_then(Value::as_str).map(str::to_string))
    }
}

#[async_trait]
impl Transport for FakeMailgun {
    async fn execute(&self, request: ApiRequest, cancel: &CancellationToken) -> TransportResult<Value> {
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        let mut state = self.lock();
        let call = Call::from(&request);
        debug!(call = %call, "Fake Mailgun request");
        state.calls.push(call.clone());

        if let Some(expected) = &state.api_key {
            if self.presented_key.as_ref().is_some_and(|k| k != expected) {
                return Err(TransportError::authentication("Invalid private key"));
            }
        }
        if let Some(pos) = state
            .injected
            .iter()
            .position(|i| i.method == call.method && i.path == call.path)
        {
            return Err(state.injected.remove(pos).error);
        }

        state.handle(&request)
    }
}

impl TransportFactory for FakeMailgun {
    fn build(&self, credentials: &ResolvedCredentials) -> ReconcileResult<Arc<dyn Transport>> {
        Ok(Arc::new(Self {
            state: self.state.clone(),
            presented_key: Some(credentials.api_key.clone()),
        }))
    }
}

fn now() -> String {
    Utc::now().to_rfc2822()
}

fn required<'a>(form: &'a FormBody, field: &str) -> TransportResult<&'a str> {
    form.get(field)
        .ok_or_else(|| TransportError::validation(format!("'{field}' parameter is missing")))
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "true" | "yes" | "1")
}

fn set_str(object: &mut Map<String, Value>, form: &FormBody, field: &str) {
    if let Some(value) = form.get(field) {
        object.insert(field.to_string(), json!(value));
    }
}

impl State {
    fn handle(&mut self, request: &ApiRequest) -> TransportResult<Value> {
        let segments: Vec<&str> = request.segments.iter().map(String::as_str).collect();
        let form = &request.form;

        match (request.method, segments.as_slice()) {
            // Domains
            (Method::Post, ["v4", "domains"]) => self.create_domain(form),
            (Method::Get, ["v4", "domains", name]) => self.get(scope::DOMAINS, name, Some("domain")),
            (Method::Put, ["v4", "domains", name]) => {
                self.update(scope::DOMAINS, name, "domain", |object| {
                    set_str(object, form, "spam_action");
                    set_str(object, form, "web_scheme");
                    if let Some(wildcard) = form.get("wildcard") {
                        object.insert("wildcard".to_string(), json!(parse_bool(wildcard)));
                    }
                })
            }
            (Method::Delete, ["v3", "domains", name]) => self.remove(scope::DOMAINS, name),

            // Webhooks
            (Method::Post, ["v3", "domains", domain, "webhooks"]) => self.create_webhook(domain, form),
            (Method::Get, ["v3", "domains", domain, "webhooks", event]) => {
                self.get(&scope::webhooks(domain), event, Some("webhook"))
            }
            (Method::Put, ["v3", "domains", domain, "webhooks", event]) => {
                self.update(&scope::webhooks(domain), event, "webhook", |object| {
                    let urls = form.get_all("url");
                    if !urls.is_empty() {
                        object.insert("urls".to_string(), json!(urls));
                    }
                    set_str(object, form, "username");
                })
            }
            (Method::Delete, ["v3", "domains", domain, "webhooks", event]) => {
                self.remove(&scope::webhooks(domain), event)
            }

            // SMTP credentials
            (Method::Post, ["v3", "domains", domain, "credentials"]) => {
                self.create_credential(domain, form)
            }
            (Method::Put, ["v3", "domains", domain, "credentials", login]) => {
                let password = required(form, "password")?.to_string();
                self.update(&scope::credentials(domain), login, "credential", |object| {
                    object.insert("password".to_string(), json!(password));
                })
                .map(|_| json!({"message": "Password changed"}))
            }
            (Method::Delete, ["v3", "domains", domain, "credentials", login]) => {
                self.remove(&scope::credentials(domain), login)
            }

            // Mailing lists
            (Method::Post, ["v3", "lists"]) => self.create_list(form),
            (Method::Get, ["v3", "lists", address]) => self.get(scope::LISTS, address, Some("list")),
            (Method::Put, ["v3", "lists", address]) => {
                self.update(scope::LISTS, address, "list", |object| {
                    for field in ["name", "description", "access_level", "reply_preference"] {
                        set_str(object, form, field);
                    }
                })
            }
            (Method::Delete, ["v3", "lists", address]) => self.remove(scope::LISTS, address),

            // Routes
            (Method::Post, ["v3", "routes"]) => self.create_route(form),
            (Method::Get, ["v3", "routes", id]) => self.get(scope::ROUTES, id, Some("route")),
            (Method::Put, ["v3", "routes", id]) => {
                let priority = parse_priority(form)?;
                self.update(scope::ROUTES, id, "route", |object| {
                    set_str(object, form, "expression");
                    set_str(object, form, "description");
                    if let Some(priority) = priority {
                        object.insert("priority".to_string(), json!(priority));
                    }
                    let actions = form.get_all("action");
                    if !actions.is_empty() {
                        object.insert("actions".to_string(), json!(actions));
                    }
                })
            }
            (Method::Delete, ["v3", "routes", id]) => self.remove(scope::ROUTES, id),

            // Templates
            (Method::Post, ["v3", domain, "templates"]) => self.create_template(domain, form),
            (Method::Post, ["v3", domain, "templates", name, "versions"]) => {
                self.create_template_version(domain, name, form)
            }
            (Method::Get, ["v3", domain, "templates", name]) => {
                let active = request.query.iter().any(|(k, v)| k == "active" && v == "yes");
                self.get_template(domain, name, active)
            }
            (Method::Put, ["v3", domain, "templates", name]) => {
                self.update(&scope::templates(domain), name, "template", |object| {
                    set_str(object, form, "description");
                })
                .map(|_| json!({"message": "template has been updated", "template": {"name": name}}))
            }
            (Method::Delete, ["v3", domain, "templates", name]) => {
                self.remove(&scope::templates(domain), name)
            }

            // Suppressions
            (Method::Post, ["v3", domain, list @ ("bounces" | "complaints" | "unsubscribes")]) => {
                self.upsert_suppression(list, domain, form)
            }
            (Method::Get, ["v3", domain, list @ ("bounces" | "complaints" | "unsubscribes"), address]) => {
                self.get(&scope::suppressions(list, domain), address, None)
            }
            (
                Method::Delete,
                ["v3", domain, list @ ("bounces" | "complaints" | "unsubscribes"), address],
            ) => self.remove(&scope::suppressions(list, domain), address),

            _ => Err(TransportError::not_found(format!(
                "no handler for {} {}",
                request.method,
                request.path()
            ))),
        }
    }

    fn key(scope: &str, id: &str) -> (String, String) {
        (scope.to_string(), id.to_string())
    }

    fn insert_new(&mut self, scope: &str, id: &str, value: Value) -> TransportResult<()> {
        let key = Self::key(scope, id);
        if self.objects.contains_key(&key) {
            return Err(TransportError::conflict(format!("'{id}' already exists")));
        }
        self.objects.insert(key, value);
        Ok(())
    }

    fn get(&self, scope: &str, id: &str, envelope: Option<&str>) -> TransportResult<Value> {
        let object = self
            .objects
            .get(&Self::key(scope, id))
            .cloned()
            .ok_or_else(|| TransportError::not_found(format!("{id} not found")))?;
        Ok(match envelope {
            Some(envelope) => json!({ envelope: object }),
            None => object,
        })
    }

    fn update(
        &mut self,
        scope: &str,
        id: &str,
        envelope: &str,
        apply: impl FnOnce(&mut Map<String, Value>),
    ) -> TransportResult<Value> {
        let object = self
            .objects
            .get_mut(&Self::key(scope, id))
            .and_then(Value::as_object_mut)
            .ok_or_else(|| TransportError::not_found(format!("{id} not found")))?;
        apply(object);
        Ok(json!({"message": "updated", envelope: object.clone()}))
    }

    fn remove(&mut self, scope: &str, id: &str) -> TransportResult<Value> {
        self.objects
            .remove(&Self::key(scope, id))
            .map(|_| json!({"message": "deleted"}))
            .ok_or_else(|| TransportError::not_found(format!("{id} not found")))
    }

    fn create_domain(&mut self, form: &FormBody) -> TransportResult<Value> {
        let name = required(form, "name")?;
        let domain = json!({
            "name": name,
            "spam_action": form.get("spam_action").unwrap_or("disabled"),
            "wildcard": form.get("wildcard").map_or(false, parse_bool),
            "web_scheme": form.get("web_scheme").unwrap_or("http"),
            "state": "unverified",
            "smtp_login": format!("postmaster@{name}"),
            "created_at": now(),
        });
        self.insert_new(scope::DOMAINS, name, domain.clone())?;
        Ok(json!({"message": "Domain DNS records have been created", "domain": domain}))
    }

    fn create_list(&mut self, form: &FormBody) -> TransportResult<Value> {
        let address = required(form, "address")?;
        let list = json!({
            "address": address,
            "name": form.get("name").unwrap_or(""),
            "description": form.get("description").unwrap_or(""),
            "access_level": form.get("access_level").unwrap_or("readonly"),
            "reply_preference": form.get("reply_preference").unwrap_or("list"),
            "members_count": 0,
            "created_at": now(),
        });
        self.insert_new(scope::LISTS, address, list.clone())?;
        Ok(json!({"message": "Mailing list has been created", "list": list}))
    }

    fn create_route(&mut self, form: &FormBody) -> TransportResult<Value> {
        let expression = required(form, "expression")?;
        let actions = form.get_all("action");
        if actions.is_empty() {
            return Err(TransportError::validation("'action' parameter is missing"));
        }

        self.next_id += 1;
        let id = format!("route-{:04}", self.next_id);
        let route = json!({
            "id": id,
            "priority": parse_priority(form)?.unwrap_or(0),
            "description": form.get("description").unwrap_or(""),
            "expression": expression,
            "actions": actions,
            "created_at": now(),
        });
        self.insert_new(scope::ROUTES, &id, route.clone())?;
        Ok(json!({"message": "Route has been created", "route": route}))
    }

    fn create_webhook(&mut self, domain: &str, form: &FormBody) -> TransportResult<Value> {
        let event = required(form, "id")?;
        let urls = form.get_all("url");
        if urls.is_empty() {
            return Err(TransportError::validation("'url' parameter is missing"));
        }

        let mut webhook = Map::new();
        webhook.insert("urls".to_string(), json!(urls));
        set_str(&mut webhook, form, "username");
        let webhook = Value::Object(webhook);
        self.insert_new(&scope::webhooks(domain), event, webhook.clone())?;
        Ok(json!({"message": "Webhook has been created", "webhook": webhook}))
    }

    fn create_credential(&mut self, domain: &str, form: &FormBody) -> TransportResult<Value> {
        let login = required(form, "login")?;
        let (password, generated) = match form.get("password") {
            Some(password) => (password.to_string(), false),
            None => {
                self.next_id += 1;
                (format!("generated-{:04}", self.next_id), true)
            }
        };

        self.insert_new(
            &scope::credentials(domain),
            login,
            json!({"login": login, "password": password}),
        )?;

        let mut response = json!({"message": "Created 1 credentials pair(s)"});
        if generated {
            response["password"] = json!(password);
        }
        Ok(response)
    }

    fn create_template(&mut self, domain: &str, form: &FormBody) -> TransportResult<Value> {
        let name = required(form, "name")?.to_lowercase();
        let mut versions = Vec::new();
        if let Some(content) = form.get("template") {
            versions.push(new_version(
                form.get("tag").unwrap_or("initial"),
                content,
                form,
                true,
            ));
        }

        let template = json!({
            "name": name,
            "description": form.get("description").unwrap_or(""),
            "createdAt": now(),
            "versions": versions,
        });
        self.insert_new(&scope::templates(domain), &name, template)?;
        Ok(json!({"message": "template has been stored", "template": {"name": name}}))
    }

    fn create_template_version(
        &mut self,
        domain: &str,
        name: &str,
        form: &FormBody,
    ) -> TransportResult<Value> {
        let content = required(form, "template")?;
        let tag = required(form, "tag")?;
        let active = form.get("active") == Some("yes");

        let template = self
            .objects
            .get_mut(&Self::key(&scope::templates(domain), name))
            .ok_or_else(|| TransportError::not_found(format!("template {name} not found")))?;
        let Some(versions) = template.get_mut("versions").and_then(Value::as_array_mut) else {
            return Err(TransportError::unknown(Some(500), "template has no versions list"));
        };
        if versions.iter().any(|v| v["tag"] == tag) {
            return Err(TransportError::conflict(format!("version '{tag}' already exists")));
        }
        if active {
            for version in versions.iter_mut() {
                version["active"] = json!(false);
            }
        }
        let version = new_version(tag, content, form, active);
        versions.push(version.clone());
        Ok(json!({"message": "new version of the template has been stored", "template": {"name": name, "version": version}}))
    }

    fn get_template(&self, domain: &str, name: &str, active: bool) -> TransportResult<Value> {
        let stored = self
            .objects
            .get(&Self::key(&scope::templates(domain), name))
            .ok_or_else(|| TransportError::not_found(format!("template {name} not found")))?;

        let mut template = json!({
            "name": stored["name"],
            "description": stored["description"],
            "createdAt": stored["createdAt"],
        });
        if active {
            if let Some(version) = stored["versions"]
                .as_array()
                .and_then(|versions| versions.iter().find(|v| v["active"] == true))
            {
                template["version"] = version.clone();
            }
        }
        Ok(json!({ "template": template }))
    }

    fn upsert_suppression(&mut self, list: &str, domain: &str, form: &FormBody) -> TransportResult<Value> {
        let address = required(form, "address")?;
        let entry = match list {
            "bounces" => json!({
                "address": address,
                "code": form.get("code").unwrap_or("550"),
                "error": form.get("error").unwrap_or(""),
                "created_at": now(),
            }),
            "unsubscribes" => {
                let mut tags = form.get_all("tag");
                if tags.is_empty() {
                    tags.push("*");
                }
                json!({"address": address, "tags": tags, "created_at": now()})
            }
            _ => json!({"address": address, "created_at": now()}),
        };
        self.objects
            .insert(Self::key(&scope::suppressions(list, domain), address), entry);
        Ok(json!({"message": format!("Address has been added to the {list} table"), "address": address}))
    }
}

fn parse_priority(form: &FormBody) -> TransportResult<Option<i64>> {
    form.get("priority")
        .map(|p| {
            p.parse::<i64>()
                .map_err(|_| TransportError::validation(format!("'priority' parameter is invalid: {p}")))
        })
        .transpose()
}

fn new_version(tag: &str, content: &str, form: &FormBody, active: bool) -> Value {
    let mut version = json!({
        "tag": tag,
        "template": content,
        "engine": form.get("engine").unwrap_or("handlebars"),
        "active": active,
        "createdAt": now(),
    });
    if let Some(comment) = form.get("comment") {
        version["comment"] = json!(comment);
    }
    version
}
