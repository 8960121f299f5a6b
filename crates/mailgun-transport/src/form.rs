//! Form-encoded request bodies.
//!
//! Mailgun accepts `application/x-www-form-urlencoded` bodies in which a key
//! may repeat (`action` on routes, `url` on webhooks), so a body is an ordered
//! list of pairs rather than a map.

use std::fmt;

/// Key-value pair of a form body.
pub type FormField = (String, String);

/// Ordered, possibly repeating, form fields.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct FormBody {
    fields: Vec<FormField>,
}

impl FormBody {
    /// Creates an empty body.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field.
    pub fn push(&mut self, field: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.fields.push((field.into(), value.into()));
        self
    }

    /// Appends a field only when a value is present.
    ///
    /// Unset optional parameters are left out entirely so the remote side
    /// keeps whatever it already has.
    pub fn push_opt<V: ToString>(&mut self, field: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.fields.push((field.to_string(), value.to_string()));
        }
        self
    }

    /// Appends one field per value, preserving order.
    pub fn push_all<I, V>(&mut self, field: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        for value in values {
            self.fields.push((field.to_string(), value.into()));
        }
        self
    }

    /// Appends every field of `other`, preserving order.
    pub fn extend_from(&mut self, other: FormBody) -> &mut Self {
        self.fields.extend(other.fields);
        self
    }

    /// Returns the first value for a field.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, v)| v.as_str())
    }

    /// Returns every value for a field, in order.
    pub fn get_all(&self, field: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(f, _)| f == field)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Returns true if the field is present at least once.
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|(f, _)| f == field)
    }

    /// Returns true if the body has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the fields in order.
    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    /// Serializes to `application/x-www-form-urlencoded`.
    pub fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.fields.iter())
            .finish()
    }
}

impl fmt::Debug for FormBody {
    // Passwords travel in form bodies, so their values never reach logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for (field, value) in &self.fields {
            if field.contains("password") {
                list.entry(&(field.as_str(), "<redacted>"));
            } else {
                list.entry(&(field.as_str(), value.as_str()));
            }
        }
        list.finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormBody {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Builds a [`FormBody`] from field-value pairs.
#[macro_export]
macro_rules! form {
    ($($field:expr => $value:expr),* $(,)?) => {
        $crate::FormBody::from_iter(vec![
            $(($field.to_string(), $value.to_string()),)*
        ])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_opt_skips_none() {
        let mut body = FormBody::new();
        body.push("expression", "catch_all()")
            .push_opt::<u32>("priority", None)
            .push_opt("description", Some("all mail"));

        assert!(body.has_field("expression"));
        assert!(!body.has_field("priority"));
        assert_eq!(body.get("description"), Some("all mail"));
    }

    #[test]
    fn test_repeated_fields_keep_order() {
        let mut body = FormBody::new();
        body.push_all("action", ["forward('a@b.com')", "stop()"]);

        assert_eq!(body.get_all("action"), vec!["forward('a@b.com')", "stop()"]);
        assert_eq!(body.get("action"), Some("forward('a@b.com')"));
    }

    #[test]
    fn test_encode() {
        let body = form! {
            "expression" => "match_recipient('a@b.com')",
            "priority" => 10,
        };
        assert_eq!(
            body.encode(),
            "expression=match_recipient%28%27a%40b.com%27%29&priority=10"
        );
    }

    #[test]
    fn test_debug_redacts_passwords() {
        let body = form! { "login" => "postmaster", "password" => "hunter2" };
        let rendered = format!("{body:?}");
        assert!(rendered.contains("postmaster"));
        assert!(!rendered.contains("hunter2"));
    }
}
