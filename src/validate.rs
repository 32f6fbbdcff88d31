//! # Validation
//!
//! Method-aware validation of decoded records. A record type exposes a
//! capability table of validator functions; the mutate handler resolves
//! the table once when it is built and picks an entry per request method.

use std::collections::BTreeMap;
use std::fmt;

use axum::http::Method;
use serde::Serialize;

/// Field name to failure reason. Empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure for `field`; a later failure replaces an earlier one
    pub fn add(&mut self, field: impl Into<String>, reason: impl fmt::Display) {
        self.0.insert(field.into(), reason.to_string());
    }

    /// Record a failure for `field` unless `ok` holds
    pub fn check(&mut self, ok: bool, field: impl Into<String>, reason: impl fmt::Display) {
        if !ok {
            self.add(field, reason);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: fmt::Display> FromIterator<(K, V)> for ValidationErrors {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut errors = Self::new();
        for (field, reason) in iter {
            errors.add(field, reason);
        }
        errors
    }
}

/// A validator for one request kind
pub type ValidateFn<R> = fn(&R) -> ValidationErrors;

/// Capability table of validators a record supports.
///
/// Method-specific entries win over `generic`; with neither present the
/// request is not validated.
pub struct Validators<R> {
    pub post: Option<ValidateFn<R>>,
    pub put: Option<ValidateFn<R>>,
    pub patch: Option<ValidateFn<R>>,
    pub generic: Option<ValidateFn<R>>,
}

impl<R> Validators<R> {
    pub fn none() -> Self {
        Self {
            post: None,
            put: None,
            patch: None,
            generic: None,
        }
    }

    /// Same validator for every method
    pub fn generic(validate: ValidateFn<R>) -> Self {
        Self {
            generic: Some(validate),
            ..Self::none()
        }
    }

    pub fn with_post(mut self, validate: ValidateFn<R>) -> Self {
        self.post = Some(validate);
        self
    }

    pub fn with_put(mut self, validate: ValidateFn<R>) -> Self {
        self.put = Some(validate);
        self
    }

    pub fn with_patch(mut self, validate: ValidateFn<R>) -> Self {
        self.patch = Some(validate);
        self
    }

    /// Validator for `method`, falling back to the generic one
    pub fn resolve(&self, method: &Method) -> Option<ValidateFn<R>> {
        let specific = if *method == Method::POST {
            self.post
        } else if *method == Method::PUT {
            self.put
        } else if *method == Method::PATCH {
            self.patch
        } else {
            None
        };
        specific.or(self.generic)
    }

    pub fn is_empty(&self) -> bool {
        self.post.is_none() && self.put.is_none() && self.patch.is_none() && self.generic.is_none()
    }
}

impl<R> Clone for Validators<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for Validators<R> {}

impl<R> Default for Validators<R> {
    fn default() -> Self {
        Self::none()
    }
}

impl<R> fmt::Debug for Validators<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validators")
            .field("post", &self.post.is_some())
            .field("put", &self.put.is_some())
            .field("patch", &self.patch.is_some())
            .field("generic", &self.generic.is_some())
            .finish()
    }
}
