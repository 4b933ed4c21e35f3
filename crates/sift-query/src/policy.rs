//! Field visibility policy.
//!
//! A policy decides which query parameters take part in filtering. It is derived once from a
//! serializer declaration and shared read-only between requests.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::QueryError;

/// Which fields may be filtered on, and under which names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPolicy {
    /// Fields that may be filtered on. Empty together with `search_fields` means "all".
    allowed_fields: BTreeSet<String>,
    /// Fields that may never be filtered on.
    excluded_fields: BTreeSet<String>,
    /// Extra filterable names that are not output fields.
    search_fields: BTreeSet<String>,
    /// External parameter name to internal field name.
    field_aliases: BTreeMap<String, String>,
}

impl FieldPolicy {
    /// Starts a policy declaration. `owner` names the declaring serializer in errors.
    pub fn builder(owner: impl Into<String>) -> FieldPolicyBuilder {
        FieldPolicyBuilder {
            owner: owner.into(),
            policy: Self::default(),
        }
    }

    /// A policy that admits every field.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Resolves an external name through the alias map.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.field_aliases.get(name).map_or(name, String::as_str)
    }

    /// Returns true if `base` may be filtered on.
    ///
    /// The allow list is consulted first; the exclude list is only checked for fields the allow
    /// list let through.
    pub fn admits(&self, base: &str) -> bool {
        let restricted = !self.allowed_fields.is_empty() || !self.search_fields.is_empty();
        if restricted && !self.allowed_fields.contains(base) && !self.search_fields.contains(base)
        {
            return false;
        }
        !self.excluded_fields.contains(base)
    }

    /// Returns true if neither an allow list nor search fields are declared.
    pub fn is_unrestricted(&self) -> bool {
        self.allowed_fields.is_empty() && self.search_fields.is_empty()
    }

    /// Allowed field names.
    pub fn allowed_fields(&self) -> &BTreeSet<String> {
        &self.allowed_fields
    }

    /// Excluded field names.
    pub fn excluded_fields(&self) -> &BTreeSet<String> {
        &self.excluded_fields
    }

    /// Search-only field names.
    pub fn search_fields(&self) -> &BTreeSet<String> {
        &self.search_fields
    }

    /// Alias map.
    pub fn field_aliases(&self) -> &BTreeMap<String, String> {
        &self.field_aliases
    }
}

/// Builder for [`FieldPolicy`].
#[derive(Debug, Clone)]
pub struct FieldPolicyBuilder {
    /// Name used in configuration errors.
    owner: String,
    /// Policy under construction.
    policy: FieldPolicy,
}

impl FieldPolicyBuilder {
    /// Adds allowed fields.
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policy
            .allowed_fields
            .extend(fields.into_iter().map(Into::into));
        self
    }

    /// Adds excluded fields.
    pub fn exclude<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policy
            .excluded_fields
            .extend(fields.into_iter().map(Into::into));
        self
    }

    /// Adds search-only fields.
    pub fn search_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policy
            .search_fields
            .extend(fields.into_iter().map(Into::into));
        self
    }

    /// Maps the external parameter name `alias` onto the internal field `field`.
    pub fn alias(mut self, alias: impl Into<String>, field: impl Into<String>) -> Self {
        self.policy.field_aliases.insert(alias.into(), field.into());
        self
    }

    /// Finishes the declaration.
    pub fn build(self) -> Result<FieldPolicy, QueryError> {
        if !self.policy.allowed_fields.is_empty() && !self.policy.excluded_fields.is_empty() {
            return Err(QueryError::FieldsAndExclude { owner: self.owner });
        }
        Ok(self.policy)
    }
}
