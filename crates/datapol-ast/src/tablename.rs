//! Tablenames: a table qualified by an optional service and modal

use std::fmt;

/// Name of a table, e.g. `nova:servers` or `execute[nova:servers.pause]`
///
/// Ordering compares modal, then service, then table; absent parts sort first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tablename {
    pub modal: Option<String>,
    pub service: Option<String>,
    pub table: String,
}

impl Tablename {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            modal: None,
            service: None,
            table: table.into(),
        }
    }

    #[must_use]
    pub fn with_service(mut self, service: Option<String>) -> Self {
        self.service = service;
        self
    }

    #[must_use]
    pub fn with_modal(mut self, modal: Option<String>) -> Self {
        self.modal = modal;
        self
    }

    /// Build a tablename from its full text.
    ///
    /// With modules enabled, `"nova:servers:cpu"` becomes service `nova` and
    /// table `servers:cpu`. Otherwise the whole text is the table.
    #[must_use]
    pub fn create(name: &str, use_modules: bool) -> Self {
        if use_modules {
            let (service, table) = Self::parse_service_table(name);
            Self::new(table).with_service(service)
        } else {
            Self::new(name)
        }
    }

    /// Split `service:table` at the first colon
    #[must_use]
    pub fn parse_service_table(name: &str) -> (Option<String>, String) {
        match name.split_once(':') {
            Some((service, table)) => (Some(service.to_string()), table.to_string()),
            None => (None, name.to_string()),
        }
    }

    #[must_use]
    pub fn build_service_table(service: &str, table: &str) -> String {
        format!("{service}:{table}")
    }

    /// Join `prefix`, service and table with colons, skipping absent parts
    #[must_use]
    pub fn global_tablename(&self, prefix: Option<&str>) -> String {
        [prefix, self.service.as_deref(), Some(self.table.as_str())]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(":")
    }

    /// True when this names `service:table` under `modal`, including when the
    /// service was left inside the table text
    #[must_use]
    pub fn matches(&self, service: Option<&str>, table: &str, modal: Option<&str>) -> bool {
        if modal != self.modal.as_deref() {
            return false;
        }
        if service == self.service.as_deref() && table == self.table {
            return true;
        }
        let (self_service, self_table) = Self::parse_service_table(&self.table);
        service == self_service.as_deref() && table == self_table
    }

    /// Equality where a missing service means `default_service`
    #[must_use]
    pub fn same(&self, other: &Self, default_service: Option<&str>) -> bool {
        if self.table != other.table || self.modal != other.modal {
            return false;
        }
        let self_service = self.service.as_deref().or(default_service);
        let other_service = other.service.as_deref().or(default_service);
        self_service == other_service
    }

    /// `service:table`, with `default_service` filling in a missing service
    #[must_use]
    pub fn name(&self, default_service: Option<&str>) -> String {
        match self.service.as_deref().or(default_service) {
            Some(service) => Self::build_service_table(service, &self.table),
            None => self.table.clone(),
        }
    }

    #[must_use]
    pub fn is_update(&self) -> bool {
        self.table.ends_with('+') || self.table.ends_with('-')
    }

    /// Copy with the update sign flipped; `None` when not an update table
    #[must_use]
    pub fn invert_update(&self) -> Option<Self> {
        let suffix = if self.table.ends_with('+') {
            '-'
        } else if self.table.ends_with('-') {
            '+'
        } else {
            return None;
        };
        let mut new = self.clone();
        new.table.pop();
        new.table.push(suffix);
        Some(new)
    }

    /// Copy without the update sign; `None` when not an update table
    #[must_use]
    pub fn drop_update(&self) -> Option<Self> {
        if !self.is_update() {
            return None;
        }
        let mut new = self.clone();
        new.table.pop();
        Some(new)
    }

    #[must_use]
    pub fn make_update(&self, is_insert: bool) -> Self {
        let mut new = self.clone();
        new.table.push(if is_insert { '+' } else { '-' });
        new
    }

    pub fn drop_service(&mut self) {
        self.service = None;
    }
}

impl fmt::Display for Tablename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [
            self.modal.as_deref(),
            self.service.as_deref(),
            Some(self.table.as_str()),
        ]
        .into_iter()
        .flatten()
        .collect();
        f.write_str(&parts.join(":"))
    }
}
