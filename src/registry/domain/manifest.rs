//! Binder discovery manifest.
//!
//! Each transport module ships a manifest resource listing the binder types
//! it provides, one per line:
//!
//! ```text
//! # comment
//! memory=in-memory
//! kafka=kafka-binder,kafka-binder-legacy
//! ```
//!
//! Implementation identifiers are resolved against the startup registration
//! table, so a type may name several candidates.

use super::{BinderName, RegistryDomainError};

/// One `type=implementation[,...]` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    binder_type: BinderName,
    implementations: Vec<String>,
    origin: String,
}

impl ManifestEntry {
    /// Returns the declared binder type.
    #[must_use]
    pub const fn binder_type(&self) -> &BinderName {
        &self.binder_type
    }

    /// Returns the implementation identifiers in declaration order.
    #[must_use]
    pub fn implementations(&self) -> &[String] {
        &self.implementations
    }

    /// Returns the resource the entry was read from.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }
}

/// Merged binder manifest, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinderManifest {
    entries: Vec<ManifestEntry>,
}

impl BinderManifest {
    /// Creates an empty manifest.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Parses one manifest resource.
    ///
    /// Blank lines and lines starting with `#` or `!` are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryDomainError::InvalidManifestLine`] for lines without
    /// a separator, with an invalid type name or without implementations,
    /// and [`RegistryDomainError::DuplicateManifestEntry`] when a type is
    /// declared twice.
    pub fn parse(origin: &str, content: &str) -> Result<Self, RegistryDomainError> {
        let mut manifest = Self::new();
        for (index, raw_line) in content.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let invalid = || RegistryDomainError::InvalidManifestLine {
                origin: origin.to_owned(),
                line: index.saturating_add(1),
                content: raw_line.to_owned(),
            };
            let (name, value) = line.split_once(['=', ':']).ok_or_else(invalid)?;
            let binder_type = BinderName::new(name).map_err(|_| invalid())?;
            let implementations: Vec<String> = value
                .split(',')
                .map(str::trim)
                .filter(|candidate| !candidate.is_empty())
                .map(str::to_owned)
                .collect();
            if implementations.is_empty() {
                return Err(invalid());
            }
            manifest.push(ManifestEntry {
                binder_type,
                implementations,
                origin: origin.to_owned(),
            })?;
        }
        Ok(manifest)
    }

    /// Adds the entries of another resource.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryDomainError::DuplicateManifestEntry`] when a type is
    /// already declared. The manifest is left unchanged in that case.
    pub fn merge(&mut self, other: Self) -> Result<(), RegistryDomainError> {
        if let Some(clash) = other
            .entries
            .iter()
            .find_map(|entry| self.duplicate_of(entry))
        {
            return Err(clash);
        }
        self.entries.extend(other.entries);
        Ok(())
    }

    fn push(&mut self, entry: ManifestEntry) -> Result<(), RegistryDomainError> {
        if let Some(clash) = self.duplicate_of(&entry) {
            return Err(clash);
        }
        self.entries.push(entry);
        Ok(())
    }

    fn duplicate_of(&self, entry: &ManifestEntry) -> Option<RegistryDomainError> {
        self.get(&entry.binder_type)
            .map(|existing| RegistryDomainError::DuplicateManifestEntry {
                name: entry.binder_type.to_string(),
                first: existing.origin.clone(),
                second: entry.origin.clone(),
            })
    }

    /// Returns the declaration of `binder_type`.
    #[must_use]
    pub fn get(&self, binder_type: &BinderName) -> Option<&ManifestEntry> {
        self.entries
            .iter()
            .find(|entry| entry.binder_type == *binder_type)
    }

    /// Returns every declaration.
    #[must_use]
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Returns the number of declared binder types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether no binder type is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
