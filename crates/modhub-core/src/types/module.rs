//! Module records, manifests, and record filters.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use super::version::Version;

/// A persisted module record.
///
/// `update_pending` and `core_supported` are derived on demand from the
/// version fields and are never stored as authoritative state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Module {
    /// Store-assigned key; also the registry iteration order. `0` until first save.
    pub id: i64,
    /// Unique, immutable module key.
    pub slug: String,
    /// Human-readable name.
    pub name: String,
    /// Short description.
    pub description: String,
    /// Author or maintainer.
    pub author: String,
    /// Version declared by the manifest on disk.
    pub version: Version,
    /// Minimum core version this module runs on (`None` = any).
    pub min_core_version: Option<Version>,
    /// Declared dependency slugs, in manifest order.
    pub dependencies: Vec<String>,
    /// Whether the module participates in hooks.
    pub enabled: bool,
    /// Version that was last installed; empty when never installed.
    pub installed_version: Version,
    /// When the record was first created.
    pub created_at: DateTime<Utc>,
    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
}

impl Module {
    /// Creates a fresh, disabled, never-installed record from a manifest.
    pub fn discovered(slug: impl Into<String>, manifest: &Manifest) -> Self {
        let now = Utc::now();
        let mut module = Self {
            id: 0,
            slug: slug.into(),
            name: String::new(),
            description: String::new(),
            author: String::new(),
            version: Version::none(),
            min_core_version: None,
            dependencies: Vec::new(),
            enabled: false,
            installed_version: Version::none(),
            created_at: now,
            updated_at: now,
        };
        module.apply_manifest(manifest);
        module
    }

    /// Re-imports every manifest-owned field. The manifest is authoritative.
    pub fn apply_manifest(&mut self, manifest: &Manifest) {
        self.name = manifest.name.clone();
        self.description = manifest.description.clone();
        self.author = manifest.author.clone();
        self.version = manifest.version.clone();
        self.min_core_version = manifest.min_core_version.clone().filter(|v| !v.is_empty());
        self.dependencies = manifest.dependency_slugs();
    }

    /// Whether the on-disk version is newer than the installed one.
    pub fn update_pending(&self) -> bool {
        self.version > self.installed_version
    }

    /// Whether this module runs on the given core version.
    pub fn core_supported(&self, core_version: &Version) -> bool {
        match &self.min_core_version {
            Some(min) => min <= core_version,
            None => true,
        }
    }

    /// Whether the module declares any dependency.
    pub fn has_dependencies(&self) -> bool {
        !self.dependencies.is_empty()
    }
}

/// One declared dependency: the slug and its (currently unenforced) version constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    /// Dependency slug as written in the manifest.
    pub slug: String,
    /// Version constraint as written in the manifest.
    pub constraint: String,
}

impl Dependency {
    /// The slug with any `vendor/` path prefix removed.
    pub fn normalized_slug(&self) -> &str {
        self.slug.rsplit('/').next().unwrap_or(&self.slug)
    }
}

/// A module descriptor as read from its directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Short description.
    #[serde(default)]
    pub description: String,
    /// Author or maintainer.
    #[serde(default)]
    pub author: String,
    /// Module version.
    #[serde(default)]
    pub version: Version,
    /// Minimum supported core version.
    #[serde(default, alias = "core_version")]
    pub min_core_version: Option<Version>,
    /// Declared dependencies, keeping manifest order.
    #[serde(
        default,
        deserialize_with = "deserialize_dependencies",
        skip_serializing
    )]
    pub dependencies: Vec<Dependency>,
}

impl Manifest {
    /// Normalized dependency slugs in declaration order, without duplicates.
    pub fn dependency_slugs(&self) -> Vec<String> {
        let mut slugs: Vec<String> = Vec::with_capacity(self.dependencies.len());
        for dependency in &self.dependencies {
            let slug = dependency.normalized_slug();
            if !slug.is_empty() && !slugs.iter().any(|s| s == slug) {
                slugs.push(slug.to_string());
            }
        }
        slugs
    }
}

fn deserialize_dependencies<'de, D>(deserializer: D) -> Result<Vec<Dependency>, D::Error>
where
    D: Deserializer<'de>,
{
    struct DependencyMap;

    impl<'de> Visitor<'de> for DependencyMap {
        type Value = Vec<Dependency>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of dependency slug to version constraint")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut out = Vec::new();
            while let Some((slug, constraint)) = map.next_entry::<String, Option<String>>()? {
                out.push(Dependency {
                    slug,
                    constraint: constraint.unwrap_or_default(),
                });
            }
            Ok(out)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(DependencyMap)
}

/// Typed predicate for listing module records.
///
/// A typed filter rather than a closure so that SQL-backed stores can
/// translate it into a `WHERE` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleFilter {
    /// Every record.
    All,
    /// Enabled records, optionally excluding one slug.
    Enabled {
        /// Slug to leave out (the application module).
        excluding: Option<String>,
    },
    /// Records whose slug is not in the list.
    SlugNotIn(Vec<String>),
}

impl ModuleFilter {
    /// Enabled records except `slug`.
    pub fn enabled_except(slug: &str) -> Self {
        Self::Enabled {
            excluding: Some(slug.to_string()),
        }
    }

    /// Evaluates the filter against a record.
    pub fn matches(&self, module: &Module) -> bool {
        match self {
            Self::All => true,
            Self::Enabled { excluding } => {
                module.enabled && excluding.as_deref() != Some(module.slug.as_str())
            }
            Self::SlugNotIn(slugs) => !slugs.iter().any(|s| s == &module.slug),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(json: &str) -> Manifest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_dependencies_keep_declared_order() {
        let m = manifest(
            r#"{"name":"Blog","version":"1.0","dependencies":{"zeta":"*","alpha":">=1","vendor/files":""}}"#,
        );
        assert_eq!(m.dependency_slugs(), vec!["zeta", "alpha", "files"]);
    }

    #[test]
    fn test_null_dependencies() {
        let m = manifest(r#"{"name":"Blog","version":"1.0","dependencies":null}"#);
        assert!(m.dependencies.is_empty());
    }

    #[test]
    fn test_derived_flags() {
        let m = manifest(r#"{"name":"Blog","version":"1.2","core_version":"2.0"}"#);
        let mut module = Module::discovered("blog", &m);
        assert!(!module.enabled);
        assert!(module.update_pending());
        assert!(module.core_supported(&Version::new("2.0")));
        assert!(!module.core_supported(&Version::new("1.9")));

        module.installed_version = Version::new("1.2");
        assert!(!module.update_pending());

        module.installed_version = Version::new("1.2-beta");
        assert!(module.update_pending());
    }

    #[test]
    fn test_blank_min_core_version_is_unset() {
        let m = manifest(r#"{"name":"Blog","version":"1.0","core_version":""}"#);
        let module = Module::discovered("blog", &m);
        assert!(module.min_core_version.is_none());
        assert!(module.core_supported(&Version::new("0.1")));
    }

    #[test]
    fn test_filter_enabled_excluding() {
        let mut module = Module::discovered("app", &Manifest::default());
        module.enabled = true;
        assert!(!ModuleFilter::enabled_except("app").matches(&module));
        assert!(ModuleFilter::enabled_except("other").matches(&module));
        assert!(ModuleFilter::SlugNotIn(vec!["x".into()]).matches(&module));
    }
}
