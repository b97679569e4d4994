//! Name/identifier tables fetched from the server once per run.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use async_trait::async_trait;
use clap::ValueEnum;

use crate::error::{JiraError, Result};
use crate::responses::IdName;

/// Identifier handed out for unknown names when running without a server.
pub const OFFLINE_ID: &str = "00";

pub const EPIC_THEME: &str = "epic/theme";
pub const EPIC_NAME: &str = "epic name";
pub const EPIC_LINK: &str = "epic link";

pub const SUBTASK_TYPE: &str = "sub-task";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum)]
pub enum Category {
    Project,
    #[value(name = "issuetype", alias = "types")]
    IssueType,
    #[value(alias = "priorities")]
    Priority,
    Versions,
    #[value(name = "fixversions")]
    FixVersions,
    Components,
    Resolutions,
}

impl Category {
    /// Fix versions come from the same endpoint as versions and share a table.
    fn table_key(self) -> Self {
        match self {
            Self::FixVersions => Self::Versions,
            other => other,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Project => "project",
            Self::IssueType => "issuetype",
            Self::Priority => "priority",
            Self::Versions => "versions",
            Self::FixVersions => "fixVersions",
            Self::Components => "components",
            Self::Resolutions => "resolutions",
        };
        f.write_str(name)
    }
}

/// Bidirectional id <-> lowercase name map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupTable {
    by_id: BTreeMap<String, String>,
    by_name: BTreeMap<String, String>,
}

impl LookupTable {
    pub fn from_entries(entries: impl IntoIterator<Item = IdName>) -> Self {
        let mut table = Self::default();
        for entry in entries {
            table.insert(entry.id, &entry.name);
        }
        table
    }

    pub fn insert(&mut self, id: impl Into<String>, name: &str) {
        let id = id.into();
        let name = name.to_lowercase();
        self.by_name.insert(name.clone(), id.clone());
        self.by_id.insert(id, name);
    }

    pub fn id_of(&self, name: &str) -> Option<&str> {
        self.by_name.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Entries in id order, numeric ids compared as numbers.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        let mut entries: Vec<_> = self
            .by_id
            .iter()
            .map(|(id, name)| (id.as_str(), name.as_str()))
            .collect();
        entries.sort_by(|a, b| id_order(a.0, b.0));
        entries.into_iter()
    }
}

/// `4` before `10`, and `customfield_9` before `customfield_10010`.
fn id_order(a: &str, b: &str) -> Ordering {
    fn split(id: &str) -> (&str, Option<u64>) {
        let prefix = id.trim_end_matches(|c: char| c.is_ascii_digit());
        (prefix, id[prefix.len()..].parse().ok())
    }
    split(a).cmp(&split(b)).then_with(|| a.cmp(b))
}

impl fmt::Display for LookupTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (id, name)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{id}: {name:?}")?;
        }
        f.write_str("}")
    }
}

/// Where tables come from. The server-backed implementation lives in `jira`.
#[async_trait(?Send)]
pub trait LookupSource {
    async fn fetch(&self, category: Category) -> Result<Vec<IdName>>;

    /// Custom fields (id -> display label) available on one issue type.
    async fn fetch_custom_fields(&self, issue_type_id: &str) -> Result<Vec<IdName>>;

    /// Offline sources accept names they have never seen.
    fn is_offline(&self) -> bool {
        false
    }
}

/// Synthetic tables used when the server is never contacted.
pub fn offline_entries(category: Category) -> Vec<IdName> {
    match category {
        Category::IssueType => vec![
            IdName::new("1", "epic"),
            IdName::new("2", "story"),
            IdName::new("3", "task"),
            IdName::new("4", SUBTASK_TYPE),
        ],
        _ => Vec::new(),
    }
}

pub fn offline_custom_fields(issue_type_id: &str) -> Vec<IdName> {
    let mut fields = vec![
        IdName::new("customfield_00000", EPIC_THEME),
        IdName::new("customfield_00002", EPIC_LINK),
    ];
    if issue_type_id == "1" {
        fields.push(IdName::new("customfield_00001", EPIC_NAME));
    }
    fields
}

/// Lazily populated tables, one fetch per category per run.
pub struct LookupCache<S> {
    source: S,
    tables: HashMap<Category, LookupTable>,
    fetched: HashSet<Category>,
    custom_fields: HashMap<String, LookupTable>,
}

impl<S: LookupSource> LookupCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            tables: HashMap::new(),
            fetched: HashSet::new(),
            custom_fields: HashMap::new(),
        }
    }

    pub fn is_offline(&self) -> bool {
        self.source.is_offline()
    }

    pub async fn table(&mut self, category: Category) -> Result<&LookupTable> {
        let key = category.table_key();
        if !self.fetched.contains(&key) {
            let entries = self.source.fetch(key).await?;
            let table = LookupTable::from_entries(entries);
            log::debug!("{key} table: {table}");
            self.tables.insert(key, table);
            self.fetched.insert(key);
        }
        Ok(&*self.tables.entry(key).or_default())
    }

    pub async fn custom_fields(&mut self, issue_type_id: &str) -> Result<&LookupTable> {
        if !self.custom_fields.contains_key(issue_type_id) {
            let entries = self.source.fetch_custom_fields(issue_type_id).await?;
            let table = LookupTable::from_entries(entries);
            log::debug!("custom fields for issue type {issue_type_id}: {table}");
            self.custom_fields.insert(issue_type_id.to_string(), table);
        }
        Ok(&*self
            .custom_fields
            .entry(issue_type_id.to_string())
            .or_default())
    }

    /// True if any custom field table fetched so far has this display label.
    pub fn is_known_custom_label(&self, label: &str) -> bool {
        self.custom_fields
            .values()
            .any(|table| table.id_of(label).is_some())
    }

    /// Translate a human-readable name (or a bare numeric id) into the
    /// server's identifier for `category`.
    pub async fn resolve(&mut self, category: Category, name: &str) -> Result<String> {
        let name = name.trim().to_lowercase();
        let offline = self.is_offline();
        let table = self.table(category).await?;

        if !name.is_empty() && name.chars().all(|c| c.is_ascii_digit()) {
            if table.contains_id(&name) || table.is_empty() || offline {
                return Ok(name);
            }
            return Err(JiraError::UnknownId {
                category,
                id: name,
                known: table.to_string(),
            });
        }

        match table.id_of(&name) {
            Some(id) => Ok(id.to_string()),
            None if offline => Ok(OFFLINE_ID.to_string()),
            None => Err(JiraError::UnknownValue {
                category,
                value: name,
                known: table.to_string(),
            }),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;

    use super::*;

    /// In-memory source that counts how often each table is requested.
    #[derive(Default)]
    pub(crate) struct StaticSource {
        pub tables: HashMap<Category, Vec<IdName>>,
        pub custom_fields: HashMap<String, Vec<IdName>>,
        pub calls: RefCell<Vec<String>>,
        pub offline: bool,
    }

    impl StaticSource {
        pub(crate) fn with(mut self, category: Category, entries: &[(&str, &str)]) -> Self {
            self.tables.insert(
                category,
                entries.iter().map(|(id, name)| IdName::new(*id, *name)).collect(),
            );
            self
        }

        pub(crate) fn with_custom_fields(mut self, issue_type_id: &str, entries: &[(&str, &str)]) -> Self {
            self.custom_fields.insert(
                issue_type_id.to_string(),
                entries.iter().map(|(id, name)| IdName::new(*id, *name)).collect(),
            );
            self
        }

        pub(crate) fn offline(mut self) -> Self {
            self.offline = true;
            self
        }

        pub(crate) fn call_count(&self, what: &str) -> usize {
            self.calls.borrow().iter().filter(|c| c.as_str() == what).count()
        }
    }

    #[async_trait(?Send)]
    impl LookupSource for StaticSource {
        async fn fetch(&self, category: Category) -> Result<Vec<IdName>> {
            self.calls.borrow_mut().push(category.to_string());
            Ok(self.tables.get(&category).cloned().unwrap_or_default())
        }

        async fn fetch_custom_fields(&self, issue_type_id: &str) -> Result<Vec<IdName>> {
            self.calls.borrow_mut().push(format!("customfields:{issue_type_id}"));
            Ok(self.custom_fields.get(issue_type_id).cloned().unwrap_or_default())
        }

        fn is_offline(&self) -> bool {
            self.offline
        }
    }

    #[test]
    fn test_table_lookup_is_case_insensitive() {
        let table = LookupTable::from_entries([IdName::new("10111", "CSA")]);
        assert_eq!(table.id_of("csa"), Some("10111"));
        assert_eq!(table.id_of("CsA"), Some("10111"));
        assert_eq!(table.to_string(), r#"{10111: "csa"}"#);
    }

    #[test]
    fn test_entries_follow_numeric_id_order() {
        let table = LookupTable::from_entries([
            IdName::new("10", "blocker"),
            IdName::new("4", "minor"),
            IdName::new("9", "trivial"),
        ]);
        let ids: Vec<&str> = table.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, ["4", "9", "10"]);
        assert_eq!(table.to_string(), r#"{4: "minor", 9: "trivial", 10: "blocker"}"#);

        let fields = LookupTable::from_entries([
            IdName::new("customfield_10010", "epic/theme"),
            IdName::new("customfield_9", "team"),
        ]);
        assert_eq!(fields.iter().next(), Some(("customfield_9", "team")));
    }

    #[tokio::test]
    async fn test_resolve_fetches_each_category_once() {
        let source = StaticSource::default().with(Category::Components, &[("10111", "csa")]);
        let mut cache = LookupCache::new(source);

        assert_eq!(cache.resolve(Category::Components, "CSA").await.unwrap(), "10111");
        assert_eq!(cache.resolve(Category::Components, "csa").await.unwrap(), "10111");
        assert_eq!(cache.source.call_count("components"), 1);
    }

    #[tokio::test]
    async fn test_empty_answer_is_not_refetched() {
        let mut cache = LookupCache::new(StaticSource::default());
        cache.table(Category::Priority).await.unwrap();
        cache.table(Category::Priority).await.unwrap();
        assert_eq!(cache.source.call_count("priority"), 1);
    }

    #[tokio::test]
    async fn test_unknown_name_reports_table() {
        let source = StaticSource::default().with(Category::Components, &[("10111", "csa")]);
        let mut cache = LookupCache::new(source);

        let err = cache
            .resolve(Category::Components, "nonexistent")
            .await
            .unwrap_err();
        match err {
            JiraError::UnknownValue { value, known, .. } => {
                assert_eq!(value, "nonexistent");
                assert!(known.contains("10111"));
                assert!(known.contains("csa"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_numeric_names_are_checked_against_ids() {
        let source = StaticSource::default().with(Category::Priority, &[("4", "minor"), ("3", "major")]);
        let mut cache = LookupCache::new(source);

        assert_eq!(cache.resolve(Category::Priority, "3").await.unwrap(), "3");
        assert!(matches!(
            cache.resolve(Category::Priority, "99").await,
            Err(JiraError::UnknownId { .. })
        ));
    }

    #[tokio::test]
    async fn test_numeric_names_pass_with_empty_table() {
        let mut cache = LookupCache::new(StaticSource::default());
        assert_eq!(cache.resolve(Category::Versions, "10033").await.unwrap(), "10033");
    }

    #[tokio::test]
    async fn test_fix_versions_share_versions_table() {
        let source = StaticSource::default().with(Category::Versions, &[("10020", "2.0")]);
        let mut cache = LookupCache::new(source);

        assert_eq!(cache.resolve(Category::Versions, "2.0").await.unwrap(), "10020");
        assert_eq!(cache.resolve(Category::FixVersions, "2.0").await.unwrap(), "10020");
        assert_eq!(cache.source.call_count("versions"), 1);
        assert_eq!(cache.source.call_count("fixVersions"), 0);
    }

    #[tokio::test]
    async fn test_offline_unknown_names_get_placeholder() {
        let mut cache = LookupCache::new(StaticSource::default().offline());
        assert_eq!(cache.resolve(Category::Project, "INFOSYS").await.unwrap(), OFFLINE_ID);
    }

    #[tokio::test]
    async fn test_custom_field_labels() {
        let source = StaticSource::default()
            .with_custom_fields("6", &[("customfield_10010", "Epic/Theme"), ("customfield_10441", "Epic Name")]);
        let mut cache = LookupCache::new(source);

        assert!(!cache.is_known_custom_label(EPIC_THEME));
        let fields = cache.custom_fields("6").await.unwrap();
        assert_eq!(fields.id_of(EPIC_NAME), Some("customfield_10441"));
        assert!(cache.is_known_custom_label(EPIC_THEME));
        cache.custom_fields("6").await.unwrap();
        assert_eq!(cache.source.call_count("customfields:6"), 1);
    }

    #[test]
    fn test_offline_custom_fields_only_epic_has_name() {
        assert!(offline_custom_fields("1").iter().any(|f| f.name == EPIC_NAME));
        assert!(!offline_custom_fields("2").iter().any(|f| f.name == EPIC_NAME));
    }
}
