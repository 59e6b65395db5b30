//! Make abbreviation table.
//!
//! A flat mapping from canonical make name to an optional abbreviation
//! (`"Volkswagen" -> "VW"`). It is loaded once at start-up, either from the
//! table bundled with the crate or from a user-supplied JSON/TOML file, and
//! is read-only afterwards. Keys are matched verbatim: callers normalise
//! case before lookup if they need to.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::{Error, Result};

const BUILTIN_ABBREVIATIONS: &str = include_str!("../data/make_abbreviations.json");

/// Read-only make → abbreviation lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    entries: BTreeMap<String, Option<String>>,
}

impl AliasTable {
    /// The table bundled with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_ABBREVIATIONS)
    }

    /// Parse a flat JSON object of `make -> abbreviation | null`.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: BTreeMap<String, Option<String>> = serde_json::from_str(content)?;
        Ok(Self::from_entries(raw))
    }

    /// Parse a flat TOML table of `make = "abbreviation"`. TOML has no
    /// null, so an empty string stands for "no abbreviation".
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: BTreeMap<String, String> = toml::from_str(content)?;
        Ok(Self::from_entries(
            raw.into_iter().map(|(make, abbr)| (make, Some(abbr))),
        ))
    }

    /// Load a table from disk, choosing the format by file extension
    /// (`.toml`, anything else is read as JSON).
    ///
    /// # Errors
    /// Returns [`Error::AliasResourceMissing`] if the file cannot be read,
    /// or a parse error if its content is not a flat table.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            log::error!("Cannot read alias resource {}: {}", path.display(), e);
            Error::AliasResourceMissing {
                path: path.to_path_buf(),
            }
        })?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let table = if is_toml {
            Self::from_toml_str(&content)?
        } else {
            Self::from_json_str(&content)?
        };

        log::info!(
            "Loaded {} make aliases from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Load from `path` when given, otherwise fall back to the bundled table.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        }
    }

    /// Build a table from `(make, abbreviation)` pairs. Blank abbreviations
    /// are stored as absent.
    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<String>)>,
        K: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(make, abbr)| {
                let abbr = abbr.filter(|a| !a.trim().is_empty());
                (make.into(), abbr)
            })
            .collect();
        Self { entries }
    }

    /// The abbreviation stored for `make`, if any.
    #[must_use]
    pub fn lookup(&self, make: &str) -> Option<&str> {
        self.entries.get(make).and_then(|abbr| abbr.as_deref())
    }

    /// Number of makes in the table (with or without an abbreviation).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lower-cased names a make is known by: itself plus its abbreviation.
    #[must_use]
    pub fn aliases_for(&self, make: &str) -> BTreeSet<String> {
        let mut aliases = BTreeSet::new();
        aliases.insert(make.to_lowercase());
        if let Some(abbr) = self.lookup(make) {
            aliases.insert(abbr.to_lowercase());
        }
        aliases
    }

    /// Two-way `"make,abbr"` synonym rules, lower-cased, for search engines
    /// with a synonym filter. Makes without a distinct abbreviation are
    /// skipped.
    #[must_use]
    pub fn synonym_pairs(&self) -> Vec<String> {
        let mut pairs = Vec::new();
        for (make, abbr) in &self.entries {
            let Some(abbr) = abbr else { continue };
            if abbr == make {
                continue;
            }
            let make = make.to_lowercase();
            let abbr = abbr.to_lowercase();
            pairs.push(format!("{make},{abbr}"));
            pairs.push(format!("{abbr},{make}"));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    fn temp_with_suffix(suffix: &str) -> NamedTempFile {
        Builder::new().suffix(suffix).tempfile().unwrap()
    }

    #[test]
    fn test_builtin_table_loads() {
        let table = AliasTable::builtin().unwrap();
        assert!(!table.is_empty());
        assert_eq!(table.lookup("Toyota"), Some("TOY"));
        assert_eq!(table.lookup("Volkswagen"), Some("VW"));
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let table = AliasTable::builtin().unwrap();
        assert_eq!(table.lookup("toyota"), None);
        assert_eq!(table.lookup("TOYOTA"), None);
    }

    #[test]
    fn test_null_entry_has_no_abbreviation() {
        let table = AliasTable::from_json_str(r#"{"Honda": null, "Toyota": "TOY"}"#).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup("Honda"), None);
    }

    #[test]
    fn test_blank_abbreviation_is_absent() {
        let table = AliasTable::from_json_str(r#"{"Honda": "  "}"#).unwrap();
        assert_eq!(table.lookup("Honda"), None);
    }

    #[test]
    fn test_nested_json_is_rejected() {
        let result = AliasTable::from_json_str(r#"{"Toyota": {"abbr": "TOY"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_toml_str() {
        let table = AliasTable::from_toml_str(
            r#"
"Toyota" = "TOY"
"Land Rover" = "LR"
"Honda" = ""
"#,
        )
        .unwrap();
        assert_eq!(table.lookup("Land Rover"), Some("LR"));
        assert_eq!(table.lookup("Honda"), None);
    }

    #[test]
    fn test_load_json_file() {
        let mut file = temp_with_suffix(".json");
        write!(file, r#"{{"Chevrolet": "CHEVY"}}"#).unwrap();
        let table = AliasTable::load(file.path()).unwrap();
        assert_eq!(table.lookup("Chevrolet"), Some("CHEVY"));
    }

    #[test]
    fn test_load_toml_file() {
        let mut file = temp_with_suffix(".toml");
        writeln!(file, r#""Mercedes-Benz" = "MB""#).unwrap();
        let table = AliasTable::load(file.path()).unwrap();
        assert_eq!(table.lookup("Mercedes-Benz"), Some("MB"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = AliasTable::load(Path::new("/nonexistent/aliases.json")).unwrap_err();
        assert!(matches!(err, Error::AliasResourceMissing { .. }));
    }

    #[test]
    fn test_load_or_builtin_without_path() {
        let table = AliasTable::load_or_builtin(None).unwrap();
        assert_eq!(table, AliasTable::builtin().unwrap());
    }

    #[test]
    fn test_aliases_for() {
        let table = AliasTable::from_entries([("Toyota", Some("TOY".to_string()))]);
        let aliases = table.aliases_for("Toyota");
        assert!(aliases.contains("toyota"));
        assert!(aliases.contains("toy"));

        let aliases = table.aliases_for("Honda");
        assert_eq!(aliases.len(), 1);
    }

    #[test]
    fn test_synonym_pairs() {
        let table = AliasTable::from_entries([
            ("Volkswagen", Some("VW".to_string())),
            ("Honda", None),
            ("Mini", Some("Mini".to_string())),
        ]);
        let pairs = table.synonym_pairs();
        assert_eq!(pairs, vec!["volkswagen,vw", "vw,volkswagen"]);
    }
}
