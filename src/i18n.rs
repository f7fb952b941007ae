use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Fr,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::En, Language::Fr];

    pub fn as_str(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Fr => "fr",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported language: {0}")]
pub struct UnsupportedLanguageError(pub String);

impl FromStr for Language {
    type Err = UnsupportedLanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en" => Ok(Language::En),
            "fr" => Ok(Language::Fr),
            other => Err(UnsupportedLanguageError(other.to_string())),
        }
    }
}

/// One value per supported language. Lookup is total because the fields
/// mirror the `Language` variants one to one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageTable<T> {
    pub en: T,
    pub fr: T,
}

impl<T> LanguageTable<T> {
    pub fn get(&self, language: Language) -> &T {
        match language {
            Language::En => &self.en,
            Language::Fr => &self.fr,
        }
    }
}

/// Localized strings, nested by key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TranslationTree {
    Leaf(String),
    Node(BTreeMap<String, TranslationTree>),
}

impl Default for TranslationTree {
    fn default() -> Self {
        TranslationTree::Node(BTreeMap::new())
    }
}

impl TranslationTree {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Resolves a dotted key path such as `"header.title"` to a leaf.
    pub fn lookup(&self, path: &str) -> Option<&str> {
        let mut current = self;
        for key in path.split('.') {
            match current {
                TranslationTree::Node(children) => current = children.get(key)?,
                TranslationTree::Leaf(_) => return None,
            }
        }
        match current {
            TranslationTree::Leaf(value) => Some(value),
            TranslationTree::Node(_) => None,
        }
    }
}

/// Deep-merges `overrides` onto `base`. Nodes present on both sides merge
/// recursively; any other collision takes the override value whole.
pub fn merge(base: &TranslationTree, overrides: &TranslationTree) -> TranslationTree {
    match (base, overrides) {
        (TranslationTree::Node(base), TranslationTree::Node(overrides)) => {
            let mut merged = base.clone();
            for (key, value) in overrides {
                let value = match base.get(key) {
                    Some(existing) => merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), value);
            }
            TranslationTree::Node(merged)
        }
        (_, overrides) => overrides.clone(),
    }
}

#[derive(Debug, Error)]
#[error("invalid {language} translations: {source}")]
pub struct TranslationLoadError {
    pub language: Language,
    #[source]
    pub source: serde_json::Error,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationPair {
    pub default: TranslationTree,
    #[serde(rename = "override")]
    pub overrides: TranslationTree,
}

/// Default and override trees for every language.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationCatalog {
    pairs: LanguageTable<TranslationPair>,
}

impl TranslationCatalog {
    pub fn new(pairs: LanguageTable<TranslationPair>) -> Self {
        Self { pairs }
    }

    /// Parses `(default, override)` JSON documents for each language.
    pub fn from_json(
        sources: LanguageTable<(&str, &str)>,
    ) -> Result<Self, TranslationLoadError> {
        let parse = |language, json: &str| {
            TranslationTree::from_json(json)
                .map_err(|source| TranslationLoadError { language, source })
        };

        Ok(Self::new(LanguageTable {
            en: TranslationPair {
                default: parse(Language::En, sources.en.0)?,
                overrides: parse(Language::En, sources.en.1)?,
            },
            fr: TranslationPair {
                default: parse(Language::Fr, sources.fr.0)?,
                overrides: parse(Language::Fr, sources.fr.1)?,
            },
        }))
    }

    pub fn translations(&self, language: Language) -> TranslationTree {
        let pair = self.pairs.get(language);
        merge(&pair.default, &pair.overrides)
    }
}

impl Default for TranslationCatalog {
    fn default() -> Self {
        Self::new(LanguageTable {
            en: TranslationPair::default(),
            fr: TranslationPair::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(json: &str) -> TranslationTree {
        TranslationTree::from_json(json).unwrap()
    }

    #[test]
    fn merge_nested_override() {
        let merged = merge(
            &tree(r#"{"a":{"b":"x","c":"y"}}"#),
            &tree(r#"{"a":{"b":"z"}}"#),
        );
        assert_eq!(merged, tree(r#"{"a":{"b":"z","c":"y"}}"#));
    }

    #[test]
    fn merge_with_empty_override_is_identity() {
        let base = tree(r#"{"header":{"title":"Catalogi","links":{"home":"Home"}},"footer":"x"}"#);
        assert_eq!(merge(&base, &tree("{}")), base);
    }

    #[test]
    fn keys_from_both_sides_pass_through() {
        let merged = merge(
            &tree(r#"{"only_base":"b","shared":{"x":"1"}}"#),
            &tree(r#"{"only_override":"o","shared":{"y":"2"}}"#),
        );
        assert_eq!(
            merged,
            tree(r#"{"only_base":"b","only_override":"o","shared":{"x":"1","y":"2"}}"#)
        );
    }

    #[test]
    fn leaf_and_node_collision_takes_override() {
        let merged = merge(&tree(r#"{"a":"leaf"}"#), &tree(r#"{"a":{"b":"node"}}"#));
        assert_eq!(merged, tree(r#"{"a":{"b":"node"}}"#));

        let merged = merge(&tree(r#"{"a":{"b":"node"}}"#), &tree(r#"{"a":"leaf"}"#));
        assert_eq!(merged, tree(r#"{"a":"leaf"}"#));
    }

    #[test]
    fn lookup_dotted_path() {
        let t = tree(r#"{"header":{"title":"Catalogi"}}"#);
        assert_eq!(t.lookup("header.title"), Some("Catalogi"));
        assert_eq!(t.lookup("header"), None);
        assert_eq!(t.lookup("header.title.extra"), None);
        assert_eq!(t.lookup("missing"), None);
    }

    #[test]
    fn language_codes() {
        assert_eq!("fr".parse::<Language>().unwrap(), Language::Fr);
        assert_eq!(Language::En.to_string(), "en");
        assert_eq!(
            "de".parse::<Language>().unwrap_err(),
            UnsupportedLanguageError("de".to_string())
        );
        assert_eq!(serde_json::to_string(&Language::Fr).unwrap(), "\"fr\"");
        assert!(serde_json::from_str::<Language>("\"es\"").is_err());
    }

    #[test]
    fn catalog_merges_per_language() {
        let catalog = TranslationCatalog::from_json(LanguageTable {
            en: (r#"{"title":"Software","tagline":"Catalog"}"#, r#"{"title":"Apps"}"#),
            fr: (r#"{"title":"Logiciels"}"#, "{}"),
        })
        .unwrap();

        assert_eq!(
            catalog.translations(Language::En),
            tree(r#"{"title":"Apps","tagline":"Catalog"}"#)
        );
        assert_eq!(
            catalog.translations(Language::Fr),
            tree(r#"{"title":"Logiciels"}"#)
        );
    }

    #[test]
    fn catalog_reports_language_of_bad_json() {
        let err = TranslationCatalog::from_json(LanguageTable {
            en: ("{}", "{}"),
            fr: ("{", "{}"),
        })
        .unwrap_err();
        assert_eq!(err.language, Language::Fr);
    }
}
