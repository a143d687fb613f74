//! Keyword → study-resource lookup.
//!
//! The table is built once at startup and only read afterwards. Matching is
//! a case-insensitive substring test, so a keyword also fires inside a
//! longer word ("jee" in "jeep").

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// One keyword and the descriptors it contributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntry {
    pub keyword: String,
    pub resources: Vec<String>,
}

impl ResourceEntry {
    pub fn new<I, S>(keyword: impl Into<String>, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keyword: keyword.into(),
            resources: resources.into_iter().map(Into::into).collect(),
        }
    }
}

/// Ordered keyword table. Iteration order is the order results are emitted.
#[derive(Debug, Clone, Default)]
pub struct ResourceTable {
    entries: Vec<ResourceEntry>,
}

impl ResourceTable {
    /// Build a table; keywords are lowercased and surrounding whitespace is
    /// dropped. Entries with an empty keyword are skipped.
    pub fn new(entries: impl IntoIterator<Item = ResourceEntry>) -> Self {
        let entries = entries
            .into_iter()
            .filter_map(|e| {
                let keyword = e.keyword.trim().to_lowercase();
                (!keyword.is_empty()).then_some(ResourceEntry {
                    keyword,
                    resources: e.resources,
                })
            })
            .collect();
        Self { entries }
    }

    /// The study table shipped with the service.
    pub fn builtin() -> Self {
        Self::new(builtin_entries())
    }

    pub fn entries(&self) -> &[ResourceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Descriptors for every keyword found in `query`, in table order.
    ///
    /// A keyword listed twice in the table still contributes once.
    pub fn lookup(&self, query: &str) -> Vec<&str> {
        if query.is_empty() {
            return Vec::new();
        }

        let query = query.to_lowercase();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut matched = Vec::new();

        for entry in &self.entries {
            if query.contains(entry.keyword.as_str()) && seen.insert(entry.keyword.as_str()) {
                debug!(keyword = %entry.keyword, "Resource keyword matched");
                matched.extend(entry.resources.iter().map(String::as_str));
            }
        }

        debug!(count = matched.len(), "Resource lookup finished");
        matched
    }
}

/// Default entries for [`ResourceTable::builtin`], also used as the
/// configuration default.
pub fn builtin_entries() -> Vec<ResourceEntry> {
    vec![
        ResourceEntry::new(
            "biology",
            [
                "Khan Academy Biology (https://www.khanacademy.org/science/biology)",
                "Nature Biology Subject Page (https://www.nature.com/subjects/biology)",
            ],
        ),
        ResourceEntry::new(
            "photosynthesis",
            [
                "Khan Academy - Photosynthesis (https://www.khanacademy.org/science/biology/photosynthesis-in-plants)",
                "Britannica - Photosynthesis (https://www.britannica.com/science/photosynthesis)",
            ],
        ),
        ResourceEntry::new(
            "quantum physics",
            [
                "Stanford Encyclopedia of Philosophy - Quantum Mechanics (https://plato.stanford.edu/entries/qm/)",
                "Khan Academy - Quantum Physics (https://www.khanacademy.org/science/physics/quantum-physics)",
            ],
        ),
        ResourceEntry::new(
            "calculus",
            [
                "Khan Academy Calculus 1 (https://www.khanacademy.org/math/calculus-1)",
                "MIT OCW Single Variable Calculus (https://ocw.mit.edu/courses/18-01sc-single-variable-calculus-fall-2010/)",
            ],
        ),
        ResourceEntry::new(
            "python",
            [
                "Official Python Tutorial (https://docs.python.org/3/tutorial/)",
                "Real Python Website (https://realpython.com/)",
            ],
        ),
        // Joint Entrance Examination (India)
        ResourceEntry::new(
            "jee",
            [
                "Embibe JEE Study Material (https://www.embibe.com/exams/jee-main-study-material/)",
                "Khan Academy JEE Prep (https://www.khanacademy.org/test-prep/jee)",
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_table() -> ResourceTable {
        ResourceTable::new(vec![
            ResourceEntry::new("python", ["py-1", "py-2"]),
            ResourceEntry::new("rust", ["rs-1"]),
            ResourceEntry::new("py", ["short-py"]),
        ])
    }

    #[test]
    fn case_insensitive_match_returns_list_once() {
        let table = ResourceTable::builtin();
        let found = table.lookup("I love PYTHON scripting, python is great");
        assert_eq!(
            found,
            vec![
                "Official Python Tutorial (https://docs.python.org/3/tutorial/)",
                "Real Python Website (https://realpython.com/)",
            ]
        );
    }

    #[test]
    fn no_keywords_yields_empty() {
        let table = ResourceTable::builtin();
        assert!(table.lookup("How do volcanoes form?").is_empty());
    }

    #[test]
    fn empty_query_yields_empty() {
        assert!(ResourceTable::builtin().lookup("").is_empty());
    }

    #[test]
    fn results_follow_table_order() {
        let table = small_table();
        let found = table.lookup("rust or python?");
        assert_eq!(found, vec!["py-1", "py-2", "rs-1", "short-py"]);
    }

    #[test]
    fn substring_matches_inside_words() {
        let table = ResourceTable::builtin();
        let found = table.lookup("Can I take my jeep to the exam?");
        assert_eq!(found.len(), 2);
        assert!(found[0].contains("Embibe"));
    }

    #[test]
    fn multi_word_keyword() {
        let table = ResourceTable::builtin();
        let found = table.lookup("Intro to Quantum Physics please");
        assert_eq!(found.len(), 2);
        assert!(found[0].contains("plato.stanford.edu"));
    }

    #[test]
    fn photosynthesis_has_two_links() {
        let table = ResourceTable::builtin();
        let found = table.lookup("Explain photosynthesis");
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|l| l.to_lowercase().contains("photosynthesis")));
    }

    #[test]
    fn duplicate_keywords_contribute_once() {
        let table = ResourceTable::new(vec![
            ResourceEntry::new("Calculus", ["first"]),
            ResourceEntry::new("calculus", ["second"]),
        ]);
        assert_eq!(table.lookup("calculus"), vec!["first"]);
    }

    #[test]
    fn keywords_are_normalized_and_blank_dropped() {
        let table = ResourceTable::new(vec![
            ResourceEntry::new("  Biology ", ["bio"]),
            ResourceEntry::new("   ", ["never"]),
        ]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.entries()[0].keyword, "biology");
        assert_eq!(table.lookup("BIOLOGY 101"), vec!["bio"]);
    }
}
