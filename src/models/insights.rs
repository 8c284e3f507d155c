//! Chart data for a single document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightDocument {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub term: String,
    pub frequency: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub label: String,
    pub value: f64,
}

/// Citation counts keyed by year, ascending. Citations without a year are
/// counted separately.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationsByYear {
    pub counts: BTreeMap<i32, u32>,
    pub undated: u32,
}

/// `GET /documents/{id}/insights` body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentInsights {
    #[serde(default)]
    pub document: InsightDocument,
    #[serde(default)]
    pub keywords: Vec<Keyword>,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default)]
    pub topics: Vec<Topic>,
    #[serde(default)]
    pub trends: Vec<TrendPoint>,
}

impl DocumentInsights {
    /// The `limit` most frequent keywords, most frequent first, ties by term.
    pub fn top_keywords(&self, limit: usize) -> Vec<Keyword> {
        let mut keywords = self.keywords.clone();
        keywords.sort_by(|a, b| b.frequency.cmp(&a.frequency).then_with(|| a.term.cmp(&b.term)));
        keywords.truncate(limit);
        keywords
    }

    pub fn citations_by_year(&self) -> CitationsByYear {
        let mut grouped = CitationsByYear::default();
        for citation in &self.citations {
            match citation.year {
                Some(year) => *grouped.counts.entry(year).or_insert(0) += 1,
                None => grouped.undated += 1,
            }
        }
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_keywords_ranks_and_truncates() {
        let insights = DocumentInsights {
            keywords: vec![
                Keyword { term: "protein".into(), frequency: 3 },
                Keyword { term: "cell".into(), frequency: 9 },
                Keyword { term: "assay".into(), frequency: 3 },
            ],
            ..Default::default()
        };
        let top = insights.top_keywords(2);
        assert_eq!(top[0].term, "cell");
        assert_eq!(top[1].term, "assay");
        assert_eq!(top.len(), 2);
    }

    #[test]
    fn test_citations_grouped_by_year() {
        let insights = DocumentInsights {
            citations: vec![
                Citation { title: None, year: Some(2020) },
                Citation { title: None, year: Some(2018) },
                Citation { title: None, year: Some(2020) },
                Citation { title: None, year: None },
            ],
            ..Default::default()
        };
        let grouped = insights.citations_by_year();
        assert_eq!(grouped.counts.iter().collect::<Vec<_>>(), vec![(&2018, &1), (&2020, &2)]);
        assert_eq!(grouped.undated, 1);
    }
}
