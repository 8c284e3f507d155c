//! Document insights turned into chart series, one per tab.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::api::DocumentsApi;
use crate::error::ApiResult;
use crate::models::{DocumentInsights, InsightDocument};

/// Keywords shown on the keyword chart.
pub const TOP_KEYWORDS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InsightTab {
    Keywords,
    Citations,
    Topics,
    Trends,
}

impl InsightTab {
    pub const ALL: [InsightTab; 4] = [
        InsightTab::Keywords,
        InsightTab::Citations,
        InsightTab::Topics,
        InsightTab::Trends,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InsightTab::Keywords => "keywords",
            InsightTab::Citations => "citations",
            InsightTab::Topics => "topics",
            InsightTab::Trends => "trends",
        }
    }
}

impl FromStr for InsightTab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InsightTab::ALL
            .into_iter()
            .find(|tab| tab.as_str() == s)
            .ok_or_else(|| format!("unknown insights tab: {s}"))
    }
}

impl fmt::Display for InsightTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Labels and values for one chart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl ChartSeries {
    fn push(&mut self, label: impl Into<String>, value: f64) {
        self.labels.push(label.into());
        self.values.push(value);
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::from("label,value\n");
        for (label, value) in self.labels.iter().zip(&self.values) {
            let label = if label.contains([',', '"', '\n']) {
                format!("\"{}\"", label.replace('"', "\"\""))
            } else {
                label.clone()
            };
            out.push_str(&format!("{},{}\n", label, value));
        }
        out
    }

    pub fn build(insights: &DocumentInsights, tab: InsightTab) -> Self {
        let mut series = ChartSeries::default();
        match tab {
            InsightTab::Keywords => {
                for keyword in insights.top_keywords(TOP_KEYWORDS) {
                    series.push(keyword.term, keyword.frequency as f64);
                }
            }
            InsightTab::Citations => {
                let grouped = insights.citations_by_year();
                for (year, count) in grouped.counts {
                    series.push(year.to_string(), count as f64);
                }
                if grouped.undated > 0 {
                    series.push("Unknown", grouped.undated as f64);
                }
            }
            InsightTab::Topics => {
                for topic in &insights.topics {
                    series.push(topic.name.clone(), topic.weight);
                }
            }
            InsightTab::Trends => {
                for point in &insights.trends {
                    series.push(point.label.clone(), point.value);
                }
            }
        }
        series
    }
}

/// Charts for the document currently on screen.
#[derive(Debug, Clone, Default)]
pub struct InsightCharts {
    pub document_id: String,
    pub document: InsightDocument,
    pub charts: HashMap<InsightTab, ChartSeries>,
}

impl InsightCharts {
    pub fn chart(&self, tab: InsightTab) -> Option<&ChartSeries> {
        self.charts.get(&tab)
    }
}

#[derive(Clone)]
pub struct InsightsService {
    api: DocumentsApi,
    current: Arc<Mutex<Option<InsightCharts>>>,
}

impl InsightsService {
    pub fn new(api: DocumentsApi) -> Self {
        Self {
            api,
            current: Arc::new(Mutex::new(None)),
        }
    }

    /// Load charts for `document_id`, replacing those of any other document.
    /// Charts already built for the same document are reused.
    pub async fn load(&self, document_id: &str) -> ApiResult<InsightCharts> {
        let cached = self
            .current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .filter(|c| c.document_id == document_id);
        if let Some(charts) = cached {
            debug!("insights: reusing charts for {}", document_id);
            return Ok(charts);
        }

        let insights = self.api.insights(document_id).await?;
        let charts = InsightCharts {
            document_id: document_id.to_string(),
            document: insights.document.clone(),
            charts: InsightTab::ALL
                .into_iter()
                .map(|tab| (tab, ChartSeries::build(&insights, tab)))
                .collect(),
        };
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(charts.clone());
        Ok(charts)
    }

    pub fn clear(&self) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}
