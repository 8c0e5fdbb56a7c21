//! Per-session query log feeding the presentation deck.

use super::{ConversationMessage, SessionRecord};
use crate::llm::ChatRole;
use crate::persona::PersonaScores;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

const HOURLY_RATE_USD: f64 = 75.0;
const DEFAULT_FEATURE: &str = "BevGenie AI";
const PENDING_SOLUTION: &str = "Solution being generated...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProblemCategory {
    #[serde(rename = "Data Access")]
    DataAccess,
    Analysis,
    Comparison,
    Trends,
    Reporting,
    Performance,
    Competitive,
    Territory,
    #[serde(rename = "ROI")]
    Roi,
    #[serde(rename = "General Inquiry")]
    General,
}

impl ProblemCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemCategory::DataAccess => "Data Access",
            ProblemCategory::Analysis => "Analysis",
            ProblemCategory::Comparison => "Comparison",
            ProblemCategory::Trends => "Trends",
            ProblemCategory::Reporting => "Reporting",
            ProblemCategory::Performance => "Performance",
            ProblemCategory::Competitive => "Competitive",
            ProblemCategory::Territory => "Territory",
            ProblemCategory::Roi => "ROI",
            ProblemCategory::General => "General Inquiry",
        }
    }

    pub fn minutes_saved(&self) -> u32 {
        match self {
            ProblemCategory::DataAccess => 30,
            ProblemCategory::Analysis => 120,
            ProblemCategory::Comparison => 60,
            ProblemCategory::Trends => 90,
            ProblemCategory::Reporting => 180,
            ProblemCategory::Performance => 45,
            ProblemCategory::Competitive => 240,
            ProblemCategory::Territory => 90,
            ProblemCategory::Roi => 150,
            ProblemCategory::General => 60,
        }
    }

    fn problem_statement(&self, subject: &str) -> String {
        match self {
            ProblemCategory::DataAccess => format!("Difficulty accessing: {}", subject),
            ProblemCategory::Analysis => format!("Need to understand: {}", subject),
            ProblemCategory::Comparison => format!("Unable to compare: {}", subject),
            ProblemCategory::Trends => format!("Tracking trends for: {}", subject),
            ProblemCategory::Reporting => format!("Creating reports on: {}", subject),
            ProblemCategory::Performance => format!("Monitoring performance of: {}", subject),
            ProblemCategory::Competitive => format!("Competitive intelligence needed for: {}", subject),
            ProblemCategory::Territory => format!("Territory analysis needed for: {}", subject),
            ProblemCategory::Roi => format!("Proving value and ROI for: {}", subject),
            ProblemCategory::General => format!("Challenge with: {}", subject),
        }
    }

    fn before_after(&self, feature: &str) -> (String, String) {
        let (before, after) = match self {
            ProblemCategory::DataAccess => (
                "Manually searching through multiple spreadsheets and databases",
                format!("Instant access via {}", feature),
            ),
            ProblemCategory::Analysis => (
                "Hours spent in Excel creating pivot tables and formulas",
                "AI-powered insights delivered in seconds".to_string(),
            ),
            ProblemCategory::Comparison => (
                "Building comparison tables manually across data sources",
                "Side-by-side comparison with one click".to_string(),
            ),
            ProblemCategory::Trends => (
                "Manually tracking data points over time in spreadsheets",
                "Automated trend analysis with predictive insights".to_string(),
            ),
            ProblemCategory::Reporting => (
                "Spending 2-3 hours creating presentation slides",
                "Auto-generated reports in minutes".to_string(),
            ),
            ProblemCategory::Performance => (
                "Waiting for weekly reports from multiple sources",
                "Real-time performance dashboards".to_string(),
            ),
            ProblemCategory::Competitive => (
                "Manual research across news, reports, and databases",
                "Consolidated competitive intelligence dashboard".to_string(),
            ),
            ProblemCategory::Territory => (
                "Analyzing territories manually with static reports",
                "Dynamic territory intelligence with real-time insights".to_string(),
            ),
            ProblemCategory::Roi => (
                "Guessing at value without concrete data",
                "Data-driven ROI calculations with proof points".to_string(),
            ),
            ProblemCategory::General => (
                "Manual, time-consuming process",
                "Automated solution via BevGenie AI".to_string(),
            ),
        };
        (before.to_string(), after)
    }
}

// First match wins, so order matters.
static CATEGORY_RULES: Lazy<Vec<(ProblemCategory, Regex)>> = Lazy::new(|| {
    [
        (ProblemCategory::DataAccess, r"(?i)find|get|show|where|access|need data|view|display"),
        (ProblemCategory::Analysis, r"(?i)why|analyze|understand|explain|insight|breakdown|deep dive"),
        (ProblemCategory::Comparison, r"(?i)compare|versus|vs|difference|better|against"),
        (ProblemCategory::Trends, r"(?i)trend|forecast|predict|future|growth|projection"),
        (ProblemCategory::Reporting, r"(?i)report|export|share|presentation|summary|document"),
        (ProblemCategory::Performance, r"(?i)how is|performing|results|metrics|kpi|measure"),
        (ProblemCategory::Competitive, r"(?i)competitor|competitive|market share|benchmark"),
        (ProblemCategory::Territory, r"(?i)territory|region|area|geographic|market|location"),
        (ProblemCategory::Roi, r"(?i)roi|return|investment|cost|value|savings|prove"),
    ]
    .into_iter()
    .filter_map(|(category, pattern)| Regex::new(pattern).ok().map(|re| (category, re)))
    .collect()
});

static SUBJECT_PREFIX: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?i)^(show me|find|get|how|what|why|where|when|can you|tell me|explain)\s+").ok()
});

pub fn categorize_problem(query: &str) -> ProblemCategory {
    CATEGORY_RULES
        .iter()
        .find(|(_, re)| re.is_match(query))
        .map(|(category, _)| *category)
        .unwrap_or(ProblemCategory::General)
}

fn extract_subject(query: &str) -> String {
    let stripped = match SUBJECT_PREFIX.as_ref() {
        Some(re) => re.replace(query, "").into_owned(),
        None => query.to_string(),
    };
    stripped.trim().trim_end_matches('?').trim().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub query: String,
    pub timestamp: DateTime<Utc>,
    pub context: String,
    pub problem_type: ProblemCategory,
    pub solution_provided: String,
    pub feature_used: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemSolution {
    pub user_question: String,
    pub problem_statement: String,
    pub bev_genie_solution: String,
    pub feature_used: String,
    pub time_saved: u32,
    pub before_state: String,
    pub after_state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoiSummary {
    pub total_minutes_saved: u32,
    /// One decimal place.
    pub hours_saved: String,
    pub cost_saved: u64,
    pub efficiency_gain: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationData {
    pub session_id: String,
    pub persona: PersonaScores,
    pub duration: String,
    pub queries_asked: usize,
    pub actual_questions: Vec<String>,
    pub problem_solutions: Vec<ProblemSolution>,
    pub category_breakdown: BTreeMap<String, usize>,
    pub top_category: String,
    pub roi: RoiSummary,
}

#[derive(Debug, Clone)]
pub struct SessionTracker {
    session_id: String,
    started_at: DateTime<Utc>,
    persona: PersonaScores,
    queries: Vec<UserQuery>,
}

impl SessionTracker {
    pub fn new(session_id: &str, started_at: DateTime<Utc>, persona: PersonaScores) -> Self {
        Self {
            session_id: session_id.to_string(),
            started_at,
            persona,
            queries: Vec::new(),
        }
    }

    /// Rebuild from stored history: every user turn is a query, answered by
    /// the assistant turn that follows it.
    pub fn from_history(record: &SessionRecord, history: &[ConversationMessage]) -> Self {
        let mut tracker = Self::new(&record.session_id, record.created_at, record.persona.clone());
        for message in history {
            match message.role {
                ChatRole::User => {
                    tracker.track_query(&message.content, message.generation_mode.as_str());
                    if let Some(last) = tracker.queries.last_mut() {
                        last.timestamp = message.created_at;
                    }
                }
                ChatRole::Assistant => tracker.update_last_query(&message.content, DEFAULT_FEATURE),
            }
        }
        tracker
    }

    pub fn track_query(&mut self, query: &str, context: &str) {
        self.queries.push(UserQuery {
            query: query.trim().to_string(),
            timestamp: Utc::now(),
            context: context.to_string(),
            problem_type: categorize_problem(query),
            solution_provided: PENDING_SOLUTION.to_string(),
            feature_used: DEFAULT_FEATURE.to_string(),
        });
    }

    pub fn update_last_query(&mut self, solution: &str, feature: &str) {
        if let Some(last) = self.queries.last_mut() {
            last.solution_provided = solution.to_string();
            last.feature_used = feature.to_string();
        }
    }

    pub fn queries(&self) -> &[UserQuery] {
        &self.queries
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn problem_solutions(&self) -> Vec<ProblemSolution> {
        self.queries
            .iter()
            .map(|q| {
                let (before, after) = q.problem_type.before_after(&q.feature_used);
                ProblemSolution {
                    user_question: q.query.clone(),
                    problem_statement: q.problem_type.problem_statement(&extract_subject(&q.query)),
                    bev_genie_solution: q.solution_provided.clone(),
                    feature_used: q.feature_used.clone(),
                    time_saved: q.problem_type.minutes_saved(),
                    before_state: before,
                    after_state: after,
                }
            })
            .collect()
    }

    pub fn category_breakdown(&self) -> BTreeMap<String, usize> {
        let mut breakdown = BTreeMap::new();
        for q in &self.queries {
            *breakdown.entry(q.problem_type.as_str().to_string()).or_insert(0) += 1;
        }
        breakdown
    }

    /// Most frequent category; earliest-asked wins ties.
    pub fn top_category(&self) -> String {
        let breakdown = self.category_breakdown();
        let mut top: Option<(&str, usize)> = None;
        for q in &self.queries {
            let name = q.problem_type.as_str();
            let count = breakdown.get(name).copied().unwrap_or(0);
            if top.map(|(_, c)| count > c).unwrap_or(true) {
                top = Some((name, count));
            }
        }
        top.map(|(name, _)| name.to_string())
            .unwrap_or_else(|| "General".to_string())
    }

    pub fn roi(&self) -> RoiSummary {
        let total: u32 = self.queries.iter().map(|q| q.problem_type.minutes_saved()).sum();
        let hours = f64::from(total) / 60.0;
        RoiSummary {
            total_minutes_saved: total,
            hours_saved: format!("{:.1}", hours),
            cost_saved: (hours * HOURLY_RATE_USD).round() as u64,
            efficiency_gain: ((f64::from(total) / (f64::from(total) + 15.0)) * 100.0).round() as u32,
        }
    }

    pub fn duration(&self, now: DateTime<Utc>) -> String {
        let minutes = (now - self.started_at).num_minutes().max(0);
        match minutes {
            0 => "Less than 1 minute".to_string(),
            1 => "1 minute".to_string(),
            m if m < 60 => format!("{} minutes", m),
            m => {
                let hours = m / 60;
                let rest = m % 60;
                format!(
                    "{} hour{} {} minute{}",
                    hours,
                    if hours > 1 { "s" } else { "" },
                    rest,
                    if rest != 1 { "s" } else { "" }
                )
            }
        }
    }

    pub fn presentation_data(&self, now: DateTime<Utc>) -> PresentationData {
        PresentationData {
            session_id: self.session_id.clone(),
            persona: self.persona.clone(),
            duration: self.duration(now),
            queries_asked: self.queries.len(),
            actual_questions: self.queries.iter().map(|q| q.query.clone()).collect(),
            problem_solutions: self.problem_solutions(),
            category_breakdown: self.category_breakdown(),
            top_category: self.top_category(),
            roi: self.roi(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::GenerationMode;
    use chrono::Duration;

    #[test]
    fn categories_follow_rule_order() {
        assert_eq!(categorize_problem("Show me depletions"), ProblemCategory::DataAccess);
        assert_eq!(categorize_problem("Why did sales drop?"), ProblemCategory::Analysis);
        assert_eq!(categorize_problem("Forecast next quarter"), ProblemCategory::Trends);
        assert_eq!(categorize_problem("Prove the ROI"), ProblemCategory::Roi);
        assert_eq!(categorize_problem("hello"), ProblemCategory::General);
    }

    #[test]
    fn roi_aggregates() {
        let mut tracker = SessionTracker::new("s", Utc::now(), PersonaScores::default());
        tracker.track_query("Show me my accounts", "fresh");
        tracker.track_query("Create a report for my boss", "fresh");
        let roi = tracker.roi();
        assert_eq!(roi.total_minutes_saved, 210);
        assert_eq!(roi.hours_saved, "3.5");
        assert_eq!(roi.cost_saved, 263);
        assert_eq!(roi.efficiency_gain, 93);
    }

    #[test]
    fn rebuilds_from_history() {
        let record = SessionRecord::new("abc");
        let at = Utc::now();
        let msg = |role, content: &str| ConversationMessage {
            role,
            content: content.to_string(),
            generation_mode: GenerationMode::Fresh,
            created_at: at,
        };
        let history = vec![
            msg(ChatRole::User, "Where can I find depletion data?"),
            msg(ChatRole::Assistant, "BevGenie pulls depletions into one view."),
            msg(ChatRole::User, "Why are we losing placements?"),
        ];
        let tracker = SessionTracker::from_history(&record, &history);
        assert_eq!(tracker.queries().len(), 2);
        assert_eq!(tracker.queries()[0].solution_provided, "BevGenie pulls depletions into one view.");
        assert_eq!(tracker.queries()[1].solution_provided, PENDING_SOLUTION);
        let pairs = tracker.problem_solutions();
        assert_eq!(pairs[0].problem_statement, "Difficulty accessing: can I find depletion data");
    }

    #[test]
    fn duration_formatting() {
        let start = Utc::now();
        let tracker = SessionTracker::new("s", start, PersonaScores::default());
        assert_eq!(tracker.duration(start), "Less than 1 minute");
        assert_eq!(tracker.duration(start + Duration::minutes(1)), "1 minute");
        assert_eq!(tracker.duration(start + Duration::minutes(61)), "1 hour 1 minute");
        assert_eq!(tracker.duration(start + Duration::minutes(125)), "2 hours 5 minutes");
    }
}
