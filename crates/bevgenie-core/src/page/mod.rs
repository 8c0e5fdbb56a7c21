//! Page specification: the JSON artifact handed to the renderer.

mod generator;
mod templates;
mod validation;

pub use generator::{
    enhance_page_with_context, estimate_generation_time, extract_json_object, page_cache_key,
    InteractionContext, PageGenerationRequest, PageGenerationResponse, PageGenerator,
    MAX_PAGE_RETRIES,
};
pub use templates::{fallback_page_content, FallbackContent, PageTemplate};
pub use validation::{parse_page_value, validate_page_spec, ValidationRules, VALIDATION_RULES};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    SolutionBrief,
    FeatureShowcase,
    CaseStudy,
    Comparison,
    ImplementationRoadmap,
    RoiCalculator,
}

impl PageType {
    pub const ALL: [PageType; 6] = [
        PageType::SolutionBrief,
        PageType::FeatureShowcase,
        PageType::CaseStudy,
        PageType::Comparison,
        PageType::ImplementationRoadmap,
        PageType::RoiCalculator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PageType::SolutionBrief => "solution_brief",
            PageType::FeatureShowcase => "feature_showcase",
            PageType::CaseStudy => "case_study",
            PageType::Comparison => "comparison",
            PageType::ImplementationRoadmap => "implementation_roadmap",
            PageType::RoiCalculator => "roi_calculator",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    pub fn min_sections(&self) -> usize {
        match self {
            PageType::CaseStudy | PageType::Comparison => 5,
            _ => 4,
        }
    }
}

/// Button target. Unknown strings deserialize to `Other` and fail validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CtaAction {
    ScheduleDemo,
    Download,
    Contact,
    LearnMore,
    Replicate,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CtaButton {
    pub text: String,
    pub action: Option<CtaAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HeroSection {
    pub headline: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subheadline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cta_button: Option<CtaButton>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Feature {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeatureGridSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<u8>,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TestimonialSection {
    pub quote: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A comparison cell: either a check mark or free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComparisonValue {
    Flag(bool),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComparisonRow {
    pub feature: String,
    pub values: Vec<ComparisonValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComparisonTableSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<ComparisonRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CtaSection {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub buttons: Vec<CtaButton>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaqItem {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaqSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub items: Vec<FaqItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metric {
    pub value: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub metrics: Vec<Metric>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Step {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepsSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub steps: Vec<Step>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Insight {
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualKind {
    HighlightBox,
    CaseStudy,
    Example,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualContent {
    #[serde(rename = "type")]
    pub kind: VisualKind,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenCtaKind {
    Primary,
    Secondary,
    Tertiary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenCtaAction {
    Form,
    NewSection,
    Chat,
    Explore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenCta {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: ScreenCtaKind,
    pub action: ScreenCtaAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

/// Full-viewport layout combining headline, insights, stats and calls to action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SingleScreenSection {
    pub headline: String,
    pub subtitle: String,
    pub insights: Vec<Insight>,
    pub stats: Vec<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual_content: Option<VisualContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub how_it_works: Vec<String>,
    pub ctas: Vec<ScreenCta>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageSection {
    Hero(HeroSection),
    FeatureGrid(FeatureGridSection),
    Testimonial(TestimonialSection),
    ComparisonTable(ComparisonTableSection),
    Cta(CtaSection),
    Faq(FaqSection),
    Metrics(MetricsSection),
    Steps(StepsSection),
    SingleScreen(SingleScreenSection),
}

impl PageSection {
    pub fn tag(&self) -> &'static str {
        match self {
            PageSection::Hero(_) => "hero",
            PageSection::FeatureGrid(_) => "feature_grid",
            PageSection::Testimonial(_) => "testimonial",
            PageSection::ComparisonTable(_) => "comparison_table",
            PageSection::Cta(_) => "cta",
            PageSection::Faq(_) => "faq",
            PageSection::Metrics(_) => "metrics",
            PageSection::Steps(_) => "steps",
            PageSection::SingleScreen(_) => "single_screen",
        }
    }
}

/// A generated landing page. Type-specific extras (pain points addressed,
/// competitors, ROI assumptions, ...) ride along in `metadata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BevGeniePage {
    #[serde(rename = "type")]
    pub page_type: PageType,
    pub title: String,
    pub description: String,
    pub sections: Vec<PageSection>,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}
