//! Per page-type structural guidance for the page prompt.

use super::PageType;
use serde::Serialize;

pub struct PageTemplate {
    pub name: &'static str,
    pub purpose: &'static str,
    pub section_order: &'static [&'static str],
    /// Type-specific top-level fields the renderer understands.
    pub extra_fields: &'static str,
    pub tone: &'static str,
}

impl PageTemplate {
    pub fn for_type(page_type: PageType) -> &'static PageTemplate {
        match page_type {
            PageType::SolutionBrief => &SOLUTION_BRIEF,
            PageType::FeatureShowcase => &FEATURE_SHOWCASE,
            PageType::CaseStudy => &CASE_STUDY,
            PageType::Comparison => &COMPARISON,
            PageType::ImplementationRoadmap => &IMPLEMENTATION_ROADMAP,
            PageType::RoiCalculator => &ROI_CALCULATOR,
        }
    }

    /// Prompt fragment describing this template.
    pub fn render(&self) -> String {
        format!(
            "PAGE TYPE: {}\nPurpose: {}\nSections, in this order: {}\nAdditional top-level fields: {}\nTone: {}",
            self.name,
            self.purpose,
            self.section_order.join(" -> "),
            self.extra_fields,
            self.tone
        )
    }
}

static SOLUTION_BRIEF: PageTemplate = PageTemplate {
    name: "solution_brief",
    purpose: "Address the visitor's specific challenge and show how BevGenie solves it.",
    section_order: &["hero", "feature_grid", "testimonial", "cta"],
    extra_fields: "painPointsAddressed (array of pain-point tags)",
    tone: "Direct and empathetic; lead with the problem, then the outcome.",
};

static FEATURE_SHOWCASE: PageTemplate = PageTemplate {
    name: "feature_showcase",
    purpose: "Highlight the capabilities most relevant to the visitor's focus area.",
    section_order: &["hero", "feature_grid", "comparison_table", "cta"],
    extra_fields: "focusArea (string), featuredFeatures (array of strings)",
    tone: "Concrete and capability-led; every feature tied to a benefit.",
};

static CASE_STUDY: PageTemplate = PageTemplate {
    name: "case_study",
    purpose: "Prove results with a customer story similar to the visitor's business.",
    section_order: &["hero", "metrics", "testimonial", "steps", "cta"],
    extra_fields: "customerName, customerType, challenge (strings)",
    tone: "Evidence first; quantified outcomes, credible voice.",
};

static COMPARISON: PageTemplate = PageTemplate {
    name: "comparison",
    purpose: "Compare BevGenie with the alternatives the visitor is weighing.",
    section_order: &["hero", "comparison_table", "feature_grid", "testimonial", "cta"],
    extra_fields: "competitors (array of strings)",
    tone: "Fair and specific; no disparagement, clear differentiators.",
};

static IMPLEMENTATION_ROADMAP: PageTemplate = PageTemplate {
    name: "implementation_roadmap",
    purpose: "Show how a team gets from sign-up to value, step by step.",
    section_order: &["hero", "steps", "faq", "cta"],
    extra_fields: "estimatedDuration (string)",
    tone: "Reassuring and practical; remove adoption risk.",
};

static ROI_CALCULATOR: PageTemplate = PageTemplate {
    name: "roi_calculator",
    purpose: "Quantify the return the visitor can expect.",
    section_order: &["hero", "metrics", "feature_grid", "cta"],
    extra_fields: "assumptions (array of {label, defaultValue, unit})",
    tone: "Numerical and transparent about assumptions.",
};

/// Plain-text stand-in shown when generation fails and the caller wants something.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackContent {
    pub title: &'static str,
    pub description: &'static str,
}

pub fn fallback_page_content(page_type: PageType) -> FallbackContent {
    match page_type {
        PageType::SolutionBrief => FallbackContent {
            title: "Solutions for Your Beverage Business",
            description: "Discover how BevGenie helps beverage companies overcome their biggest challenges.",
        },
        PageType::FeatureShowcase => FallbackContent {
            title: "BevGenie Platform Features",
            description: "Explore the capabilities that help beverage teams sell and market smarter.",
        },
        PageType::CaseStudy => FallbackContent {
            title: "Customer Success Stories",
            description: "See how beverage companies like yours achieved measurable results with BevGenie.",
        },
        PageType::Comparison => FallbackContent {
            title: "How BevGenie Compares",
            description: "A side-by-side look at BevGenie and the alternatives.",
        },
        PageType::ImplementationRoadmap => FallbackContent {
            title: "Getting Started with BevGenie",
            description: "A clear path from onboarding to measurable value.",
        },
        PageType::RoiCalculator => FallbackContent {
            title: "Calculate Your ROI",
            description: "Estimate the time and revenue BevGenie can return to your team.",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_order_meets_minimums() {
        for page_type in PageType::ALL {
            let template = PageTemplate::for_type(page_type);
            assert_eq!(template.name, page_type.as_str());
            assert!(template.section_order.len() >= page_type.min_sections());
        }
    }

    #[test]
    fn rendered_template_lists_sections() {
        let text = PageTemplate::for_type(PageType::CaseStudy).render();
        assert!(text.contains("hero -> metrics -> testimonial -> steps -> cta"));
    }

    #[test]
    fn every_type_has_fallback_copy() {
        for page_type in PageType::ALL {
            let fallback = fallback_page_content(page_type);
            assert!(fallback.title.len() >= 10);
            assert!(fallback.description.len() >= 20);
        }
    }
}
