//! Structural parsing and rule validation of page specifications.
//!
//! Both entry points are pure: the same input always yields the same errors.

use super::{
    BevGeniePage, CtaAction, CtaButton, PageSection, PageType,
};
use serde_json::{Map, Value};

/// Inclusive bounds, in characters for strings and in items for lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min: usize,
    pub max: usize,
}

const fn b(min: usize, max: usize) -> Bounds {
    Bounds { min, max }
}

#[derive(Debug, Clone, Copy)]
pub struct ValidationRules {
    pub page_title: Bounds,
    pub page_description: Bounds,
    pub hero_headline: Bounds,
    pub hero_subheadline: Bounds,
    pub feature_count: Bounds,
    pub feature_title: Bounds,
    pub feature_description: Bounds,
    pub testimonial_quote: Bounds,
    pub testimonial_author: Bounds,
    pub comparison_min_headers: usize,
    pub comparison_rows: Bounds,
    pub comparison_feature: Bounds,
    pub cta_title: Bounds,
    pub cta_buttons: Bounds,
    pub faq_items: Bounds,
    pub faq_question: Bounds,
    pub faq_answer: Bounds,
    pub metrics_count: Bounds,
    pub metric_value: Bounds,
    pub steps_count: Bounds,
    pub step_title: Bounds,
    pub step_description: Bounds,
    pub screen_headline: Bounds,
    pub screen_insights: Bounds,
    pub screen_max_stats: usize,
    pub screen_ctas: Bounds,
}

pub const VALIDATION_RULES: ValidationRules = ValidationRules {
    page_title: b(10, 120),
    page_description: b(20, 500),
    hero_headline: b(10, 100),
    hero_subheadline: b(20, 150),
    feature_count: b(2, 6),
    feature_title: b(5, 50),
    feature_description: b(10, 150),
    testimonial_quote: b(20, 300),
    testimonial_author: b(2, 50),
    comparison_min_headers: 2,
    comparison_rows: b(3, 12),
    comparison_feature: b(5, 50),
    cta_title: b(10, 100),
    cta_buttons: b(1, 3),
    faq_items: b(2, 8),
    faq_question: b(10, 100),
    faq_answer: b(20, 500),
    metrics_count: b(1, 5),
    metric_value: b(1, 20),
    steps_count: b(2, 10),
    step_title: b(5, 50),
    step_description: b(10, 200),
    screen_headline: b(10, 100),
    screen_insights: b(1, 6),
    screen_max_stats: 4,
    screen_ctas: b(1, 4),
};

const SECTION_TAGS: [&str; 9] = [
    "hero",
    "feature_grid",
    "testimonial",
    "comparison_table",
    "cta",
    "faq",
    "metrics",
    "steps",
    "single_screen",
];

fn check_text(errors: &mut Vec<String>, label: &str, value: &str, bounds: Bounds) {
    let len = value.trim().chars().count();
    if len == 0 {
        errors.push(format!("Missing {}", label.to_lowercase()));
    } else if len < bounds.min {
        errors.push(format!("{} too short (min {} chars)", label, bounds.min));
    } else if len > bounds.max {
        errors.push(format!("{} too long (max {} chars)", label, bounds.max));
    }
}

fn check_count(errors: &mut Vec<String>, label: &str, count: usize, bounds: Bounds) {
    if count < bounds.min {
        errors.push(format!("Too few {} (min {})", label, bounds.min));
    } else if count > bounds.max {
        errors.push(format!("Too many {} (max {})", label, bounds.max));
    }
}

fn check_buttons(errors: &mut Vec<String>, buttons: &[CtaButton]) {
    for (i, button) in buttons.iter().enumerate() {
        if button.text.trim().is_empty() {
            errors.push(format!("Button {}: Missing text", i));
        }
        match button.action {
            None => errors.push(format!("Button {}: Missing action", i)),
            Some(CtaAction::Other) => errors.push(format!("Button {}: Unsupported action", i)),
            Some(_) => {}
        }
    }
}

fn validate_section(section: &PageSection) -> Vec<String> {
    let r = &VALIDATION_RULES;
    let mut errors = Vec::new();
    match section {
        PageSection::Hero(s) => {
            check_text(&mut errors, "Headline", &s.headline, r.hero_headline);
            if let Some(sub) = &s.subheadline {
                check_text(&mut errors, "Subheadline", sub, r.hero_subheadline);
            }
            if let Some(button) = &s.cta_button {
                check_buttons(&mut errors, std::slice::from_ref(button));
            }
        }
        PageSection::FeatureGrid(s) => {
            check_count(&mut errors, "features", s.features.len(), r.feature_count);
            if let Some(columns) = s.columns {
                if !(2..=4).contains(&columns) {
                    errors.push(format!("Columns must be 2, 3 or 4 (got {})", columns));
                }
            }
            for (i, f) in s.features.iter().enumerate() {
                let mut inner = Vec::new();
                check_text(&mut inner, "Title", &f.title, r.feature_title);
                check_text(&mut inner, "Description", &f.description, r.feature_description);
                errors.extend(inner.into_iter().map(|e| format!("Feature {}: {}", i, e)));
            }
        }
        PageSection::Testimonial(s) => {
            check_text(&mut errors, "Quote", &s.quote, r.testimonial_quote);
            check_text(&mut errors, "Author", &s.author, r.testimonial_author);
        }
        PageSection::ComparisonTable(s) => {
            if s.headers.len() < r.comparison_min_headers {
                errors.push(format!(
                    "Too few headers (min {})",
                    r.comparison_min_headers
                ));
            }
            check_count(&mut errors, "rows", s.rows.len(), r.comparison_rows);
            for (i, row) in s.rows.iter().enumerate() {
                let mut inner = Vec::new();
                check_text(&mut inner, "Feature", &row.feature, r.comparison_feature);
                errors.extend(inner.into_iter().map(|e| format!("Row {}: {}", i, e)));
            }
        }
        PageSection::Cta(s) => {
            check_text(&mut errors, "Title", &s.title, r.cta_title);
            check_count(&mut errors, "buttons", s.buttons.len(), r.cta_buttons);
            check_buttons(&mut errors, &s.buttons);
        }
        PageSection::Faq(s) => {
            check_count(&mut errors, "items", s.items.len(), r.faq_items);
            for (i, item) in s.items.iter().enumerate() {
                let mut inner = Vec::new();
                check_text(&mut inner, "Question", &item.question, r.faq_question);
                check_text(&mut inner, "Answer", &item.answer, r.faq_answer);
                errors.extend(inner.into_iter().map(|e| format!("Item {}: {}", i, e)));
            }
        }
        PageSection::Metrics(s) => {
            check_count(&mut errors, "metrics", s.metrics.len(), r.metrics_count);
            for (i, m) in s.metrics.iter().enumerate() {
                let mut inner = Vec::new();
                check_text(&mut inner, "Value", &m.value, r.metric_value);
                if m.label.trim().is_empty() {
                    inner.push("Missing label".to_string());
                }
                errors.extend(inner.into_iter().map(|e| format!("Metric {}: {}", i, e)));
            }
        }
        PageSection::Steps(s) => {
            check_count(&mut errors, "steps", s.steps.len(), r.steps_count);
            for (i, step) in s.steps.iter().enumerate() {
                let mut inner = Vec::new();
                check_text(&mut inner, "Title", &step.title, r.step_title);
                check_text(&mut inner, "Description", &step.description, r.step_description);
                errors.extend(inner.into_iter().map(|e| format!("Step {}: {}", i, e)));
            }
        }
        PageSection::SingleScreen(s) => {
            check_text(&mut errors, "Headline", &s.headline, r.screen_headline);
            check_count(&mut errors, "insights", s.insights.len(), r.screen_insights);
            if s.stats.len() > r.screen_max_stats {
                errors.push(format!("Too many stats (max {})", r.screen_max_stats));
            }
            check_count(&mut errors, "calls to action", s.ctas.len(), r.screen_ctas);
        }
    }
    errors
}

/// Rule validation of an already-typed page. Empty result means valid.
pub fn validate_page_spec(page: &BevGeniePage) -> Vec<String> {
    let r = &VALIDATION_RULES;
    let mut errors = Vec::new();

    check_text(&mut errors, "Title", &page.title, r.page_title);
    check_text(&mut errors, "Description", &page.description, r.page_description);

    let min = page.page_type.min_sections();
    if page.sections.len() < min {
        errors.push(format!(
            "Page must contain at least {} sections (found {})",
            min,
            page.sections.len()
        ));
    }

    for (i, section) in page.sections.iter().enumerate() {
        errors.extend(
            validate_section(section)
                .into_iter()
                .map(|e| format!("Section {} ({}): {}", i, section.tag(), e)),
        );
    }
    errors
}

/// Parse untyped model output into a page and validate it.
///
/// Unknown section tags and malformed sections are reported as errors
/// alongside rule violations, so the caller can feed all of them back.
pub fn parse_page_value(value: &Value) -> Result<BevGeniePage, Vec<String>> {
    let Some(obj) = value.as_object() else {
        return Err(vec!["Page specification must be a JSON object".to_string()]);
    };

    let text = |key: &str| {
        obj.get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .filter(|s| !s.trim().is_empty())
    };
    let (Some(type_str), Some(title), Some(description)) =
        (text("type"), text("title"), text("description"))
    else {
        return Err(vec![
            "Missing required fields: type, title, or description".to_string()
        ]);
    };
    let Some(page_type) = PageType::from_str(&type_str) else {
        return Err(vec![format!("Unknown page type: {}", type_str)]);
    };

    let mut errors = Vec::new();
    let mut sections = Vec::new();
    match obj.get("sections") {
        None | Some(Value::Null) => {}
        Some(Value::Array(raw_sections)) => {
            for (i, raw) in raw_sections.iter().enumerate() {
                let tag = raw.get("type").and_then(Value::as_str);
                match tag {
                    None => errors.push(format!("Section {}: Missing section type", i)),
                    Some(tag) if !SECTION_TAGS.contains(&tag) => {
                        errors.push(format!("Section {}: Unknown section type: {}", i, tag))
                    }
                    Some(tag) => match serde_json::from_value::<PageSection>(raw.clone()) {
                        Ok(section) => sections.push(section),
                        Err(e) => errors.push(format!(
                            "Section {} ({}): Malformed section: {}",
                            i, tag, e
                        )),
                    },
                }
            }
        }
        Some(_) => errors.push("Sections must be an array".to_string()),
    }

    let metadata: Map<String, Value> = obj
        .iter()
        .filter(|(k, _)| !matches!(k.as_str(), "type" | "title" | "description" | "sections"))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let page = BevGeniePage {
        page_type,
        title,
        description,
        sections,
        metadata,
    };

    // A section that failed to parse is missing from `page.sections`; count it
    // against the minimum only once.
    let rule_errors = validate_page_spec(&page);
    if errors.is_empty() {
        errors = rule_errors;
    } else {
        errors.extend(
            rule_errors
                .into_iter()
                .filter(|e| !e.starts_with("Page must contain at least")),
        );
    }

    if errors.is_empty() {
        Ok(page)
    } else {
        Err(errors)
    }
}
