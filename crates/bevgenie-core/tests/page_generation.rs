//! Integration test: page generation retry loop.
//!
//! Verifies that:
//! 1. Validation errors from one attempt are appended to the next prompt.
//! 2. The loop stops after two retries (three model calls).
//! 3. A failed model call retries without adding feedback.
//! 4. Batches and variants produce one response per request.

mod common;

use bevgenie_core::page::{PageGenerationRequest, MAX_PAGE_RETRIES};
use bevgenie_core::{PageGenerator, PageType, PersonaScores};
use common::{valid_page, Scripted, ScriptedModel};
use std::sync::Arc;

const FEEDBACK_MARKER: &str = "[Previous attempt had validation issues:";

fn request(page_type: PageType) -> PageGenerationRequest {
    PageGenerationRequest {
        user_message: "How do I see what happens on shelf?".to_string(),
        page_type: Some(page_type),
        persona: Some(PersonaScores::default()),
        ..Default::default()
    }
}

fn page_without_sections() -> Scripted {
    let mut page = valid_page("solution_brief");
    page.as_object_mut().unwrap().remove("sections");
    Scripted::Text(page.to_string())
}

#[tokio::test]
async fn missing_sections_are_fed_back_on_the_second_attempt() {
    let model = Arc::new(
        ScriptedModel::healthy().with_pages(vec![page_without_sections()]),
    );
    let generator = PageGenerator::new(model.clone(), 4000);

    let response = generator.generate_page_spec(&request(PageType::SolutionBrief)).await;

    assert!(response.success, "{:?}", response.error);
    assert_eq!(response.retry_count, 1);
    let prompts = model.page_user_prompts();
    assert_eq!(prompts.len(), 2);
    assert!(!prompts[0].contains(FEEDBACK_MARKER));
    let feedback = &prompts[1][prompts[1].find(FEEDBACK_MARKER).expect("feedback appended")..];
    assert!(feedback.contains("sections"), "{feedback}");
}

#[tokio::test]
async fn retries_are_bounded() {
    let model = Arc::new(ScriptedModel::new(
        Scripted::Text("unused".to_string()),
        page_without_sections(),
    ));
    let generator = PageGenerator::new(model.clone(), 4000);

    let response = generator.generate_page_spec(&request(PageType::SolutionBrief)).await;

    assert!(!response.success);
    assert!(response.page.is_none());
    assert_eq!(response.retry_count, MAX_PAGE_RETRIES);
    assert_eq!(model.page_calls(), 3);
    let error = response.error.unwrap();
    assert!(error.starts_with("Validation failed after 2 retries:"), "{error}");
    let fallback = response.fallback.expect("fallback copy on failure");
    assert_eq!(fallback.title, "Solutions for Your Beverage Business");
}

#[tokio::test]
async fn failed_call_retries_without_new_feedback() {
    let model = Arc::new(
        ScriptedModel::healthy().with_pages(vec![Scripted::Fail, Scripted::Text("no json here".into())]),
    );
    let generator = PageGenerator::new(model.clone(), 4000);

    let response = generator.generate_page_spec(&request(PageType::SolutionBrief)).await;

    assert!(response.success);
    assert_eq!(response.retry_count, 2);
    assert!(model
        .page_user_prompts()
        .iter()
        .all(|p| !p.contains(FEEDBACK_MARKER)));
}

#[tokio::test]
async fn wrong_page_type_counts_as_invalid() {
    let model = Arc::new(ScriptedModel::new(
        Scripted::Text("unused".to_string()),
        Scripted::Text(valid_page("case_study").to_string()),
    ));
    let generator = PageGenerator::new(model.clone(), 4000);

    let response = generator.generate_page_spec(&request(PageType::Comparison)).await;
    assert!(!response.success);
    let prompts = model.page_user_prompts();
    assert!(prompts[1].contains("Expected page type comparison, got case_study"));
}

#[tokio::test]
async fn batch_and_variants_return_one_response_each() {
    let model = Arc::new(ScriptedModel::new(
        Scripted::Text("unused".to_string()),
        Scripted::Text(valid_page("case_study").to_string()),
    ));
    let generator = PageGenerator::new(model.clone(), 4000);

    let responses = generator
        .generate_pages_batch(&[request(PageType::CaseStudy), request(PageType::CaseStudy)])
        .await;
    assert_eq!(responses.len(), 2);
    assert!(responses.iter().all(|r| r.success));

    let variants = generator
        .generate_page_variants(&request(PageType::CaseStudy), 3)
        .await;
    assert_eq!(variants.len(), 3);
    assert_eq!(model.page_calls(), 5);
}
