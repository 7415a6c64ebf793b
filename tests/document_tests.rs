mod common;

use common::*;
use thread_canvas::core::document::{Document, SectionBody, SectionKind};
use thread_canvas::core::models::SummaryResult;

fn full_summary() -> SummaryResult {
    SummaryResult {
        title: "Release planning".to_string(),
        overview: "Overview text".to_string(),
        key_points: vec!["Point".to_string()],
        decisions: Some(vec!["Ship Friday".to_string()]),
        action_items: Some(vec!["Alice prepares notes".to_string()]),
        follow_ups: vec!["Check QA".to_string()],
        references: Some(vec!["https://wiki.example.com/release".to_string()]),
    }
}

#[test]
fn all_sections_render_in_fixed_order() {
    let doc = Document::assemble(&full_summary(), &context(vec![]));
    assert_eq!(
        doc.section_kinds(),
        vec![
            SectionKind::Overview,
            SectionKind::KeyPoints,
            SectionKind::Decisions,
            SectionKind::ActionItems,
            SectionKind::FollowUps,
            SectionKind::References,
            SectionKind::ThreadLink,
        ]
    );
}

#[test]
fn order_holds_for_every_optional_subset() {
    for mask in 0u8..8 {
        let mut s = full_summary();
        if mask & 1 == 0 {
            s.decisions = None;
        }
        if mask & 2 == 0 {
            s.action_items = Some(vec![]);
        }
        if mask & 4 == 0 {
            s.references = None;
        }

        let kinds = Document::assemble(&s, &context(vec![])).section_kinds();
        let mut sorted = kinds.clone();
        sorted.sort();
        assert_eq!(kinds, sorted, "mask {mask}");
        assert_eq!(kinds.last(), Some(&SectionKind::ThreadLink));
        assert_eq!(kinds.contains(&SectionKind::Decisions), mask & 1 != 0);
        assert_eq!(kinds.contains(&SectionKind::ActionItems), mask & 2 != 0);
        assert_eq!(kinds.contains(&SectionKind::References), mask & 4 != 0);
    }
}

#[test]
fn no_decisions_or_actions_still_keeps_follow_ups_and_link() {
    let doc = Document::assemble(&summary(), &context(vec![]));
    let kinds = doc.section_kinds();
    assert!(!kinds.contains(&SectionKind::Decisions));
    assert!(!kinds.contains(&SectionKind::ActionItems));
    assert!(kinds.contains(&SectionKind::FollowUps));
    assert_eq!(kinds.last(), Some(&SectionKind::ThreadLink));
}

#[test]
fn thread_link_comes_from_fetched_permalink_only() {
    let mut s = full_summary();
    s.references = Some(vec!["https://evil.example.com/fake-thread".to_string()]);
    let doc = Document::assemble(&s, &context(vec![]));

    let link = doc.sections.last().map(|sec| sec.body.clone());
    assert!(matches!(
        link,
        Some(SectionBody::Link { url, .. }) if url == PERMALINK
    ));
}

#[test]
fn markdown_renders_tasks_and_link() {
    let doc = Document::assemble(&full_summary(), &context(vec![]));
    let md = doc.render_markdown();

    assert!(md.starts_with("## Overview\n\nOverview text\n"));
    assert!(md.contains("## Action Items\n\n- [ ] Alice prepares notes\n"));
    assert!(md.contains(&format!("({PERMALINK})")));
    let decisions = md.find("## Decisions").unwrap();
    let follow_ups = md.find("## Follow-ups").unwrap();
    assert!(decisions < follow_ups);
}

#[test]
fn fallback_file_has_title_heading_and_safe_name() {
    let mut s = full_summary();
    s.title = "Q3: plan / review".to_string();
    let doc = Document::assemble(&s, &context(vec![]));

    assert!(doc.render_file().starts_with("# Q3: plan / review\n\n## Overview"));
    assert_eq!(doc.file_name(), "Q3_ plan _ review.md");
}
