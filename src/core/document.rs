//! Document assembly: turns a [`SummaryResult`] into ordered sections.
//!
//! Section order is fixed: Overview, Key Points, Decisions, Action Items, Follow-ups,
//! References, Thread Link. Empty optional sections are omitted. The thread link is
//! always last and comes from the fetched permalink, never from model output.

use super::models::{SummaryResult, ThreadContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SectionKind {
    Overview,
    KeyPoints,
    Decisions,
    ActionItems,
    FollowUps,
    References,
    ThreadLink,
}

impl SectionKind {
    #[must_use]
    pub fn heading(self) -> &'static str {
        match self {
            Self::Overview => "Overview",
            Self::KeyPoints => "Key Points",
            Self::Decisions => "Decisions",
            Self::ActionItems => "Action Items",
            Self::FollowUps => "Follow-ups",
            Self::References => "References",
            Self::ThreadLink => "Original Thread",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionBody {
    Paragraph(String),
    Bullets(Vec<String>),
    Tasks(Vec<String>),
    Link { label: String, url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    pub body: SectionBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub sections: Vec<Section>,
}

impl Document {
    #[must_use]
    pub fn assemble(summary: &SummaryResult, context: &ThreadContext) -> Self {
        let mut sections = vec![
            Section {
                kind: SectionKind::Overview,
                body: SectionBody::Paragraph(summary.overview.trim().to_string()),
            },
            Section {
                kind: SectionKind::KeyPoints,
                body: SectionBody::Bullets(clean_items(&summary.key_points)),
            },
        ];

        if let Some(decisions) = non_empty(summary.decisions.as_deref()) {
            sections.push(Section {
                kind: SectionKind::Decisions,
                body: SectionBody::Bullets(decisions),
            });
        }

        if let Some(actions) = non_empty(summary.action_items.as_deref()) {
            sections.push(Section {
                kind: SectionKind::ActionItems,
                body: SectionBody::Tasks(actions),
            });
        }

        sections.push(Section {
            kind: SectionKind::FollowUps,
            body: SectionBody::Bullets(clean_items(&summary.follow_ups)),
        });

        if let Some(references) = non_empty(summary.references.as_deref()) {
            sections.push(Section {
                kind: SectionKind::References,
                body: SectionBody::Bullets(references),
            });
        }

        sections.push(Section {
            kind: SectionKind::ThreadLink,
            body: SectionBody::Link {
                label: "Open the original Slack thread".to_string(),
                url: context.permalink.clone(),
            },
        });

        Self {
            title: summary.title.trim().to_string(),
            sections,
        }
    }

    #[must_use]
    pub fn section_kinds(&self) -> Vec<SectionKind> {
        self.sections.iter().map(|s| s.kind).collect()
    }

    /// Canvas body. The title is passed to Slack separately.
    #[must_use]
    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            if section.kind == SectionKind::ThreadLink {
                out.push_str("---\n");
            }
            out.push_str("## ");
            out.push_str(section.kind.heading());
            out.push_str("\n\n");
            render_body(&section.body, &mut out);
            out.push('\n');
        }
        out.trim_end().to_string() + "\n"
    }

    /// Plain-file equivalent of the canvas, with the title as a top-level heading.
    #[must_use]
    pub fn render_file(&self) -> String {
        format!("# {}\n\n{}", self.title, self.render_markdown())
    }

    /// File name for the fallback upload, derived from the title.
    #[must_use]
    pub fn file_name(&self) -> String {
        let stem: String = self
            .title
            .chars()
            .map(|c| {
                if matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || c.is_control() {
                    '_'
                } else {
                    c
                }
            })
            .collect();
        let stem = stem.trim();
        if stem.is_empty() {
            "thread-summary.md".to_string()
        } else {
            format!("{stem}.md")
        }
    }
}

fn render_body(body: &SectionBody, out: &mut String) {
    match body {
        SectionBody::Paragraph(text) => {
            out.push_str(text);
            out.push('\n');
        }
        SectionBody::Bullets(items) => {
            for item in items {
                out.push_str("- ");
                out.push_str(item);
                out.push('\n');
            }
        }
        SectionBody::Tasks(items) => {
            for item in items {
                out.push_str("- [ ] ");
                out.push_str(item);
                out.push('\n');
            }
        }
        SectionBody::Link { label, url } => {
            out.push_str(&format!("[{label}]({url})\n"));
        }
    }
}

fn clean_items(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|i| i.trim())
        .filter(|i| !i.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn non_empty(items: Option<&[String]>) -> Option<Vec<String>> {
    items.map(clean_items).filter(|v| !v.is_empty())
}
