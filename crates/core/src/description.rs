//! Typed subset of the Atlassian Document Format used for defect descriptions.

use serde::{Deserialize, Serialize};

use crate::error::DescriptionError;
use crate::model::{ReconciliationRecord, StepStatus};

const SUMMARY_MAX_CHARS: usize = 255;

/// Root `doc` node, version 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "type")]
    doc_type: String,
    version: u32,
    content: Vec<Block>,
}

/// Block-level node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Block {
    /// `heading` with a level in 1..=6.
    Heading {
        /// Heading level.
        attrs: HeadingAttrs,
        /// Heading text.
        content: Vec<Inline>,
    },
    /// `paragraph`.
    Paragraph {
        /// Paragraph text.
        content: Vec<Inline>,
    },
    /// `codeBlock`, rendered verbatim.
    CodeBlock {
        /// Code text.
        content: Vec<Inline>,
    },
    /// `bulletList`.
    BulletList {
        /// List items, never empty.
        content: Vec<ListItem>,
    },
}

/// Attributes of a heading node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingAttrs {
    /// 1..=6.
    pub level: u8,
}

/// Child of a bullet list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ListItem {
    /// `listItem` wrapping block content.
    ListItem {
        /// Item blocks, never empty.
        content: Vec<Block>,
    },
}

/// Inline node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Inline {
    /// `text`, never empty.
    Text {
        /// The text.
        text: String,
        /// Formatting marks.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        marks: Vec<Mark>,
    },
}

/// Inline formatting mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mark {
    /// Bold.
    Strong,
}

impl Inline {
    /// Plain text.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text {
            text: s.into(),
            marks: vec![],
        }
    }

    /// Bold text.
    pub fn strong(s: impl Into<String>) -> Self {
        Self::Text {
            text: s.into(),
            marks: vec![Mark::Strong],
        }
    }
}

impl Block {
    /// Heading holding a single text node.
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Self::Heading {
            attrs: HeadingAttrs { level },
            content: vec![Inline::text(text)],
        }
    }

    /// Paragraph of inline nodes.
    pub fn paragraph(content: Vec<Inline>) -> Self {
        Self::Paragraph { content }
    }

    /// Code block holding `text`.
    pub fn code(text: impl Into<String>) -> Self {
        Self::CodeBlock {
            content: vec![Inline::text(text)],
        }
    }

    /// Bullet list with one paragraph per item.
    pub fn bullets(items: Vec<Vec<Inline>>) -> Self {
        Self::BulletList {
            content: items
                .into_iter()
                .map(|inline| ListItem::ListItem {
                    content: vec![Block::paragraph(inline)],
                })
                .collect(),
        }
    }

    fn validate(&self, path: &str) -> Result<(), DescriptionError> {
        match self {
            Self::Heading { attrs, content } => {
                if !(1..=6).contains(&attrs.level) {
                    return Err(DescriptionError::HeadingLevel(attrs.level));
                }
                validate_inline(content, path)
            }
            Self::Paragraph { content } | Self::CodeBlock { content } => {
                validate_inline(content, path)
            }
            Self::BulletList { content } => {
                if content.is_empty() {
                    return Err(DescriptionError::EmptyNode(path.to_string()));
                }
                for (i, ListItem::ListItem { content }) in content.iter().enumerate() {
                    if content.is_empty() {
                        return Err(DescriptionError::EmptyNode(format!("{path}/item[{i}]")));
                    }
                    for (j, block) in content.iter().enumerate() {
                        block.validate(&format!("{path}/item[{i}]/{j}"))?;
                    }
                }
                Ok(())
            }
        }
    }
}

fn validate_inline(content: &[Inline], path: &str) -> Result<(), DescriptionError> {
    if content.is_empty() {
        return Err(DescriptionError::EmptyNode(path.to_string()));
    }
    for (i, Inline::Text { text, .. }) in content.iter().enumerate() {
        // the tracker rejects empty text nodes outright
        if text.is_empty() {
            return Err(DescriptionError::EmptyText(format!("{path}/text[{i}]")));
        }
    }
    Ok(())
}

impl Document {
    /// Wraps `content` in a `doc` node.
    pub fn new(content: Vec<Block>) -> Self {
        Self {
            doc_type: "doc".to_string(),
            version: 1,
            content,
        }
    }

    /// Top-level blocks.
    pub fn content(&self) -> &[Block] {
        &self.content
    }

    /// Checks the document against the constraints the tracker enforces.
    pub fn validate(&self) -> Result<(), DescriptionError> {
        if self.content.is_empty() {
            return Err(DescriptionError::EmptyNode("doc".to_string()));
        }
        for (i, block) in self.content.iter().enumerate() {
            block.validate(&format!("doc/{i}"))?;
        }
        Ok(())
    }
}

/// One-line defect summary: `[<key>] <title>`, capped at the tracker's limit.
pub fn issue_summary(record: &ReconciliationRecord) -> String {
    let summary = format!("[{}] {}", record.test_case_key, record.title.trim());
    if summary.chars().count() <= SUMMARY_MAX_CHARS {
        return summary;
    }
    summary.chars().take(SUMMARY_MAX_CHARS).collect()
}

/// Structured description of a failing result.
pub fn describe_failure(record: &ReconciliationRecord) -> Document {
    let mut blocks = vec![
        Block::heading(2, "Automated test failure"),
        Block::paragraph(vec![
            Inline::strong("Test case: "),
            Inline::text(record.test_case_key.as_str()),
        ]),
    ];
    if let Some(cycle) = &record.test_cycle_key {
        blocks.push(Block::paragraph(vec![
            Inline::strong("Test cycle: "),
            Inline::text(cycle.as_str()),
        ]));
    }
    blocks.push(Block::paragraph(vec![
        Inline::strong("Status: "),
        Inline::text(record.status.to_string()),
        Inline::text(format!(" after {} ms", record.duration_ms)),
    ]));

    if let Some(err) = record.error.as_deref().filter(|e| !e.trim().is_empty()) {
        blocks.push(Block::heading(3, "Error"));
        blocks.push(Block::code(err));
    }

    if !record.steps.is_empty() {
        blocks.push(Block::heading(3, "Steps"));
        let items = record
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                let label = match step.status_name {
                    StepStatus::Pass => "PASS",
                    StepStatus::Fail => "FAIL",
                };
                let mut line = vec![Inline::strong(format!("{}. {label}", i + 1))];
                if !step.actual_result.is_empty() {
                    line.push(Inline::text(format!(" {}", step.actual_result)));
                }
                line
            })
            .collect();
        blocks.push(Block::bullets(items));
    }

    Document::new(blocks)
}
