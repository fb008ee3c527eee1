//! Prompt construction and citation-aware answer rendering.

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::cite::{parse_citations, ParsedMessage, ResolvedCitation, Segment};
use crate::docs::types::FileNode;
use crate::docs::{display_name, DocumentTree};
use crate::llm::{LlmClient, Message};

/// Tooltip-length cap for quotes in the sources footer.
const QUOTE_PREVIEW_CHARS: usize = 30;

const CITATION_INSTRUCTION: &str = "Give a complete, natural answer. Whenever a sentence relies on \
a specific passage of the knowledge base, end it with a citation made of double brackets around \
the file name and the quoted passage, copied verbatim, for example: \
[[Chapter 1 Overview.md:Reading passages are mostly taken from academic journals]]. \
Use [[file name]] alone when citing a whole file.";

/// An assistant answer with its citations resolved against the tree.
#[derive(Debug, Clone)]
pub struct Answer {
    pub question: String,
    pub parsed: ParsedMessage,
    pub citations: Vec<ResolvedCitation>,
    pub answered_at: DateTime<Utc>,
}

impl Answer {
    pub fn new(question: &str, text: &str, tree: &DocumentTree) -> Self {
        let parsed = parse_citations(text);
        let citations = parsed.resolve(tree);
        Self {
            question: question.to_string(),
            parsed,
            citations,
            answered_at: Utc::now(),
        }
    }

    pub fn citation(&self, sequence_index: usize) -> Option<&ResolvedCitation> {
        self.citations
            .iter()
            .find(|c| c.token.sequence_index == sequence_index)
    }
}

/// System context: citation format, the selected documents' text, and the tree layout.
pub fn build_context(tree: &DocumentTree, selected: &[&FileNode]) -> String {
    let mut context = String::from("You are the assistant of a creator's knowledge base.\n");
    context.push_str(CITATION_INSTRUCTION);
    context.push_str("\n\n");

    if !selected.is_empty() {
        context.push_str("The user is asking about these files:\n");
        for file in selected {
            context.push_str(&format!("- \"{}\" (type: {})\n", file.name, file.kind.as_str()));
            if let Some(text) = file.text() {
                context.push_str(&format!("  File content:\n{}\n\n", text));
            }
        }
    }

    let layout: Vec<serde_json::Value> = tree
        .roots()
        .iter()
        .map(|n| serde_json::json!({ "name": n.name, "type": n.kind.as_str() }))
        .collect();
    context.push_str("File structure:\n");
    context.push_str(&serde_json::to_string_pretty(&layout).unwrap_or_default());
    context
}

/// Documents to put in the context when the user names none: the one the
/// channel is currently viewing, if it is still in the tree.
pub fn default_selection<'a>(tree: &'a DocumentTree, active: Option<&str>) -> Vec<&'a FileNode> {
    active
        .and_then(|id| tree.find_by_id(id))
        .filter(|node| !node.is_folder())
        .into_iter()
        .collect()
}

/// Ask the LLM and resolve the citations in its reply.
pub async fn ask(
    llm: &LlmClient,
    tree: &DocumentTree,
    question: &str,
    selected: &[&FileNode],
) -> Result<Answer> {
    let messages = vec![
        Message::system(build_context(tree, selected)),
        Message::user(question),
    ];
    let reply = llm.chat(&messages).await?;
    let answer = Answer::new(question, &reply, tree);
    info!(
        citations = answer.citations.len(),
        unresolved = answer.citations.iter().filter(|c| !c.is_actionable()).count(),
        "answer parsed"
    );
    Ok(answer)
}

/// Replace citation tokens with numbered markers and append a sources footer.
/// Actionable markers are bold, unresolved ones stay plain.
pub fn render_answer(answer: &Answer) -> String {
    let mut out = String::new();
    for segment in &answer.parsed.segments {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Citation(token) => {
                let actionable = answer
                    .citation(token.sequence_index)
                    .is_some_and(|c| c.is_actionable());
                if actionable {
                    out.push_str(&format!("**[{}]**", token.sequence_index));
                } else {
                    out.push_str(&format!("[{}]", token.sequence_index));
                }
            }
        }
    }

    if !answer.citations.is_empty() {
        out.push_str("\n\n**Sources:**\n");
        for c in &answer.citations {
            let name = display_name(&c.token.source_name);
            let line = match (&c.target, c.token.quoted_span.as_deref()) {
                (None, _) => format!("{}. ~~{}~~ (not in the knowledge base)\n", c.token.sequence_index, name),
                (Some(_), Some(quote)) if !quote.trim().is_empty() => format!(
                    "{}. {} — “{}”\n",
                    c.token.sequence_index,
                    name,
                    preview(quote.trim(), QUOTE_PREVIEW_CHARS)
                ),
                (Some(_), _) => format!("{}. {}\n", c.token.sequence_index, name),
            };
            out.push_str(&line);
        }
    }
    out
}

fn preview(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let cut: String = s.chars().take(max_chars).collect();
    format!("{}...", cut)
}
