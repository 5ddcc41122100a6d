//! Built-in document, code, and slide templates.
//!
//! Every agent has a template rendition of its output so a project can be
//! worked end to end with no text-generation provider configured.

pub mod code;
pub mod documents;
pub mod slides;

/// Escape text for inclusion in HTML element content or attribute values.
pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Body of the first fenced code block, optionally restricted to languages.
///
/// With an empty `languages` slice any fence matches. Language tags are
/// compared case-insensitively. An unterminated fence yields `None`.
pub fn extract_code_block(text: &str, languages: &[&str]) -> Option<String> {
    let mut lines = text.lines();
    while let Some(line) = lines.next() {
        let trimmed = line.trim_start();
        let Some(tag) = trimmed.strip_prefix("```") else {
            continue;
        };
        let tag = tag.trim().to_ascii_lowercase();
        let wanted = languages.is_empty() || languages.iter().any(|l| *l == tag);

        let mut body = Vec::new();
        let mut closed = false;
        for inner in lines.by_ref() {
            if inner.trim_start().starts_with("```") {
                closed = true;
                break;
            }
            body.push(inner);
        }
        if !closed {
            return None;
        }
        if wanted {
            return Some(body.join("\n"));
        }
    }
    None
}

/// A `##` section of a Markdown document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub body: String,
}

impl Section {
    /// List items (`-`, `*`, or `1.` lines) of the section body.
    pub fn bullets(&self) -> Vec<String> {
        self.body
            .lines()
            .map(str::trim)
            .filter_map(|l| {
                l.strip_prefix("- ")
                    .or_else(|| l.strip_prefix("* "))
                    .or_else(|| {
                        let (num, rest) = l.split_once(". ")?;
                        num.chars().all(|c| c.is_ascii_digit()).then_some(rest)
                    })
            })
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Split a Markdown document into its `##` sections.
///
/// Text before the first `##` heading is ignored, and deeper headings stay
/// inside their section body. Fenced code is skipped when looking for
/// headings.
pub fn markdown_sections(markdown: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current: Option<Section> = None;
    let mut in_fence = false;

    for line in markdown.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
        let heading = (!in_fence)
            .then(|| line.strip_prefix("## "))
            .flatten();

        match heading {
            Some(title) => {
                if let Some(done) = current.take() {
                    sections.push(finish(done));
                }
                current = Some(Section {
                    title: title.trim().to_string(),
                    body: String::new(),
                });
            }
            None => {
                if let Some(section) = current.as_mut() {
                    section.body.push_str(line);
                    section.body.push('\n');
                }
            }
        }
    }
    if let Some(done) = current {
        sections.push(finish(done));
    }
    sections
}

fn finish(mut section: Section) -> Section {
    section.body = section.body.trim().to_string();
    section
}

/// Render items as a Markdown bullet list.
pub fn bullet_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split a requirement into short feature phrases.
///
/// Splits on sentence ends, line breaks, and semicolons. Always returns at
/// least one phrase for non-empty input.
pub fn feature_phrases(requirement: &str) -> Vec<String> {
    let phrases: Vec<String> = requirement
        .split(['.', '\n', ';', '!', '?'])
        .map(|s| s.trim().trim_start_matches(['-', '*']).trim())
        .filter(|s| s.len() > 3)
        .map(|s| {
            let mut chars = s.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .take(8)
        .collect();

    if phrases.is_empty() && !requirement.trim().is_empty() {
        vec![requirement.trim().to_string()]
    } else {
        phrases
    }
}
