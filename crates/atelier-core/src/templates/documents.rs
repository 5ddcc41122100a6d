//! Markdown document templates.

use atelier_types::project::Project;

use super::{bullet_list, feature_phrases, markdown_sections};

/// Mike's delivery plan.
pub fn plan(project: &Project) -> String {
    let features = feature_phrases(&project.requirement);
    format!(
        "# Project Plan: {name}\n\n\
         ## Objective\n\n{requirement}\n\n\
         ## Scope\n\n{scope}\n\n\
         ## Team Assignments\n\n\
         - Emma (Product Manager): product requirements and user stories\n\
         - Bob (Architect): architecture and file layout\n\
         - Alex (Engineer): implementation of the web application\n\
         - David (Data Analyst): project report and presentation\n\n\
         ## Milestones\n\n\
         1. Requirements agreed\n\
         2. Architecture reviewed\n\
         3. Working prototype delivered\n\
         4. Results presented\n\n\
         ## Risks\n\n\
         - Requirements may change during implementation\n\
         - Browser compatibility of the prototype\n",
        name = project.name,
        requirement = project.requirement,
        scope = bullet_list(&features),
    )
}

/// Emma's product requirements document.
pub fn prd(project: &Project, plan: Option<&str>) -> String {
    let features = feature_phrases(&project.requirement);
    let milestones = plan
        .map(markdown_sections)
        .unwrap_or_default()
        .into_iter()
        .find(|s| s.title.eq_ignore_ascii_case("Milestones"))
        .map(|s| s.bullets())
        .unwrap_or_default();

    let mut doc = format!(
        "# Product Requirements: {name}\n\n\
         ## Overview\n\n{requirement}\n\n\
         ## Goals\n\n\
         - Deliver a usable first version of {name}\n\
         - Keep the interface simple and responsive\n\n\
         ## Features\n\n{features}\n\n\
         ## Non-Functional Requirements\n\n\
         - Runs in any modern browser without a build step\n\
         - Loads in under two seconds on a typical connection\n\
         - Accessible keyboard navigation\n",
        name = project.name,
        requirement = project.requirement,
        features = bullet_list(&features),
    );
    if !milestones.is_empty() {
        doc.push_str("\n## Release Plan\n\n");
        doc.push_str(&bullet_list(&milestones));
        doc.push('\n');
    }
    doc
}

/// Emma's user stories, one per feature.
pub fn user_stories(project: &Project, prd: &str) -> String {
    let features = markdown_sections(prd)
        .into_iter()
        .find(|s| s.title.eq_ignore_ascii_case("Features"))
        .map(|s| s.bullets())
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| feature_phrases(&project.requirement));

    let mut doc = format!("# User Stories: {}\n", project.name);
    for (i, feature) in features.iter().enumerate() {
        doc.push_str(&format!(
            "\n## Story {n}: {feature}\n\n\
             As a user, I want {lower} so that I can get value from {name}.\n\n\
             Acceptance criteria:\n\
             - The feature is reachable from the main page\n\
             - Errors are shown inline\n",
            n = i + 1,
            lower = lowercase_first(feature),
            name = project.name,
        ));
    }
    doc
}

/// Bob's architecture document.
pub fn architecture(project: &Project, prd: Option<&str>) -> String {
    let feature_count = prd
        .map(markdown_sections)
        .unwrap_or_default()
        .into_iter()
        .find(|s| s.title.eq_ignore_ascii_case("Features"))
        .map(|s| s.bullets().len())
        .unwrap_or(0);

    format!(
        "# Architecture: {name}\n\n\
         ## Overview\n\n\
         {name} is a static single-page web application. All logic runs in the \
         browser; state is kept in memory and persisted to `localStorage`.\n\n\
         ## Components\n\n\
         - `index.html`: page skeleton and mount points\n\
         - `styles.css`: layout and theme\n\
         - `app.js`: state, rendering, and event handlers\n\n\
         ## Data Flow\n\n\
         1. User input triggers an event handler\n\
         2. The handler updates application state\n\
         3. State is saved and the view re-renders\n\n\
         ## Feature Coverage\n\n\
         The design covers {coverage}.\n\n\
         ## Technology\n\n\
         - HTML5, CSS3, modern JavaScript (ES2020)\n\
         - No external runtime dependencies\n",
        name = project.name,
        coverage = match feature_count {
            0 => "the requested functionality".to_string(),
            1 => "1 requested feature".to_string(),
            n => format!("{n} requested features"),
        },
    )
}

/// Bob's planned file layout.
pub fn file_tree(project: &Project) -> String {
    format!(
        "# File Tree: {name}\n\n\
         ```text\n\
         {slug}/\n\
         ├── README.md\n\
         ├── docs/\n\
         │   ├── plan.md\n\
         │   ├── prd.md\n\
         │   ├── user_stories.md\n\
         │   ├── architecture.md\n\
         │   ├── file_tree.md\n\
         │   └── report.md\n\
         ├── slides/\n\
         │   └── index.html\n\
         └── src/\n\
         \x20   ├── index.html\n\
         \x20   ├── styles.css\n\
         \x20   └── app.js\n\
         ```\n",
        name = project.name,
        slug = if project.slug.is_empty() { "project" } else { project.slug.as_str() },
    )
}

/// David's project report.
pub fn report(project: &Project, documents: &[(&str, &str)]) -> String {
    let mut doc = format!(
        "# Project Report: {name}\n\n\
         ## Summary\n\n\
         The team delivered a first version of {name} based on the request:\n\n\
         > {requirement}\n\n\
         ## Deliverables\n\n",
        name = project.name,
        requirement = project.requirement.replace('\n', "\n> "),
    );

    let delivered: Vec<String> = documents
        .iter()
        .map(|(path, content)| format!("`{path}` ({} lines)", content.lines().count()))
        .collect();
    if delivered.is_empty() {
        doc.push_str("- No earlier documents were found\n");
    } else {
        doc.push_str(&bullet_list(&delivered));
        doc.push('\n');
    }

    let section_count: usize = documents
        .iter()
        .map(|(_, content)| markdown_sections(content).len())
        .sum();
    doc.push_str(&format!(
        "\n## Metrics\n\n\
         - Documents reviewed: {}\n\
         - Sections covered: {section_count}\n\n\
         ## Next Steps\n\n\
         - Gather user feedback on the prototype\n\
         - Prioritize the next feature set\n",
        documents.len(),
    ));
    doc
}

fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
