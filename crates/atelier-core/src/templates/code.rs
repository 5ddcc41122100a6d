//! Web application templates used by the engineer step.

use atelier_types::project::Project;

use super::{feature_phrases, html_escape};

/// Page skeleton loading `styles.css` and `app.js`.
pub fn index_html(project: &Project) -> String {
    let title = html_escape(&project.name);
    let features: String = feature_phrases(&project.requirement)
        .iter()
        .map(|f| format!("        <li>{}</li>\n", html_escape(f)))
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{title}</title>
  <link rel="stylesheet" href="styles.css">
</head>
<body>
  <header class="app-header">
    <h1>{title}</h1>
  </header>
  <main class="app-main">
    <section class="card">
      <h2>Features</h2>
      <ul class="features">
{features}      </ul>
    </section>
    <section class="card">
      <h2>Items</h2>
      <form id="item-form" class="item-form">
        <input id="item-input" type="text" placeholder="Add an item" aria-label="New item" required>
        <button type="submit">Add</button>
      </form>
      <ul id="item-list" class="item-list"></ul>
      <p id="empty-state" class="empty">Nothing here yet.</p>
    </section>
  </main>
  <script src="app.js"></script>
</body>
</html>
"#
    )
}

/// Stylesheet for the page skeleton.
pub fn styles_css() -> String {
    r#":root {
  --bg: #f5f6fa;
  --fg: #1f2430;
  --accent: #4f6df5;
  --card: #ffffff;
  --muted: #6b7280;
}

* { box-sizing: border-box; }

body {
  margin: 0;
  font-family: system-ui, -apple-system, "Segoe UI", sans-serif;
  background: var(--bg);
  color: var(--fg);
}

.app-header {
  padding: 1.5rem 2rem;
  background: var(--accent);
  color: #fff;
}

.app-header h1 { margin: 0; font-size: 1.6rem; }

.app-main {
  max-width: 48rem;
  margin: 2rem auto;
  padding: 0 1rem;
  display: grid;
  gap: 1.5rem;
}

.card {
  background: var(--card);
  border-radius: 0.75rem;
  padding: 1.25rem 1.5rem;
  box-shadow: 0 1px 3px rgba(0, 0, 0, 0.08);
}

.item-form { display: flex; gap: 0.5rem; }

.item-form input {
  flex: 1;
  padding: 0.5rem 0.75rem;
  border: 1px solid #d1d5db;
  border-radius: 0.5rem;
}

.item-form button {
  padding: 0.5rem 1rem;
  border: 0;
  border-radius: 0.5rem;
  background: var(--accent);
  color: #fff;
  cursor: pointer;
}

.item-list { list-style: none; padding: 0; }

.item-list li {
  display: flex;
  justify-content: space-between;
  align-items: center;
  padding: 0.5rem 0;
  border-bottom: 1px solid #eef0f4;
}

.item-list li.done span { text-decoration: line-through; color: var(--muted); }

.empty { color: var(--muted); }
"#
    .to_string()
}

/// Fallback application script.
pub fn app_js(project: &Project) -> String {
    let storage_key = if project.slug.is_empty() {
        "atelier-app".to_string()
    } else {
        format!("{}-items", project.slug)
    };

    format!(
        r#"// {name}
(function () {{
  "use strict";

  const STORAGE_KEY = "{storage_key}";
  const form = document.getElementById("item-form");
  const input = document.getElementById("item-input");
  const list = document.getElementById("item-list");
  const empty = document.getElementById("empty-state");

  let items = load();

  function load() {{
    try {{
      return JSON.parse(localStorage.getItem(STORAGE_KEY)) || [];
    }} catch (_) {{
      return [];
    }}
  }}

  function save() {{
    try {{
      localStorage.setItem(STORAGE_KEY, JSON.stringify(items));
    }} catch (_) {{
      // sandboxed previews have no storage; items stay in memory
    }}
  }}

  function render() {{
    list.innerHTML = "";
    items.forEach(function (item, index) {{
      const li = document.createElement("li");
      li.className = item.done ? "done" : "";

      const label = document.createElement("span");
      label.textContent = item.text;
      label.addEventListener("click", function () {{
        items[index].done = !items[index].done;
        save();
        render();
      }});

      const remove = document.createElement("button");
      remove.textContent = "Remove";
      remove.addEventListener("click", function () {{
        items.splice(index, 1);
        save();
        render();
      }});

      li.appendChild(label);
      li.appendChild(remove);
      list.appendChild(li);
    }});
    empty.hidden = items.length > 0;
  }}

  form.addEventListener("submit", function (event) {{
    event.preventDefault();
    const text = input.value.trim();
    if (!text) return;
    items.push({{ text: text, done: false }});
    input.value = "";
    save();
    render();
  }});

  render();
}})();
"#,
        name = project.name.replace(['\n', '\r'], " "),
    )
}

/// Project README.
pub fn readme(project: &Project, notes: Option<&str>) -> String {
    let mut doc = format!(
        "# {name}\n\n\
         {requirement}\n\n\
         ## Running\n\n\
         Open `src/index.html` in a browser, or use the live preview.\n\n\
         ## Layout\n\n\
         - `docs/`: plan, requirements, architecture, and report\n\
         - `src/`: the web application\n\
         - `slides/`: project presentation\n",
        name = project.name,
        requirement = project.requirement,
    );
    if let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) {
        doc.push_str("\n## Implementation Notes\n\n");
        doc.push_str(notes);
        doc.push('\n');
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_types::project::ProjectId;
    use chrono::Utc;

    fn project(name: &str) -> Project {
        Project {
            id: ProjectId::new(),
            name: name.to_string(),
            slug: atelier_types::project::slugify(name),
            requirement: "A list of <b>things</b>".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn index_escapes_project_text() {
        let html = index_html(&project("Tom & Jerry"));
        assert!(html.contains("<title>Tom &amp; Jerry</title>"));
        assert!(html.contains("&lt;b&gt;things&lt;/b&gt;"));
        assert!(html.contains(r#"<script src="app.js"></script>"#));
    }

    #[test]
    fn app_js_uses_slug_storage_key() {
        let js = app_js(&project("Reading List"));
        assert!(js.contains(r#"const STORAGE_KEY = "reading-list-items";"#));
        assert!(js.contains("(function () {"));
    }

    #[test]
    fn readme_appends_notes() {
        let p = project("Notes");
        assert!(!readme(&p, None).contains("Implementation Notes"));
        assert!(readme(&p, Some("Uses localStorage.")).contains("## Implementation Notes"));
        assert!(!readme(&p, Some("   ")).contains("Implementation Notes"));
    }
}
