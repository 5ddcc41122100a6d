//! HTML slide deck built from document sections.

use atelier_types::project::Project;

use super::{Section, html_escape};

/// Bullets shown per slide; longer sections are truncated.
const MAX_BULLETS: usize = 6;

/// Render a self-contained slide deck.
///
/// The first slide is a title slide; each section becomes one slide. Arrow
/// keys and clicks navigate.
pub fn deck(project: &Project, sections: &[Section]) -> String {
    let mut slides = String::new();
    slides.push_str(&format!(
        "    <section class=\"slide title\">\n      <h1>{}</h1>\n      <p>{}</p>\n    </section>\n",
        html_escape(&project.name),
        html_escape(first_line(&project.requirement)),
    ));

    for section in sections {
        slides.push_str(&slide(section));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{title} - Presentation</title>
  <style>
    body {{ margin: 0; font-family: system-ui, sans-serif; background: #111827; color: #f9fafb; }}
    .slide {{ display: none; min-height: 100vh; padding: 8vh 10vw; box-sizing: border-box; }}
    .slide.active {{ display: block; }}
    .slide.title {{ text-align: center; padding-top: 30vh; }}
    h1 {{ font-size: 3rem; margin: 0 0 1rem; }}
    h2 {{ font-size: 2.2rem; color: #93c5fd; }}
    li {{ font-size: 1.4rem; margin: 0.6rem 0; }}
    p {{ font-size: 1.3rem; color: #d1d5db; }}
    .counter {{ position: fixed; bottom: 1rem; right: 1.5rem; color: #9ca3af; }}
  </style>
</head>
<body>
  <main id="deck">
{slides}  </main>
  <div class="counter" id="counter"></div>
  <script>
    (function () {{
      const slides = Array.from(document.querySelectorAll(".slide"));
      const counter = document.getElementById("counter");
      let current = 0;
      function show(index) {{
        current = Math.max(0, Math.min(slides.length - 1, index));
        slides.forEach(function (s, i) {{ s.classList.toggle("active", i === current); }});
        counter.textContent = (current + 1) + " / " + slides.length;
      }}
      document.addEventListener("keydown", function (e) {{
        if (e.key === "ArrowRight" || e.key === " ") show(current + 1);
        if (e.key === "ArrowLeft") show(current - 1);
      }});
      document.addEventListener("click", function () {{ show(current + 1); }});
      show(0);
    }})();
  </script>
</body>
</html>
"#,
        title = html_escape(&project.name),
    )
}

fn slide(section: &Section) -> String {
    let bullets = section.bullets();
    let body = if bullets.is_empty() {
        format!(
            "      <p>{}</p>\n",
            html_escape(first_line(&section.body))
        )
    } else {
        let items: String = bullets
            .iter()
            .take(MAX_BULLETS)
            .map(|b| format!("        <li>{}</li>\n", html_escape(&strip_inline_markup(b))))
            .collect();
        format!("      <ul>\n{items}      </ul>\n")
    };

    format!(
        "    <section class=\"slide\">\n      <h2>{}</h2>\n{body}    </section>\n",
        html_escape(&section.title)
    )
}

fn first_line(text: &str) -> &str {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
}

fn strip_inline_markup(text: &str) -> String {
    text.replace("**", "").replace('`', "")
}
