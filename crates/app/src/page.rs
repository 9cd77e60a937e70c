use pdf_insights_core::Match;
use std::fmt::Write;

pub const NO_RESULTS: &str = "No relevant documents found.";

/// A status line shown above the form after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

/// What the single page shows besides the form itself.
#[derive(Debug, Default)]
pub struct PageView<'a> {
    pub query: Option<&'a str>,
    pub notices: Vec<Notice>,
    pub matches: Option<&'a [Match]>,
    pub backend: &'a str,
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Plain-text lines for the CLI: one per match, or the warning.
pub fn result_lines(matches: &[Match]) -> Vec<String> {
    if matches.is_empty() {
        return vec![NO_RESULTS.to_string()];
    }
    matches.iter().map(ToString::to_string).collect()
}

pub fn render(view: &PageView<'_>) -> String {
    let mut body = String::new();

    for notice in &view.notices {
        let (class, text) = match notice {
            Notice::Success(text) => ("success", text),
            Notice::Error(text) => ("error", text),
        };
        let _ = writeln!(body, r#"<p class="{class}">{}</p>"#, escape_html(text));
    }

    let query = view.query.map(escape_html).unwrap_or_default();
    let _ = write!(
        body,
        r#"<form action="/documents" method="post" enctype="multipart/form-data">
  <label>Upload a PDF <input type="file" name="file" accept=".pdf,application/pdf" required></label>
  <button type="submit">Process &amp; Store in {backend}</button>
</form>
<form action="/" method="get">
  <label>Ask a question about your documents: <input type="text" name="q" value="{query}"></label>
</form>
"#,
        backend = escape_html(view.backend),
    );

    if let Some(matches) = view.matches {
        if matches.is_empty() {
            let _ = writeln!(body, r#"<p class="warning">{NO_RESULTS}</p>"#);
        } else {
            body.push_str("<h2>Relevant Results:</h2>\n<ul>\n");
            for hit in matches {
                let _ = writeln!(
                    body,
                    "  <li><strong>File:</strong> {} (Score: {:.2})</li>",
                    escape_html(hit.filename()),
                    hit.score
                );
            }
            body.push_str("</ul>\n");
        }
    }

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>AI-Powered PDF Search</title>
<style>
body {{ font-family: sans-serif; max-width: 46rem; margin: 2rem auto; }}
.success {{ color: #1b5e20; }}
.warning {{ color: #8a6d00; }}
.error {{ color: #b71c1c; }}
form {{ margin: 1rem 0; }}
</style>
</head>
<body>
<h1>AI-Powered PDF Search (Finance &amp; Insurance)</h1>
<p>Upload your <strong>insurance policies, mutual fund reports, or tax documents</strong>, and ask questions about them.</p>
{body}</body>
</html>
"#
    )
}
