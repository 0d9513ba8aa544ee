//! HTML templates with `{{title}}` / `{{body}}` placeholders
//!
//! Templates are parsed up front so a broken template fails at startup,
//! not on the first request that needs it.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::{Renderer, TemplateName};
use crate::error::{Result, WikiError};
use crate::storage::Page;

const DEFAULT_VIEW: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{{title}}</title>
</head>
<body>
    <h1>{{title}}</h1>
    <p>[<a href="/edit/{{title}}">edit</a>]</p>
    <div>{{body}}</div>
</body>
</html>"#;

const DEFAULT_EDIT: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Editing {{title}}</title>
</head>
<body>
    <h1>Editing {{title}}</h1>
    <form action="/save/{{title}}" method="POST">
        <div><textarea name="body" rows="20" cols="80">{{body}}</textarea></div>
        <div><input type="submit" value="Save"></div>
    </form>
</body>
</html>"#;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Title,
    Body,
}

/// A parsed template
#[derive(Debug, Clone)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(open) = rest.find("{{") {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let after_open = &rest[open + 2..];
            let Some(close) = after_open.find("}}") else {
                return Err(WikiError::Render("unterminated '{{' in template".to_string()));
            };
            segments.push(match after_open[..close].trim() {
                "title" => Segment::Title,
                "body" => Segment::Body,
                other => {
                    return Err(WikiError::Render(format!(
                        "unknown placeholder '{{{{{other}}}}}'"
                    )))
                }
            });
            rest = &after_open[close + 2..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }
        Ok(Self { segments })
    }

    pub fn render(&self, page: &Page) -> String {
        let title = escape_html(page.title().as_str());
        let body = escape_html(&page.body_text());

        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Title => out.push_str(&title),
                Segment::Body => out.push_str(&body),
            }
        }
        out
    }
}

/// The set of templates available to handlers
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: HashMap<TemplateName, Template>,
}

impl TemplateSet {
    /// Built-in view and edit templates
    pub fn builtin() -> Result<Self> {
        let mut set = Self::default();
        set.insert(TemplateName::View, Template::parse(DEFAULT_VIEW)?);
        set.insert(TemplateName::Edit, Template::parse(DEFAULT_EDIT)?);
        Ok(set)
    }

    /// Load `view.html` and `edit.html` from `dir`; both must exist
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut set = Self::default();
        for name in [TemplateName::View, TemplateName::Edit] {
            let path = dir.join(name.file_name());
            let source = fs::read_to_string(&path).map_err(|e| {
                WikiError::Render(format!("cannot read template '{}': {e}", path.display()))
            })?;
            let template = Template::parse(&source).map_err(|e| {
                WikiError::Render(format!("template '{}': {e}", path.display()))
            })?;
            set.insert(name, template);
        }
        Ok(set)
    }

    pub fn insert(&mut self, name: TemplateName, template: Template) {
        self.templates.insert(name, template);
    }
}

impl Renderer for TemplateSet {
    fn render(&self, name: TemplateName, page: &Page) -> Result<String> {
        self.templates
            .get(&name)
            .map(|template| template.render(page))
            .ok_or_else(|| WikiError::Render(format!("no template named '{}'", name.as_str())))
    }
}

/// Escape text for HTML element content and attribute values
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
