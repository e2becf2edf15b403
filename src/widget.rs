//! Markup for widgets shown while authoring notebooks.
//!
//! Each function returns an HTML string ready to be displayed in a notebook
//! output cell. Arguments are inserted verbatim, so callers may pass markup.

use anyhow::Result;
use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

use crate::error::PublishError;
use crate::html::anchor_id;

/// Title card with a "last modified" calendar. The keyword line is what the
/// publisher picks up as the catalog caption.
pub fn header_calendar(title: &str, keywords: &[&str], now: NaiveDateTime) -> String {
    let keywords = if keywords.is_empty() {
        String::new()
    } else {
        format!("{};", keywords.join("; "))
    };
    format!(
        r#"<style>
.hc-wrapper {{ display: flex; align-items: center; gap: 20px; border-left: 3px solid #666; padding-left: 12px; margin: 1em 0; font-family: 'Georgia', serif; }}
.hc-calendar {{ width: 120px; flex-shrink: 0; border-radius: 8px; overflow: hidden; border: 1px solid #444; background: #2d2d2d; text-align: center; font: 12px 'Arial', sans-serif; }}
.hc-header, .hc-time {{ background: #333; color: #bbb; padding: 4px 0; }}
.hc-month {{ background: #EF8C00; color: #fff; padding: 5px 0; font-weight: bold; }}
.hc-day {{ background: #3a3a3a; color: #eee; padding: 8px 0; font-size: 20px; font-weight: bold; }}
.hc-title {{ margin: 0; color: #EF8C00; font-size: 1.8em; line-height: 1.2em; }}
.hc-keywords {{ margin: 0.5em 0 0 0; font-size: 0.9em; opacity: 0.8; }}
</style>
<div class="hc-wrapper">
  <div class="hc-calendar">
    <div class="hc-header">Last modified</div>
    <div class="hc-month">{month}, {year}</div>
    <div class="hc-day">{day}</div>
    <div class="hc-time">{time}</div>
  </div>
  <div style="flex: 1;">
    <div class="hc-title">{title}</div>
    <p class="hc-keywords">{keywords}</p>
  </div>
</div>
"#,
        month = now.format("%b"),
        year = now.format("%Y"),
        day = now.format("%d"),
        time = now.format("%I:%M:%S %p"),
        title = title,
        keywords = keywords,
    )
}

/// Command palette listing `sections`, opened by a button or Ctrl/Cmd+K.
pub fn toc_palette(sections: &[&str], title: &str) -> String {
    let mut items = String::new();
    for (i, section) in sections.iter().enumerate() {
        items.push_str(&format!(
            r##"    <a href="#{id}" onclick="closeCommandPalette()" class="nav-item"><span class="nav-num">{num:02}</span><span>{section}</span></a>
"##,
            id = anchor_id(section),
            num = i + 1,
            section = section,
        ));
    }
    format!(
        r#"<button id="toc-trigger" class="toc-toggle" onclick="toggleCommandPalette()" title="Open TOC">&#9776;</button>
<div id="cmd-palette" class="cmd-palette">
  <div class="cmd-header"><span>{title}</span><span>{total} sections</span></div>
  <div id="nav-items">
{items}  </div>
</div>
<div id="cmd-overlay" class="cmd-overlay" onclick="closeCommandPalette()"></div>
<script>
function toggleCommandPalette() {{
  const palette = document.getElementById('cmd-palette');
  if (palette.classList.contains('open')) {{ closeCommandPalette(); return; }}
  palette.classList.add('open');
  document.getElementById('cmd-overlay').classList.add('open');
}}
function closeCommandPalette() {{
  document.getElementById('cmd-palette').classList.remove('open');
  document.getElementById('cmd-overlay').classList.remove('open');
}}
document.addEventListener('keydown', (e) => {{
  if ((e.metaKey || e.ctrlKey) && e.key === 'k') {{ e.preventDefault(); toggleCommandPalette(); }}
  if (e.key === 'Escape') {{ closeCommandPalette(); }}
}});
</script>
<style>
.toc-toggle {{ position: fixed; top: 20px; right: 80px; width: 50px; height: 50px; border-radius: 50%; border: 2px solid #444; background: #2d2d2d; color: #d4d4d4; font-size: 22px; cursor: pointer; z-index: 1000; }}
.cmd-palette {{ position: fixed; top: 50%; left: 50%; transform: translate(-50%, -50%); width: 90%; max-width: 450px; background: rgba(20, 20, 20, 0.98); border: 1px solid rgba(255,255,255,0.1); border-radius: 8px; z-index: 1001; visibility: hidden; opacity: 0; transition: all 0.2s ease; font: 13px 'Monaco', 'Menlo', monospace; }}
.cmd-palette.open, .cmd-overlay.open {{ visibility: visible; opacity: 1; }}
.cmd-header {{ display: flex; justify-content: space-between; padding: 12px 16px; color: rgba(255,255,255,0.7); font-size: 11px; text-transform: uppercase; }}
.cmd-palette .nav-item {{ display: flex; padding: 10px 16px; color: rgba(255,255,255,0.85); text-decoration: none; }}
.cmd-palette .nav-num {{ width: 20px; margin-right: 12px; opacity: 0.6; }}
.cmd-overlay {{ position: fixed; inset: 0; background: rgba(0,0,0,0.5); z-index: 1000; visibility: hidden; opacity: 0; }}
body.light-mode .toc-toggle {{ background: #f5f5f5; color: #333; border-color: #ddd; }}
body.light-mode .cmd-palette {{ background: rgba(255,255,255,0.98); }}
body.light-mode .cmd-palette .nav-item, body.light-mode .cmd-header {{ color: rgba(0,0,0,0.85); }}
</style>
"#,
        title = title,
        total = sections.len(),
        items = items,
    )
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum BoxKind {
    Note,
    Tip,
    Question,
    Warning,
    Danger,
    Important,
    Example,
    Exercise,
    Success,
    Info,
    Code,
    Upcoming,
}

struct BoxStyle {
    icon: &'static str,
    text: &'static str,
    background: &'static str,
    border: &'static str,
    title: &'static str,
}

impl BoxKind {
    pub const ALL: [BoxKind; 12] = [
        BoxKind::Note,
        BoxKind::Tip,
        BoxKind::Question,
        BoxKind::Warning,
        BoxKind::Danger,
        BoxKind::Important,
        BoxKind::Example,
        BoxKind::Exercise,
        BoxKind::Success,
        BoxKind::Info,
        BoxKind::Code,
        BoxKind::Upcoming,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BoxKind::Note => "note",
            BoxKind::Tip => "tip",
            BoxKind::Question => "question",
            BoxKind::Warning => "warning",
            BoxKind::Danger => "danger",
            BoxKind::Important => "important",
            BoxKind::Example => "example",
            BoxKind::Exercise => "exercise",
            BoxKind::Success => "success",
            BoxKind::Info => "info",
            BoxKind::Code => "code",
            BoxKind::Upcoming => "upcoming",
        }
    }

    fn style(self) -> BoxStyle {
        let (icon, text, background, border, title) = match self {
            BoxKind::Note => ("📝", "#0d47a1", "#e3f2fd", "#2196f3", "Note"),
            BoxKind::Tip => ("💡", "#1b5e20", "#e8f5e8", "#4caf50", "Tip"),
            BoxKind::Question => ("❓", "#6a1b9a", "#f3e5f5", "#9c27b0", "Question"),
            BoxKind::Warning => ("⚠️", "#e65100", "#fff3e0", "#ff9800", "Warning"),
            BoxKind::Danger => ("🚨", "#b71c1c", "#ffebee", "#f44336", "Danger"),
            BoxKind::Important => ("⭐", "#4a148c", "#f3e5f5", "#9c27b0", "Important"),
            BoxKind::Example => ("📋", "#004d40", "#e0f2f1", "#009688", "Example"),
            BoxKind::Exercise => ("🏋️", "#1a237e", "#e8eaf6", "#3f51b5", "Exercise"),
            BoxKind::Success => ("✅", "#33691e", "#f1f8e9", "#8bc34a", "Success"),
            BoxKind::Info => ("ℹ️", "#006064", "#e0f7fa", "#00bcd4", "Info"),
            BoxKind::Code => ("💻", "#263238", "#f5f5f5", "#607d8b", "Code"),
            BoxKind::Upcoming => ("🔜", "#1565c0", "#e3f2fd", "#42a5f5", "Coming Up Next"),
        };
        BoxStyle {
            icon,
            text,
            background,
            border,
            title,
        }
    }
}

impl fmt::Display for BoxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BoxKind {
    type Err = PublishError;

    fn from_str(s: &str) -> std::result::Result<BoxKind, PublishError> {
        BoxKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| PublishError::UnknownBoxType {
                kind: s.to_string(),
                available: BoxKind::ALL
                    .iter()
                    .map(|kind| kind.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// Callout box. `title` defaults to the kind's own title.
pub fn tutbox(content: &str, kind: BoxKind, title: Option<&str>) -> String {
    let style = kind.style();
    format!(
        r#"<div class="tutbox tutbox-{kind}" style="margin: 15px 0; padding: 16px 20px; border-radius: 8px; border-left: 4px solid {border}; display: flex; align-items: flex-start; gap: 12px; box-shadow: 0 2px 8px rgba(0, 0, 0, 0.1); background-color: {background}; color: {text}; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;">
  <div style="font-size: 20px; margin-top: 2px; flex-shrink: 0;">{icon}</div>
  <div style="flex: 1;">
    <div style="font-weight: bold; margin-bottom: 6px; font-size: 14px; text-transform: uppercase; letter-spacing: 0.5px;">{title}</div>
    <div style="margin: 0; font-size: 14px; line-height: 1.5;">{content}</div>
  </div>
</div>
"#,
        kind = kind,
        border = style.border,
        background = style.background,
        text = style.text,
        icon = style.icon,
        title = title.unwrap_or(style.title),
        content = content,
    )
}

/// Same as [`tutbox`], with the kind given by name.
pub fn tutbox_named(content: &str, kind: &str, title: Option<&str>) -> Result<String> {
    Ok(tutbox(content, kind.parse()?, title))
}

pub struct NavLinks<'a> {
    pub prev_link: Option<&'a str>,
    pub next_link: Option<&'a str>,
    pub prev_content: &'a str,
    pub next_content: &'a str,
    pub title: &'a str,
}

impl Default for NavLinks<'_> {
    fn default() -> Self {
        NavLinks {
            prev_link: None,
            next_link: None,
            prev_content: "Previous Section",
            next_content: "Next Section",
            title: "Navigation",
        }
    }
}

/// Previous/next box. A side without a link renders as plain text.
pub fn nav(links: &NavLinks) -> String {
    let prev = match links.prev_link {
        Some(href) => format!(
            r#"<a href="{href}" style="color: #5d4037; text-decoration: none; padding: 8px 12px; border-radius: 4px; background-color: #efebe9; border: 1px solid #8d6e63; display: inline-block; font-weight: 500;">⬅️ {}</a>"#,
            links.prev_content
        ),
        None => format!(
            r#"<span style="color: #999; padding: 8px 12px;">⬅️ {}</span>"#,
            links.prev_content
        ),
    };
    let next = match links.next_link {
        Some(href) => format!(
            r#"<a href="{href}" style="color: #2e7d32; text-decoration: none; padding: 8px 12px; border-radius: 4px; background-color: #e8f5e8; border: 1px solid #66bb6a; display: inline-block; font-weight: 500;">{} ➡️</a>"#,
            links.next_content
        ),
        None => format!(
            r#"<span style="color: #999; padding: 8px 12px;">{} ➡️</span>"#,
            links.next_content
        ),
    };
    format!(
        r#"<div class="tutnav" style="margin: 15px 0; padding: 16px 20px; border-radius: 8px; border-left: 4px solid #607d8b; box-shadow: 0 2px 8px rgba(0, 0, 0, 0.1); background-color: #f8f9fa; color: #37474f;">
  <div style="font-weight: bold; margin-bottom: 12px; font-size: 14px; text-transform: uppercase; letter-spacing: 0.5px;"><span style="font-size: 18px;">🧭</span> {title}</div>
  <div style="display: flex; justify-content: space-between; align-items: center; gap: 16px;">
    <div>{prev}</div>
    <div>{next}</div>
  </div>
</div>
"#,
        title = links.title,
    )
}

/// Banner with the topic badge and a link to the source repository.
pub fn hero(topic: &str, git_link: &str, git_name: &str) -> String {
    format!(
        r#"<div class="hero" style="position: relative; display: flex; align-items: center; min-height: 80px; max-width: 800px; background: linear-gradient(135deg, #f5f7fa 0%, #c3cfe2 100%); padding: 20px; border-radius: 12px; border: 1px solid #e1e8ed; margin: 10px 0;">
  <a href="{git_link}" target="_blank" style="position: absolute; top: 16px; right: 20px; color: #333; font-size: 14px; text-decoration: none;">/{git_name}</a>
  <div style="font-size: 14px; background: linear-gradient(135deg, #667eea, #764ba2); color: white; padding: 8px 10px; border-radius: 5px; font-weight: 600;">{topic}</div>
</div>
"#
    )
}

/// Section header, rendered as `<h2>` so the notebook title stays the only h1.
pub fn h1(topic: &str) -> String {
    format!(
        r#"<div style="margin: 25px 0 15px 0;"><h2 style="font-size: 24px; font-weight: 600; color: #667eea; margin: 0; padding: 12px 0 8px 0;">▶ {topic}</h2></div>
"#
    )
}

pub fn h2(topic: &str) -> String {
    format!(
        r#"<div style="margin: 25px 0 15px 0;"><h3 style="font-size: 18px; font-weight: 600; color: #667eea; margin: 0; padding: 12px 0 8px 0; border-bottom: 3px solid #667eea; display: inline-block;">{topic}</h3></div>
"#
    )
}
