use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Prefix marking an author-only code cell.
pub const HIDE_MARKER: &str = "#hide";

static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Anchor id for a heading or a TOC entry, in the same form nbconvert uses:
/// "Big O. Notation" -> "Big-O-Notation".
pub fn anchor_id(title: &str) -> String {
    let text = TAGS.replace_all(title, "");
    let text = html_escape::decode_html_entities(&text);
    let ret = SPACES.replace_all(text.trim(), "-").replace('.', "");
    if ret.is_empty() {
        "section".to_string()
    } else {
        ret
    }
}

/// Gives every heading an id and wraps its title in a self-link.
pub fn build_header_links(html: &str) -> String {
    static HEADER: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"<h(?P<level>[1-6])( id="(?P<id>.*?)")?>(?P<title>.*?)</h[1-6]>"#).unwrap()
    });
    let mut id_counter = HashMap::new();

    HEADER
        .replace_all(html, |caps: &regex::Captures<'_>| {
            let level = &caps["level"];
            let title = &caps["title"];
            let id = caps.name("id").map(|id| id.as_str());
            wrap_header_with_link(level, title, id, &mut id_counter)
        })
        .into_owned()
}

fn wrap_header_with_link(
    level: &str,
    title: &str,
    id: Option<&str>,
    id_counter: &mut HashMap<String, usize>,
) -> String {
    let id = match id {
        Some(id) => id.to_string(),
        None => {
            let id = anchor_id(title);
            let id_count = id_counter.entry(id.clone()).or_insert(0);
            let id = if *id_count == 0 {
                id
            } else {
                format!("{id}-{}", *id_count)
            };
            *id_count += 1;
            id
        }
    };
    format!(r##"<h{level} id="{id}"><a class="self-link" href="#{id}">{title}</a></h{level}>"##)
}

#[derive(PartialEq, Eq, Debug, Clone, Serialize)]
pub struct Heading {
    pub level: u8,
    pub id: String,
    pub title: String,
}

/// Headings up to `max_level` that carry an id, in document order.
pub fn collect_headings(html: &str, max_level: u8) -> Vec<Heading> {
    static HEADINGS: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("h1[id], h2[id], h3[id], h4[id], h5[id], h6[id]").unwrap());
    let doc = Html::parse_fragment(html);
    doc.select(&HEADINGS)
        .filter_map(|el| {
            let level = el.value().name()[1..].parse::<u8>().ok()?;
            if level > max_level {
                return None;
            }
            let title = collapse(&el.text().collect::<String>());
            Some(Heading {
                level,
                id: el.value().attr("id")?.to_string(),
                title,
            })
        })
        .collect()
}

/// Removes the input area of every code cell whose source starts with
/// [`HIDE_MARKER`]. Outputs of those cells stay. Returns the cleaned html and
/// the number of removed inputs.
pub fn strip_hidden_cells(html: &str) -> (String, usize) {
    static INPUT_AREA: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse(".jp-InputArea").unwrap());
    static PRE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("pre").unwrap());

    let mut doc = Html::parse_fragment(html);
    let hidden = doc
        .select(&INPUT_AREA)
        .filter(|input| {
            input
                .select(&PRE)
                .next()
                .map(|pre| pre.text().collect::<String>().trim().starts_with(HIDE_MARKER))
                .unwrap_or(false)
        })
        .map(|input| input.id())
        .collect::<Vec<_>>();
    if hidden.is_empty() {
        return (html.to_string(), 0);
    }
    for id in &hidden {
        if let Some(mut node) = doc.tree.get_mut(*id) {
            node.detach();
        }
    }
    (doc.root_element().inner_html(), hidden.len())
}

/// Caption text for the catalog: the keyword line written by the header
/// widget, or else the first non-empty paragraph.
pub fn extract_keywords(html: &str) -> String {
    static KEYWORDS: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("p.hc-keywords").unwrap());
    static PARAGRAPH: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").unwrap());

    let doc = Html::parse_fragment(html);
    if let Some(el) = doc.select(&KEYWORDS).next() {
        return collapse(&el.text().collect::<String>());
    }
    doc.select(&PARAGRAPH)
        .map(|p| collapse(&p.text().collect::<String>()))
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

fn collapse(s: &str) -> String {
    SPACES.replace_all(s.trim(), " ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_header_test() {
        let header =
            Regex::new(r#"<h(?P<level>[1-6])( id="(?P<id>.*?)")?>(?P<title>.*?)</h[1-6]>"#).unwrap();

        let cap = header.captures(r#"<h1 id="id1">title1</h1>"#).unwrap();
        assert_eq!(cap.name("level").unwrap().as_str(), "1");
        assert_eq!(cap.name("id").unwrap().as_str(), "id1");
        assert_eq!(cap.name("title").unwrap().as_str(), "title1");

        let cap = header.captures(r#"<h1>title1</h1>"#).unwrap();
        assert!(cap.name("id").is_none());
    }

    #[test]
    fn build_header_links_test() {
        let html = r#"
<h1 id="id1">title1</h1>
<h2>Big O. Notation</h2>
<h3>Big O. Notation</h3>
"#;
        assert_eq!(
            build_header_links(html),
            r##"
<h1 id="id1"><a class="self-link" href="#id1">title1</a></h1>
<h2 id="Big-O-Notation"><a class="self-link" href="#Big-O-Notation">Big O. Notation</a></h2>
<h3 id="Big-O-Notation-1"><a class="self-link" href="#Big-O-Notation-1">Big O. Notation</a></h3>
"##
        );
    }

    #[test]
    fn anchor_id_test() {
        assert_eq!(anchor_id("Linked List"), "Linked-List");
        assert_eq!(anchor_id("  1.2 Setup  "), "12-Setup");
        assert_eq!(anchor_id("<code>Vec</code> &amp; slices"), "Vec-&-slices");
        assert_eq!(anchor_id("..."), "section");
    }

    #[test]
    fn collect_headings_test() {
        let html = build_header_links("<h1>Intro</h1><p>x</p><h2>Setup <code>env</code></h2><h4>Deep</h4><h2>Last</h2>");
        let headings = collect_headings(&html, 3);
        assert_eq!(
            headings,
            vec![
                Heading { level: 1, id: "Intro".to_string(), title: "Intro".to_string() },
                Heading { level: 2, id: "Setup-env".to_string(), title: "Setup env".to_string() },
                Heading { level: 2, id: "Last".to_string(), title: "Last".to_string() },
            ]
        );
        assert!(collect_headings("<h2>plain</h2>", 3).is_empty());
    }

    #[test]
    fn strip_hidden_cells_test() {
        let html = concat!(
            r#"<div class="jp-Cell jp-CodeCell"><div class="jp-InputArea"><pre>  #hide"#,
            "\nsetup()</pre></div>",
            r#"<div class="jp-OutputArea"><p>shown</p></div></div>"#,
            r#"<div class="jp-Cell jp-CodeCell"><div class="jp-InputArea"><pre>x = 1 #hide</pre></div></div>"#,
        );
        let (cleaned, removed) = strip_hidden_cells(html);
        assert_eq!(removed, 1);
        assert!(!cleaned.contains("setup()"));
        assert!(cleaned.contains("<p>shown</p>"));
        assert!(cleaned.contains("x = 1 #hide"));
    }

    #[test]
    fn strip_hidden_cells_untouched_test() {
        let html = r#"<div class="jp-InputArea"><pre>print(1)</pre></div>"#;
        assert_eq!(strip_hidden_cells(html), (html.to_string(), 0));
    }

    #[test]
    fn extract_keywords_test() {
        let html = r#"<p>Intro   paragraph</p><div><p class="hc-keywords">nodes; pointers;</p></div>"#;
        assert_eq!(extract_keywords(html), "nodes; pointers;");

        let html = "<h1>Title</h1><p> </p><p>First\n real   text</p><p>second</p>";
        assert_eq!(extract_keywords(html), "First real text");

        assert_eq!(extract_keywords("<pre>code</pre>"), "");
    }
}
