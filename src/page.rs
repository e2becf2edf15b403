use anyhow::{anyhow, Result};
use minijinja::Environment;
use serde::Serialize;
use std::path::Path;

use crate::html::Heading;

const PAGE_TEMPLATE: &str = "page.html";

#[derive(Debug, Serialize)]
pub struct Page<'a> {
    pub title: &'a str,
    pub site_name: &'a str,
    pub repo_url: Option<&'a str>,
    pub keywords: &'a str,
    pub headings: &'a [Heading],
    pub body: &'a str,
}

/// Wraps converted notebook bodies in the site chrome.
pub struct PageRenderer {
    env: Environment<'static>,
}

impl PageRenderer {
    /// Uses `page.html` from `template_dir` when given, the built-in template
    /// otherwise.
    pub fn new(template_dir: Option<&Path>) -> Result<PageRenderer> {
        let mut env = Environment::new();
        match template_dir {
            Some(dir) => {
                if !dir.join(PAGE_TEMPLATE).is_file() {
                    return Err(anyhow!(
                        "{} has no {}",
                        dir.display(),
                        PAGE_TEMPLATE
                    ));
                }
                env.set_loader(minijinja::path_loader(dir));
            }
            None => {
                env.add_template(PAGE_TEMPLATE, include_str!("../templates/page.html"))?;
            }
        }
        Ok(PageRenderer { env })
    }

    pub fn render(&self, page: &Page) -> Result<String> {
        self.env
            .get_template(PAGE_TEMPLATE)?
            .render(page)
            .map_err(|e| anyhow!("renderer err: {:#}", e))
    }
}
