use opac_core::{Page, Selection};
use opac_logging::opac_warn;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// A parsed HTML document answering selector paths.
pub struct HtmlPage {
    document: Html,
    url: Url,
}

impl HtmlPage {
    pub fn parse(html: &str, url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            document: Html::parse_document(html),
            url: Url::parse(url)?,
        })
    }
}

impl Selection for HtmlPage {
    fn query_one(&self, path: &str) -> Option<String> {
        query_one(self.document.root_element(), path)
    }

    fn query_all(&self, path: &str) -> Vec<String> {
        query_all(self.document.root_element(), path)
    }

    fn select_scopes(&self, path: &str) -> Vec<Box<dyn Selection + '_>> {
        select_scopes(self.document.root_element(), path)
    }
}

impl Page for HtmlPage {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    fn resolve(&self, reference: &str) -> Option<String> {
        let trimmed = reference.trim();
        let lower = trimmed.to_ascii_lowercase();
        if trimmed.is_empty() || lower.starts_with('#') || lower.starts_with("javascript:") {
            return None;
        }
        self.url.join(trimmed).ok().map(String::from)
    }
}

/// One element of an [`HtmlPage`], used as the root of relative queries.
struct ElementScope<'a> {
    element: ElementRef<'a>,
}

impl Selection for ElementScope<'_> {
    fn query_one(&self, path: &str) -> Option<String> {
        query_one(self.element, path)
    }

    fn query_all(&self, path: &str) -> Vec<String> {
        query_all(self.element, path)
    }

    fn select_scopes(&self, path: &str) -> Vec<Box<dyn Selection + '_>> {
        select_scopes(self.element, path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    /// All descendant text.
    Text,
    /// Text nodes that are direct children.
    OwnText,
    Attr(String),
}

fn split_path(path: &str) -> (&str, Target) {
    match path.rsplit_once("::") {
        Some((css, "text")) => (css, Target::OwnText),
        Some((css, suffix)) => match suffix
            .strip_prefix("attr(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            Some(name) => (css, Target::Attr(name.trim().to_string())),
            None => (path, Target::Text),
        },
        None => (path, Target::Text),
    }
}

fn compile(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(err) => {
            opac_warn!("Invalid selector '{}': {}", css, err);
            None
        }
    }
}

fn read(element: ElementRef<'_>, target: &Target) -> Option<String> {
    match target {
        Target::Text => Some(element.text().collect()),
        Target::OwnText => Some(
            element
                .children()
                .filter_map(|child| child.value().as_text())
                .map(|text| &**text)
                .collect(),
        ),
        Target::Attr(name) => element.value().attr(name).map(str::to_string),
    }
}

fn query_one(root: ElementRef<'_>, path: &str) -> Option<String> {
    let (css, target) = split_path(path);
    let selector = compile(css)?;
    root.select(&selector)
        .find_map(|element| read(element, &target))
}

fn query_all(root: ElementRef<'_>, path: &str) -> Vec<String> {
    let (css, target) = split_path(path);
    let Some(selector) = compile(css) else {
        return Vec::new();
    };
    root.select(&selector)
        .filter_map(|element| read(element, &target))
        .collect()
}

fn select_scopes<'a>(root: ElementRef<'a>, path: &str) -> Vec<Box<dyn Selection + 'a>> {
    let Some(selector) = compile(path) else {
        return Vec::new();
    };
    root.select(&selector)
        .map(|element| Box::new(ElementScope { element }) as Box<dyn Selection + 'a>)
        .collect()
}
