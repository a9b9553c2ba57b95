//! Resolution of model-authored selector strings into element locators.
//!
//! The model writes selectors in a loose grammar: ARIA `role "name"` pairs
//! (optionally nested for scoping), `role=`/`text=`/`label=`/`placeholder=`
//! prefixes, raw CSS, or bare visible text. Rules are attempted in order and
//! the first match wins. A selector that looks like a copied accessibility
//! tree path is rejected outright with a corrective message, since no
//! locator can be built from it.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;
use webpilot_browser::{ElementQuery, Locator, Page};

/// A selector string that cannot be turned into a locator.
#[derive(Debug, Error, PartialEq)]
#[error("{0}")]
pub struct SelectorError(pub String);

/// The outcome of parsing: one query, or a child query scoped inside a
/// parent.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedSelector {
    Single(ElementQuery),
    Nested {
        parent: ElementQuery,
        child: ElementQuery,
    },
}

/// Bind a selector string to a lazily-evaluated locator on `page`.
pub fn resolve(page: &Page, raw: &str) -> Result<Locator, SelectorError> {
    let locator = match parse(raw)? {
        ParsedSelector::Nested { parent, child } => page.nested_locator(parent, child),
        ParsedSelector::Single(query) => match query {
            ElementQuery::Role { role, name } => page.get_by_role(&role, name.as_deref()),
            ElementQuery::Text { needle, exact } => page.get_by_text(&needle, exact),
            ElementQuery::Label { needle } => page.get_by_label(&needle),
            ElementQuery::Placeholder { needle } => page.get_by_placeholder(&needle),
            ElementQuery::Css { selector } => page.css(&selector),
        },
    };
    Ok(locator)
}

/// Parse a selector string. Pure; no DOM access.
pub fn parse(raw: &str) -> Result<ParsedSelector, SelectorError> {
    // Tolerate YAML-list copy-paste from the observation.
    let s = raw.trim().strip_prefix("- ").unwrap_or(raw.trim()).trim();

    if s.is_empty() {
        return Err(SelectorError("empty selector".into()));
    }

    // Tree-path hallucinations: the model sometimes echoes an internal
    // "ROOT > NODE5 > ..." path instead of a selector.
    if looks_like_tree_path(s) {
        return Err(SelectorError(format!(
            "'{s}' looks like an accessibility tree path, not a selector. \
             Use the ARIA form instead, e.g. button \"Submit\" or link \"Settings\""
        )));
    }

    // Nested ARIA scope: role1 "name1" role2 "name2".
    if let Some(caps) = nested_aria_re().captures(s) {
        let (r1, n1, r2, n2) = (&caps[1], &caps[2], &caps[3], &caps[4]);
        if is_aria_role(r1) && is_aria_role(r2) {
            return Ok(ParsedSelector::Nested {
                parent: role_query(r1, Some(n1)),
                child: role_query(r2, Some(n2)),
            });
        }
    }

    // ARIA quoted: role "name", with an optional trailing bracket suffix.
    if let Some(caps) = quoted_aria_re().captures(s) {
        let role = &caps[1];
        if is_aria_role(role) {
            return Ok(ParsedSelector::Single(role_query(role, Some(&caps[2]))));
        }
    }

    // ARIA unquoted: role name, greedy. `button Submit now` is
    // role=button, name="Submit now".
    if let Some(caps) = unquoted_aria_re().captures(s) {
        let (role, name) = (&caps[1], caps[2].trim());
        if is_aria_role(role) && !name.contains('=') {
            return Ok(ParsedSelector::Single(role_query(role, Some(name))));
        }
    }

    if let Some(rest) = s.strip_prefix("role=") {
        return parse_role_prefix(rest);
    }
    if let Some(rest) = s.strip_prefix("text=") {
        return Ok(ParsedSelector::Single(ElementQuery::Text {
            needle: rest.to_string(),
            exact: false,
        }));
    }
    if let Some(rest) = s.strip_prefix("label=") {
        return Ok(ParsedSelector::Single(ElementQuery::Label {
            needle: rest.to_string(),
        }));
    }
    if let Some(rest) = s.strip_prefix("placeholder=") {
        return Ok(ParsedSelector::Single(ElementQuery::Placeholder {
            needle: rest.to_string(),
        }));
    }

    // CSS heuristic: selector punctuation means CSS.
    if s.chars().any(|c| "#.[]>:=@".contains(c)) {
        return Ok(ParsedSelector::Single(ElementQuery::Css {
            selector: s.to_string(),
        }));
    }

    // Last resort: non-exact visible-text match.
    Ok(ParsedSelector::Single(ElementQuery::Text {
        needle: s.to_string(),
        exact: false,
    }))
}

fn parse_role_prefix(rest: &str) -> Result<ParsedSelector, SelectorError> {
    if let Some(caps) = role_prefix_re().captures(rest) {
        let role = caps[1].to_string();
        let name = caps.get(2).map(|m| m.as_str().to_string());
        return Ok(ParsedSelector::Single(ElementQuery::Role {
            role: role.to_ascii_lowercase(),
            name,
        }));
    }
    Err(SelectorError(format!(
        "malformed role= selector 'role={rest}'; expected role=button or role=button[name='Submit']"
    )))
}

fn role_query(role: &str, name: Option<&str>) -> ElementQuery {
    ElementQuery::Role {
        role: role.to_ascii_lowercase(),
        name: name.map(str::to_string),
    }
}

fn looks_like_tree_path(s: &str) -> bool {
    if s.to_ascii_uppercase().contains("ROOT") {
        return true;
    }
    tree_path_re().is_match(s) && s.chars().any(|c| c.is_ascii_digit())
}

fn tree_path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z]+\s*>\s*[A-Z]+").unwrap())
}

fn nested_aria_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^([A-Za-z]+)\s+"([^"]+)"\s+([A-Za-z]+)\s+"([^"]+)"$"#).unwrap()
    })
}

fn quoted_aria_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^([A-Za-z]+)\s+"([^"]*)"\s*(\[[^\]]*\])?$"#).unwrap())
}

fn unquoted_aria_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z]+)\s+(\S.*)$").unwrap())
}

fn role_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^([A-Za-z]+)(?:\[name=['"]([^'"]*)['"]\])?$"#).unwrap())
}

/// The closed set of recognised ARIA roles, compared case-insensitively.
pub fn is_aria_role(candidate: &str) -> bool {
    let lower = candidate.to_ascii_lowercase();
    ARIA_ROLES.binary_search(&lower.as_str()).is_ok()
}

/// W3C ARIA role names, sorted for binary search.
pub const ARIA_ROLES: &[&str] = &[
    "alert",
    "alertdialog",
    "application",
    "article",
    "banner",
    "blockquote",
    "button",
    "caption",
    "cell",
    "checkbox",
    "code",
    "columnheader",
    "combobox",
    "complementary",
    "contentinfo",
    "definition",
    "deletion",
    "dialog",
    "directory",
    "document",
    "emphasis",
    "feed",
    "figure",
    "form",
    "generic",
    "grid",
    "gridcell",
    "group",
    "heading",
    "img",
    "insertion",
    "link",
    "list",
    "listbox",
    "listitem",
    "log",
    "main",
    "marquee",
    "math",
    "menu",
    "menubar",
    "menuitem",
    "menuitemcheckbox",
    "menuitemradio",
    "meter",
    "navigation",
    "none",
    "note",
    "option",
    "paragraph",
    "presentation",
    "progressbar",
    "radio",
    "radiogroup",
    "region",
    "row",
    "rowgroup",
    "rowheader",
    "scrollbar",
    "search",
    "searchbox",
    "separator",
    "slider",
    "spinbutton",
    "status",
    "strong",
    "subscript",
    "superscript",
    "switch",
    "tab",
    "table",
    "tablist",
    "tabpanel",
    "term",
    "textbox",
    "time",
    "timer",
    "toolbar",
    "tooltip",
    "tree",
    "treegrid",
    "treeitem",
];
