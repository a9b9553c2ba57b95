//! Element queries and their translation to WebDriver locator strings.
//!
//! Role queries compile to XPath unions over explicit `@role` attributes and
//! the implicit ARIA roles of plain HTML tags, with an accessible-name
//! predicate over text content, `aria-label`, `value`, `alt`, `title` and
//! `placeholder`. Chromedriver has no native role selector, so this
//! translation is what makes `button "Apply"` work against a live DOM.

use std::fmt;

/// One lazily-evaluated element query.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementQuery {
    /// ARIA role with optional accessible name.
    Role {
        role: String,
        name: Option<String>,
    },
    /// Visible text; `exact` switches substring matching off.
    Text { needle: String, exact: bool },
    /// Form-control label (wrapping `<label>`, `for=`, or `aria-label`).
    Label { needle: String },
    /// `placeholder` attribute substring.
    Placeholder { needle: String },
    /// Raw CSS selector, passed through.
    Css { selector: String },
}

impl fmt::Display for ElementQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role { role, name: Some(n) } => write!(f, "{role} \"{n}\""),
            Self::Role { role, name: None } => write!(f, "{role}"),
            Self::Text { needle, exact } => {
                write!(f, "text={needle}{}", if *exact { " (exact)" } else { "" })
            }
            Self::Label { needle } => write!(f, "label={needle}"),
            Self::Placeholder { needle } => write!(f, "placeholder={needle}"),
            Self::Css { selector } => write!(f, "css={selector}"),
        }
    }
}

/// A concrete locator string plus the strategy it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledQuery {
    Css(String),
    XPath(String),
}

impl ElementQuery {
    /// Compile to a locator string. `relative` makes XPath queries search
    /// inside a context element instead of the whole document.
    pub fn compile(&self, relative: bool) -> CompiledQuery {
        let prefix = if relative { ".//" } else { "//" };
        match self {
            Self::Role { role, name } => {
                CompiledQuery::XPath(role_xpath(prefix, role, name.as_deref()))
            }
            Self::Text { needle, exact } => {
                let lit = xpath_literal(needle);
                if *exact {
                    CompiledQuery::XPath(format!("{prefix}*[normalize-space(.) = {lit}]"))
                } else {
                    CompiledQuery::XPath(format!("{prefix}*[text()[contains(., {lit})]]"))
                }
            }
            Self::Label { needle } => {
                let lit = xpath_literal(needle);
                CompiledQuery::XPath(format!(
                    "{prefix}label[contains(normalize-space(.), {lit})]//*[self::input or self::textarea or self::select] \
                     | {prefix}*[@id = //label[contains(normalize-space(.), {lit})]/@for] \
                     | {prefix}*[@aria-label and contains(@aria-label, {lit})]"
                ))
            }
            Self::Placeholder { needle } => {
                let lit = xpath_literal(needle);
                CompiledQuery::XPath(format!("{prefix}*[contains(@placeholder, {lit})]"))
            }
            Self::Css { selector } => CompiledQuery::Css(selector.clone()),
        }
    }
}

fn role_xpath(prefix: &str, role: &str, name: Option<&str>) -> String {
    let role_lower = role.to_ascii_lowercase();
    let mut alternatives = vec![format!("@role = {}", xpath_literal(&role_lower))];
    alternatives.extend(
        implicit_role_tests(&role_lower)
            .iter()
            .map(|t| t.to_string()),
    );
    let role_pred = alternatives.join(" or ");

    match name {
        Some(n) => format!("{prefix}*[({role_pred}) and ({})]", name_predicate(n)),
        None => format!("{prefix}*[{role_pred}]"),
    }
}

/// Accessible-name predicate: text content plus the attributes browsers use
/// for name computation on common controls.
fn name_predicate(name: &str) -> String {
    let lit = xpath_literal(name);
    [
        format!("contains(normalize-space(string(.)), {lit})"),
        format!("contains(@aria-label, {lit})"),
        format!("contains(@value, {lit})"),
        format!("contains(@alt, {lit})"),
        format!("contains(@title, {lit})"),
        format!("contains(@placeholder, {lit})"),
    ]
    .join(" or ")
}

/// XPath node tests for the tags that carry a role implicitly.
fn implicit_role_tests(role: &str) -> Vec<&'static str> {
    match role {
        "button" => vec![
            "self::button",
            "self::input[@type='button' or @type='submit' or @type='reset']",
            "self::summary",
        ],
        "link" => vec!["self::a[@href]", "self::area[@href]"],
        "textbox" => vec![
            "self::textarea",
            "self::input[not(@type) or @type='text' or @type='email' or @type='url' or @type='tel' or @type='password' or @type='number']",
        ],
        "searchbox" => vec!["self::input[@type='search']"],
        "checkbox" => vec!["self::input[@type='checkbox']"],
        "radio" => vec!["self::input[@type='radio']"],
        "combobox" => vec!["self::select[not(@multiple)]", "self::input[@list]"],
        "listbox" => vec!["self::select[@multiple]", "self::datalist"],
        "option" => vec!["self::option"],
        "slider" => vec!["self::input[@type='range']"],
        "heading" => vec![
            "self::h1", "self::h2", "self::h3", "self::h4", "self::h5", "self::h6",
        ],
        "img" => vec!["self::img"],
        "list" => vec!["self::ul", "self::ol", "self::menu"],
        "listitem" => vec!["self::li"],
        "table" => vec!["self::table"],
        "row" => vec!["self::tr"],
        "cell" => vec!["self::td"],
        "columnheader" => vec!["self::th[not(@scope) or @scope='col']"],
        "rowheader" => vec!["self::th[@scope='row']"],
        "rowgroup" => vec!["self::tbody", "self::thead", "self::tfoot"],
        "navigation" => vec!["self::nav"],
        "main" => vec!["self::main"],
        "banner" => vec!["self::header"],
        "contentinfo" => vec!["self::footer"],
        "complementary" => vec!["self::aside"],
        "form" => vec!["self::form"],
        "search" => vec!["self::search"],
        "article" => vec!["self::article"],
        "region" => vec!["self::section"],
        "dialog" => vec!["self::dialog"],
        "separator" => vec!["self::hr"],
        "figure" => vec!["self::figure"],
        "paragraph" => vec!["self::p"],
        "blockquote" => vec!["self::blockquote"],
        "caption" => vec!["self::caption", "self::figcaption"],
        "term" => vec!["self::dt"],
        "definition" => vec!["self::dd"],
        "code" => vec!["self::code"],
        "emphasis" => vec!["self::em"],
        "strong" => vec!["self::strong"],
        "time" => vec!["self::time"],
        "progressbar" => vec!["self::progress"],
        "meter" => vec!["self::meter"],
        "group" => vec!["self::fieldset", "self::optgroup", "self::details"],
        "deletion" => vec!["self::del"],
        "insertion" => vec!["self::ins"],
        "subscript" => vec!["self::sub"],
        "superscript" => vec!["self::sup"],
        // The remaining roles only exist with an explicit role attribute.
        _ => vec![],
    }
}

/// Produce a valid XPath 1.0 string literal for arbitrary input.
pub fn xpath_literal(input: &str) -> String {
    if !input.contains('"') {
        return format!("\"{input}\"");
    }
    if !input.contains('\'') {
        return format!("'{input}'");
    }

    // Mixed quotes need concat(): split on double quotes and stitch them
    // back in as single-quoted literals.
    let segments: Vec<&str> = input.split('"').collect();
    let mut parts: Vec<String> = Vec::new();
    for (index, part) in segments.iter().enumerate() {
        if !part.is_empty() {
            parts.push(format!("\"{part}\""));
        }
        if index + 1 < segments.len() {
            parts.push("'\"'".to_string());
        }
    }

    if parts.is_empty() {
        "\"\"".to_string()
    } else {
        format!("concat({})", parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_with_name_compiles_to_xpath_union() {
        let q = ElementQuery::Role {
            role: "button".into(),
            name: Some("Apply".into()),
        };
        let CompiledQuery::XPath(xp) = q.compile(false) else {
            panic!("expected xpath");
        };
        assert!(xp.starts_with("//*["));
        assert!(xp.contains("@role = \"button\""));
        assert!(xp.contains("self::button"));
        assert!(xp.contains("contains(normalize-space(string(.)), \"Apply\")"));
        assert!(xp.contains("contains(@aria-label, \"Apply\")"));
    }

    #[test]
    fn relative_compilation_scopes_into_context() {
        let q = ElementQuery::Role {
            role: "link".into(),
            name: None,
        };
        let CompiledQuery::XPath(xp) = q.compile(true) else {
            panic!("expected xpath");
        };
        assert!(xp.starts_with(".//*["));
    }

    #[test]
    fn exotic_roles_still_match_explicit_attribute() {
        let q = ElementQuery::Role {
            role: "menuitemcheckbox".into(),
            name: None,
        };
        let CompiledQuery::XPath(xp) = q.compile(false) else {
            panic!("expected xpath");
        };
        assert_eq!(xp, "//*[@role = \"menuitemcheckbox\"]");
    }

    #[test]
    fn css_queries_pass_through() {
        let q = ElementQuery::Css {
            selector: "#login > button.primary".into(),
        };
        assert_eq!(
            q.compile(false),
            CompiledQuery::Css("#login > button.primary".into())
        );
    }

    #[test]
    fn text_query_targets_direct_text_nodes() {
        let q = ElementQuery::Text {
            needle: "Sign in".into(),
            exact: false,
        };
        let CompiledQuery::XPath(xp) = q.compile(false) else {
            panic!("expected xpath");
        };
        assert_eq!(xp, "//*[text()[contains(., \"Sign in\")]]");
    }

    #[test]
    fn xpath_literal_handles_mixed_quotes() {
        assert_eq!(xpath_literal("plain"), "\"plain\"");
        assert_eq!(xpath_literal("it\"s"), "'it\"s'");
        assert_eq!(
            xpath_literal(r#"a"b'c"#),
            r#"concat("a",'"',"b'c")"#
        );
    }
}
