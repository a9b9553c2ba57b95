//! The tool surface exposed to the model.

use serde_json::json;
use webpilot_llm::ToolSpec;

/// Every tool the agent understands, in the order they are advertised.
pub fn all_tools() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "navigate".into(),
            description: "Open a URL in the current tab. A missing scheme defaults to https."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "url": { "type": "string", "description": "Address to open" }
                },
                "required": ["url"]
            }),
        },
        ToolSpec {
            name: "click".into(),
            description: "Click one element. Selector syntax: ARIA role and name like \
                          button \"Submit\", or text=/label=/placeholder= prefixes, or CSS."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "selector": { "type": "string" }
                },
                "required": ["selector"]
            }),
        },
        ToolSpec {
            name: "type".into(),
            description: "Clear a field and type text into it.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "selector": { "type": "string" },
                    "text": { "type": "string" }
                },
                "required": ["selector", "text"]
            }),
        },
        ToolSpec {
            name: "scroll".into(),
            description: "Scroll the page up or down by one screenful.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "direction": { "type": "string", "enum": ["up", "down"] }
                },
                "required": ["direction"]
            }),
        },
        ToolSpec {
            name: "read_page".into(),
            description: "Re-read the current page and return a fresh accessibility snapshot."
                .into(),
            parameters: json!({ "type": "object", "properties": {} }),
        },
        ToolSpec {
            name: "go_back".into(),
            description: "Go back in browser history.".into(),
            parameters: json!({ "type": "object", "properties": {} }),
        },
        ToolSpec {
            name: "select_option".into(),
            description: "Choose an option in a <select> by value or visible label.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "selector": { "type": "string" },
                    "value": { "type": "string" }
                },
                "required": ["selector", "value"]
            }),
        },
        ToolSpec {
            name: "press_key".into(),
            description: "Press one keyboard key, e.g. Enter, Tab, Escape, ArrowDown.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "key": { "type": "string" }
                },
                "required": ["key"]
            }),
        },
        ToolSpec {
            name: "hover".into(),
            description: "Move the pointer over an element (opens hover menus).".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "selector": { "type": "string" }
                },
                "required": ["selector"]
            }),
        },
        ToolSpec {
            name: "wait".into(),
            description: "Pause for up to 10000 milliseconds.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "ms": { "type": "integer", "minimum": 0 }
                },
                "required": ["ms"]
            }),
        },
        ToolSpec {
            name: "ask_user".into(),
            description: "Ask the human operator a question and wait for the answer.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "question": { "type": "string" }
                },
                "required": ["question"]
            }),
        },
        done_tool(),
    ]
}

/// The reserved tool that ends the run; also offered alone at the
/// iteration ceiling to force a summary.
pub fn done_tool() -> ToolSpec {
    ToolSpec {
        name: "done".into(),
        description: "Finish the task and report what was achieved.".into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "summary": {
                    "type": "string",
                    "description": "What was done, what remains, and suggested next steps"
                }
            },
            "required": ["summary"]
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_full_surface_is_advertised() {
        let names: Vec<String> = all_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            [
                "navigate",
                "click",
                "type",
                "scroll",
                "read_page",
                "go_back",
                "select_option",
                "press_key",
                "hover",
                "wait",
                "ask_user",
                "done"
            ]
        );
    }

    #[test]
    fn every_tool_has_an_object_schema() {
        for tool in all_tools() {
            assert_eq!(tool.parameters["type"], "object", "{}", tool.name);
        }
    }
}
