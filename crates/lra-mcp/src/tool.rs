//! Descriptor and input schema of the single exposed tool.

use serde::Serialize;
use serde_json::{Value, json};

pub const TOOL_NAME: &str = "browser_visual_test";
pub const SERVER_NAME: &str = "browser-visual-testing";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const SET_VIEWPORT: &str = "set_viewport";
pub const DEFAULT_ACTION: &str = "screenshot";

/// Every action the tool accepts, in schema order.
pub const ACTIONS: &[&str] = &[
    "navigate",
    "screenshot",
    "zoom",
    "read_page",
    "scroll",
    "left_click",
    "right_click",
    "double_click",
    "type",
    "key",
    "form_input",
    SET_VIEWPORT,
];

const DESCRIPTION: &str = "Browser automation tool for visual testing of web applications.

Key actions for visual testing:
- navigate: Go to a URL (automatically captures screenshot)
- screenshot: Take a viewport screenshot
- zoom: Take a zoomed screenshot of a specific region
- read_page: Get DOM structure with element refs for analysis
- scroll: Scroll and capture new viewport
- set_viewport: Change viewport size for responsive testing

Mouse/Keyboard actions:
- left_click, right_click, double_click: Click elements
- type: Enter text
- key: Press key combinations
- form_input: Fill form fields

Use this for:
1. Visual verification of UI elements
2. Responsive design testing (mobile, tablet, desktop viewports)
3. End-to-end user flow testing
4. Screenshot comparison
";

#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: TOOL_NAME,
        description: DESCRIPTION,
        input_schema: input_schema(),
    }
}

/// Result of `initialize`.
pub fn server_info() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        },
        "capabilities": {
            "tools": {}
        }
    })
}

pub fn input_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "action": {
                "type": "string",
                "enum": ACTIONS,
                "description": "The browser action to perform.\n* `set_viewport`: Change the browser viewport size for responsive testing (requires viewport parameter)."
            },
            "text": {
                "type": "string",
                "description": "URL for navigate, text for type, key combination for key"
            },
            "ref": {
                "type": "string",
                "description": "Element reference from read_page"
            },
            "coordinate": {
                "type": "array",
                "items": {"type": "integer"},
                "description": "[x, y] pixel position"
            },
            "start_coordinate": {
                "type": "array",
                "items": {"type": "integer"},
                "description": "[x, y] start position for drags"
            },
            "scroll_direction": {
                "type": "string",
                "enum": ["up", "down", "left", "right"]
            },
            "scroll_amount": {
                "type": "integer",
                "description": "Number of scroll steps"
            },
            "duration": {
                "type": "number",
                "description": "Seconds to hold or wait"
            },
            "value": {
                "description": "Value for form_input"
            },
            "region": {
                "type": "array",
                "items": {"type": "integer"},
                "description": "[x0, y0, x1, y1] region for zoom"
            },
            "viewport": {
                "type": "array",
                "items": {"type": "integer"},
                "description": "Set viewport size for responsive testing. Format: [width, height]. Common sizes: [375, 667] (iPhone SE), [768, 1024] (iPad), [1920, 1080] (Desktop)"
            }
        },
        "required": ["action"]
    })
}

pub fn is_known_action(action: &str) -> bool {
    ACTIONS.contains(&action)
}
