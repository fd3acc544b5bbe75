use regex::Regex;

use crate::core::FlawLabel;

/// Lexical detector for risky JavaScript patterns.
///
/// Every check runs against the raw body text, case-sensitive, and
/// contributes at most one label. This is co-occurrence matching, not a
/// parse: false positives on comments or string literals are expected.
pub struct FlawDetector {
    event_handler: Regex,
    function_constructor: Regex,
}

impl FlawDetector {
    pub fn new() -> Self {
        Self {
            event_handler: Regex::new(r"on\w+=").expect("event handler pattern is valid"),
            function_constructor: Regex::new(r"Function\(").expect("function pattern is valid"),
        }
    }

    /// Returns the labels whose condition holds for `body`, in check order.
    pub fn detect(&self, body: &str) -> Vec<FlawLabel> {
        FlawLabel::ALL
            .into_iter()
            .filter(|label| self.matches(*label, body))
            .collect()
    }

    fn matches(&self, label: FlawLabel, body: &str) -> bool {
        match label {
            FlawLabel::Eval => body.contains("eval(") && !body.contains("JSON.parse("),
            FlawLabel::DocumentWrite => body.contains("document.write"),
            FlawLabel::InnerHtml => body.contains("innerHTML") && body.contains('<'),
            FlawLabel::WindowOpen => body.contains("window.open"),
            FlawLabel::WithStatement => body.contains("with("),
            FlawLabel::EventHandlers => self.event_handler.is_match(body),
            FlawLabel::FunctionConstructor => self.function_constructor.is_match(body),
            // Any `eval` plus any `("` anywhere, not necessarily related.
            FlawLabel::DynamicCodeExecution => {
                body.contains("String.fromCharCode")
                    || (body.contains("eval") && body.contains("(\""))
            }
        }
    }
}

impl Default for FlawDetector {
    fn default() -> Self {
        Self::new()
    }
}
