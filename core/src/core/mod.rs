pub mod engine;
pub mod prober;
pub mod result_aggregator;
pub mod target_manager;

use serde::{Serialize, Serializer};

/// Risky JavaScript pattern classification reported per URL.
///
/// Variants are declared in check order; `FlawLabel::ALL` and the detector
/// both rely on that order when rendering a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlawLabel {
    Eval,
    DocumentWrite,
    InnerHtml,
    WindowOpen,
    WithStatement,
    EventHandlers,
    FunctionConstructor,
    DynamicCodeExecution,
}

impl FlawLabel {
    pub const ALL: [FlawLabel; 8] = [
        FlawLabel::Eval,
        FlawLabel::DocumentWrite,
        FlawLabel::InnerHtml,
        FlawLabel::WindowOpen,
        FlawLabel::WithStatement,
        FlawLabel::EventHandlers,
        FlawLabel::FunctionConstructor,
        FlawLabel::DynamicCodeExecution,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FlawLabel::Eval => "eval() function used",
            FlawLabel::DocumentWrite => "document.write() function used",
            FlawLabel::InnerHtml => "innerHTML property used to insert HTML",
            FlawLabel::WindowOpen => "window.open() function used",
            FlawLabel::WithStatement => "with statement used",
            FlawLabel::EventHandlers => "Event handlers found",
            FlawLabel::FunctionConstructor => "Function constructor used",
            FlawLabel::DynamicCodeExecution => "Dynamic code execution found",
        }
    }
}

impl std::fmt::Display for FlawLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FlawLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One URL read from the input list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target(String);

impl Target {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<&str> for Target {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for Target {
    fn from(url: String) -> Self {
        Self(url)
    }
}

/// What came back from fetching a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    /// A response was received with this status code.
    Http(u16),
    /// The request never produced a response.
    Error(String),
}

impl ProbeStatus {
    /// Value of the "Status Code" column.
    pub fn label(&self) -> String {
        match self {
            ProbeStatus::Http(code) => code.to_string(),
            ProbeStatus::Error(_) => "Error".to_string(),
        }
    }
}

/// Serializes as the numeric code or the string `"Error"`, matching the
/// "Status Code" column.
impl Serialize for ProbeStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ProbeStatus::Http(code) => serializer.serialize_u16(*code),
            ProbeStatus::Error(_) => serializer.serialize_str("Error"),
        }
    }
}

/// Result of probing a single target. Built only by the prober and the
/// engine, so `flaws` is non-empty only for `Http(200)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub url: String,
    pub status: ProbeStatus,
    pub flaws: Vec<FlawLabel>,
}

impl ProbeOutcome {
    pub fn scanned(url: String, flaws: Vec<FlawLabel>) -> Self {
        Self { url, status: ProbeStatus::Http(200), flaws }
    }

    pub fn http(url: String, code: u16) -> Self {
        Self { url, status: ProbeStatus::Http(code), flaws: Vec::new() }
    }

    pub fn error(url: String, description: impl Into<String>) -> Self {
        Self { url, status: ProbeStatus::Error(description.into()), flaws: Vec::new() }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.status, ProbeStatus::Error(_))
    }

    /// Value of the "Flaws" column: labels joined in check order, or the
    /// transport error description.
    pub fn flaws_field(&self) -> String {
        match &self.status {
            ProbeStatus::Error(description) => format!("Error: {}", description),
            ProbeStatus::Http(_) => self
                .flaws
                .iter()
                .map(FlawLabel::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_render_in_check_order() {
        let outcome = ProbeOutcome::scanned(
            "https://example.com/app.js".to_string(),
            vec![FlawLabel::Eval, FlawLabel::DynamicCodeExecution],
        );
        assert_eq!(outcome.status.label(), "200");
        assert_eq!(outcome.flaws_field(), "eval() function used, Dynamic code execution found");
    }

    #[test]
    fn test_error_outcome_fields() {
        let outcome = ProbeOutcome::error("http://down.test/a.js".to_string(), "connection refused");
        assert!(outcome.is_error());
        assert_eq!(outcome.status.label(), "Error");
        assert_eq!(outcome.flaws_field(), "Error: connection refused");
    }

    #[test]
    fn test_non_success_has_empty_flaws_field() {
        let outcome = ProbeOutcome::http("https://example.com/missing.js".to_string(), 404);
        assert_eq!(outcome.status.label(), "404");
        assert_eq!(outcome.flaws_field(), "");
    }

    #[test]
    fn test_all_is_declaration_order() {
        assert_eq!(FlawLabel::ALL.first(), Some(&FlawLabel::Eval));
        assert_eq!(FlawLabel::ALL.last(), Some(&FlawLabel::DynamicCodeExecution));
        assert_eq!(FlawLabel::WithStatement.to_string(), "with statement used");
    }
}
