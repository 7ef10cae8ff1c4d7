//! GitHub Actions workflow commands.
//!
//! Commands are lines of the form `::name key=value,key=value::message`
//! written to stdout. Message data and property values are percent-escaped
//! so that newlines and the separators cannot break the line format.

use std::fmt;

fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn escape_property(value: &str) -> String {
    escape_data(value).replace(':', "%3A").replace(',', "%2C")
}

/// A single workflow command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowCommand {
    name: &'static str,
    properties: Vec<(&'static str, String)>,
    message: String,
}

impl WorkflowCommand {
    fn new(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            properties: Vec::new(),
            message: message.into(),
        }
    }

    /// Starts a collapsible log group.
    pub fn group(title: impl Into<String>) -> Self {
        Self::new("group", title)
    }

    /// Ends the innermost log group.
    pub fn end_group() -> Self {
        Self::new("endgroup", "")
    }

    /// Emits an error annotation.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new("error", message)
    }

    /// Adds a `key=value` property.
    pub fn property(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.properties.push((key, value.into()));
        self
    }

    /// Writes the command to stdout.
    pub fn issue(&self) {
        println!("{self}");
    }
}

impl fmt::Display for WorkflowCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "::{}", self.name)?;
        for (i, (key, value)) in self.properties.iter().enumerate() {
            let sep = if i == 0 { " " } else { "," };
            write!(f, "{sep}{key}={}", escape_property(value))?;
        }
        write!(f, "::{}", escape_data(&self.message))
    }
}

/// An open log group. Closes itself when dropped, so an early return still
/// leaves the log well-formed.
#[must_use = "the group closes as soon as the guard is dropped"]
pub struct LogGroup(());

impl LogGroup {
    /// Opens a group titled `title`.
    pub fn start(title: &str) -> Self {
        WorkflowCommand::group(title).issue();
        Self(())
    }
}

impl Drop for LogGroup {
    fn drop(&mut self) {
        WorkflowCommand::end_group().issue();
    }
}
