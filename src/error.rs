//! Error types shared by the stores, the page handlers and the server.
//!
//! The `Display` text of every domain error is the exact message shown to the
//! user on the page, so handlers can render `err.to_string()` directly.

use thiserror::Error;

/// Failure to persist the project list.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The one-name-per-line format cannot hold this entry.
    #[error("entry {0:?} contains a line break")]
    MultiLineEntry(String),

    /// Used by in-memory stores that simulate a broken disk.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of a rejected project list operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectError {
    /// Bad user input. Nothing was changed.
    #[error("{0}")]
    Validation(String),

    /// The write-through failed and the in-memory list was rolled back.
    #[error("{0}")]
    Persistence(String),
}

/// Errors reported by the calculator page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalcError {
    #[error("Invalid input: Please enter valid numeric values.")]
    InvalidInput,

    #[error("Error: Division by zero is not allowed.")]
    DivisionByZero,

    #[error("Invalid operator selected.")]
    InvalidOperator,

    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// Errors reported by the stock lookup page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    #[error("Please enter a ticker symbol.")]
    EmptyTicker,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API call frequency limit reached. Please wait a minute or use your own key.")]
    RateLimit,

    #[error("Invalid ticker symbol or API error.")]
    InvalidTicker,

    #[error("Unexpected response from stock API.")]
    UnexpectedResponse,

    #[error("Unexpected response from stock API: bad '{field}' for {date}.")]
    MalformedQuote { date: String, field: String },
}

/// Invalid value in the process environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidVar {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Errors that abort server start-up or a page render.
#[cfg(feature = "web")]
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("template error: {0}")]
    Template(#[from] handlebars::TemplateError),

    #[error("render error: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
