//! Prompt construction for LLM requests.
//!
//! Four templates drive a chat turn. Each is plain text with `{field}`
//! placeholders that are filled in a single pass; substituted values are
//! never rescanned, so schema text or user input containing braces is safe.

use regex::Regex;
use std::sync::LazyLock;

use crate::config::PromptsConfig;
use crate::error::{Result, SqlFlowError};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").expect("placeholder pattern is valid"));

/// Turns a natural-language question into one SQL statement.
const SQL_GENERATION_TEMPLATE: &str = r#"You are a SQL assistant. Based on the schema below, write a SQL query to answer the user's question.
Return the full SQL query only, nothing else. You can generate any type of query: SELECT, SHOW, INSERT, UPDATE, DELETE, DESCRIBE, EXPLAIN, etc.

<SCHEMA>{schema}</SCHEMA>
Conversation History: {history}

User Request: {question}
SQL Query:"#;

/// Narrates the rows a read-style statement returned.
const ROWS_ANSWER_TEMPLATE: &str = r#"You are a data analyst. Write a natural language answer based on:
Schema: {schema}
Conversation History: {history}
User Question: {question}
SQL Query: {query}
SQL Response: {response}

Answer:"#;

/// Explains what a write-style statement changed.
const AFFECTED_ANSWER_TEMPLATE: &str = r#"You are a SQL assistant. Explain the result of a non-SELECT SQL query (INSERT, UPDATE, DELETE, etc.) in simple natural language.
SQL Query: {query}
Execution Result: {result}

Explanation:"#;

/// Diagnoses a failed turn.
const ERROR_EXPLANATION_TEMPLATE: &str = r#"You are a database expert. The following query failed. Explain why and how to fix it.
SQL Query: {query}
Error: {error}
Explanation:"#;

/// The four prompt templates of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// Question to SQL.
    SqlGeneration,
    /// Rows to prose.
    RowsAnswer,
    /// Affected-row count to prose.
    AffectedAnswer,
    /// Failure to diagnosis.
    ErrorExplanation,
}

impl TemplateKind {
    /// Returns the template's name, as used in the `[prompts]` config section.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SqlGeneration => "sql_generation",
            Self::RowsAnswer => "rows_answer",
            Self::AffectedAnswer => "affected_answer",
            Self::ErrorExplanation => "error_explanation",
        }
    }

    /// Returns the fields this template may reference.
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            Self::SqlGeneration => &["schema", "history", "question"],
            Self::RowsAnswer => &["schema", "history", "question", "query", "response"],
            Self::AffectedAnswer => &["query", "result"],
            Self::ErrorExplanation => &["query", "error"],
        }
    }

    /// Returns the built-in template text.
    pub fn default_text(&self) -> &'static str {
        match self {
            Self::SqlGeneration => SQL_GENERATION_TEMPLATE,
            Self::RowsAnswer => ROWS_ANSWER_TEMPLATE,
            Self::AffectedAnswer => AFFECTED_ANSWER_TEMPLATE,
            Self::ErrorExplanation => ERROR_EXPLANATION_TEMPLATE,
        }
    }
}

/// A template text bound to its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    kind: TemplateKind,
    text: String,
}

impl PromptTemplate {
    /// Returns the built-in template for `kind`.
    pub fn builtin(kind: TemplateKind) -> Self {
        Self {
            kind,
            text: kind.default_text().to_string(),
        }
    }

    /// Creates a template from custom text.
    ///
    /// Fails with a `Config` error if the text references a field outside
    /// the kind's field set.
    pub fn custom(kind: TemplateKind, text: impl Into<String>) -> Result<Self> {
        let template = Self {
            kind,
            text: text.into(),
        };
        if let Some(unknown) = template
            .placeholders()
            .into_iter()
            .find(|name| !kind.fields().contains(name))
        {
            return Err(SqlFlowError::config(format!(
                "Prompt template '{}' uses unknown placeholder {{{}}}; allowed: {}",
                kind.name(),
                unknown,
                kind.fields().join(", ")
            )));
        }
        Ok(template)
    }

    /// Returns the names of all placeholders in order of appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        PLACEHOLDER
            .captures_iter(&self.text)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect()
    }

    /// Renders the template with the given field values.
    ///
    /// Fails with a `Template` error if a placeholder has no value.
    pub fn render(&self, values: &[(&str, &str)]) -> Result<String> {
        let lookup = |name: &str| {
            values
                .iter()
                .find(|(field, _)| *field == name)
                .map(|(_, value)| *value)
        };

        if let Some(missing) = self
            .placeholders()
            .into_iter()
            .find(|name| lookup(name).is_none())
        {
            return Err(SqlFlowError::template(format!(
                "Template '{}' needs field '{}' but it was not supplied",
                self.kind.name(),
                missing
            )));
        }

        Ok(PLACEHOLDER
            .replace_all(&self.text, |caps: &regex::Captures| {
                lookup(&caps[1]).unwrap_or_default().to_string()
            })
            .into_owned())
    }
}

/// The complete set of templates used by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    sql_generation: PromptTemplate,
    rows_answer: PromptTemplate,
    affected_answer: PromptTemplate,
    error_explanation: PromptTemplate,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            sql_generation: PromptTemplate::builtin(TemplateKind::SqlGeneration),
            rows_answer: PromptTemplate::builtin(TemplateKind::RowsAnswer),
            affected_answer: PromptTemplate::builtin(TemplateKind::AffectedAnswer),
            error_explanation: PromptTemplate::builtin(TemplateKind::ErrorExplanation),
        }
    }
}

impl PromptSet {
    /// Builds the set from config overrides, keeping built-ins for unset entries.
    pub fn from_config(config: &PromptsConfig) -> Result<Self> {
        let pick = |kind: TemplateKind, text: &Option<String>| match text {
            Some(text) => PromptTemplate::custom(kind, text.clone()),
            None => Ok(PromptTemplate::builtin(kind)),
        };

        Ok(Self {
            sql_generation: pick(TemplateKind::SqlGeneration, &config.sql_generation)?,
            rows_answer: pick(TemplateKind::RowsAnswer, &config.rows_answer)?,
            affected_answer: pick(TemplateKind::AffectedAnswer, &config.affected_answer)?,
            error_explanation: pick(TemplateKind::ErrorExplanation, &config.error_explanation)?,
        })
    }

    /// Renders the question-to-SQL prompt.
    pub fn sql_generation(&self, schema: &str, history: &str, question: &str) -> Result<String> {
        self.sql_generation.render(&[
            ("schema", schema),
            ("history", history),
            ("question", question),
        ])
    }

    /// Renders the rows-to-prose prompt.
    pub fn rows_answer(
        &self,
        schema: &str,
        history: &str,
        question: &str,
        query: &str,
        response: &str,
    ) -> Result<String> {
        self.rows_answer.render(&[
            ("schema", schema),
            ("history", history),
            ("question", question),
            ("query", query),
            ("response", response),
        ])
    }

    /// Renders the affected-count explanation prompt.
    pub fn affected_answer(&self, query: &str, result: &str) -> Result<String> {
        self.affected_answer
            .render(&[("query", query), ("result", result)])
    }

    /// Renders the error diagnosis prompt.
    pub fn error_explanation(&self, query: &str, error: &str) -> Result<String> {
        self.error_explanation
            .render(&[("query", query), ("error", error)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_templates_only_use_their_fields() {
        for kind in [
            TemplateKind::SqlGeneration,
            TemplateKind::RowsAnswer,
            TemplateKind::AffectedAnswer,
            TemplateKind::ErrorExplanation,
        ] {
            let template = PromptTemplate::builtin(kind);
            let mut used = template.placeholders();
            used.sort_unstable();
            used.dedup();
            let mut fields = kind.fields().to_vec();
            fields.sort_unstable();
            assert_eq!(used, fields, "{}", kind.name());
        }
    }

    #[test]
    fn test_sql_generation_includes_schema_and_question() {
        let prompt = PromptSet::default()
            .sql_generation("Table: users", "Human: hi", "show tables")
            .unwrap();

        assert!(prompt.contains("<SCHEMA>Table: users</SCHEMA>"));
        assert!(prompt.contains("Conversation History: Human: hi"));
        assert!(prompt.contains("User Request: show tables"));
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let prompt = PromptSet::default()
            .error_explanation("SELECT '{error}'", "bad {query}")
            .unwrap();

        assert!(prompt.contains("SQL Query: SELECT '{error}'"));
        assert!(prompt.contains("Error: bad {query}"));
    }

    #[test]
    fn test_missing_field_is_template_error() {
        let template = PromptTemplate::builtin(TemplateKind::AffectedAnswer);
        let err = template.render(&[("query", "DELETE FROM t")]).unwrap_err();

        assert!(matches!(err, SqlFlowError::Template(_)));
        assert!(err.to_string().contains("result"));
    }

    #[test]
    fn test_custom_template_with_unknown_placeholder_is_rejected() {
        let err = PromptTemplate::custom(TemplateKind::AffectedAnswer, "{query} {schema}")
            .unwrap_err();
        assert!(matches!(err, SqlFlowError::Config(_)));
    }

    #[test]
    fn test_json_braces_are_not_placeholders() {
        let template =
            PromptTemplate::custom(TemplateKind::AffectedAnswer, r#"{"sql": "{query}"} -> {result}"#)
                .unwrap();
        assert_eq!(
            template.render(&[("query", "X"), ("result", "1")]).unwrap(),
            r#"{"sql": "X"} -> 1"#
        );
    }

    #[test]
    fn test_from_config_overrides_one_template() {
        let config = PromptsConfig {
            affected_answer: Some("Changed: {result}".to_string()),
            ..Default::default()
        };
        let set = PromptSet::from_config(&config).unwrap();

        assert_eq!(set.affected_answer("DELETE", "5").unwrap(), "Changed: 5");
        assert_eq!(set.sql_generation, PromptTemplate::builtin(TemplateKind::SqlGeneration));
    }
}
