use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{truncate, AppError, EXCERPT_MAX_LEN};
use crate::models::{NaturalLanguageQuery, SchemaContext, SqlStatement};
use crate::services::llm_service::LlmClient;

/// First fenced code block, optionally tagged `sql`
static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)```(?:sql)?\s*([^`]+)```").expect("Invalid code fence regex"));

const SYSTEM_INSTRUCTION: &str = "You are a SQL expert. Convert the user's question into a single valid PostgreSQL query.
Rules:
- Output ONLY the SQL query, with no explanations, comments, or markdown formatting
- Use only tables and columns from the schema below
- Make reasonable assumptions when the question is ambiguous";

/// Turns a natural-language question plus schema context into a SQL statement
pub struct TranslationService {
    llm: Arc<dyn LlmClient>,
    model: String,
    timeout: Duration,
}

impl TranslationService {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            llm,
            model: model.into(),
            timeout,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn build_prompt(query: &NaturalLanguageQuery, schema: &SchemaContext) -> String {
        format!(
            "{}\n\n{}\n\nQuestion: {}\n\nSQL Query:",
            SYSTEM_INSTRUCTION,
            schema.to_prompt_string(),
            query.as_str()
        )
    }

    /// Reduce a raw model reply to SQL.
    ///
    /// A fenced block is taken verbatim (trimmed). Unfenced text is trimmed and
    /// normalised to end in exactly one `;`.
    pub fn extract_sql(response: &str) -> Result<SqlStatement, AppError> {
        let sql = match CODE_FENCE.captures(response) {
            Some(captures) => captures
                .get(1)
                .map_or("", |m| m.as_str())
                .trim()
                .to_string(),
            None => {
                let body = response.trim();
                let body = body.strip_suffix(';').unwrap_or(body).trim_end();
                if body.is_empty() {
                    String::new()
                } else {
                    format!("{};", body)
                }
            }
        };

        SqlStatement::new(sql).map_err(|_| AppError::invalid_translation_response(response))
    }

    pub async fn translate(
        &self,
        query: &NaturalLanguageQuery,
        schema: &SchemaContext,
    ) -> Result<SqlStatement, AppError> {
        let prompt = Self::build_prompt(query, schema);

        tracing::debug!(
            model = %self.model,
            tables = schema.tables().len(),
            question = %truncate(query.as_str(), EXCERPT_MAX_LEN),
            "Requesting SQL translation"
        );

        let response = tokio::time::timeout(
            self.timeout,
            self.llm.generate(&prompt, &self.model, self.timeout),
        )
        .await
        .map_err(|_| {
            tracing::warn!(
                timeout_secs = self.timeout.as_secs(),
                "SQL translation timed out"
            );
            AppError::TranslationTimeout
        })??;

        if response.trim().is_empty() {
            return Err(AppError::invalid_translation_response(
                "Empty response from LLM",
            ));
        }

        Self::extract_sql(&response)
    }

    pub async fn is_available(&self) -> bool {
        self.llm.is_available().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnInfo, TableInfo};
    use crate::services::llm_service::mock::MockLlm;

    fn question(text: &str) -> NaturalLanguageQuery {
        NaturalLanguageQuery::new(text).unwrap()
    }

    fn users_schema() -> SchemaContext {
        SchemaContext::new(vec![TableInfo {
            schema_name: "public".to_string(),
            table_name: "users".to_string(),
            columns: vec![ColumnInfo {
                name: "id".to_string(),
                data_type: "integer".to_string(),
                nullable: false,
                primary_key: true,
            }],
            relations: vec![],
        }])
    }

    fn service(llm: MockLlm) -> TranslationService {
        TranslationService::new(Arc::new(llm), "llama3.2", Duration::from_secs(5))
    }

    #[test]
    fn test_extract_sql_from_fenced_block() {
        let response = "Here you go:\n```sql\nSELECT * FROM users;\n```\nThis lists users.";
        let sql = TranslationService::extract_sql(response).unwrap();
        assert_eq!(sql.as_str(), "SELECT * FROM users;");
    }

    #[test]
    fn test_extract_sql_from_untagged_fence() {
        let sql = TranslationService::extract_sql("```\nSELECT 1\n```").unwrap();
        assert_eq!(sql.as_str(), "SELECT 1");
    }

    #[test]
    fn test_extract_sql_fenced_body_is_verbatim() {
        let sql = TranslationService::extract_sql("```sql\nSELECT * FROM users\n```").unwrap();
        assert_eq!(sql.as_str(), "SELECT * FROM users");

        let response = "```sql\nBEGIN;\nUPDATE users SET active = true;\nCOMMIT;\n```";
        let sql = TranslationService::extract_sql(response).unwrap();
        assert_eq!(sql.as_str(), "BEGIN;\nUPDATE users SET active = true;\nCOMMIT;");
    }

    #[test]
    fn test_extract_sql_appends_terminator() {
        let sql = TranslationService::extract_sql("select 1 ").unwrap();
        assert_eq!(sql.as_str(), "select 1;");
    }

    #[test]
    fn test_extract_sql_keeps_single_terminator() {
        let sql = TranslationService::extract_sql("  SELECT count(*) FROM users ;  ").unwrap();
        assert_eq!(sql.as_str(), "SELECT count(*) FROM users;");
    }

    #[test]
    fn test_extract_sql_rejects_empty_fence() {
        assert!(matches!(
            TranslationService::extract_sql("```sql\n   \n```"),
            Err(AppError::InvalidTranslationResponse(_))
        ));
        assert!(matches!(
            TranslationService::extract_sql(" ; "),
            Err(AppError::InvalidTranslationResponse(_))
        ));
    }

    #[test]
    fn test_prompt_contains_schema_and_question() {
        let prompt = TranslationService::build_prompt(&question("How many users?"), &users_schema());
        assert!(prompt.starts_with("You are a SQL expert."));
        assert!(prompt.contains("Table: users"));
        assert!(prompt.contains("id (integer) PRIMARY KEY NOT NULL"));
        assert!(prompt.ends_with("Question: How many users?\n\nSQL Query:"));
    }

    #[test]
    fn test_prompt_with_empty_schema() {
        let prompt =
            TranslationService::build_prompt(&question("How many users?"), &SchemaContext::empty());
        assert!(prompt.contains("No schema information available."));
    }

    #[tokio::test]
    async fn test_translate_returns_extracted_sql() {
        let llm = Arc::new(MockLlm::replying("```sql\nSELECT count(*) FROM users\n```"));
        let service = TranslationService::new(llm.clone(), "llama3.2", Duration::from_secs(5));

        let sql = service
            .translate(&question("How many users?"), &users_schema())
            .await
            .unwrap();
        assert_eq!(sql.as_str(), "SELECT count(*) FROM users");
        assert_eq!(llm.calls(), 1);
        assert!(llm.prompts()[0].contains("Question: How many users?"));
    }

    #[tokio::test]
    async fn test_translate_rejects_blank_response() {
        let result = service(MockLlm::replying("   \n"))
            .translate(&question("How many users?"), &users_schema())
            .await;
        match result {
            Err(AppError::InvalidTranslationResponse(message)) => {
                assert_eq!(message, "Empty response from LLM")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_translate_propagates_unavailable() {
        let result = service(MockLlm::unavailable())
            .translate(&question("How many users?"), &users_schema())
            .await;
        assert!(matches!(result, Err(AppError::TranslationUnavailable(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_translate_times_out() {
        let llm = MockLlm::replying("SELECT 1").slow(Duration::from_secs(120));
        let service = TranslationService::new(Arc::new(llm), "llama3.2", Duration::from_secs(1));

        let result = service
            .translate(&question("How many users?"), &users_schema())
            .await;
        assert!(matches!(result, Err(AppError::TranslationTimeout)));
    }

    #[tokio::test]
    async fn test_is_available_delegates_to_client() {
        assert!(service(MockLlm::replying("SELECT 1")).is_available().await);
        assert!(!service(MockLlm::unavailable()).is_available().await);
    }
}
