//! REST collaborator: question lists and server-confirmed answers.

use async_trait::async_trait;
use quiz_core::model::{QuizKind, TaskId};
use quiz_core::normalize::RawQuestion;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::QuizApiError;

/// Answers the server already accepted for a task.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfirmedAnswers {
    #[serde(default)]
    pub answers: Map<String, Value>,
}

#[async_trait]
pub trait QuizApi: Send + Sync {
    /// Fetch the raw question list for a task.
    ///
    /// # Errors
    ///
    /// Returns `QuizApiError` when the request fails or cannot be decoded.
    async fn fetch_questions(
        &self,
        kind: QuizKind,
        task_id: TaskId,
    ) -> Result<Vec<RawQuestion>, QuizApiError>;

    /// Fetch previously confirmed answers; `None` when the task has none.
    ///
    /// # Errors
    ///
    /// Returns `QuizApiError` when the request fails or cannot be decoded.
    async fn fetch_confirmed_answers(
        &self,
        kind: QuizKind,
        task_id: TaskId,
    ) -> Result<Option<ConfirmedAnswers>, QuizApiError>;
}

#[derive(Clone, Debug)]
pub struct QuizApiConfig {
    pub base_url: String,
}

impl QuizApiConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[derive(Clone)]
pub struct HttpQuizApi {
    client: Client,
    config: QuizApiConfig,
}

impl HttpQuizApi {
    #[must_use]
    pub fn new(config: QuizApiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn url(&self, task_id: TaskId, resource: &str) -> String {
        format!(
            "{}/tasks/{task_id}/{resource}",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl QuizApi for HttpQuizApi {
    async fn fetch_questions(
        &self,
        kind: QuizKind,
        task_id: TaskId,
    ) -> Result<Vec<RawQuestion>, QuizApiError> {
        let response = self
            .client
            .get(self.url(task_id, "questions"))
            .query(&[("type", kind.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(QuizApiError::HttpStatus(response.status().as_u16()));
        }

        let body: QuestionsResponse = response.json().await?;
        Ok(body.into_questions())
    }

    async fn fetch_confirmed_answers(
        &self,
        kind: QuizKind,
        task_id: TaskId,
    ) -> Result<Option<ConfirmedAnswers>, QuizApiError> {
        let response = self
            .client
            .get(self.url(task_id, "confirmed-answers"))
            .query(&[("type", kind.as_str())])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(QuizApiError::HttpStatus(response.status().as_u16()));
        }

        let body: Option<ConfirmedAnswers> = response.json().await?;
        Ok(body.filter(|confirmed| !confirmed.answers.is_empty()))
    }
}

/// The endpoint answers either with a bare list or `{ "questions": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QuestionsResponse {
    List(Vec<RawQuestion>),
    Wrapped { questions: Vec<RawQuestion> },
}

impl QuestionsResponse {
    fn into_questions(self) -> Vec<RawQuestion> {
        match self {
            QuestionsResponse::List(questions) | QuestionsResponse::Wrapped { questions } => {
                questions
            }
        }
    }
}
