use async_trait::async_trait;
use dioxus::document::eval;
use quiz_core::model::{ContentKey, QuestionId};
use serde::Deserialize;
use services::{RenderedInputs, RenderedValue, ScrapeError};

use crate::context::InputHandoff;

#[derive(Clone, Debug, Deserialize)]
struct ScrapedInput {
    question_id: String,
    position: Option<usize>,
    value: String,
}

const SCRAPE_INPUTS_SCRIPT_TEMPLATE: &str = r#"
    const root = document.querySelector('[data-quiz-key="{quiz_key}"]');
    if (!root) { return []; }
    const values = [];
    root.querySelectorAll("[data-question-id]").forEach((el) => {
        if (el.type === "radio" && !el.checked) { return; }
        const position = el.dataset.blank ?? el.dataset.rank;
        const value = typeof el.value === "string" ? el.value : (el.dataset.value ?? "");
        values.push({
            question_id: el.dataset.questionId,
            position: position === undefined ? null : Number(position),
            value,
        });
    });
    return values;
"#;

fn scrape_inputs_script(key: &ContentKey) -> String {
    SCRAPE_INPUTS_SCRIPT_TEMPLATE.replace("{quiz_key}", key.as_str())
}

fn focus_question_script(quiz_key: &ContentKey, question_id: &QuestionId) -> String {
    format!(
        r#"(function() {{
            const root = document.querySelector('[data-quiz-key={quiz_key:?}]');
            if (!root) return;
            const card = root.querySelector('[data-question-card={question_id:?}]');
            if (!card) return;
            card.scrollIntoView({{ block: "center" }});
            const input = card.querySelector("input, textarea, button");
            if (input) input.focus();
        }})();"#,
        quiz_key = quiz_key.as_str(),
        question_id = question_id.as_str(),
    )
}

pub(super) async fn focus_question(quiz_key: &ContentKey, question_id: &QuestionId) {
    let _ = eval(&focus_question_script(quiz_key, question_id)).await;
}

/// Read every answer input currently rendered for `key`.
async fn read_rendered_inputs(key: &ContentKey) -> Result<Vec<RenderedValue>, ScrapeError> {
    let scraped = eval(&scrape_inputs_script(key))
        .join::<Vec<ScrapedInput>>()
        .await
        .map_err(|err| ScrapeError(format!("{err:?}")))?;
    Ok(scraped
        .into_iter()
        .map(|input| RenderedValue {
            question_id: QuestionId::new(input.question_id),
            position: input.position,
            value: input.value,
        })
        .collect())
}

/// Capture the player's inputs before it is torn down, for the next mount.
pub(crate) async fn hand_off_inputs(key: &ContentKey, handoff: &InputHandoff) {
    match read_rendered_inputs(key).await {
        Ok(values) => {
            tracing::debug!(%key, count = values.len(), "captured rendered inputs");
            handoff.stash(values);
        }
        Err(err) => tracing::warn!(%key, error = %err, "could not capture rendered inputs"),
    }
}

/// Last-resort recovery: values captured from the previous player, or
/// whatever the document still shows.
pub(super) struct DocumentInputs {
    key: ContentKey,
    handed_off: Vec<RenderedValue>,
}

impl DocumentInputs {
    pub(super) fn new(key: ContentKey, handed_off: Vec<RenderedValue>) -> Self {
        Self { key, handed_off }
    }
}

#[async_trait(?Send)]
impl RenderedInputs for DocumentInputs {
    async fn scrape(&self) -> Result<Vec<RenderedValue>, ScrapeError> {
        if !self.handed_off.is_empty() {
            return Ok(self.handed_off.clone());
        }
        read_rendered_inputs(&self.key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrape_script_targets_the_quiz_root() {
        let script = scrape_inputs_script(&ContentKey::for_content(9));
        assert!(script.contains(r#"[data-quiz-key="content-9"]"#));
        assert!(script.contains("dataset.rank"));
    }
}
