use dioxus::prelude::*;
use quiz_core::model::QuestionId;

use crate::vm::{BlankSegment, MatchOptionVm, QuestionCardVm, QuestionInputVm, QuizIntent};

/// One question with the inputs of its kind.
///
/// Every value-carrying input has `data-question-id` (plus `data-blank` for
/// blanks, `data-rank` for ranked items) so the rendered-input scrape can
/// read it back.
#[component]
pub fn QuestionCard(card: QuestionCardVm, on_intent: EventHandler<QuizIntent>) -> Element {
    let card_id = card.id.to_string();
    let show_prompt = !matches!(card.input, QuestionInputVm::Blanks { .. });
    let id = card.id.clone();

    rsx! {
        section { class: "quiz-card", "data-question-card": "{card_id}",
            header { class: "quiz-card__header",
                span { class: "quiz-card__number", "{card.number}." }
                if show_prompt {
                    p { class: "quiz-card__prompt", "{card.prompt}" }
                }
            }
            if let Some(hint) = card.hint.as_ref() {
                p { class: "quiz-card__hint", "{hint}" }
            }
            match card.input.clone() {
                QuestionInputVm::Text { value, error } => rsx! {
                    TextAnswer { id, value, error, on_intent }
                },
                QuestionInputVm::Blanks { segments } => rsx! {
                    BlankAnswers { id, segments, on_intent }
                },
                QuestionInputVm::Ranked { items } => rsx! {
                    RankedAnswer { id, items, on_intent }
                },
                QuestionInputVm::Matching { options, error } => rsx! {
                    MatchingAnswer { id, options, error, on_intent }
                },
                QuestionInputVm::Malformed { message } => rsx! {
                    p { class: "quiz-error quiz-error--format", role: "alert", "{message}" }
                },
            }
        }
    }
}

#[component]
fn TextAnswer(
    id: QuestionId,
    value: String,
    error: Option<String>,
    on_intent: EventHandler<QuizIntent>,
) -> Element {
    let question_id = id.to_string();
    let class = if error.is_some() {
        "quiz-input quiz-input--text quiz-input--invalid"
    } else {
        "quiz-input quiz-input--text"
    };

    rsx! {
        textarea {
            class: "{class}",
            "data-question-id": "{question_id}",
            aria_invalid: error.is_some(),
            value: "{value}",
            oninput: move |evt: FormEvent| {
                on_intent.call(QuizIntent::SetText { id: id.clone(), value: evt.value() });
            },
        }
        if let Some(ref message) = error {
            p { class: "quiz-error", role: "alert", "{message}" }
        }
    }
}

#[component]
fn BlankAnswers(
    id: QuestionId,
    segments: Vec<BlankSegment>,
    on_intent: EventHandler<QuizIntent>,
) -> Element {
    rsx! {
        p { class: "quiz-blanks",
            for (position, segment) in segments.into_iter().enumerate() {
                match segment {
                    BlankSegment::Text(text) => rsx! {
                        span { key: "{position}", class: "quiz-blanks__text", "{text}" }
                    },
                    BlankSegment::Blank { index, value, error } => rsx! {
                        BlankField { key: "{position}", id: id.clone(), index, value, error, on_intent }
                    },
                }
            }
        }
    }
}

#[component]
fn BlankField(
    id: QuestionId,
    index: usize,
    value: String,
    error: Option<String>,
    on_intent: EventHandler<QuizIntent>,
) -> Element {
    let question_id = id.to_string();
    let class = if error.is_some() {
        "quiz-input quiz-input--blank quiz-input--invalid"
    } else {
        "quiz-input quiz-input--blank"
    };

    rsx! {
        span { class: "quiz-blank",
            input {
                class: "{class}",
                r#type: "text",
                "data-question-id": "{question_id}",
                "data-blank": "{index}",
                aria_invalid: error.is_some(),
                value: "{value}",
                oninput: move |evt: FormEvent| {
                    on_intent.call(QuizIntent::SetBlank { id: id.clone(), index, value: evt.value() });
                },
            }
            if let Some(ref message) = error {
                span { class: "quiz-error", role: "alert", "{message}" }
            }
        }
    }
}

#[component]
fn RankedAnswer(id: QuestionId, items: Vec<String>, on_intent: EventHandler<QuizIntent>) -> Element {
    let last = items.len().saturating_sub(1);

    rsx! {
        ol { class: "quiz-ranking",
            for (index, item) in items.into_iter().enumerate() {
                RankedItem {
                    key: "{index}-{item}",
                    id: id.clone(),
                    index,
                    label: item.clone(),
                    is_first: index == 0,
                    is_last: index == last,
                    on_intent,
                }
            }
        }
    }
}

#[component]
fn RankedItem(
    id: QuestionId,
    index: usize,
    label: String,
    is_first: bool,
    is_last: bool,
    on_intent: EventHandler<QuizIntent>,
) -> Element {
    let question_id = id.to_string();
    let up = id.clone();
    let down = id;

    rsx! {
        li {
            class: "quiz-ranking__item",
            "data-question-id": "{question_id}",
            "data-rank": "{index}",
            "data-value": "{label}",
            span { class: "quiz-ranking__label", "{label}" }
            button {
                class: "quiz-ranking__move",
                r#type: "button",
                aria_label: "Move up",
                disabled: is_first,
                onclick: move |_| on_intent.call(QuizIntent::MoveUp { id: up.clone(), index }),
                "▲"
            }
            button {
                class: "quiz-ranking__move",
                r#type: "button",
                aria_label: "Move down",
                disabled: is_last,
                onclick: move |_| on_intent.call(QuizIntent::MoveDown { id: down.clone(), index }),
                "▼"
            }
        }
    }
}

#[component]
fn MatchingAnswer(
    id: QuestionId,
    options: Vec<MatchOptionVm>,
    error: Option<String>,
    on_intent: EventHandler<QuizIntent>,
) -> Element {
    rsx! {
        div { class: "quiz-matching", role: "radiogroup",
            for option in options {
                MatchingOption {
                    key: "{option.label}",
                    id: id.clone(),
                    label: option.label.clone(),
                    selected: option.selected,
                    on_intent,
                }
            }
        }
        if let Some(message) = error {
            p { class: "quiz-error", role: "alert", "{message}" }
        }
    }
}

#[component]
fn MatchingOption(
    id: QuestionId,
    label: String,
    selected: bool,
    on_intent: EventHandler<QuizIntent>,
) -> Element {
    let group = id.to_string();
    let option = label.clone();

    rsx! {
        label { class: "quiz-option",
            input {
                r#type: "radio",
                name: "{group}",
                "data-question-id": "{group}",
                value: "{label}",
                checked: selected,
                onchange: move |_| {
                    on_intent.call(QuizIntent::Select { id: id.clone(), option: option.clone() });
                },
            }
            span { "{label}" }
        }
    }
}
