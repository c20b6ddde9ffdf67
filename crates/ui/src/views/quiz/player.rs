use std::rc::Rc;

use dioxus::prelude::*;
use quiz_core::model::QuizKind;
use services::Liveness;

use crate::context::AppContext;
use crate::views::{ViewError, ViewState, view_state_from_resource};
use crate::vm::{QuizIntent, QuizPhase, QuizVm, ReviewRowVm, mount_quiz};

use super::cards::QuestionCard;
use super::scripts::{DocumentInputs, focus_question, hand_off_inputs};

fn kind_title(kind: QuizKind) -> &'static str {
    match kind {
        QuizKind::Flashcard => "Flashcards",
        QuizKind::FillBlank => "Fill in the blanks",
        QuizKind::Flowchart => "Flowchart",
        QuizKind::Matching => "Matching",
        QuizKind::Ranking => "Ranking",
        QuizKind::QuestionAnswer => "Questions",
    }
}

#[component]
pub fn QuizPlayer() -> Element {
    let ctx = use_context::<AppContext>();
    let quiz_loop = ctx.quiz_loop();
    let launch = ctx.launch().clone();
    let quiz_key = launch.key.clone();
    let title = kind_title(launch.kind);

    let liveness = use_hook(Liveness::new);
    {
        let liveness = liveness.clone();
        use_drop(move || liveness.release());
    }

    let vm = use_signal(|| None::<QuizVm>);
    let submitting = use_signal(|| false);

    let handoff = ctx.handoff();

    let resource = {
        let quiz_loop = quiz_loop.clone();
        let mirror = ctx.mirror();
        let handoff = handoff.clone();
        use_resource(move || {
            let quiz_loop = quiz_loop.clone();
            let rendered = DocumentInputs::new(launch.key.clone(), handoff.take());
            let request = launch
                .request(mirror.clone(), liveness.clone())
                .with_rendered(Rc::new(rendered));
            let mut vm = vm;
            async move {
                if let Some(loaded) = mount_quiz(&quiz_loop, request).await {
                    vm.set(Some(loaded));
                }
                Ok::<_, ViewError>(())
            }
        })
    };
    let state = view_state_from_resource(&resource);

    let dispatch = {
        let quiz_loop = quiz_loop.clone();
        let quiz_key = quiz_key.clone();
        use_callback(move |intent: QuizIntent| {
            let mut vm = vm;
            if !intent.is_async() {
                let focus = vm.write().as_mut().and_then(|current| {
                    let _ = current.apply(intent);
                    current.take_focus()
                });
                if let Some(question_id) = focus {
                    let quiz_key = quiz_key.clone();
                    spawn(async move {
                        focus_question(&quiz_key, &question_id).await;
                    });
                }
                return;
            }

            let quiz_loop = quiz_loop.clone();
            let mut submitting = submitting;
            spawn(async move {
                submitting.set(true);
                let taken = vm.write().take();
                if let Some(mut current) = taken {
                    let _ = current.dispatch(&quiz_loop, intent).await;
                    // Always put the session back so the player stays usable.
                    vm.set(Some(current));
                }
                submitting.set(false);
            });
        })
    };

    let retry = {
        let quiz_key = quiz_key.clone();
        use_callback(move |()| {
            let quiz_key = quiz_key.clone();
            let handoff = handoff.clone();
            spawn(async move {
                hand_off_inputs(&quiz_key, &handoff).await;
                let mut vm = vm;
                let mut resource = resource;
                vm.set(None);
                resource.restart();
            });
        })
    };

    let vm_guard = vm.read();
    let phase = vm_guard.as_ref().map(QuizVm::phase);
    let cards = vm_guard.as_ref().map(QuizVm::cards).unwrap_or_default();
    let rows = vm_guard.as_ref().map(QuizVm::review_rows).unwrap_or_default();
    let notice = vm_guard.as_ref().and_then(QuizVm::notice);
    let load_error = vm_guard
        .as_ref()
        .and_then(QuizVm::load_error)
        .unwrap_or_else(|| ViewError::Unknown.message().to_string());
    let progress = vm_guard.as_ref().map(QuizVm::progress_label);
    let preview = vm_guard.as_ref().is_some_and(QuizVm::is_preview);
    drop(vm_guard);

    let body = if submitting() {
        rsx! { p { class: "quiz-status", "Submitting..." } }
    } else {
        match (state, phase) {
            (ViewState::Error(err), _) => rsx! {
                p { "{err.message()}" }
                button { class: "btn btn-secondary", r#type: "button", onclick: move |_| retry.call(()), "Retry" }
            },
            (ViewState::Ready(()), Some(QuizPhase::LoadFailed)) => rsx! {
                div { class: "quiz-load-error",
                    p { "{load_error}" }
                    button { class: "btn btn-secondary", r#type: "button", onclick: move |_| retry.call(()), "Retry" }
                }
            },
            (ViewState::Ready(()), Some(QuizPhase::Answering)) => rsx! {
                if let Some(err) = notice {
                    p { class: "quiz-notice", role: "alert", "{err.message()}" }
                }
                for card in cards {
                    QuestionCard { key: "{card.id}", card: card.clone(), on_intent: dispatch }
                }
                footer { class: "quiz-player__footer",
                    button {
                        class: "btn btn-primary",
                        id: "quiz-review",
                        r#type: "button",
                        onclick: move |_| dispatch.call(QuizIntent::Review),
                        "Review answers"
                    }
                }
            },
            (ViewState::Ready(()), Some(QuizPhase::Reviewing)) => rsx! {
                if let Some(err) = notice {
                    p { class: "quiz-notice", role: "alert", "{err.message()}" }
                }
                ReviewList { rows }
                footer { class: "quiz-player__footer",
                    button {
                        class: "btn btn-secondary",
                        r#type: "button",
                        onclick: move |_| dispatch.call(QuizIntent::Back),
                        "Back"
                    }
                    button {
                        class: "btn btn-primary",
                        id: "quiz-confirm",
                        r#type: "button",
                        onclick: move |_| dispatch.call(QuizIntent::Confirm),
                        "Confirm"
                    }
                }
            },
            (ViewState::Ready(()), Some(QuizPhase::Submitting)) => rsx! {
                p { class: "quiz-status", "Submitting..." }
            },
            (ViewState::Ready(()), Some(QuizPhase::Completed)) => rsx! {
                div { class: "quiz-complete",
                    h3 { class: "quiz-complete__title", "Quiz complete" }
                    ReviewList { rows }
                    button {
                        class: "btn btn-secondary",
                        id: "quiz-restart",
                        r#type: "button",
                        onclick: move |_| dispatch.call(QuizIntent::Restart),
                        "Start over"
                    }
                }
            },
            _ => rsx! { p { "Loading..." } },
        }
    };

    rsx! {
        div { class: "quiz-player", "data-quiz-key": "{quiz_key}",
            header { class: "quiz-player__header",
                h2 { class: "quiz-player__title", "{title}" }
                if preview {
                    span { class: "quiz-badge", "Preview" }
                }
                if let Some(progress) = progress {
                    span { class: "quiz-progress", "{progress}" }
                }
            }
            div { class: "quiz-player__body", {body} }
        }
    }
}

#[component]
fn ReviewList(rows: Vec<ReviewRowVm>) -> Element {
    rsx! {
        ol { class: "quiz-review",
            for row in rows {
                li { key: "{row.number}", class: "quiz-review__row",
                    p { class: "quiz-review__prompt", "{row.prompt}" }
                    p { class: "quiz-review__answer", "{row.answer}" }
                }
            }
        }
    }
}
