use dioxus::prelude::*;
use quiz_core::model::QuestionId;
use quiz_core::validation::BLANK_REQUIRED;

use super::cards::QuestionCard;
use crate::vm::{BlankSegment, MatchOptionVm, QuestionCardVm, QuestionInputVm, QuizIntent};

#[component]
fn CardsHarness(cards: Vec<QuestionCardVm>) -> Element {
    rsx! {
        for card in cards {
            QuestionCard { key: "{card.id}", card: card.clone(), on_intent: move |_: QuizIntent| {} }
        }
    }
}

fn render(cards: Vec<QuestionCardVm>) -> String {
    let mut dom = VirtualDom::new_with_props(CardsHarness, CardsHarnessProps { cards });
    dom.rebuild_in_place();
    dioxus_ssr::render(&dom)
}

#[test]
fn question_inputs_render_with_scrape_attributes() {
    let html = render(vec![
        QuestionCardVm {
            id: QuestionId::from("fb1"),
            number: 1,
            prompt: "The capital of France is ____ and known for ____.".into(),
            hint: Some("Think Europe".into()),
            input: QuestionInputVm::Blanks {
                segments: vec![
                    BlankSegment::Text("The capital of France is ".into()),
                    BlankSegment::Blank {
                        index: 0,
                        value: "Paris".into(),
                        error: None,
                    },
                    BlankSegment::Text(" and known for ".into()),
                    BlankSegment::Blank {
                        index: 1,
                        value: String::new(),
                        error: Some(BLANK_REQUIRED.into()),
                    },
                ],
            },
        },
        QuestionCardVm {
            id: QuestionId::from("m1"),
            number: 2,
            prompt: "Pick the river".into(),
            hint: None,
            input: QuestionInputVm::Matching {
                options: vec![
                    MatchOptionVm {
                        label: "Seine".into(),
                        selected: true,
                    },
                    MatchOptionVm {
                        label: "Thames".into(),
                        selected: false,
                    },
                ],
                error: None,
            },
        },
    ]);

    assert!(html.contains("data-question-id"), "missing scrape hooks in {html}");
    assert!(html.contains("data-blank"), "missing blank index in {html}");
    assert!(html.contains("Paris"), "missing blank value in {html}");
    assert!(html.contains(BLANK_REQUIRED), "missing blank error in {html}");
    assert!(html.contains("Think Europe"), "missing hint in {html}");
    assert!(html.contains("Pick the river"), "missing prompt in {html}");
    assert!(html.contains("Thames"), "missing option in {html}");
}

#[test]
fn malformed_question_renders_inline_error() {
    let html = render(vec![QuestionCardVm {
        id: QuestionId::from("r1"),
        number: 1,
        prompt: "Rank these".into(),
        hint: None,
        input: QuestionInputVm::Malformed {
            message: "This question cannot be shown: needs at least two items".into(),
        },
    }]);
    assert!(html.contains("cannot be shown"), "missing format error in {html}");
    assert!(!html.contains("data-question-id"), "malformed card rendered inputs: {html}");
}

#[test]
fn ranked_items_carry_positions_even_with_repeated_labels() {
    let html = render(vec![QuestionCardVm {
        id: QuestionId::from("r1"),
        number: 1,
        prompt: "Rank the steps".into(),
        hint: None,
        input: QuestionInputVm::Ranked {
            items: vec!["Mix".into(), "Bake".into(), "Mix".into()],
        },
    }]);

    assert_eq!(html.matches("data-rank").count(), 3, "missing ranked items in {html}");
    assert!(html.contains(r#"data-value="Bake""#), "missing rank value in {html}");
}
