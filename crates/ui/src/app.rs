use dioxus::prelude::*;

use crate::context::AppContext;
use crate::views::{QuizPlayer, hand_off_inputs};

#[component]
pub fn App() -> Element {
    let ctx = use_context::<AppContext>();
    let generation = use_signal(|| 0_u32);

    // Inputs are read before the old player (and its DOM) goes away.
    let reload = move |_: MouseEvent| {
        let ctx = ctx.clone();
        spawn(async move {
            hand_off_inputs(&ctx.launch().key, &ctx.handoff()).await;
            let mut generation = generation;
            generation += 1;
        });
    };

    rsx! {
        document::Title { "Quiz" }

        div { class: "app-root",
            ErrorBoundary {
                handle_error: |errors: ErrorContext| rsx! {
                    div { class: "fatal",
                        h1 { "Something went wrong" }
                        pre { "{errors:?}" }
                    }
                },
                // A new key drops the player and mounts a fresh one.
                QuizPlayer { key: "{generation}" }
                button {
                    class: "app-remount",
                    r#type: "button",
                    onclick: reload,
                    "Reload quiz"
                }
            }
        }
    }
}
