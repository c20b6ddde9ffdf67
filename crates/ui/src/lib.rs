pub mod app;
pub mod context;
pub mod vm;
pub mod views;

pub use app::App;
pub use context::{AppContext, InputHandoff, QuizLaunch, UiApp, build_app_context};
