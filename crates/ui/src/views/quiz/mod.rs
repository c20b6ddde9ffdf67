mod cards;
mod player;
mod scripts;

#[cfg(test)]
mod smoke;

pub use cards::QuestionCard;
pub use player::QuizPlayer;
pub(crate) use scripts::hand_off_inputs;
