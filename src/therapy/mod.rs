pub mod questions;
pub mod session;

pub use questions::{generate_question, progress};
pub use session::{Action, TherapySession};
