pub mod openai;

pub use openai::{AiGateway, Completion};
