pub mod palette;
pub mod prompt;

pub use palette::{decode_drawing, extract_colors};
pub use prompt::generate_prompt;
