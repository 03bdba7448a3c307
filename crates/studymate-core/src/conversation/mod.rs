mod message;
mod transcript;

pub use message::{Message, Role};
pub use transcript::Transcript;
