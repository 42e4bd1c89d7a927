mod board;
mod card;
mod comment;

pub use board::*;
pub use card::*;
pub use comment::*;
