pub mod error;
pub mod recognizer;
pub mod result;
pub mod tally;
