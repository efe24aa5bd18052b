//! The quill prediction engine: random-access search over sorted ngram
//! flat files, the completion predictor built on it, the paragraph
//! word-wrap codec, and the corpus table builder.

pub mod bsearch;
pub mod corpus;
pub mod ngram;
pub mod predict;
pub mod wordwrap;

pub use ngram::Match;
pub use predict::Predictor;
