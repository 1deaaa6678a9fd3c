pub mod fields;
pub mod lexicon;
pub mod normalizer;

pub use fields::{FieldExtractor, KeywordFieldExtractor};
pub use normalizer::{NormalizerOptions, TextNormalizer};
