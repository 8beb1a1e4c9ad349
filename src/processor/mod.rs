pub mod field_propagator;
pub mod rule_normalizer;
pub mod similarity_matcher;
pub mod table_assembler;
pub mod text_normalizer;

pub use field_propagator::*;
pub use rule_normalizer::*;
pub use similarity_matcher::*;
pub use table_assembler::*;
pub use text_normalizer::*;
