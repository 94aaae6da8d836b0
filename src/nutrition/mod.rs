pub mod aggregate;
pub mod parser;
mod record;

pub use record::{EntrySource, NutritionRecord, TEMPLATE};
