pub mod catalog;
pub mod input;
pub mod scanner;

pub use catalog::{InMemoryCatalog, PromptCatalog, PromptEntry, ResolvedTag};
pub use input::{EditOutcome, PromptInput};
pub use scanner::{scan, ScanResult, TagToken};
