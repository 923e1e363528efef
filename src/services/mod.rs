pub mod pipeline;
pub mod translate;

pub use pipeline::{fit_within, ImagePipeline, PipelineEvent, PreparedImage};
pub use translate::{
    contains_persian, detect_language, smart_translate, MyMemoryTranslator, NoopTranslator,
    TranslationOutcome, Translator,
};
