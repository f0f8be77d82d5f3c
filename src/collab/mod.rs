//! External collaborators: the interfaces the pipeline depends on and
//! thin implementations over the LLM client and HTTP.

mod http;
mod llm;
mod traits;

pub use http::{HttpCatalogue, HttpIntentChannel};
pub use llm::{LlmGenerator, LlmValidator, ReviewCriteria};
pub use traits::{
    Catalogue, CatalogueEntry, CatalogueRecord, Generator, IntentChannel, Persistence, PersistReport, SubIntent,
    UiLayout, Validator, WrittenFile,
};
