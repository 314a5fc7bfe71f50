pub mod mock;
pub mod openai;

pub use mock::{MockProvider, MockResponse};
pub use openai::OpenAiProvider;
