pub mod completion;
pub mod extract;
pub mod featherless;
pub mod gemini;
pub mod image;
pub mod media;
pub mod pollinations;

pub use completion::{ChatCompletion, CompletionError, SamplingConfig};
pub use featherless::FeatherlessClient;
pub use gemini::GeminiImageClient;
pub use image::{ImageSynthesis, ImageSynthesizer, SynthesisOutcome};
pub use pollinations::PollinationsClient;
