pub mod echo;
#[cfg(feature = "http-provider")]
pub mod openai_compatible;
pub mod reliable;

pub use reliable::RetryingModelClient;
