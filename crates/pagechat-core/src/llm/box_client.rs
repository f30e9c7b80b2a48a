//! BoxGenerationClient -- type-erased wrapper for GenerationClient.
//!
//! `GenerationClient` is already object-safe (its only stream-producing
//! method returns a boxed stream), so the wrapper is a thin `Box<dyn _>`
//! that lets the binary pick a backend at runtime without threading a type
//! parameter through every service.

use secrecy::SecretString;

use super::client::{GenerationClient, TextStream};

/// Type-erased generation client for runtime backend selection.
pub struct BoxGenerationClient {
    inner: Box<dyn GenerationClient>,
}

impl BoxGenerationClient {
    /// Wrap a concrete `GenerationClient` in a type-erased box.
    pub fn new<T: GenerationClient + 'static>(client: T) -> Self {
        Self {
            inner: Box::new(client),
        }
    }
}

impl GenerationClient for BoxGenerationClient {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn generate(&self, credential: &SecretString, prompt: String) -> TextStream {
        self.inner.generate(credential, prompt)
    }
}
