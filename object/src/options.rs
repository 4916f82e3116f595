//! Options for element buffers.

use dicombuf_encoding::codec::{registry, CodecOptions, CodecRegistry};
use std::sync::Arc;

/// A set of options for creating codecs out of an element buffer.
///
/// # Example
///
/// ```
/// # use dicombuf_object::{BufferOptions, ElementBuffer};
/// # use dicombuf_encoding::CodecOptions;
/// # use dicombuf_core::VR;
/// let buffer = ElementBuffer::new(VR::DA).with_options(
///     BufferOptions::new().codec_options(CodecOptions::new().strict_temporal(true)),
/// );
/// ```
#[derive(Debug, Default, Clone)]
#[non_exhaustive]
pub struct BufferOptions {
    /// Options passed to every codec created for the buffer
    pub codec: CodecOptions,
    /// The registry used to create codecs,
    /// or `None` for the process-wide standard registry
    pub registry: Option<Arc<CodecRegistry>>,
}

impl BufferOptions {
    /// Create the default options.
    pub fn new() -> Self {
        BufferOptions::default()
    }

    /// Set the options passed to every codec.
    pub fn codec_options(mut self, codec: CodecOptions) -> Self {
        self.codec = codec;
        self
    }

    /// Create codecs with the given registry
    /// instead of the process-wide standard one.
    pub fn registry(mut self, registry: Arc<CodecRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub(crate) fn codec_registry(&self) -> &CodecRegistry {
        match &self.registry {
            Some(registry) => registry.as_ref(),
            None => registry(),
        }
    }
}
