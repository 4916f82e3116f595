//! The mapping from value representation codes to codec constructors.
//!
//! The global registry returned by [`registry`]
//! knows every standard value representation except SQ.
//! Custom registries can be built from [`CodecRegistry::standard`]
//! and handed to element buffers through their options.

use super::{
    CodecOptions, NumericCodec, Result, StringCodec, StringTraits, UnknownValueRepresentationSnafu,
    ValueCodec,
};
use dicombuf_core::{VrCode, VR};
use once_cell::sync::Lazy;
use snafu::OptionExt;
use std::collections::HashMap;
use std::fmt;

/// A constructor of value codecs.
pub type CodecFactory = Box<dyn Fn(VrCode, &CodecOptions) -> Box<dyn ValueCodec> + Send + Sync>;

/// Data type for a registry of value codecs.
pub struct CodecRegistry {
    factories: HashMap<VrCode, CodecFactory>,
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut codes: Vec<&str> = self.factories.keys().map(VrCode::as_str).collect();
        codes.sort_unstable();
        f.debug_struct("CodecRegistry")
            .field("factories", &codes)
            .finish()
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        CodecRegistry::standard()
    }
}

fn numeric<T: super::NumericElement>() -> CodecFactory {
    Box::new(|vr: VrCode, _: &CodecOptions| -> Box<dyn ValueCodec> {
        Box::new(NumericCodec::<T>::new(vr))
    })
}

fn string(traits: StringTraits) -> CodecFactory {
    Box::new(
        move |vr: VrCode, options: &CodecOptions| -> Box<dyn ValueCodec> {
            Box::new(StringCodec::new(vr, traits, *options))
        },
    )
}

impl CodecRegistry {
    /// Create a registry without any codec.
    pub fn new() -> Self {
        CodecRegistry {
            factories: HashMap::new(),
        }
    }

    /// Create a registry with a codec for every standard value representation
    /// other than SQ.
    pub fn standard() -> Self {
        let mut registry = CodecRegistry::new();
        for vr in VR::all() {
            if let Some(traits) = StringTraits::of(vr) {
                registry.register(vr, string(traits));
            }
        }

        registry.register(VR::OB, numeric::<u8>());
        registry.register(VR::UN, numeric::<u8>());
        registry.register(VrCode::SIGNED_BYTE, numeric::<i8>());
        registry.register(VR::OW, numeric::<u16>());
        registry.register(VR::AT, numeric::<u16>());
        registry.register(VR::US, numeric::<u16>());
        registry.register(VR::SS, numeric::<i16>());
        registry.register(VR::UL, numeric::<u32>());
        registry.register(VR::OL, numeric::<u32>());
        registry.register(VR::SL, numeric::<i32>());
        registry.register(VR::UV, numeric::<u64>());
        registry.register(VR::OV, numeric::<u64>());
        registry.register(VR::SV, numeric::<i64>());
        registry.register(VR::FL, numeric::<f32>());
        registry.register(VR::OF, numeric::<f32>());
        registry.register(VR::FD, numeric::<f64>());
        registry.register(VR::OD, numeric::<f64>());
        registry
    }

    /// Register a codec constructor for a value representation,
    /// replacing any previous one.
    /// Returns whether a constructor was replaced.
    pub fn register(&mut self, vr: impl Into<VrCode>, factory: CodecFactory) -> bool {
        self.factories.insert(vr.into(), factory).is_some()
    }

    /// Whether a codec is registered for the value representation.
    pub fn contains(&self, vr: VrCode) -> bool {
        self.factories.contains_key(&vr)
    }

    /// Create an empty codec for the value representation.
    pub fn create(&self, vr: VrCode, options: &CodecOptions) -> Result<Box<dyn ValueCodec>> {
        let factory = self
            .factories
            .get(&vr)
            .context(UnknownValueRepresentationSnafu { code: vr })?;
        Ok(factory(vr, options))
    }
}

static REGISTRY: Lazy<CodecRegistry> = Lazy::new(CodecRegistry::standard);

/// Retrieve the global codec registry.
pub fn registry() -> &'static CodecRegistry {
    &REGISTRY
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Error;

    #[test]
    fn every_standard_vr_but_sequences() {
        for vr in VR::all() {
            assert_eq!(
                registry().contains(VrCode::from(vr)),
                vr != VR::SQ,
                "{}",
                vr
            );
        }
    }

    #[test]
    fn signed_bytes() {
        let mut codec = registry()
            .create(VrCode::SIGNED_BYTE, &CodecOptions::new())
            .unwrap();
        codec.resize(1);
        codec.set_as_integer(0, -3);
        assert_eq!(codec.encode().unwrap().as_slice(), &[0xFDu8]);
    }

    #[test]
    fn codecs_follow_their_vr() {
        let options = CodecOptions::new();
        let codec = registry().create(VrCode::from(VR::FD), &options).unwrap();
        assert_eq!(codec.unit_size(), 8);
        assert_eq!(codec.vr_code(), VR::FD);

        let codec = registry().create(VrCode::from(VR::UI), &options).unwrap();
        assert_eq!(codec.padding_byte(), 0);
        assert_eq!(codec.max_value_length(), 64);

        let codec = registry().create(VrCode::from(VR::PN), &options).unwrap();
        assert_eq!(codec.separator(), Some('='));
        assert_eq!(codec.padding_byte(), b' ');

        for vr in [VR::DA, VR::TM, VR::DT] {
            let codec = registry().create(VrCode::from(vr), &options).unwrap();
            assert_eq!(codec.padding_byte(), b' ');
        }
    }

    #[test]
    fn unknown_vr() {
        let code = VrCode::new("XX").unwrap();
        let err = registry().create(code, &CodecOptions::new()).unwrap_err();
        assert!(matches!(err, Error::UnknownValueRepresentation { .. }));
        assert_eq!(err.to_string(), "unknown value representation `XX`");

        let err = registry()
            .create(VrCode::from(VR::SQ), &CodecOptions::new())
            .unwrap_err();
        assert!(matches!(err, Error::UnknownValueRepresentation { .. }));
    }

    #[test]
    fn custom_registration() {
        let mut registry = CodecRegistry::new();
        assert!(!registry.contains(VrCode::from(VR::US)));
        assert!(!registry.register(VR::US, numeric::<u32>()));
        assert!(registry.register(VR::US, numeric::<u16>()));
        let codec = registry
            .create(VrCode::from(VR::US), &CodecOptions::new())
            .unwrap();
        assert_eq!(codec.unit_size(), 2);

        let private = VrCode::new("ZZ").unwrap();
        registry.register(
            private,
            Box::new(|vr: VrCode, _: &CodecOptions| -> Box<dyn ValueCodec> {
                Box::new(NumericCodec::<u8>::new(vr))
            }),
        );
        let codec = registry.create(private, &CodecOptions::new()).unwrap();
        assert_eq!(codec.vr_code(), private);
    }
}
