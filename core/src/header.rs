//! Value representation identifiers.
//!
//! [`VR`] enumerates the value representations defined by the standard.
//! [`VrCode`] is what an element buffer actually stores:
//! any two upper case letters,
//! so that buffers declared with non-standard codes
//! can still be created and rejected only when a codec is requested.

use snafu::{OptionExt, Snafu};
use std::fmt;
use std::str::{from_utf8, FromStr};

macro_rules! value_representations {
    ($($vr:ident => $name:literal,)*) => {
        /// An enum type for a DICOM value representation.
        #[derive(Debug, Eq, PartialEq, Hash, Copy, Clone, Ord, PartialOrd)]
        pub enum VR {
            $(
                #[doc = $name]
                $vr,
            )*
        }

        const ALL_VRS: &[VR] = &[$(VR::$vr),*];

        impl VR {
            /// Retrieve a string representation of this VR.
            pub fn to_string(self) -> &'static str {
                match self {
                    $(VR::$vr => stringify!($vr),)*
                }
            }
        }
    };
}

value_representations! {
    AE => "Application Entity",
    AS => "Age String",
    AT => "Attribute Tag",
    CS => "Code String",
    DA => "Date",
    DS => "Decimal String",
    DT => "Date Time",
    FL => "Floating Point Single",
    FD => "Floating Point Double",
    IS => "Integer String",
    LO => "Long String",
    LT => "Long Text",
    OB => "Other Byte",
    OD => "Other Double",
    OF => "Other Float",
    OL => "Other Long",
    OV => "Other Very Long",
    OW => "Other Word",
    PN => "Person Name",
    SH => "Short String",
    SL => "Signed Long",
    SQ => "Sequence of Items",
    SS => "Signed Short",
    ST => "Short Text",
    SV => "Signed Very Long",
    TM => "Time",
    UC => "Unlimited Characters",
    UI => "Unique Identifier (UID)",
    UL => "Unsigned Long",
    UN => "Unknown",
    UR => "Universal Resource Identifier or Locator (URI/URL)",
    US => "Unsigned Short",
    UT => "Unlimited Text",
    UV => "Unsigned Very Long",
}

impl VR {
    /// Obtain the value representation corresponding to the given two bytes.
    /// Each byte should represent an alphabetic character in upper case.
    pub fn from_binary(chars: [u8; 2]) -> Option<Self> {
        VR::all().find(|vr| vr.to_bytes() == chars)
    }

    /// Iterate over every value representation known to this crate.
    pub fn all() -> impl Iterator<Item = VR> {
        ALL_VRS.iter().copied()
    }

    /// Retrieve a copy of this VR's byte representation.
    /// The function returns two alphabetic characters in upper case.
    pub fn to_bytes(self) -> [u8; 2] {
        let bytes = self.to_string().as_bytes();
        [bytes[0], bytes[1]]
    }
}

impl FromStr for VR {
    type Err = &'static str;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        VR::all()
            .find(|vr| vr.to_string() == string)
            .ok_or("no such value representation")
    }
}

impl fmt::Display for VR {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(VR::to_string(*self))
    }
}

/// An error raised when a text is not a well formed VR code.
#[derive(Debug, Snafu)]
#[snafu(display("`{}` is not a two-letter value representation code", code))]
pub struct InvalidVrCode {
    code: String,
}

/// The two-letter value representation code declared by an element buffer.
///
/// Unlike [`VR`], the code does not have to be a standard one.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone, Ord, PartialOrd)]
pub struct VrCode([u8; 2]);

impl VrCode {
    /// The code assumed when a buffer is declared with a malformed code.
    pub const DEFAULT: VrCode = VrCode(*b"OB");

    /// Signed bytes (SB), a non-standard code for arrays of `i8`.
    pub const SIGNED_BYTE: VrCode = VrCode(*b"SB");

    /// Create a code from two upper case ASCII letters.
    pub fn new(code: &str) -> Option<Self> {
        match code.as_bytes() {
            &[a, b] if a.is_ascii_uppercase() && b.is_ascii_uppercase() => Some(VrCode([a, b])),
            _ => None,
        }
    }

    /// Create a code from the given text,
    /// falling back to [`VrCode::DEFAULT`] if it is not well formed.
    pub fn new_or_default(code: &str) -> Self {
        VrCode::new(code).unwrap_or(VrCode::DEFAULT)
    }

    /// The code as text.
    pub fn as_str(&self) -> &str {
        // only ASCII letters are ever stored
        from_utf8(&self.0).unwrap_or("??")
    }

    /// The code as raw bytes.
    pub fn to_bytes(self) -> [u8; 2] {
        self.0
    }

    /// The standard value representation behind this code, if any.
    pub fn vr(self) -> Option<VR> {
        VR::from_binary(self.0)
    }
}

impl Default for VrCode {
    fn default() -> Self {
        VrCode::DEFAULT
    }
}

impl From<VR> for VrCode {
    fn from(vr: VR) -> Self {
        VrCode(vr.to_bytes())
    }
}

impl FromStr for VrCode {
    type Err = InvalidVrCode;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        VrCode::new(code).context(InvalidVrCodeSnafu { code })
    }
}

impl fmt::Display for VrCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq<VR> for VrCode {
    fn eq(&self, other: &VR) -> bool {
        self.0 == other.to_bytes()
    }
}

impl PartialEq<&str> for VrCode {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vr_text_round_trip() {
        for vr in VR::all() {
            assert_eq!(vr.to_string().parse::<VR>(), Ok(vr));
            assert_eq!(VR::from_binary(vr.to_bytes()), Some(vr));
        }
        assert!("XX".parse::<VR>().is_err());
    }

    #[test]
    fn vr_codes() {
        let code = VrCode::new("SB").unwrap();
        assert_eq!(code.as_str(), "SB");
        assert_eq!(code.vr(), None);
        assert_eq!(VrCode::from(VR::DA).vr(), Some(VR::DA));
        assert_eq!(VrCode::from(VR::DA), VR::DA);
        assert_eq!(code, "SB");
        assert_eq!(code, VrCode::SIGNED_BYTE);

        assert_eq!(VrCode::new("ob"), None);
        assert_eq!(VrCode::new("OBX"), None);
        assert_eq!(VrCode::new(""), None);
        assert_eq!(VrCode::new_or_default("O"), VrCode::DEFAULT);
        assert_eq!(VrCode::default().to_string(), "OB");

        assert!("CS".parse::<VrCode>().is_ok());
        let err = "C5".parse::<VrCode>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "`C5` is not a two-letter value representation code"
        );
    }
}
