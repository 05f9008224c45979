use core::fmt;

/// Four-byte ACPI table signature, e.g. `APIC` or `NFIT`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature(pub [u8; 4]);

impl Signature {
    pub const APMT: Self = Self(*b"APMT");
    pub const GTDT: Self = Self(*b"GTDT");
    /// The iBFT signature is six bytes (`iBFT\0\0`); only the first four are compared.
    pub const IBFT: Self = Self(*b"iBFT");
    pub const NFIT: Self = Self(*b"NFIT");
    pub const PCCT: Self = Self(*b"PCCT");
    pub const VIOT: Self = Self(*b"VIOT");

    #[must_use]
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Parse a four-character ASCII signature such as `"NFIT"`.
    #[must_use]
    pub fn from_text(text: &str) -> Option<Self> {
        let bytes: [u8; 4] = text.as_bytes().try_into().ok()?;
        bytes.is_ascii().then_some(Self(bytes))
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use fmt::Write;
        for &b in &self.0 {
            let c = if b.is_ascii_graphic() { char::from(b) } else { '?' };
            f.write_char(c)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature(\"{self}\")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_round_trip() {
        assert_eq!(Signature::from_text("NFIT"), Some(Signature::NFIT));
        assert_eq!(Signature::from_text("NFI"), None);
        assert_eq!(Signature::from_text("NFITS"), None);
        assert_eq!(Signature::NFIT.to_string(), "NFIT");
    }

    #[test]
    fn non_printable_bytes_are_masked() {
        assert_eq!(Signature([b'A', 0, 0xFF, b'B']).to_string(), "A??B");
    }
}
