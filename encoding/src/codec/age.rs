//! Age strings (AS): three digits and a unit letter.

use super::lexical::parse_integer;
use std::convert::TryFrom;
use std::fmt;

/// The unit of an age string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgeUnit {
    /// `D`
    Days,
    /// `W`
    Weeks,
    /// `M`
    Months,
    /// `Y`
    Years,
}

impl Default for AgeUnit {
    fn default() -> Self {
        AgeUnit::Years
    }
}

impl AgeUnit {
    /// The unit letter used in the encoded value.
    pub fn code(self) -> char {
        match self {
            AgeUnit::Days => 'D',
            AgeUnit::Weeks => 'W',
            AgeUnit::Months => 'M',
            AgeUnit::Years => 'Y',
        }
    }

    /// Look up a unit by its letter.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'D' => Some(AgeUnit::Days),
            'W' => Some(AgeUnit::Weeks),
            'M' => Some(AgeUnit::Months),
            'Y' => Some(AgeUnit::Years),
            _ => None,
        }
    }

    /// How many of this unit make up a year.
    pub fn per_year(self) -> f64 {
        match self {
            AgeUnit::Days => 365.,
            AgeUnit::Weeks => 52.14,
            AgeUnit::Months => 12.,
            AgeUnit::Years => 1.,
        }
    }
}

/// An age as a magnitude and a unit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Age {
    /// The magnitude, at most three digits once encoded
    pub value: u32,
    /// The unit of the magnitude
    pub unit: AgeUnit,
}

impl Age {
    /// Create an age.
    pub fn new(value: u32, unit: AgeUnit) -> Self {
        Age { value, unit }
    }

    /// Read an age from its encoded form.
    ///
    /// A short text is completed with `0` up to three characters
    /// and with a `Y` unit;
    /// an unknown unit letter reads as years.
    pub fn parse(text: &str) -> Self {
        let mut chars: Vec<char> = text.chars().collect();
        if chars.len() < 3 {
            chars.resize(3, '0');
        }
        if chars.len() < 4 {
            chars.push('Y');
        }
        let magnitude: String = chars.iter().collect();
        Age {
            value: u32::try_from(parse_integer(&magnitude)).unwrap_or(0),
            unit: AgeUnit::from_code(chars[3]).unwrap_or_default(),
        }
    }

    /// Pick the unit for an age given in years.
    ///
    /// Below 0.08 years the age is counted in days,
    /// below 0.5 in weeks, below 2 in months, and in years otherwise.
    /// Magnitudes are truncated; negative ages become zero days.
    pub fn from_years(years: f64) -> Self {
        if years < 0. {
            Age::new(0, AgeUnit::Days)
        } else if years < 0.08 {
            Age::new((years * AgeUnit::Days.per_year()) as u32, AgeUnit::Days)
        } else if years < 0.5 {
            Age::new((years * AgeUnit::Weeks.per_year()) as u32, AgeUnit::Weeks)
        } else if years < 2. {
            Age::new((years * AgeUnit::Months.per_year()) as u32, AgeUnit::Months)
        } else {
            Age::new(years as u32, AgeUnit::Years)
        }
    }

    /// The age in years.
    pub fn to_years(self) -> f64 {
        f64::from(self.value) / self.unit.per_year()
    }
}

impl fmt::Display for Age {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:03}{}", self.value, self.unit.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_age_strings() {
        assert_eq!(Age::parse("005D"), Age::new(5, AgeUnit::Days));
        assert_eq!(Age::parse("018M"), Age::new(18, AgeUnit::Months));
        assert_eq!(Age::parse("042"), Age::new(42, AgeUnit::Years));
        assert_eq!(Age::parse("012X"), Age::new(12, AgeUnit::Years));
        assert_eq!(Age::parse(""), Age::new(0, AgeUnit::Years));
    }

    #[test]
    fn unit_thresholds() {
        assert_eq!(Age::from_years(0.07), Age::new(25, AgeUnit::Days));
        assert_eq!(Age::from_years(0.08), Age::new(4, AgeUnit::Weeks));
        assert_eq!(Age::from_years(0.5), Age::new(6, AgeUnit::Months));
        assert_eq!(Age::from_years(1.5), Age::new(18, AgeUnit::Months));
        assert_eq!(Age::from_years(2.), Age::new(2, AgeUnit::Years));
        assert_eq!(Age::from_years(-1.), Age::new(0, AgeUnit::Days));
    }

    #[test]
    fn display_is_zero_padded() {
        assert_eq!(Age::new(5, AgeUnit::Weeks).to_string(), "005W");
        assert_eq!(Age::new(120, AgeUnit::Years).to_string(), "120Y");
    }
}
