//! Compile-time unit safety for PV electrical quantities.
//!
//! Prevents mixing incompatible units like volts and amperes, or ohms and
//! ohms-per-kilometre.
//!
//! # Design Philosophy
//!
//! String sizing and cable selection juggle several physical quantities:
//! - Voltages (V) and currents (A) from module and inverter datasheets
//! - Temperatures (°C) at the site extremes
//! - Cable geometry: lengths (m) and cross-sections (mm²)
//! - Conductor resistance, tabulated per kilometre (Ω/km) or absolute (Ω)
//!
//! Newtype wrappers keep a module's Voc from being added to a cable length.
//! All types are `#[repr(transparent)]` and serialize as plain numbers, so
//! project files and JSON output stay unit-free.
//!
//! # Usage
//!
//! ```
//! use pv_core::units::{Meters, OhmsPerKm, Volts};
//!
//! let string_voc = Volts(49.41) * 17.0;
//! let loop_resistance = OhmsPerKm(1.84).over_length(Meters(100.0));
//! assert!((loop_resistance.value() - 0.184).abs() < 1e-12);
//! assert!(string_voc > Volts(800.0));
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Macro to implement common arithmetic operations for unit types
macro_rules! impl_unit_ops {
    ($type:ty, $unit_name:literal) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Neg for $type {
            type Output = Self;
            fn neg(self) -> Self::Output {
                Self(-self.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Mul<$type> for f64 {
            type Output = $type;
            fn mul(self, rhs: $type) -> Self::Output {
                <$type>::new(self * rhs.0)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl Div<$type> for $type {
            type Output = f64;
            fn div(self, rhs: $type) -> Self::Output {
                self.0 / rhs.0
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.2} {}", self.0, $unit_name)
            }
        }

        impl $type {
            /// Create a new value
            #[inline]
            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            /// Get the raw numeric value
            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }

            /// Absolute value
            #[inline]
            pub fn abs(self) -> Self {
                Self(self.0.abs())
            }

            /// Check if value is finite
            #[inline]
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }

            /// Check if value is NaN
            #[inline]
            pub fn is_nan(self) -> bool {
                self.0.is_nan()
            }

            /// Minimum of two values
            #[inline]
            pub fn min(self, other: Self) -> Self {
                Self(self.0.min(other.0))
            }

            /// Maximum of two values
            #[inline]
            pub fn max(self, other: Self) -> Self {
                Self(self.0.max(other.0))
            }

            /// Clamp value to range
            #[inline]
            pub fn clamp(self, min: Self, max: Self) -> Self {
                Self(self.0.clamp(min.0, max.0))
            }
        }

        impl std::iter::Sum for $type {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }

        impl<'a> std::iter::Sum<&'a $type> for $type {
            fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }
    };
}

// =============================================================================
// Electrical Units
// =============================================================================

/// Voltage in volts (V)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Volts(pub f64);

impl_unit_ops!(Volts, "V");

/// Current in amperes (A)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Amperes(pub f64);

impl_unit_ops!(Amperes, "A");

/// Power in watts (W)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Watts(pub f64);

impl_unit_ops!(Watts, "W");

impl Volts {
    /// DC power: P = V × I
    #[inline]
    pub fn times_current(self, current: Amperes) -> Watts {
        Watts(self.0 * current.0)
    }

    /// Ratio to a reference voltage, as a plain percentage
    #[inline]
    pub fn percent_of(self, reference: Volts) -> f64 {
        self.0 / reference.0 * 100.0
    }
}

impl Watts {
    /// Convert to kilowatts
    #[inline]
    pub fn to_kilowatts(self) -> f64 {
        self.0 / 1000.0
    }

    /// Build from kilowatts
    #[inline]
    pub fn from_kilowatts(kw: f64) -> Self {
        Self(kw * 1000.0)
    }
}

// =============================================================================
// Thermal Units
// =============================================================================

/// Temperature in degrees Celsius (°C)
///
/// Module datasheets are referenced to STC, a 25 °C cell temperature.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Celsius(pub f64);

impl_unit_ops!(Celsius, "°C");

impl Celsius {
    /// Standard Test Conditions cell temperature
    pub const STC: Self = Self(25.0);

    /// Signed offset from STC (T − 25)
    #[inline]
    pub fn delta_from_stc(self) -> f64 {
        self.0 - Self::STC.0
    }
}

// =============================================================================
// Conductor Units
// =============================================================================

/// Length in metres (m)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Meters(pub f64);

impl_unit_ops!(Meters, "m");

/// Conductor cross-section in square millimetres (mm²)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct SquareMillimeters(pub f64);

impl_unit_ops!(SquareMillimeters, "mm²");

/// Absolute resistance in ohms (Ω)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Ohms(pub f64);

impl_unit_ops!(Ohms, "Ω");

/// Tabulated conductor resistance in ohms per kilometre (Ω/km)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct OhmsPerKm(pub f64);

impl_unit_ops!(OhmsPerKm, "Ω/km");

impl OhmsPerKm {
    /// Resistance of a single conductor of the given length
    #[inline]
    pub fn over_length(self, length: Meters) -> Ohms {
        Ohms(self.0 * length.0 / 1000.0)
    }
}

impl Ohms {
    /// Voltage across this resistance: V = I × R
    #[inline]
    pub fn voltage_at(self, current: Amperes) -> Volts {
        Volts(current.0 * self.0)
    }
}

// =============================================================================
// Tests
// =============================================================================
