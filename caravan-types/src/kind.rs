//! Metric kinds - the append-only namespace of physical quantities.

use core::fmt;

/// Identifies the physical quantity a [`Metric`](crate::Metric) represents.
///
/// The numeric space is partitioned by sensor family. The ranges are a
/// convention for readability only and are not enforced at runtime:
///
/// | Range           | Family                           |
/// |-----------------|----------------------------------|
/// | `0x1000-0x10FF` | Water tank                       |
/// | `0x1100-0x11FF` | Gas                              |
/// | `0x1200-0x12FF` | Tilt / IMU                       |
/// | `0x2000-0x2FFF` | Generic (temperature, electrical)|
/// | `0xFF00-0xFFFF` | Health / diagnostics             |
///
/// New kinds are appended; existing codes never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
#[cfg_attr(feature = "minicbor", cbor(index_only))]
#[repr(u16)]
pub enum MetricKind {
    /// Fill level of a water tank, in percent.
    #[cfg_attr(feature = "minicbor", n(0x1001))]
    WaterLevelPercent = 0x1001,

    /// Fill level of a gas bottle, in percent.
    #[cfg_attr(feature = "minicbor", n(0x1101))]
    GasLevelPercent = 0x1101,

    /// Inclination angle reported by a tilt unit or IMU.
    #[cfg_attr(feature = "minicbor", n(0x1201))]
    TiltAngle = 0x1201,

    /// Generic temperature reading.
    #[cfg_attr(feature = "minicbor", n(0x2001))]
    Temperature = 0x2001,

    /// Generic electrical quantity (e.g. summed power or a line value).
    #[cfg_attr(feature = "minicbor", n(0x2101))]
    Electrical = 0x2101,

    /// Device health / diagnostic code.
    #[cfg_attr(feature = "minicbor", n(0xFF01))]
    Health = 0xFF01,
}

impl MetricKind {
    /// Every known metric kind, in ascending code order.
    pub const ALL: &'static [MetricKind] = &[
        MetricKind::WaterLevelPercent,
        MetricKind::GasLevelPercent,
        MetricKind::TiltAngle,
        MetricKind::Temperature,
        MetricKind::Electrical,
        MetricKind::Health,
    ];

    /// The stable numeric code of this kind.
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Look up a kind by its numeric code.
    pub const fn from_u16(code: u16) -> Option<Self> {
        match code {
            0x1001 => Some(MetricKind::WaterLevelPercent),
            0x1101 => Some(MetricKind::GasLevelPercent),
            0x1201 => Some(MetricKind::TiltAngle),
            0x2001 => Some(MetricKind::Temperature),
            0x2101 => Some(MetricKind::Electrical),
            0xFF01 => Some(MetricKind::Health),
            _ => None,
        }
    }

    /// The sensor family whose code range contains this kind.
    pub const fn family(self) -> MetricFamily {
        MetricFamily::of(self.as_u16())
    }

    /// The variant name, as used in logs.
    pub const fn name(self) -> &'static str {
        match self {
            MetricKind::WaterLevelPercent => "WaterLevelPercent",
            MetricKind::GasLevelPercent => "GasLevelPercent",
            MetricKind::TiltAngle => "TiltAngle",
            MetricKind::Temperature => "Temperature",
            MetricKind::Electrical => "Electrical",
            MetricKind::Health => "Health",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Documented code ranges of the [`MetricKind`] namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricFamily {
    WaterTank,
    Gas,
    Tilt,
    Generic,
    Health,
    /// A code outside every documented range.
    Unknown,
}

impl MetricFamily {
    /// Classify a raw metric code.
    pub const fn of(code: u16) -> Self {
        match code {
            0x1000..=0x10FF => MetricFamily::WaterTank,
            0x1100..=0x11FF => MetricFamily::Gas,
            0x1200..=0x12FF => MetricFamily::Tilt,
            0x2000..=0x2FFF => MetricFamily::Generic,
            0xFF00..=0xFFFF => MetricFamily::Health,
            _ => MetricFamily::Unknown,
        }
    }
}
