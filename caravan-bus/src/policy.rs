//! Device capability policy.
//!
//! Each device class has a fixed list of [`MetricKind`]s it may emit. The table
//! exists twice, generated from a single declaration:
//!
//! - as data, through [`DeviceClassTag::allowed`] and [`is_allowed`], usable in
//!   `const` contexts and tests;
//! - as types, through the [`Permits`] trait, so that
//!   [`DeviceBase::publish_checked`](crate::DeviceBase::publish_checked) rejects
//!   a disallowed (class, kind) pair at compile time.
//!
//! The table is append-only. Every class and every kind marker is sealed, so
//! the set of classes and the permitted pairs are closed to this module.
//!
//! | Class       | Allowed kinds                                  |
//! |-------------|------------------------------------------------|
//! | `WaterTank` | `WaterLevelPercent`, `Temperature`, `Health`   |
//! | `GasBottle` | `GasLevelPercent`, `Health`                    |
//! | `TiltUnit`  | `TiltAngle`, `Health`                          |

use core::fmt;

use caravan_types::MetricKind;

mod sealed {
    pub trait Sealed {}
}

/// A device class marker type.
pub trait DeviceClass: sealed::Sealed + Send + Sync + 'static {
    /// Runtime tag of this class.
    const TAG: DeviceClassTag;
}

/// A metric kind marker type, one per [`MetricKind`] variant.
///
/// See [`kinds`] for the markers.
pub trait Kind: sealed::Sealed + Send + Sync + 'static {
    /// The kind this marker stands for.
    const KIND: MetricKind;
}

/// Implemented for a device class exactly when it may emit kind `K`.
pub trait Permits<K: Kind>: DeviceClass {}

macro_rules! capability_policy {
    ($(
        $(#[$meta:meta])*
        $class:ident => [$($kind:ident),+ $(,)?]
    ),+ $(,)?) => {
        /// Runtime identity of a device class.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum DeviceClassTag {
            $( $(#[$meta])* $class, )+
        }

        impl DeviceClassTag {
            /// Every device class.
            pub const ALL: &'static [DeviceClassTag] = &[$(DeviceClassTag::$class,)+];

            /// Metric kinds this class may emit.
            pub const fn allowed(self) -> &'static [MetricKind] {
                match self {
                    $( DeviceClassTag::$class => &[$(MetricKind::$kind,)+], )+
                }
            }

            /// Class name as written in the policy table.
            pub const fn name(self) -> &'static str {
                match self {
                    $( DeviceClassTag::$class => stringify!($class), )+
                }
            }
        }

        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
            pub struct $class;

            impl sealed::Sealed for $class {}

            impl DeviceClass for $class {
                const TAG: DeviceClassTag = DeviceClassTag::$class;
            }

            $( impl Permits<kinds::$kind> for $class {} )+
        )+
    };
}

capability_policy! {
    /// Fresh or grey water tank with a level sender.
    WaterTank => [WaterLevelPercent, Temperature, Health],
    /// LPG bottle with a level or weight sensor.
    GasBottle => [GasLevelPercent, Health],
    /// Inclinometer / IMU.
    TiltUnit => [TiltAngle, Health],
}

impl fmt::Display for DeviceClassTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type-level markers for [`MetricKind`] variants.
pub mod kinds {
    use caravan_types::MetricKind;

    macro_rules! kind_markers {
        ($($kind:ident),+ $(,)?) => {
            $(
                #[doc = concat!("Marker for [`MetricKind::", stringify!($kind), "`].")]
                #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
                pub struct $kind;

                impl super::sealed::Sealed for $kind {}

                impl super::Kind for $kind {
                    const KIND: MetricKind = MetricKind::$kind;
                }
            )+

            /// Kinds that have a marker, in declaration order.
            pub(crate) const MARKED: &[MetricKind] = &[$(MetricKind::$kind,)+];
        };
    }

    kind_markers!(
        WaterLevelPercent,
        GasLevelPercent,
        TiltAngle,
        Temperature,
        Electrical,
        Health,
    );
}

/// Whether `class` may emit `kind`.
///
/// Pure and deterministic; usable in `const` contexts.
///
/// ```rust
/// use caravan_bus::{is_allowed, DeviceClassTag, MetricKind};
///
/// assert!(is_allowed(DeviceClassTag::GasBottle, MetricKind::GasLevelPercent));
/// assert!(!is_allowed(DeviceClassTag::GasBottle, MetricKind::WaterLevelPercent));
/// ```
pub const fn is_allowed(class: DeviceClassTag, kind: MetricKind) -> bool {
    contains(class.allowed(), kind)
}

const fn contains(kinds: &[MetricKind], kind: MetricKind) -> bool {
    let mut i = 0;
    while i < kinds.len() {
        if kinds[i] as u16 == kind as u16 {
            return true;
        }
        i += 1;
    }
    false
}

// Build-time checks over the whole table
const _: () = {
    let mut c = 0;
    while c < DeviceClassTag::ALL.len() {
        let allowed = DeviceClassTag::ALL[c].allowed();
        assert!(!allowed.is_empty(), "device class without allowed kinds");

        // Every class reports health
        assert!(contains(allowed, MetricKind::Health), "device class cannot report health");

        let mut k = 0;
        while k < allowed.len() {
            let mut j = k + 1;
            while j < allowed.len() {
                assert!(allowed[k] as u16 != allowed[j] as u16, "duplicate kind in policy");
                j += 1;
            }
            k += 1;
        }
        c += 1;
    }

    // Every metric kind has a marker type
    assert!(kinds::MARKED.len() == MetricKind::ALL.len(), "kind marker missing");
    let mut k = 0;
    while k < MetricKind::ALL.len() {
        assert!(contains(kinds::MARKED, MetricKind::ALL[k]), "kind marker missing");
        k += 1;
    }
};

#[cfg(test)]
mod tests {
    use super::*;

    fn permits<C: Permits<K>, K: Kind>() -> bool {
        is_allowed(C::TAG, K::KIND)
    }

    #[test]
    fn table_matches_declared_policy() {
        let expected: &[(DeviceClassTag, &[MetricKind])] = &[
            (
                DeviceClassTag::WaterTank,
                &[MetricKind::WaterLevelPercent, MetricKind::Temperature, MetricKind::Health],
            ),
            (
                DeviceClassTag::GasBottle,
                &[MetricKind::GasLevelPercent, MetricKind::Health],
            ),
            (
                DeviceClassTag::TiltUnit,
                &[MetricKind::TiltAngle, MetricKind::Health],
            ),
        ];

        assert_eq!(DeviceClassTag::ALL.len(), expected.len());
        for (class, allowed) in expected {
            assert_eq!(class.allowed(), *allowed, "{class}");
        }
    }

    #[test]
    fn exhaustive_class_kind_matrix() {
        for &class in DeviceClassTag::ALL {
            for &kind in MetricKind::ALL {
                assert_eq!(
                    is_allowed(class, kind),
                    class.allowed().contains(&kind),
                    "{class} / {kind}"
                );
            }
        }
    }

    #[test]
    fn disallowed_pairs() {
        assert!(!is_allowed(DeviceClassTag::WaterTank, MetricKind::GasLevelPercent));
        assert!(!is_allowed(DeviceClassTag::WaterTank, MetricKind::TiltAngle));
        assert!(!is_allowed(DeviceClassTag::GasBottle, MetricKind::Temperature));
        assert!(!is_allowed(DeviceClassTag::TiltUnit, MetricKind::WaterLevelPercent));
        for &class in DeviceClassTag::ALL {
            assert!(!is_allowed(class, MetricKind::Electrical));
        }
    }

    #[test]
    fn is_allowed_is_deterministic() {
        for &class in DeviceClassTag::ALL {
            for &kind in MetricKind::ALL {
                let first = is_allowed(class, kind);
                for _ in 0..3 {
                    assert_eq!(is_allowed(class, kind), first);
                }
            }
        }
    }

    #[test]
    fn type_level_permits_agree_with_table() {
        assert!(permits::<WaterTank, kinds::WaterLevelPercent>());
        assert!(permits::<WaterTank, kinds::Temperature>());
        assert!(permits::<WaterTank, kinds::Health>());
        assert!(permits::<GasBottle, kinds::GasLevelPercent>());
        assert!(permits::<GasBottle, kinds::Health>());
        assert!(permits::<TiltUnit, kinds::TiltAngle>());
        assert!(permits::<TiltUnit, kinds::Health>());
    }

    #[test]
    fn every_kind_has_a_marker() {
        assert_eq!(kinds::MARKED, MetricKind::ALL);
    }

    #[test]
    fn class_markers_carry_their_tag() {
        assert_eq!(WaterTank::TAG, DeviceClassTag::WaterTank);
        assert_eq!(GasBottle::TAG, DeviceClassTag::GasBottle);
        assert_eq!(TiltUnit::TAG, DeviceClassTag::TiltUnit);
        assert_eq!(DeviceClassTag::TiltUnit.to_string(), "TiltUnit");
    }
}
