// bf-core/src/units.rs

use uom::si::f64::Length as UomLength;
use uom::si::length::micrometer;

// Simulator grids and cell coordinates are in micrometres.
pub type Length = UomLength;

#[inline]
pub fn um(v: f64) -> Length {
    Length::new::<micrometer>(v)
}

#[inline]
pub fn to_um(l: Length) -> f64 {
    l.get::<micrometer>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uom::si::length::meter;

    #[test]
    fn micrometre_round_trip() {
        let l = um(4.0);
        assert!((to_um(l) - 4.0).abs() < 1e-12);
        assert!((l.get::<meter>() - 4.0e-6).abs() < 1e-18);
    }
}
