use nalgebra::Vector2;

use crate::dynamics::state::MU;

/// Point-mass gravity acceleration at planet-centred position `pos`.
pub fn gravity_accel(pos: &Vector2<f64>) -> Vector2<f64> {
    let r = pos.norm();
    if r < 1.0 {
        return Vector2::zeros();
    }
    -MU / (r * r) * (pos / r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::state::PLANET_RADIUS;

    #[test]
    fn surface_gravity() {
        let g = gravity_accel(&Vector2::new(0.0, PLANET_RADIUS));
        assert!((g.y + 9.82).abs() < 0.01, "Surface gravity should be ~9.82, got {}", g.y);
        assert!(g.x.abs() < 1e-12);
    }

    #[test]
    fn points_to_centre() {
        let pos = Vector2::new(4.0e6, -5.0e6);
        let g = gravity_accel(&pos);
        assert!(g.normalize().dot(&pos.normalize()) < -0.999_999);
        assert!((g.norm() - MU / pos.norm_squared()).abs() < 1e-12);
    }

    #[test]
    fn zero_at_origin() {
        assert_eq!(gravity_accel(&Vector2::zeros()), Vector2::zeros());
    }
}
