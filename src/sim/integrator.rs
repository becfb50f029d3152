use nalgebra::Vector2;

// ---------------------------------------------------------------------------
// Semi-implicit (symplectic) Euler with acceleration held over the step
// ---------------------------------------------------------------------------

/// Advance velocity with `accel`, then position with the new velocity.
///
/// Energy error stays bounded on closed orbits instead of drifting.
pub fn symplectic_euler(pos: &mut Vector2<f64>, vel: &mut Vector2<f64>, accel: &Vector2<f64>, dt: f64) {
    *vel += accel * dt;
    *pos += *vel * dt;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::state::{MU, PLANET_RADIUS};
    use crate::physics::gravity_accel;

    fn energy(pos: &Vector2<f64>, vel: &Vector2<f64>) -> f64 {
        0.5 * vel.norm_squared() - MU / pos.norm()
    }

    #[test]
    fn free_motion() {
        let mut pos = Vector2::new(0.0, 0.0);
        let mut vel = Vector2::new(1.0, 2.0);
        symplectic_euler(&mut pos, &mut vel, &Vector2::zeros(), 0.5);
        assert_eq!(pos, Vector2::new(0.5, 1.0));
    }

    #[test]
    fn velocity_updates_first() {
        let mut pos = Vector2::zeros();
        let mut vel = Vector2::zeros();
        symplectic_euler(&mut pos, &mut vel, &Vector2::new(0.0, -10.0), 1.0);
        assert_eq!(vel.y, -10.0);
        assert_eq!(pos.y, -10.0, "Position should move with the updated velocity");
    }

    #[test]
    fn orbit_conserves_energy_and_momentum() {
        let r = PLANET_RADIUS + 500_000.0;
        let mut pos = Vector2::new(0.0, r);
        let mut vel = Vector2::new((MU / r).sqrt(), 0.0);
        let e0 = energy(&pos, &vel);
        let h0 = pos.x * vel.y - pos.y * vel.x;

        for _ in 0..10_000 {
            let a = gravity_accel(&pos);
            symplectic_euler(&mut pos, &mut vel, &a, 0.01);
        }

        let de = ((energy(&pos, &vel) - e0) / e0).abs();
        let dh = ((pos.x * vel.y - pos.y * vel.x - h0) / h0).abs();
        assert!(de < 1e-6, "Relative energy drift {:e}", de);
        assert!(dh < 1e-9, "Relative angular momentum drift {:e}", dh);
    }
}
