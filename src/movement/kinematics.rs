//! Constant-rate acceleration and braking.

/// Distance needed to stop from `speed` (m/s) at `deceleration` (m/s²)
#[must_use]
pub fn braking_distance(speed: f64, deceleration: f64) -> f64 {
    if deceleration <= 0.0 {
        return f64::INFINITY;
    }
    let v = speed.max(0.0);
    v * v / (2.0 * deceleration)
}

/// Highest speed to reach at the end of a `dt` tick that still leaves room to
/// stop within `remaining` metres, counting the distance covered during the
/// tick at the mean of `speed` and the returned value
#[must_use]
pub fn approach_speed(remaining: f64, speed: f64, deceleration: f64, dt: f64) -> f64 {
    if deceleration <= 0.0 {
        return 0.0;
    }
    let half = dt / 2.0;
    let discriminant = half * half + 2.0 * (remaining - speed * half) / deceleration;
    (deceleration * (discriminant.max(0.0).sqrt() - half)).max(0.0)
}

/// Move `current` toward `target` by at most one tick of acceleration or
/// braking, never past the target
#[must_use]
pub fn step_speed(current: f64, target: f64, acceleration: f64, deceleration: f64, dt: f64) -> f64 {
    if current < target {
        (current + acceleration * dt).min(target)
    } else {
        (current - deceleration * dt).max(target).max(0.0)
    }
}

/// Distance covered in one tick under linear speed change
#[must_use]
pub fn distance_travelled(start_speed: f64, end_speed: f64, dt: f64) -> f64 {
    ((start_speed + end_speed) / 2.0 * dt).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_braking_distance() {
        assert_eq!(braking_distance(0.0, 1.0), 0.0);
        assert_eq!(braking_distance(20.0, 1.0), 200.0);
        assert_eq!(braking_distance(20.0, 0.0), f64::INFINITY);
    }

    #[test]
    fn test_approach_speed_inverts_braking_distance() {
        let v = approach_speed(200.0, 0.0, 1.0, 0.0);
        assert!((v - 20.0).abs() < 1e-9);
        assert_eq!(approach_speed(-5.0, 0.0, 1.0, 1.0), 0.0);
        assert_eq!(approach_speed(100.0, 10.0, 0.0, 1.0), 0.0);
    }

    #[test]
    fn test_approach_speed_on_braking_curve_brakes_one_step() {
        // 250 m is exactly the braking distance from 20 m/s at 0.8 m/s²
        let v = approach_speed(250.0, 20.0, 0.8, 1.0);
        assert!((v - 19.2).abs() < 1e-9);
        let left = 250.0 - distance_travelled(20.0, v, 1.0);
        assert!((left - braking_distance(v, 0.8)).abs() < 1e-9);
    }

    #[test]
    fn test_step_speed_clamps_to_target() {
        assert_eq!(step_speed(0.0, 10.0, 1.0, 1.0, 1.0), 1.0);
        assert_eq!(step_speed(9.5, 10.0, 1.0, 1.0, 1.0), 10.0);
        assert_eq!(step_speed(10.0, 0.0, 1.0, 2.0, 1.0), 8.0);
        assert_eq!(step_speed(1.0, 0.0, 1.0, 2.0, 1.0), 0.0);
    }

    #[test]
    fn test_distance_travelled() {
        assert_eq!(distance_travelled(0.0, 2.0, 1.0), 1.0);
        assert_eq!(distance_travelled(10.0, 10.0, 0.5), 5.0);
    }
}
