//! Tests for the special functions behind the k-NN entropy estimator

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;
    use visual_complexity::math::special::{digamma, ln_gamma, unit_ball_log_volume};

    const EULER_MASCHERONI: f64 = 0.577_215_664_901_532_9;

    // Tests ln Γ at integers matches ln((n-1)!)
    // Verified by dropping the Lanczos series term
    #[test]
    fn test_ln_gamma_factorials() {
        assert!(ln_gamma(1.0).abs() < 1e-12);
        assert!((ln_gamma(5.0) - 24.0_f64.ln()).abs() < 1e-12);
        assert!((ln_gamma(11.0) - 3_628_800.0_f64.ln()).abs() < 1e-10);
    }

    // Tests reflection for small arguments: Γ(1/2) = √π
    // Verified by removing the reflection branch
    #[test]
    fn test_ln_gamma_half() {
        assert!((ln_gamma(0.5) - PI.sqrt().ln()).abs() < 1e-12);
        assert!((ln_gamma(0.25) - 3.625_609_908_221_908_f64.ln()).abs() < 1e-10);
    }

    // Tests ψ(1) = -γ and the recurrence ψ(x+1) = ψ(x) + 1/x
    // Verified by flipping the recurrence sign
    #[test]
    fn test_digamma_values() {
        assert!((digamma(1.0) + EULER_MASCHERONI).abs() < 1e-10);
        assert!((digamma(4.0) - (1.0 + 0.5 + 1.0 / 3.0 - EULER_MASCHERONI)).abs() < 1e-10);
        for x in [0.3, 1.7, 5.5, 40.0] {
            assert!((digamma(x + 1.0) - digamma(x) - 1.0 / x).abs() < 1e-10);
        }
        assert!(digamma(0.0).is_nan());
    }

    // Tests unit-ball volumes in one to three dimensions
    // Verified by using Γ(d/2) instead of Γ(d/2 + 1)
    #[test]
    fn test_unit_ball_volume() {
        assert!((unit_ball_log_volume(1) - 2.0_f64.ln()).abs() < 1e-12);
        assert!((unit_ball_log_volume(2) - PI.ln()).abs() < 1e-12);
        assert!((unit_ball_log_volume(3) - (4.0 * PI / 3.0).ln()).abs() < 1e-12);
    }
}
