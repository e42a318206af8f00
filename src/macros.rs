/// Assert that two floating point numbers are equal within the given
/// epsilon. The optional fourth argument is printed when the check fails.
#[macro_export]
macro_rules! assert_float_eq {
    ($a:expr, $b:expr) => {
        $crate::assert_float_eq!($a, $b, f64::EPSILON)
    };
    ($a:expr, $b:expr, $eps:expr) => {{
        let a = $a;
        let b = $b;
        let eps = $eps;
        let error = f64::abs(a - b);
        assert!(
            error <= eps,
            "assertion failed: |({}) - ({})| = {:e} > {:e}",
            a,
            b,
            error,
            eps
        );
    }};
    ($a:expr, $b:expr, $eps:expr, $debug:expr) => {{
        let a = $a;
        let b = $b;
        let eps = $eps;
        let error = f64::abs(a - b);
        if error > eps {
            eprintln!("{:?}", $debug);
        }
        assert!(
            error <= eps,
            "assertion failed: |({}) - ({})| = {:e} > {:e}",
            a,
            b,
            error,
            eps
        );
    }};
}
