use num::NumCast;

/// Linear interpolation from `from` toward `to` by `t`.
pub fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

/// Remap `val` from one range onto another, casting through `f32`.
/// Adapted from [nannou](https://docs.rs/nannou/0.15.0/src/nannou/math.rs.html#42)
pub fn map_range<X, Y>(val: X, in_min: X, in_max: X, out_min: Y, out_max: Y) -> Y
where
    X: NumCast,
    Y: NumCast,
{
    let val: f32 = cast(val, "input value");
    let in_min: f32 = cast(in_min, "input range start");
    let in_max: f32 = cast(in_max, "input range end");
    let out_min: f32 = cast(out_min, "output range start");
    let out_max: f32 = cast(out_max, "output range end");

    cast(
        (val - in_min) / (in_max - in_min) * (out_max - out_min) + out_min,
        "mapped result",
    )
}

fn cast<A: NumCast, B: NumCast>(value: A, what: &str) -> B {
    NumCast::from(value).unwrap_or_else(|| panic!("[map_range] failed to cast {}", what))
}
