/// Returns the given error if `$condition` does not hold.
macro_rules! verify {
    ($condition: expr, $result: expr) => {
        if !$condition {
            return Err($result);
        }
    };
}
