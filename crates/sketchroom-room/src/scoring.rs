//! Guess and drawer scoring.
//!
//! Pure functions of their inputs; the state machine passes in the
//! remaining and total turn time and the configured drawer share.

/// Points every correct guess is worth, however late.
pub const BASE_POINTS: u32 = 50;

/// Extra points for guessing instantly, scaled down linearly to 0 at
/// the buzzer.
pub const SPEED_BONUS: u32 = 50;

/// Points for a correct guess with `remaining_secs` of `total_secs` left.
///
/// `BASE_POINTS + floor(remaining / total * SPEED_BONUS)`, with `remaining`
/// clamped to `total`. A zero `total` yields `BASE_POINTS`.
pub fn guess_points(remaining_secs: u32, total_secs: u32) -> u32 {
    if total_secs == 0 {
        return BASE_POINTS;
    }
    let remaining = u64::from(remaining_secs.min(total_secs));
    let bonus = remaining * u64::from(SPEED_BONUS) / u64::from(total_secs);
    BASE_POINTS + bonus as u32
}

/// The drawer's share of a guesser's points, `floor(points * percent / 100)`.
pub fn drawer_bonus(guess_points: u32, percent: u32) -> u32 {
    (u64::from(guess_points) * u64::from(percent) / 100) as u32
}
