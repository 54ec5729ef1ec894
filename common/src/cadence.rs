// Backup cadences and the interval each one re-arms after.

use chrono::Duration;
use std::fmt;
use std::str::FromStr;

/// A backup tier: how often it runs and which prefix its artifacts live under.
///
/// Cadences are evaluated coarsest first so a tick that finds several tiers
/// due produces the weekly artifact before the daily one, and so on down to
/// the ten-minute tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cadence {
    Weekly,
    Daily,
    Hourly,
    /// Ten-minute tier, stored under the `10min` prefix.
    Frequent,
}

impl Cadence {
    /// All cadences in evaluation order, coarsest first.
    pub const ALL: [Cadence; 4] = [
        Cadence::Weekly,
        Cadence::Daily,
        Cadence::Hourly,
        Cadence::Frequent,
    ];

    /// Minimum time since the last successful backup before the cadence is
    /// due again. The comparison is boundary inclusive.
    pub fn interval(&self) -> Duration {
        match self {
            Cadence::Weekly => Duration::weeks(1),
            Cadence::Daily => Duration::days(1),
            Cadence::Hourly => Duration::hours(1),
            Cadence::Frequent => Duration::minutes(10),
        }
    }

    /// Path segment for this cadence inside the bucket subfolder.
    pub fn prefix_segment(&self) -> &'static str {
        match self {
            Cadence::Weekly => "weekly",
            Cadence::Daily => "daily",
            Cadence::Hourly => "hourly",
            Cadence::Frequent => "10min",
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix_segment())
    }
}

impl FromStr for Cadence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(Cadence::Weekly),
            "daily" => Ok(Cadence::Daily),
            "hourly" => Ok(Cadence::Hourly),
            "10min" => Ok(Cadence::Frequent),
            other => Err(format!(
                "unknown cadence '{}' (expected weekly, daily, hourly or 10min)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_order_is_coarsest_first() {
        assert_eq!(
            Cadence::ALL,
            [
                Cadence::Weekly,
                Cadence::Daily,
                Cadence::Hourly,
                Cadence::Frequent
            ]
        );
    }

    #[test]
    fn test_intervals() {
        assert_eq!(Cadence::Weekly.interval(), Duration::days(7));
        assert_eq!(Cadence::Daily.interval(), Duration::hours(24));
        assert_eq!(Cadence::Hourly.interval(), Duration::minutes(60));
        assert_eq!(Cadence::Frequent.interval(), Duration::minutes(10));
    }

    #[test]
    fn test_prefix_segments() {
        assert_eq!(Cadence::Weekly.prefix_segment(), "weekly");
        assert_eq!(Cadence::Daily.prefix_segment(), "daily");
        assert_eq!(Cadence::Hourly.prefix_segment(), "hourly");
        assert_eq!(Cadence::Frequent.prefix_segment(), "10min");
    }

    #[test]
    fn test_parse_round_trips_display() {
        for cadence in Cadence::ALL {
            let parsed: Cadence = cadence.to_string().parse().unwrap();
            assert_eq!(parsed, cadence);
        }
    }

    #[test]
    fn test_parse_rejects_unknown_cadence() {
        assert!("monthly".parse::<Cadence>().is_err());
        assert!("10 min".parse::<Cadence>().is_err());
        assert!("".parse::<Cadence>().is_err());
    }
}
