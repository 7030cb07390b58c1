//! Where the sun is in the sky, for a given place and instant.
//!
//! This uses a low precision solar ephemeris (accurate to about a hundredth of
//! a degree over a few centuries around J2000), which is plenty for placing a
//! light source on a canvas.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use super::{normalize_angle, Float};

/// Julian day of the unix epoch
const UNIX_EPOCH_JD: Float = 2_440_587.5;

/// Julian day of the J2000.0 epoch
const J2000_JD: Float = 2_451_545.0;

const MILLIS_PER_DAY: Float = 86_400_000.0;

/// Step of the sunrise/sunset scan, see [`sunrise_sunset`].
pub const SCAN_STEP_MINUTES: i64 = 1;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Position of the sun in the sky, as seen by an observer on earth.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SunPosition {
    /// Angle above the horizon, in degrees. Negative at night.
    pub elevation: Float,
    /// Compass bearing, in degrees: 0° is north, 90° is east. In `[0, 360)`.
    pub azimuth: Float,
}

impl SunPosition {
    /// Whether the sun is above the horizon, and can light anything at all.
    #[inline]
    #[must_use]
    pub fn is_up(&self) -> bool {
        self.elevation > 0.0
    }

    /// Heading, in degrees in `[0, 360)`, pointing towards the sun on the
    /// canvas, where north is up.
    #[inline]
    #[must_use]
    pub fn canvas_heading(&self) -> Float {
        (self.azimuth - 90.0).rem_euclid(360.0)
    }
}

#[inline]
#[must_use]
pub fn julian_day(instant: &DateTime<Utc>) -> Float {
    instant.timestamp_millis() as Float / MILLIS_PER_DAY + UNIX_EPOCH_JD
}

/// Position of the sun at `instant`, seen from `latitude`, `longitude` (in degrees).
#[must_use]
pub fn position(latitude: Float, longitude: Float, instant: &DateTime<Utc>) -> SunPosition {
    let n = julian_day(instant) - J2000_JD;

    // mean longitude and mean anomaly
    let l = (280.460 + 0.985_647_4 * n).rem_euclid(360.0);
    let g = (357.528 + 0.985_600_3 * n).rem_euclid(360.0).to_radians();

    // ecliptic longitude, with the equation of center, and obliquity of the ecliptic
    let lambda = (l + 1.915 * g.sin() + 0.020 * (2.0 * g).sin())
        .rem_euclid(360.0)
        .to_radians();
    let epsilon = (23.439 - 0.000_000_4 * n).to_radians();

    let right_ascension = (epsilon.cos() * lambda.sin())
        .atan2(lambda.cos())
        .to_degrees()
        .rem_euclid(360.0);
    let declination = (epsilon.sin() * lambda.sin()).asin();

    let gmst = (280.460 + 360.985_647_4 * n).rem_euclid(360.0);
    let local_sidereal_time = gmst + longitude;

    let hour_angle = normalize_angle(local_sidereal_time - right_ascension).to_radians();
    let phi = latitude.to_radians();

    let elevation = (phi.sin() * declination.sin()
        + phi.cos() * declination.cos() * hour_angle.cos())
    .asin();

    let azimuth = (-hour_angle.sin())
        .atan2(phi.cos() * declination.tan() - phi.sin() * hour_angle.cos())
        .to_degrees()
        .rem_euclid(360.0);

    SunPosition {
        elevation: elevation.to_degrees(),
        azimuth,
    }
}

/// Sunrise and sunset of a single (UTC) day.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SunTimes {
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
}

/// Scans the UTC day `date` minute by minute, looking for the moments the
/// sun crosses the horizon, seen from `latitude`, `longitude` (in degrees).
///
/// This is a linear scan, not a root-find: results are accurate to
/// [`SCAN_STEP_MINUTES`]. `sunrise` is the first step the sun is up after a
/// step where it wasn't, `sunset` is the last step the sun is up before a
/// step where it isn't.
///
/// Either may be `None`. During polar night or polar day, the sun never
/// crosses the horizon, and both are.
#[must_use]
pub fn sunrise_sunset(latitude: Float, longitude: Float, date: NaiveDate) -> SunTimes {
    let start = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
    let step = Duration::minutes(SCAN_STEP_MINUTES);

    let elevation = |instant| position(latitude, longitude, &instant).elevation;

    let mut times = SunTimes::default();
    let mut previous = elevation(start - step);

    for i in 0..MINUTES_PER_DAY / SCAN_STEP_MINUTES {
        let instant = start + step * i as i32;
        let current = elevation(instant);

        if times.sunrise.is_none() && previous <= 0.0 && current > 0.0 {
            times.sunrise = Some(instant);
        }

        if times.sunset.is_none() && previous > 0.0 && current <= 0.0 {
            times.sunset = Some(instant - step);
        }

        if times.sunrise.is_some() && times.sunset.is_some() {
            break;
        }

        previous = current;
    }

    times
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn date(y: i32, mo: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap()
    }

    #[test]
    fn julian_day_of_j2000() {
        assert!((julian_day(&utc(2000, 1, 1, 12, 0)) - J2000_JD).abs() < 1e-9);
    }

    #[test]
    fn london_summer_solstice_noon() {
        let sun = position(51.5074, -0.1278, &utc(2024, 6, 21, 12, 0));

        assert!(sun.is_up());
        assert!(sun.elevation > 55.0);
        assert!((sun.elevation - 61.92).abs() < 0.05);
        assert!((sun.azimuth - 178.81).abs() < 0.05);
    }

    #[test]
    fn sun_is_below_horizon_at_night() {
        let sun = position(51.5074, -0.1278, &utc(2024, 12, 21, 0, 0));
        assert!(!sun.is_up());
        assert!(sun.elevation < -50.0);
    }

    #[test]
    fn sun_moves_westward_during_the_day() {
        let morning = position(48.85, 2.35, &utc(2024, 4, 10, 8, 0));
        let evening = position(48.85, 2.35, &utc(2024, 4, 10, 16, 0));

        assert!((60.0..180.0).contains(&morning.azimuth));
        assert!((180.0..300.0).contains(&evening.azimuth));
    }

    #[test]
    fn azimuth_stays_in_range_all_day() {
        for minute in (0..24 * 60).step_by(7) {
            let instant = utc(2024, 1, 5, 0, 0) + Duration::minutes(minute);
            let sun = position(-33.86, 151.2, &instant);
            assert!((0.0..360.0).contains(&sun.azimuth));
            assert!((-90.0..=90.0).contains(&sun.elevation));
        }
    }

    #[test]
    fn canvas_heading_points_east_for_an_eastern_sun() {
        let east = SunPosition {
            elevation: 10.0,
            azimuth: 90.0,
        };
        let north = SunPosition {
            elevation: 10.0,
            azimuth: 0.0,
        };
        assert_eq!(east.canvas_heading(), 0.0);
        assert_eq!(north.canvas_heading(), 270.0);
    }

    #[test]
    fn equator_equinox_has_twelve_hour_days() {
        for day in [date(2024, 3, 20), date(2024, 9, 22)] {
            let times = sunrise_sunset(0.0, 0.0, day);
            let (sunrise, sunset) = (times.sunrise.unwrap(), times.sunset.unwrap());

            assert!(sunrise < sunset);
            let length = (sunset - sunrise).num_minutes();
            assert!((length - 12 * 60).abs() <= 10, "day length: {length} minutes");
        }
    }

    #[test]
    fn scan_brackets_the_horizon_crossing() {
        let times = sunrise_sunset(51.5, -0.13, date(2024, 6, 21));
        let sunrise = times.sunrise.unwrap();
        let sunset = times.sunset.unwrap();

        assert!(position(51.5, -0.13, &sunrise).elevation > 0.0);
        assert!(position(51.5, -0.13, &(sunrise - Duration::minutes(1))).elevation <= 0.0);
        assert!(position(51.5, -0.13, &sunset).elevation > 0.0);
        assert!(position(51.5, -0.13, &(sunset + Duration::minutes(1))).elevation <= 0.0);
    }

    #[test]
    fn polar_night_and_polar_day() {
        assert_eq!(sunrise_sunset(80.0, 0.0, date(2024, 12, 21)), SunTimes::default());
        assert_eq!(sunrise_sunset(80.0, 0.0, date(2024, 6, 21)), SunTimes::default());
    }

    #[test]
    fn sunset_may_come_before_sunrise_in_utc() {
        // Tokyo: the sun sets around 10:00 UTC and rises around 19:30 UTC
        let times = sunrise_sunset(35.68, 139.69, date(2024, 6, 21));
        assert!(times.sunset.unwrap() < times.sunrise.unwrap());
    }
}
