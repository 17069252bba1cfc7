use std::f64::consts::PI;
use chrono::{DateTime, Datelike, Local, TimeDelta, Timelike};
use trig::Trig;

const SCAN_STEP_MINUTES: i64 = 5;
const SCAN_LIMIT_HOURS: i64 = 48;

/// Calculates the declination given a medium exact algorithm as described
/// here: https://www.reuk.co.uk/wordpress/solar/solar-declination/
///
/// # Arguments
///
/// * 'date' - the local date time
pub fn get_declination(date: DateTime<Local>) -> f64 {
    let day = date.ordinal0() as f64;

    let earth_tilt = -23.44;
    let p1 = earth_tilt.sind();
    let p2 = 360.0 / 365.24 * (day + 10.0);
    let p3 = 360.0 / PI * 0.0167 * (360.0 / 365.24 * (day - 2.0)).sind();
    let declination = (p1 * (p2 + p3).cosd()).asind();

    declination
}

/// Calculates the sun elevation given the algorithm as described
/// here: https://www.pveducation.org/pvcdrom/properties-of-sunlight/elevation-angle
///
/// # Arguments
///
/// * 'date' - the local date time
/// * 'lat' - the latitude given in decimal format
/// * 'long' - the longitude given in decimal format
/// * 'declination' - the current sun declination
pub fn get_elevation(date: DateTime<Local>, lat: f64, long: f64, declination: f64) -> f64 {
    let lstm = 15.0 * (date.offset().local_minus_utc() / 3600) as f64;
    let b = 360.0 / 365.0 * (date.ordinal0() as f64 - 81.0);
    let eot = 9.87 * (2.0 * b).sind() - 7.53 * b.cosd() - 1.5 * b.sind();
    let tc = 4.0 * (long - lstm) + eot;
    let lst = date.hour() as f64 + date.minute() as f64 / 60.0 + tc / 60.0;
    let hra = 15.0 * (lst - 12.0);

    (declination.sind() * lat.sind() + declination.cosd() * lat.cosd() * hra.cosd()).asind()
}

/// Finds the next time the sun goes below the horizon, scanning forward in
/// five minute steps. When the sun is already down the coming sunrise is
/// passed first, so the result is always a real upcoming sunset. The scan
/// gives up two days out, which only matters at polar latitudes.
///
/// # Arguments
///
/// * 'now' - the local date time to scan from
/// * 'lat' - the latitude given in decimal format
/// * 'long' - the longitude given in decimal format
pub fn next_sunset(now: DateTime<Local>, lat: f64, long: f64) -> DateTime<Local> {
    let limit = now + TimeDelta::hours(SCAN_LIMIT_HOURS);
    let mut probe = now;

    while sun_is_down(probe, lat, long) && probe < limit {
        probe = probe + TimeDelta::minutes(SCAN_STEP_MINUTES);
    }
    while !sun_is_down(probe, lat, long) && probe < limit {
        probe = probe + TimeDelta::minutes(SCAN_STEP_MINUTES);
    }

    probe
}

fn sun_is_down(date: DateTime<Local>, lat: f64, long: f64) -> bool {
    let declination = get_declination(date);

    get_elevation(date, lat, long, declination) < 0.0
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_declination_stays_within_earth_tilt() {
        for day in 0..365 {
            let date = Local.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap() + TimeDelta::days(day);
            let declination = get_declination(date);

            assert!(declination.abs() <= 23.45, "day {} gave {}", day, declination);
        }
    }

    #[test]
    fn test_sun_is_up_at_summer_noon_in_stockholm() {
        let noon = Local.with_ymd_and_hms(2026, 6, 21, 12, 0, 0).unwrap();
        let declination = get_declination(noon);

        assert!(get_elevation(noon, 59.33, 18.07, declination) > 0.0);
    }

    #[test]
    fn test_next_sunset_lies_ahead() {
        let now = Local.with_ymd_and_hms(2026, 8, 24, 10, 0, 0).unwrap();
        let sunset = next_sunset(now, 59.33, 18.07);

        assert!(sunset > now);
        assert!(sunset <= now + TimeDelta::hours(SCAN_LIMIT_HOURS));
    }
}
