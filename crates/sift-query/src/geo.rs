//! Geo-spatial filters.
//!
//! `from=latitude,longitude` together with one or more distance parameters (`km=10`,
//! `mi=2&ft=100`) becomes a "within distance of point" filter.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{error::QueryError, params::QueryParams, tokenizer::tokenize};

/// Default name of the point parameter.
pub const DEFAULT_POINT_PARAM: &str = "from";

/// Default name of the indexed location field.
pub const DEFAULT_POINT_FIELD: &str = "coordinates";

/// Default spatial reference system (WGS 84).
pub const DEFAULT_SRID: u32 = 4326;

/// Factor applied by backends that read metres as kilometres.
pub const LEGACY_UNIT_CORRECTION: f64 = 1000.0;

/// A distance unit accepted as a query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    /// Kilometres.
    Km,
    /// Metres.
    M,
    /// Centimetres.
    Cm,
    /// Millimetres.
    Mm,
    /// Statute miles.
    Mi,
    /// Yards.
    Yd,
    /// Feet.
    Ft,
    /// Inches.
    Inch,
    /// Nautical miles.
    Nm,
}

impl DistanceUnit {
    /// Every unit, in the order parameters are read.
    pub const ALL: [Self; 9] = [
        Self::Km,
        Self::M,
        Self::Cm,
        Self::Mm,
        Self::Mi,
        Self::Yd,
        Self::Ft,
        Self::Inch,
        Self::Nm,
    ];

    /// Parameter name of the unit.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Km => "km",
            Self::M => "m",
            Self::Cm => "cm",
            Self::Mm => "mm",
            Self::Mi => "mi",
            Self::Yd => "yd",
            Self::Ft => "ft",
            Self::Inch => "inch",
            Self::Nm => "nm",
        }
    }

    /// Length of one unit in metres.
    pub fn metres(self) -> f64 {
        match self {
            Self::Km => 1000.0,
            Self::M => 1.0,
            Self::Cm => 0.01,
            Self::Mm => 0.001,
            Self::Mi => 1609.344,
            Self::Yd => 0.9144,
            Self::Ft => 0.3048,
            Self::Inch => 0.0254,
            Self::Nm => 1852.0,
        }
    }
}

impl fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|unit| unit.as_str() == s)
            .ok_or_else(|| format!("unknown distance unit '{s}'"))
    }
}

/// A point on the globe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Spatial reference system id.
    pub srid: u32,
}

impl Point {
    /// Great-circle distance to `other`, using a spherical Earth.
    pub fn distance_to(&self, other: &Self) -> Distance {
        /// Mean Earth radius in metres.
        const EARTH_RADIUS: f64 = 6_371_008.8;
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        Distance::from_metres(2.0 * EARTH_RADIUS * a.sqrt().min(1.0).asin())
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "POINT({} {}) srid={}",
            self.longitude, self.latitude, self.srid
        )
    }
}

/// A length, held in metres.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct Distance {
    /// Length in metres.
    metres: f64,
}

impl Distance {
    /// Creates a distance from metres.
    pub fn from_metres(metres: f64) -> Self {
        Self { metres }
    }

    /// Creates a distance of `value` in `unit`.
    pub fn new(value: f64, unit: DistanceUnit) -> Self {
        Self::from_metres(value * unit.metres())
    }

    /// Length in metres.
    pub fn metres(self) -> f64 {
        self.metres
    }

    /// Length in kilometres.
    pub fn km(self) -> f64 {
        self.in_unit(DistanceUnit::Km)
    }

    /// Length expressed in `unit`.
    pub fn in_unit(self, unit: DistanceUnit) -> f64 {
        self.metres / unit.metres()
    }

    /// Scales the distance.
    pub fn scaled(self, factor: f64) -> Self {
        Self::from_metres(self.metres * factor)
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m", self.metres)
    }
}

/// Names used when reading geo parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoSettings {
    /// Parameter holding `latitude,longitude`.
    pub param: String,
    /// Indexed location field to filter on.
    pub point_field: String,
    /// SRID attached to parsed points.
    pub srid: u32,
}

impl Default for GeoSettings {
    fn default() -> Self {
        Self {
            param: DEFAULT_POINT_PARAM.to_string(),
            point_field: DEFAULT_POINT_FIELD.to_string(),
            srid: DEFAULT_SRID,
        }
    }
}

/// A "within `distance` of `point`" filter on `field`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoFilter {
    /// Location field.
    pub field: String,
    /// Centre.
    pub point: Point,
    /// Radius.
    pub distance: Distance,
}

/// Builds a geo filter from `params`.
///
/// Returns `Ok(None)` when the point parameter is absent or no distance unit is given. All unit
/// parameters present are summed. With `legacy_correction` the radius is multiplied by
/// [`LEGACY_UNIT_CORRECTION`] for backends that misread the unit.
pub fn build_geo_filter(
    params: &QueryParams,
    settings: &GeoSettings,
    lookup_sep: &str,
    legacy_correction: bool,
) -> Result<Option<GeoFilter>, QueryError> {
    if settings.point_field.is_empty() {
        return Err(QueryError::MissingPointField {
            owner: settings.param.clone(),
        });
    }
    let Some(raw_point) = params.get(&settings.param) else {
        return Ok(None);
    };
    let point = parse_point(raw_point, settings, lookup_sep)?;

    let mut distance: Option<Distance> = None;
    for unit in DistanceUnit::ALL {
        let Some(values) = params.get(unit.as_str()) else {
            continue;
        };
        let [value] = values else {
            return Err(QueryError::UnitValueCount {
                unit: unit.to_string(),
            });
        };
        let amount: f64 = value
            .trim()
            .parse()
            .ok()
            .filter(|v: &f64| v.is_finite())
            .ok_or_else(|| QueryError::InvalidDistance {
                unit: unit.to_string(),
                value: value.clone(),
            })?;
        let part = Distance::new(amount, unit);
        distance = Some(distance.map_or(part, |d| Distance::from_metres(d.metres() + part.metres())));
    }

    let Some(mut distance) = distance else {
        debug!(%point, "point given without distance, geo filter skipped");
        return Ok(None);
    };
    if legacy_correction {
        distance = distance.scaled(LEGACY_UNIT_CORRECTION);
    }
    debug!(%point, %distance, field = %settings.point_field, "built geo filter");
    Ok(Some(GeoFilter {
        field: settings.point_field.clone(),
        point,
        distance,
    }))
}

/// Parses `latitude,longitude`.
fn parse_point(
    values: &[String],
    settings: &GeoSettings,
    lookup_sep: &str,
) -> Result<Point, QueryError> {
    let invalid = || QueryError::InvalidCoordinates {
        param: settings.param.clone(),
    };
    let coords = tokenize(values, lookup_sep)
        .map(|token| token.parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect::<Option<Vec<f64>>>()
        .ok_or_else(invalid)?;
    let [latitude, longitude] = coords[..] else {
        return Err(invalid());
    };
    Ok(Point {
        latitude,
        longitude,
        srid: settings.srid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geo(qs: &str, legacy: bool) -> Result<Option<GeoFilter>, QueryError> {
        build_geo_filter(&QueryParams::parse(qs), &GeoSettings::default(), ",", legacy)
    }

    #[test]
    fn km_distance() {
        let filter = geo("from=59.92,10.73&km=1", false).unwrap().unwrap();
        assert_eq!(filter.field, "coordinates");
        assert!((filter.point.latitude - 59.92).abs() < 1e-9);
        assert!((filter.point.longitude - 10.73).abs() < 1e-9);
        assert_eq!(filter.point.srid, 4326);
        assert!((filter.distance.km() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn legacy_correction_multiplies() {
        let plain = geo("from=59.92,10.73&km=1", false).unwrap().unwrap();
        let legacy = geo("from=59.92,10.73&km=1", true).unwrap().unwrap();
        assert!((legacy.distance.metres() - plain.distance.metres() * 1000.0).abs() < 1e-6);
    }

    #[test]
    fn units_are_summed() {
        let filter = geo("from=0,0&km=1&m=500", false).unwrap().unwrap();
        assert!((filter.distance.metres() - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn absent_point_or_distance_is_none() {
        assert_eq!(geo("km=10", false).unwrap(), None);
        assert_eq!(geo("from=59.92,10.73", false).unwrap(), None);
    }

    #[test]
    fn bad_coordinates() {
        let err = geo("from=north,south&km=1", false).unwrap_err();
        assert!(err.to_string().starts_with("Cannot convert `from=latitude,longitude`"));
        assert!(matches!(
            geo("from=1.0&km=1", false),
            Err(QueryError::InvalidCoordinates { .. })
        ));
        assert!(matches!(
            geo("from=1,2,3", false),
            Err(QueryError::InvalidCoordinates { .. })
        ));
    }

    #[test]
    fn repeated_unit() {
        let err = geo("from=1,2&km=1&km=2", false).unwrap_err();
        assert_eq!(err.to_string(), "Each unit must have exactly one value.");
    }

    #[test]
    fn bad_distance() {
        assert!(matches!(
            geo("from=1,2&mi=far", false),
            Err(QueryError::InvalidDistance { .. })
        ));
    }

    #[test]
    fn missing_point_field() {
        let settings = GeoSettings {
            point_field: String::new(),
            ..GeoSettings::default()
        };
        let err = build_geo_filter(&QueryParams::new(), &settings, ",", false).unwrap_err();
        assert!(!err.is_client_error());
    }

    #[test]
    fn haversine_distance() {
        let oslo = Point {
            latitude: 59.9139,
            longitude: 10.7522,
            srid: DEFAULT_SRID,
        };
        let bergen = Point {
            latitude: 60.3913,
            longitude: 5.3221,
            srid: DEFAULT_SRID,
        };
        let km = oslo.distance_to(&bergen).km();
        assert!((300.0..310.0).contains(&km), "{km}");
    }

    #[test]
    fn unit_conversion() {
        let d = Distance::new(1.0, DistanceUnit::Mi);
        assert!((d.in_unit(DistanceUnit::Ft) - 5280.0).abs() < 1e-6);
        assert_eq!("nm".parse::<DistanceUnit>(), Ok(DistanceUnit::Nm));
    }
}
