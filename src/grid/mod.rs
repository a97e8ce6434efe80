mod cache;
mod source;

pub use cache::{CacheStats, DatasetCache, GridSpec, MonthlyGridSet, MonthlyGridSpec};
pub use source::{GridSource, MemorySource, TextDirSource};

use ndarray::{s, Array1, Array2, ArrayView1};

use crate::error::Error;

/// Longitude encoding used by a grid axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LonConvention {
    /// Longitudes in [-180, 180].
    Signed,
    /// Longitudes in [0, 360).
    Positive,
}

impl LonConvention {
    fn of_axis(axis: ArrayView1<f64>) -> Self {
        if axis.iter().any(|&lon| lon < 0.) {
            LonConvention::Signed
        } else {
            LonConvention::Positive
        }
    }

    pub fn convert(self, lon: f64) -> f64 {
        let lon = lon.rem_euclid(360.);
        match self {
            LonConvention::Positive => lon,
            LonConvention::Signed if lon > 180. => lon - 360.,
            LonConvention::Signed => lon,
        }
    }
}

/// Immutable lat/lon grid with bilinear interpolation.
///
/// Both axes are ascending. Queries outside the axis range are clamped to the
/// nearest edge of the grid.
#[derive(Debug, Clone)]
pub struct GeoGrid {
    lats: Array1<f64>,
    lons: Array1<f64>,
    values: Array2<f64>,
    lon_convention: LonConvention,
}

impl GeoGrid {
    pub fn new(
        lats: Array1<f64>,
        lons: Array1<f64>,
        values: Array2<f64>,
    ) -> Result<Self, Error> {
        if values.dim() != (lats.len(), lons.len()) {
            return Err(Error::MalformedGrid(format!(
                "values have shape {:?} but axes have lengths ({}, {})",
                values.dim(),
                lats.len(),
                lons.len()
            )));
        }
        if lats.is_empty() || lons.is_empty() {
            return Err(Error::MalformedGrid("empty axis".to_string()));
        }

        let (lats, values) = match direction(lats.view(), "latitude")? {
            Direction::Ascending => (lats, values),
            Direction::Descending => (
                lats.slice(s![..;-1]).to_owned(),
                values.slice(s![..;-1, ..]).to_owned(),
            ),
        };
        let (lons, values) = match direction(lons.view(), "longitude")? {
            Direction::Ascending => (lons, values),
            Direction::Descending => (
                lons.slice(s![..;-1]).to_owned(),
                values.slice(s![.., ..;-1]).to_owned(),
            ),
        };

        let lon_convention = LonConvention::of_axis(lons.view());
        Ok(GeoGrid {
            lats,
            lons,
            values,
            lon_convention,
        })
    }

    pub fn lats(&self) -> ArrayView1<'_, f64> {
        self.lats.view()
    }

    pub fn lons(&self) -> ArrayView1<'_, f64> {
        self.lons.view()
    }

    pub fn dim(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn lon_convention(&self) -> LonConvention {
        self.lon_convention
    }

    pub fn interpolate(&self, lat: f64, lon: f64) -> f64 {
        let lon = self.lon_convention.convert(lon);
        let (i, fac_lat) = locate(self.lats.view(), lat);
        let (j, fac_lon) = locate(self.lons.view(), lon);

        let i1 = (i + 1).min(self.lats.len() - 1);
        let j1 = (j + 1).min(self.lons.len() - 1);

        let f00 = self.values[[i, j]];
        let f01 = self.values[[i, j1]];
        let f10 = self.values[[i1, j]];
        let f11 = self.values[[i1, j1]];

        bilin_interp(f00, f01, f10, f11, fac_lat, fac_lon)
    }
}

enum Direction {
    Ascending,
    Descending,
}

fn direction(axis: ArrayView1<f64>, name: &str) -> Result<Direction, Error> {
    if axis.len() < 2 {
        return Ok(Direction::Ascending);
    }
    let ascending = axis.windows(2).into_iter().all(|w| w[1] > w[0]);
    let descending = axis.windows(2).into_iter().all(|w| w[1] < w[0]);
    if ascending {
        Ok(Direction::Ascending)
    } else if descending {
        Ok(Direction::Descending)
    } else {
        Err(Error::MalformedGrid(format!(
            "{} axis is not strictly monotonic",
            name
        )))
    }
}

/// Index of the lower cell node and the fractional position inside the cell,
/// with `x` clamped into the axis range.
fn locate(axis: ArrayView1<f64>, x: f64) -> (usize, f64) {
    let n = axis.len();
    if n == 1 || x <= axis[0] {
        return (0, 0.);
    }
    if x >= axis[n - 1] {
        return (n - 1, 0.);
    }
    // first index with axis[idx] > x, guaranteed in 1..n
    let upper = axis
        .as_slice()
        .map(|values| values.partition_point(|&v| v <= x))
        .unwrap_or_else(|| axis.iter().take_while(|&&v| v <= x).count());
    let i = upper - 1;
    let fac = (x - axis[i]) / (axis[upper] - axis[i]);
    (i, fac)
}

fn lin_interp(v0: f64, v1: f64, fac: f64) -> f64 {
    v0 + (v1 - v0) * fac
}

fn bilin_interp(
    f00: f64,
    f01: f64,
    f10: f64,
    f11: f64,
    fac_lat: f64,
    fac_lon: f64,
) -> f64 {
    let f_lat0 = lin_interp(f00, f01, fac_lon);
    let f_lat1 = lin_interp(f10, f11, fac_lon);
    lin_interp(f_lat0, f_lat1, fac_lat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample_grid() -> GeoGrid {
        GeoGrid::new(
            array![-10., 0., 10.],
            array![-20., 0., 20.],
            array![[1., 2., 3.], [4., 5., 6.], [7., 8., 9.]],
        )
        .unwrap()
    }

    #[test]
    fn test_interpolate_at_nodes() {
        let grid = sample_grid();
        assert_eq!(grid.interpolate(-10., -20.), 1.);
        assert_eq!(grid.interpolate(0., 0.), 5.);
        assert_eq!(grid.interpolate(10., 20.), 9.);
    }

    #[test]
    fn test_interpolate_cell_centre() {
        let grid = sample_grid();
        assert!((grid.interpolate(-5., -10.) - 3.).abs() < 1e-12);
        assert!((grid.interpolate(5., 10.) - 7.).abs() < 1e-12);
    }

    #[test]
    fn test_clamps_outside_grid() {
        let grid = sample_grid();
        assert_eq!(grid.interpolate(-80., -20.), 1.);
        assert_eq!(grid.interpolate(80., 0.), 8.);
        assert_eq!(grid.interpolate(0., 90.), 6.);
    }

    #[test]
    fn test_descending_latitude_is_flipped() {
        let grid = GeoGrid::new(
            array![10., 0., -10.],
            array![-20., 0., 20.],
            array![[7., 8., 9.], [4., 5., 6.], [1., 2., 3.]],
        )
        .unwrap();
        assert_eq!(grid.lats(), array![-10., 0., 10.]);
        assert_eq!(grid.interpolate(-10., -20.), 1.);
        assert_eq!(grid.interpolate(10., 20.), 9.);
    }

    #[test]
    fn test_longitude_converted_to_axis_convention() {
        let grid = sample_grid();
        assert_eq!(grid.lon_convention(), LonConvention::Signed);
        // 340 E is -20 on this grid
        assert_eq!(grid.interpolate(0., 340.), grid.interpolate(0., -20.));

        let positive = GeoGrid::new(
            array![0., 10.],
            array![0., 180., 359.],
            array![[0., 1., 2.], [0., 1., 2.]],
        )
        .unwrap();
        assert_eq!(positive.lon_convention(), LonConvention::Positive);
        assert_eq!(positive.interpolate(0., -180.), 1.);
    }

    #[test]
    fn test_rejects_non_monotonic_axis() {
        let result = GeoGrid::new(
            array![0., 10., 5.],
            array![0., 1.],
            Array2::zeros((3, 2)),
        );
        assert!(matches!(result, Err(Error::MalformedGrid(_))));
    }

    #[test]
    fn test_rejects_shape_mismatch() {
        let result =
            GeoGrid::new(array![0., 10.], array![0., 1.], Array2::zeros((3, 2)));
        assert!(matches!(result, Err(Error::MalformedGrid(_))));
    }
}
