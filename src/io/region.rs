use crate::types::{Grid, LstError, LstResult, Raster, ValidityMask};
use geo::{BoundingRect, Contains, MultiPolygon, Point};
use ndarray::Array2;

/// Region of interest rasterized onto the run's grid
#[derive(Debug, Clone)]
pub struct RegionMask {
    mask: ValidityMask,
}

impl RegionMask {
    /// Every cell inside
    pub fn full(shape: (usize, usize)) -> Self {
        Self {
            mask: Array2::from_elem(shape, true),
        }
    }

    /// Precomputed mask (true = inside)
    pub fn from_mask(mask: ValidityMask) -> Self {
        Self { mask }
    }

    /// A cell is inside when its centre lies inside the geometry.
    ///
    /// The geometry must already be expressed in the grid's coordinates.
    pub fn from_polygons(grid: &Grid, region: &MultiPolygon<f64>) -> Self {
        let bounds = region.bounding_rect();
        let mask = Array2::from_shape_fn(grid.shape(), |(row, col)| {
            let (x, y) = grid.cell_center(row, col);
            match bounds {
                Some(rect)
                    if x < rect.min().x
                        || x > rect.max().x
                        || y < rect.min().y
                        || y > rect.max().y =>
                {
                    false
                }
                Some(_) => region.contains(&Point::new(x, y)),
                None => false,
            }
        });

        let region_mask = Self { mask };
        log::info!(
            "Region of interest covers {}/{} cells",
            region_mask.inside_count(),
            grid.cell_count()
        );
        region_mask
    }

    pub fn mask(&self) -> &ValidityMask {
        &self.mask
    }

    pub fn shape(&self) -> (usize, usize) {
        self.mask.dim()
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.mask.get((row, col)).copied().unwrap_or(false)
    }

    pub fn inside_count(&self) -> usize {
        self.mask.iter().filter(|&&v| v).count()
    }

    pub fn ensure_shape(&self, shape: (usize, usize)) -> LstResult<()> {
        if self.shape() == shape {
            Ok(())
        } else {
            Err(LstError::ShapeMismatch {
                expected: shape,
                found: self.shape(),
            })
        }
    }

    /// Masks every cell outside the region
    pub fn clip(&self, raster: &Raster) -> LstResult<Raster> {
        raster.update_mask(&self.mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GeoTransform;
    use geo::{polygon, MultiPolygon};

    #[test]
    fn test_polygon_rasterization_uses_cell_centres() {
        let grid = Grid::pixel_grid(4, 4);
        // covers the centres of rows 1-2, cols 1-2 only
        let square = polygon![
            (x: 1.2, y: 1.2),
            (x: 2.8, y: 1.2),
            (x: 2.8, y: 2.8),
            (x: 1.2, y: 2.8),
            (x: 1.2, y: 1.2),
        ];
        let region = RegionMask::from_polygons(&grid, &MultiPolygon::new(vec![square]));

        assert_eq!(region.inside_count(), 4);
        assert!(region.contains(1, 1));
        assert!(region.contains(2, 2));
        assert!(!region.contains(0, 0));
        assert!(!region.contains(3, 3));
    }

    #[test]
    fn test_geographic_grid() {
        let grid = Grid::new(
            2,
            2,
            GeoTransform {
                top_left_x: 105.0,
                pixel_width: 0.5,
                top_left_y: 22.0,
                pixel_height: -0.5,
            },
            "EPSG:4326",
        );
        // Western half only
        let west = polygon![
            (x: 104.0, y: 20.0),
            (x: 105.5, y: 20.0),
            (x: 105.5, y: 23.0),
            (x: 104.0, y: 23.0),
        ];
        let region = RegionMask::from_polygons(&grid, &MultiPolygon::new(vec![west]));
        assert!(region.contains(0, 0));
        assert!(region.contains(1, 0));
        assert!(!region.contains(0, 1));
    }

    #[test]
    fn test_clip() {
        let region = RegionMask::from_mask(ndarray::array![[true, false]]);
        let clipped = region.clip(&Raster::filled((1, 2), 5.0)).unwrap();
        assert_eq!(clipped.get(0, 0), Some(5.0));
        assert_eq!(clipped.get(0, 1), None);
        assert!(region.ensure_shape((2, 2)).is_err());
    }
}
