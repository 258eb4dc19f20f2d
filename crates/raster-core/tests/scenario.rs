//! End-to-end walk over a 10x10 all-ones grid on the unit square.

use raster_core::{
    polygon_from_rings, EdgePolicy, EngineConfig, Extent, ExtractEngine, ExtractOptions,
    FocalEngine, FocalOptions, GeoProvider, RasterImage, RasterizeEngine, RasterizeOptions,
    Reducer, WorkerPool,
};
use test_utils::{create_constant_grid, fixtures, init_test_logging};

fn ones() -> RasterImage {
    let spec = fixtures::grid::UNIT_10X10;
    let (xmin, xmax, ymin, ymax) = spec.extent;
    RasterImage::from_array(
        create_constant_grid(spec.cols, spec.rows, 1.0),
        spec.rows,
        spec.cols,
        Extent::new(xmin, xmax, ymin, ymax),
        Some(fixtures::crs::EPSG_4326.to_string()),
        Some(fixtures::nodata::NEG_9999),
    )
    .unwrap()
}

#[test]
fn test_resolution() {
    let image = ones();
    let (xres, yres) = image.georef().resolution();
    let (spec_x, spec_y) = fixtures::grid::UNIT_10X10.resolution();
    assert!((xres - 0.1).abs() < 1e-12);
    assert!((yres - 0.1).abs() < 1e-12);
    assert!((xres - spec_x).abs() < 1e-12 && (yres - spec_y).abs() < 1e-12);
}

#[test]
fn test_aggregate_sum_2x2() {
    init_test_logging();
    let agg = ones().aggregate(2, 2, &Reducer::Sum).unwrap();
    assert_eq!((agg.rows(), agg.cols()), (5, 5));
    assert!(agg.grid().as_slice().iter().all(|v| *v == 4.0));
}

#[test]
fn test_crop_is_cell_aligned() {
    let cropped = ones().crop(&Extent::new(0.3, 0.7, 0.3, 0.7)).unwrap();
    assert_eq!((cropped.rows(), cropped.cols()), (4, 4));

    let extent = cropped.extent();
    assert!((extent.xmin - 0.3).abs() < 1e-12);
    assert!((extent.xmax - 0.7).abs() < 1e-12);
    assert!((extent.ymin - 0.3).abs() < 1e-12);
    assert!((extent.ymax - 0.7).abs() < 1e-12);
}

#[test]
fn test_focal_sum_shrink() {
    let out = FocalEngine::default()
        .apply(
            &ones(),
            &FocalOptions::new(3, 3, Reducer::Sum).with_edge_policy(EdgePolicy::Shrink),
        )
        .unwrap();
    let grid = out.grid();

    for row in 0..10 {
        for col in 0..10 {
            let on_row_edge = row == 0 || row == 9;
            let on_col_edge = col == 0 || col == 9;
            let expected = match (on_row_edge, on_col_edge) {
                (true, true) => 4.0,
                (true, false) | (false, true) => 6.0,
                (false, false) => 9.0,
            };
            assert_eq!(grid.get(0, row, col).unwrap(), Some(expected), "({}, {})", row, col);
        }
    }
}

#[test]
fn test_engines_share_a_pool() {
    let config = EngineConfig {
        worker_threads: Some(2),
        ..Default::default()
    };
    let pool = WorkerPool::from_config(&config).unwrap();
    assert_eq!(pool.threads(), 2);

    let rasterize = RasterizeEngine::with_pool(GeoProvider, pool.clone(), &config);
    let extract = ExtractEngine::with_pool(GeoProvider, pool.clone(), &config);
    let focal = FocalEngine::with_pool(pool, &config);

    let mut image = ones();
    let zones = vec![
        polygon_from_rings(&fixtures::rings::rect(0.0, 0.0, 0.5, 1.0), &[]),
        polygon_from_rings(&fixtures::rings::rect(0.5, 0.0, 1.0, 1.0), &[]),
    ];
    rasterize
        .rasterize(&mut image, &zones, &RasterizeOptions::with_values(vec![2.0, 3.0]))
        .unwrap();

    let smoothed = focal
        .apply(&image, &FocalOptions::new(1, 1, Reducer::Max))
        .unwrap();
    assert_eq!(smoothed, image);

    let results = extract
        .extract(&image, &zones, &ExtractOptions::new(Reducer::Sum))
        .unwrap();
    assert_eq!(results[0].values, vec![Some(100.0)]);
    assert_eq!(results[1].values, vec![Some(150.0)]);
    assert_eq!(results[0].cells, 50);
}
