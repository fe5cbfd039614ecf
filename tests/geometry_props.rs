//! Property-Based Tests for Targeting Geometry
//!
//! Verifies invariants of the box and projection math with proptest.

use eyecapture::geometry::{alignment_box, bounding_box, FitMode, ViewTransform};
use eyecapture::landmarks::{frame_boxes, FACE_MESH_POINTS};
use eyecapture::quality::laplacian_sharpness;
use eyecapture::testing::SyntheticFace;
use eyecapture::types::{Eye, NormalizedPoint, Viewport};
use image::{Rgb, RgbImage};
use proptest::prelude::*;

fn point() -> impl Strategy<Value = NormalizedPoint> {
    (0.0f32..=1.0, 0.0f32..=1.0).prop_map(|(x, y)| NormalizedPoint::new(x, y))
}

proptest! {
    /// INVARIANT: the box contains every selected point and nothing else widens it
    #[test]
    fn bounding_box_is_tight(
        points in prop::collection::vec(point(), 1..40),
        picks in prop::collection::vec(0usize..60, 1..20),
    ) {
        let valid: Vec<usize> = picks.iter().copied().filter(|&i| i < points.len()).collect();
        let b = bounding_box(&points, &picks);
        prop_assert_eq!(b.is_some(), !valid.is_empty());

        if let Some(b) = b {
            for &i in &valid {
                let p = points[i];
                prop_assert!(b.min_x <= p.x && p.x <= b.max_x);
                prop_assert!(b.min_y <= p.y && p.y <= b.max_y);
            }
            prop_assert!(valid.iter().any(|&i| points[i].x == b.min_x));
            prop_assert!(valid.iter().any(|&i| points[i].y == b.max_y));
        }
    }

    /// INVARIANT: Cover fills the view, Contain fits inside it
    #[test]
    fn fit_modes_bound_the_view(
        sw in 16u32..4000,
        sh in 16u32..4000,
        vw in 100.0f32..3000.0,
        vh in 100.0f32..3000.0,
    ) {
        let cover = ViewTransform::new(sw, sh, vw, vh, FitMode::Cover);
        let tl = cover.project(NormalizedPoint::new(0.0, 0.0));
        let br = cover.project(NormalizedPoint::new(1.0, 1.0));
        prop_assert!(tl.x <= 0.01 && tl.y <= 0.01);
        prop_assert!(br.x >= vw - 0.01 && br.y >= vh - 0.01);

        let contain = ViewTransform::new(sw, sh, vw, vh, FitMode::Contain);
        let tl = contain.project(NormalizedPoint::new(0.0, 0.0));
        let br = contain.project(NormalizedPoint::new(1.0, 1.0));
        prop_assert!(tl.x >= -0.01 && tl.y >= -0.01);
        prop_assert!(br.x <= vw + 0.01 && br.y <= vh + 0.01);

        prop_assert!(cover.scale >= contain.scale);
    }

    /// INVARIANT: projection preserves ordering along both axes
    #[test]
    fn projection_is_monotonic(a in point(), b in point(), mode in prop_oneof![Just(FitMode::Cover), Just(FitMode::Contain)]) {
        let t = ViewTransform::new(640, 480, 1080.0, 1920.0, mode);
        let (pa, pb) = (t.project(a), t.project(b));
        if a.x < b.x { prop_assert!(pa.x <= pb.x); }
        if a.y < b.y { prop_assert!(pa.y <= pb.y); }
    }

    /// INVARIANT: the alignment box is a centered square inside the view
    #[test]
    fn alignment_box_fits(w in 1.0f32..4000.0, h in 1.0f32..4000.0, f in 0.0f32..=1.0) {
        let r = alignment_box(Viewport::new(w, h), f);
        prop_assert!((r.width() - r.height()).abs() < 1e-2);
        prop_assert!(r.left >= -1e-3 && r.right <= w + 1e-3);
        prop_assert!(r.top >= -1e-3 && r.bottom <= h + 1e-3);
        prop_assert!(((r.left + r.right) / 2.0 - w / 2.0).abs() < 1e-2);
    }

    /// INVARIANT: shifting a face moves its eye box by the same amount
    #[test]
    fn eye_box_tracks_face(dx in -0.1f32..0.1, dy in -0.1f32..0.1) {
        let base = SyntheticFace::centered_on(Eye::Right);
        let moved = base.shifted(dx, dy);
        let b0 = frame_boxes(&base.frame(640, 480), Eye::Right).unwrap();
        let b1 = frame_boxes(&moved.frame(640, 480), Eye::Right).unwrap();
        prop_assert!((b1.eye.center_x() - b0.eye.center_x() - dx).abs() < 1e-4);
        prop_assert!((b1.eye.center_y() - b0.eye.center_y() - dy).abs() < 1e-4);
        prop_assert_eq!(moved.landmarks().len(), FACE_MESH_POINTS);
    }

    /// INVARIANT: sharpness is non-negative and zero for uniform images
    #[test]
    fn sharpness_is_non_negative(
        w in 1u32..24,
        h in 1u32..24,
        seed in any::<u64>(),
        level in any::<u8>(),
    ) {
        let noisy = RgbImage::from_fn(w, h, |x, y| {
            let v = (seed.wrapping_mul(31).wrapping_add((x * 7 + y * 13) as u64) % 256) as u8;
            Rgb([v, v.wrapping_add(3), v.wrapping_sub(5)])
        });
        prop_assert!(laplacian_sharpness(&noisy) >= 0.0);
        prop_assert_eq!(laplacian_sharpness(&RgbImage::from_pixel(w, h, Rgb([level, level, level]))), 0.0);
        if w < 3 || h < 3 {
            prop_assert_eq!(laplacian_sharpness(&noisy), 0.0);
        }
    }
}
