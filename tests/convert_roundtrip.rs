//! Cross-format conversion tests over real files on disk.

use rasterpack_rs::codec::scale::scale_plane;
use rasterpack_rs::formats::{bmp, pgx, pnm, raw, tga, tiff};
use rasterpack_rs::{ByteOrder, ImageInfo, Plane, RasterImage};

fn test_image(width: u32, height: u32, components: usize, prec: u8) -> RasterImage {
    let pixels = (width * height) as usize;
    let max = (1i64 << prec) - 1;
    let planes: Vec<Plane> = (0..components)
        .map(|c| Plane {
            prec,
            signed: false,
            data: (0..pixels)
                .map(|i| ((i * 131 + c * 29) as i64 % (max + 1)) as i32)
                .collect(),
        })
        .collect();
    RasterImage::new(width, height, planes)
}

fn assert_same_samples(a: &RasterImage, b: &RasterImage) {
    assert_eq!(a.width, b.width);
    assert_eq!(a.height, b.height);
    assert_eq!(a.component_count(), b.component_count());
    for (c, (pa, pb)) in a.planes.iter().zip(&b.planes).enumerate() {
        assert_eq!(pa.data, pb.data, "component {}", c);
    }
}

#[test]
fn bmp_to_tiff_to_pnm_preserves_samples() {
    let dir = tempfile::tempdir().unwrap();
    let image = test_image(17, 9, 3, 8);

    let bmp_path = dir.path().join("a.bmp");
    bmp::write_bmp(&bmp_path, &image).unwrap();
    let from_bmp = bmp::read_bmp(&bmp_path).unwrap();
    assert_same_samples(&image, &from_bmp);

    let tif_path = dir.path().join("a.tif");
    tiff::write_tiff(&tif_path, &from_bmp).unwrap();
    let from_tiff = tiff::read_tiff(&tif_path).unwrap();
    assert_same_samples(&image, &from_tiff);

    let ppm_path = dir.path().join("a.ppm");
    pnm::write_pnm(&ppm_path, &from_tiff).unwrap();
    let from_pnm = pnm::read_pnm(&ppm_path).unwrap();
    assert_same_samples(&image, &from_pnm);
}

#[test]
fn odd_width_tiff_survives_pgx_and_raw() {
    let dir = tempfile::tempdir().unwrap();
    // 11 bits: every row of 7 samples ends mid-byte in the TIFF strip.
    let image = test_image(7, 5, 1, 11);

    let tif_path = dir.path().join("b.tif");
    tiff::write_tiff(&tif_path, &image).unwrap();
    let from_tiff = tiff::read_tiff(&tif_path).unwrap();
    assert_same_samples(&image, &from_tiff);

    let pgx_path = dir.path().join("b.pgx");
    pgx::write_pgx(&pgx_path, &from_tiff).unwrap();
    let from_pgx = pgx::read_pgx(&pgx_path).unwrap();
    assert_same_samples(&image, &from_pgx);

    let raw_path = dir.path().join("b.rawl");
    raw::write_raw(&raw_path, &from_pgx, ByteOrder::LittleEndian).unwrap();
    let info = ImageInfo {
        width: 7,
        height: 5,
        bits_per_sample: 11,
        component_count: 1,
        signed: false,
    };
    let from_raw = raw::read_raw(&raw_path, &info, ByteOrder::LittleEndian).unwrap();
    assert_same_samples(&image, &from_raw);
}

#[test]
fn tga_rgba_to_pam_preserves_alpha() {
    let dir = tempfile::tempdir().unwrap();
    let image = test_image(6, 4, 4, 8);

    let tga_path = dir.path().join("c.tga");
    tga::write_tga(&tga_path, &image).unwrap();
    let from_tga = tga::read_tga(&tga_path).unwrap();
    assert_same_samples(&image, &from_tga);

    let pam_path = dir.path().join("c.pam");
    pnm::write_pnm(&pam_path, &from_tga).unwrap();
    let from_pam = pnm::read_pnm(&pam_path).unwrap();
    assert_same_samples(&image, &from_pam);
}

#[test]
fn scaled_conversion_is_lossless_at_full_range_corners() {
    let dir = tempfile::tempdir().unwrap();
    let mut image = test_image(4, 4, 1, 12);
    image.planes[0].data[0] = 0;
    image.planes[0].data[15] = 4095;

    for plane in &mut image.planes {
        scale_plane(plane, 8);
    }
    assert_eq!(image.planes[0].prec, 8);
    assert_eq!(image.planes[0].data[0], 0);
    assert_eq!(image.planes[0].data[15], 255);

    let bmp_path = dir.path().join("d.bmp");
    bmp::write_bmp(&bmp_path, &image).unwrap();
    let back = bmp::read_bmp(&bmp_path).unwrap();
    assert_same_samples(&image, &back);
}

#[test]
fn signed_pgx_to_tiff_keeps_sample_domain() {
    let dir = tempfile::tempdir().unwrap();
    let image = RasterImage::new(
        3,
        1,
        vec![Plane {
            prec: 12,
            signed: true,
            data: vec![-2048, 0, 2047],
        }],
    );

    let pgx_path = dir.path().join("e.pgx");
    pgx::write_pgx(&pgx_path, &image).unwrap();
    let from_pgx = pgx::read_pgx(&pgx_path).unwrap();
    assert!(from_pgx.planes[0].signed);
    assert_same_samples(&image, &from_pgx);

    let tif_path = dir.path().join("e.tif");
    tiff::write_tiff(&tif_path, &from_pgx).unwrap();
    let from_tiff = tiff::read_tiff(&tif_path).unwrap();
    assert!(from_tiff.planes[0].signed);
    assert_same_samples(&image, &from_tiff);
}
