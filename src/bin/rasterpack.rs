//! rasterpack CLI - raster format conversion utility.
//!
//! Converts between BMP, TIFF, TGA, PNM, PGX, and raw sample dumps,
//! with optional precision adaptation on the way through.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use rasterpack_rs::codec::scale::{clip_plane, scale_plane};
use rasterpack_rs::formats::{self, FileFormat};
use rasterpack_rs::{ByteOrder, ImageInfo, RasterError, RasterImage};

/// Raster image converter built around an N-bit sample packing codec
#[derive(Parser)]
#[command(name = "rasterpack")]
#[command(author = "rasterpack-rs contributors")]
#[command(version)]
#[command(about = "Convert raster images between packed sample formats", long_about = None)]
#[command(after_help = "EXAMPLES:
    rasterpack convert -i image.bmp -o image.tif
    rasterpack convert -i scan.tif -o scan.pgm --bits 8
    rasterpack convert -i frame.raw -o frame.ppm -W 640 -H 480 -b 12 -n 3
    rasterpack info -i image.tif
    rasterpack batch -i ./scans -o ./out -t tif

SUPPORTED FORMATS:
    BMP (.bmp), TIFF (.tif/.tiff, uncompressed), TGA (.tga),
    PNM (.pgm/.ppm/.pam), PGX (.pgx), raw dumps (.raw/.rawl)")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one image file to another format
    ///
    /// Input format is detected from magic bytes, falling back to the
    /// file extension; the output format follows the output extension.
    #[command(visible_alias = "c")]
    Convert {
        /// Input image file
        #[arg(short, long, help = "Path to the input image file")]
        input: PathBuf,

        /// Output image file
        #[arg(short, long, help = "Path for the converted output file")]
        output: PathBuf,

        /// Rescale all components to this precision before encoding
        #[arg(long, value_name = "BITS")]
        bits: Option<u8>,

        /// Clip instead of rescaling when changing precision
        #[arg(long)]
        clip: bool,

        /// Image width (raw input only)
        #[arg(short = 'W', long)]
        width: Option<u32>,

        /// Image height (raw input only)
        #[arg(short = 'H', long)]
        height: Option<u32>,

        /// Bits per sample of the input (raw input only)
        #[arg(short = 'b', long)]
        input_bits: Option<u8>,

        /// Number of components (raw input only)
        #[arg(short = 'n', long, default_value = "1")]
        components: u8,

        /// Treat raw input samples as signed
        #[arg(long)]
        signed: bool,
    },

    /// Print the header fields of an image file
    #[command(visible_alias = "I")]
    Info {
        /// Input image file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Convert every image in a directory
    ///
    /// Files that fail to convert are reported and skipped; the batch
    /// continues with the remaining files.
    #[command(visible_alias = "b")]
    Batch {
        /// Input directory
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Target format extension (bmp, tif, tga, pgm, ppm, pam, pgx)
        #[arg(short = 't', long, default_value = "tif")]
        to: String,

        /// Rescale all components to this precision before encoding
        #[arg(long, value_name = "BITS")]
        bits: Option<u8>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            input,
            output,
            bits,
            clip,
            width,
            height,
            input_bits,
            components,
            signed,
        } => {
            let raw_info = match (width, height, input_bits) {
                (Some(width), Some(height), Some(bits_per_sample)) => Some(ImageInfo {
                    width,
                    height,
                    bits_per_sample,
                    component_count: components,
                    signed,
                }),
                _ => None,
            };
            convert_file(&input, &output, raw_info, bits, clip)
        }
        Commands::Info { input } => print_info(&input),
        Commands::Batch {
            input,
            output,
            to,
            bits,
        } => run_batch(&input, &output, &to, bits),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn detect_format(path: &Path) -> Result<FileFormat, RasterError> {
    // Magic bytes win over the extension; raw dumps have neither.
    let mut magic = [0u8; 4];
    if let Ok(data) = std::fs::read(path) {
        let len = data.len().min(4);
        magic[..len].copy_from_slice(&data[..len]);
        if let Some(format) = FileFormat::from_magic(&magic[..len]) {
            return Ok(format);
        }
    }
    FileFormat::from_path(path).ok_or(RasterError::InvalidArgument)
}

fn read_image(
    path: &Path,
    format: FileFormat,
    raw_info: Option<ImageInfo>,
) -> Result<RasterImage, RasterError> {
    match format {
        FileFormat::Pgx => formats::pgx::read_pgx(path),
        FileFormat::Pnm => formats::pnm::read_pnm(path),
        FileFormat::Tga => formats::tga::read_tga(path),
        FileFormat::Bmp => formats::bmp::read_bmp(path),
        FileFormat::Tiff => formats::tiff::read_tiff(path),
        FileFormat::Raw | FileFormat::RawL => {
            let info = raw_info.ok_or(RasterError::InvalidArgument)?;
            let order = if format == FileFormat::Raw {
                ByteOrder::BigEndian
            } else {
                ByteOrder::LittleEndian
            };
            formats::raw::read_raw(path, &info, order)
        }
    }
}

fn write_image(path: &Path, format: FileFormat, image: &RasterImage) -> Result<(), RasterError> {
    match format {
        FileFormat::Pgx => formats::pgx::write_pgx(path, image),
        FileFormat::Pnm => formats::pnm::write_pnm(path, image),
        FileFormat::Tga => formats::tga::write_tga(path, image),
        FileFormat::Bmp => formats::bmp::write_bmp(path, image),
        FileFormat::Tiff => formats::tiff::write_tiff(path, image),
        FileFormat::Raw => formats::raw::write_raw(path, image, ByteOrder::BigEndian),
        FileFormat::RawL => formats::raw::write_raw(path, image, ByteOrder::LittleEndian),
    }
}

fn convert_file(
    input: &Path,
    output: &Path,
    raw_info: Option<ImageInfo>,
    bits: Option<u8>,
    clip: bool,
) -> Result<(), RasterError> {
    let in_format = detect_format(input)?;
    let out_format = FileFormat::from_path(output).ok_or(RasterError::InvalidArgument)?;

    let mut image = read_image(input, in_format, raw_info)?;
    if let Some(bits) = bits {
        if !(1..=16).contains(&bits) {
            return Err(RasterError::InvalidArgumentBitsPerSample);
        }
        for plane in &mut image.planes {
            if clip {
                clip_plane(plane, bits);
            } else {
                scale_plane(plane, bits);
            }
        }
    }
    write_image(output, out_format, &image)
}

fn print_info(input: &Path) -> Result<(), RasterError> {
    let format = detect_format(input)?;
    let image = read_image(input, format, None)?;
    println!("Format:     {:?}", format);
    println!("Dimensions: {}x{}", image.width, image.height);
    println!("Components: {}", image.component_count());
    if let Some(model) = image.color_model() {
        println!("Layout:     {:?}", model);
    }
    for (i, plane) in image.planes.iter().enumerate() {
        println!(
            "  [{}] {} bits, {}",
            i,
            plane.prec,
            if plane.signed { "signed" } else { "unsigned" }
        );
    }
    Ok(())
}

fn run_batch(
    input: &Path,
    output: &Path,
    to: &str,
    bits: Option<u8>,
) -> Result<(), RasterError> {
    std::fs::create_dir_all(output)?;
    let mut converted = 0u32;
    let mut failed = 0u32;

    for entry in std::fs::read_dir(input)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || FileFormat::from_path(&path).is_none() {
            continue;
        }
        let dest = output.join(path.file_stem().unwrap_or_default()).with_extension(to);
        match convert_file(&path, &dest, None, bits, false) {
            Ok(()) => {
                converted += 1;
                println!("{} -> {}", path.display(), dest.display());
            }
            Err(e) => {
                // A failed file does not stop the batch.
                failed += 1;
                eprintln!("{}: {}", path.display(), e);
            }
        }
    }
    println!("{} converted, {} failed", converted, failed);
    Ok(())
}
