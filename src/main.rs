use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use skia_safe::Color;

use vectorimage::color::parse_hex_color;
use vectorimage::{Config, EdgeInsets, Error, FitMode, PageBox, Shadow, Size, VectorImage};

/// Render the first page of a PDF to a PNG at any size.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// PDF path, file:// URL, or resource name looked up in the configured bundles
    input: String,

    /// Output PNG path
    #[arg(short, long, required_unless_present = "info", value_hint = clap::ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// Bounding width in pixels (unconstrained when omitted)
    #[arg(long)]
    width: Option<f64>,

    /// Bounding height in pixels (unconstrained when omitted)
    #[arg(long)]
    height: Option<f64>,

    /// Recolour the content, e.g. #ff8800
    #[arg(long, value_parser = parse_hex_color)]
    tint: Option<Color>,

    #[arg(long, value_parser = parse_hex_color)]
    background: Option<Color>,

    /// Enables the drop shadow
    #[arg(long, value_parser = parse_hex_color)]
    shadow_color: Option<Color>,

    /// Shadow offset in page units, as DX,DY
    #[arg(long, value_parser = parse_pair, default_value = "0,2", allow_hyphen_values = true)]
    shadow_offset: (f64, f64),

    /// Shadow blur radius in page units
    #[arg(long, default_value_t = 3.0)]
    shadow_blur: f64,

    /// Insets in page units, as TOP,LEFT,BOTTOM,RIGHT
    #[arg(long, value_parser = parse_insets, allow_hyphen_values = true)]
    insets: Option<EdgeInsets>,

    /// Keep fractional fitted sizes instead of flooring to whole pixels
    #[arg(long)]
    exact: bool,

    /// Print page boxes and native size instead of rendering
    #[arg(long)]
    info: bool,

    /// Config file to use instead of the platform default
    #[arg(short = 'C', long, value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,
}

fn parse_numbers(input: &str, expected: usize) -> Result<Vec<f64>, String> {
    let values = input
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("'{input}': {e}"))?;
    if values.len() != expected {
        return Err(format!(
            "'{input}': expected {expected} comma-separated numbers"
        ));
    }
    Ok(values)
}

fn parse_pair(input: &str) -> Result<(f64, f64), String> {
    let v = parse_numbers(input, 2)?;
    Ok((v[0], v[1]))
}

fn parse_insets(input: &str) -> Result<EdgeInsets, String> {
    let v = parse_numbers(input, 4)?;
    Ok(EdgeInsets::new(v[0], v[1], v[2], v[3]))
}

fn open_image(input: &str, config: &Config) -> Result<VectorImage> {
    let as_path = PathBuf::from(input);
    if input.contains("://") || as_path.is_file() {
        return VectorImage::from_pdf_url(input).with_context(|| format!("Failed to load {input}"));
    }

    for bundle in config.bundles() {
        match VectorImage::from_pdf_named_in(input, Some(&bundle)) {
            Ok(image) => return Ok(image),
            Err(Error::ResourceNotFound(_)) => {
                log::debug!("'{}' not in {}", input, bundle.root().display());
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to load {input}")),
        }
    }
    bail!("No PDF named '{}' in any configured bundle", input)
}

fn print_info(image: &VectorImage) {
    let native = image.native_size();
    println!("native size: {:.2} x {:.2}", native.width, native.height);
    for (label, kind) in [
        ("media", PageBox::Media),
        ("crop", PageBox::Crop),
        ("bleed", PageBox::Bleed),
        ("trim", PageBox::Trim),
        ("art", PageBox::Art),
    ] {
        let r = image.page_box(kind);
        println!(
            "{:<6} [{:.2}, {:.2}, {:.2}, {:.2}]",
            label, r.left, r.top, r.right, r.bottom
        );
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => Config::load(),
    };

    let mut image = open_image(&cli.input, &config)?;

    if cli.info {
        print_info(&image);
        return Ok(());
    }

    let mut params = config.render_params();
    if cli.tint.is_some() {
        params.tint_color = cli.tint;
    }
    if cli.background.is_some() {
        params.background_color = cli.background;
    }
    if let Some(color) = cli.shadow_color {
        params.shadow = Some(Shadow::new(color, cli.shadow_offset, cli.shadow_blur));
    }
    if let Some(insets) = cli.insets {
        params.insets = insets;
    }
    image.set_params(params);

    let bounds = Size::new(
        cli.width.unwrap_or(Size::UNCONSTRAINED),
        cli.height.unwrap_or(Size::UNCONSTRAINED),
    );
    let mode = if cli.exact {
        FitMode::Exact
    } else {
        config.fit_mode
    };
    let target = image.size_that_fits_with(bounds, mode)?;
    log::info!(
        "Fitting {:.1}x{:.1} into {:?} -> {:.1}x{:.1}",
        image.native_size().width,
        image.native_size().height,
        bounds,
        target.width,
        target.height
    );

    let bitmap = image.render_with(&config.compositor(), target)?;

    let Some(output) = cli.output else {
        bail!("--output is required unless --info is given");
    };
    bitmap.save_png(&output)?;
    println!(
        "Wrote {}x{} image to {}",
        bitmap.width(),
        bitmap.height(),
        output.display()
    );

    Ok(())
}
