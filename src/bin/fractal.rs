// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use clap::{App, Arg, ArgMatches};
use image::pnm::PNMEncoder;
use image::pnm::{PNMSubtype, SampleEncoding};
use image::{ColorType, RgbImage};
use std::fs::File;
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::AtomicBool;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fractal_explorer::builtin::{builtin, julia_formula};
use fractal_explorer::complex::{parse_complex, parse_pair};
use fractal_explorer::escape::mark_point;
use fractal_explorer::traps::rgb;
use fractal_explorer::{
    compile, render, DisplayBounds, EscapePolicy, PlaneMapper, RenderError, RenderOutcome,
    RenderSettings,
};

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_positive(s: &str, isnotanumber_err: &str, isnotpositive_err: &str) -> Result<(), String> {
    match f64::from_str(s) {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(()),
        Ok(_) => Err(isnotpositive_err.to_string()),
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

fn validate_range<T: FromStr + PartialOrd>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const OUTPUT: &str = "output";
const FORMULA: &str = "formula";
const FRACTAL: &str = "fractal";
const JULIA: &str = "julia";
const SIZE: &str = "size";
const LEFTLOWER: &str = "leftlower";
const RIGHTUPPER: &str = "rightupper";
const INVERT_REAL: &str = "invert-real";
const INVERT_IMAG: &str = "invert-imag";
const ITERATIONS: &str = "iterations";
const POINT: &str = "point";
const TRAP: &str = "trap";
const RADIUS: &str = "radius";
const GRADIENT: &str = "gradient";
const THICKNESS: &str = "thickness";

fn args<'a>() -> ArgMatches<'a> {
    App::new("fractal")
        .version("0.1.0")
        .about("Escape-time fractal renderer for user-defined recurrence formulas")
        .arg(
            Arg::with_name(OUTPUT)
                .required(true)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output file (binary PPM)"),
        )
        .arg(
            Arg::with_name(FORMULA)
                .long(FORMULA)
                .short("f")
                .takes_value(true)
                .conflicts_with(FRACTAL)
                .help("Formula: first term, ';', rule for the next term (e.g. c;p*p+c)"),
        )
        .arg(
            Arg::with_name(FRACTAL)
                .long(FRACTAL)
                .short("n")
                .takes_value(true)
                .help("Built-in fractal: Mandelbrot (the default), Burning Ship or Buffalo"),
        )
        .arg(
            Arg::with_name(JULIA)
                .long(JULIA)
                .short("j")
                .help("Draw the Julia set of the formula for the selected point"),
        )
        .arg(
            Arg::with_name(SIZE)
                .required(false)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("600x600")
                .validator(|s| validate_pair::<u16>(&s, 'x', "Could not parse output image size"))
                .help("Size of output image"),
        )
        .arg(
            Arg::with_name(LEFTLOWER)
                .required(false)
                .long(LEFTLOWER)
                .short("l")
                .takes_value(true)
                .default_value("-2.5,-1.6")
                .allow_hyphen_values(true)
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse left lower corner"))
                .help("Left lower corner of the displayed plane"),
        )
        .arg(
            Arg::with_name(RIGHTUPPER)
                .required(false)
                .long(RIGHTUPPER)
                .short("r")
                .takes_value(true)
                .default_value("1.5,1.6")
                .allow_hyphen_values(true)
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse right upper corner"))
                .help("Right upper corner of the displayed plane"),
        )
        .arg(
            Arg::with_name(INVERT_REAL)
                .long(INVERT_REAL)
                .help("Mirror the real axis"),
        )
        .arg(
            Arg::with_name(INVERT_IMAG)
                .long(INVERT_IMAG)
                .help("Mirror the imaginary axis"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .required(false)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("100")
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        1_000_000,
                        "Could not parse iteration count",
                        "Iteration count must be between 1 and 1000000",
                    )
                })
                .help("Maximum number of iterations per point"),
        )
        .arg(
            Arg::with_name(POINT)
                .long(POINT)
                .short("u")
                .takes_value(true)
                .allow_hyphen_values(true)
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse selected point"))
                .help("The selected point, bound to u in formulas"),
        )
        .arg(
            Arg::with_name(TRAP)
                .long(TRAP)
                .short("t")
                .takes_value(true)
                .default_value("default")
                .possible_values(&["default", "circle", "axis", "diagonal"])
                .help("Escape test and coloring"),
        )
        .arg(
            Arg::with_name(RADIUS)
                .long(RADIUS)
                .takes_value(true)
                .validator(|s| validate_positive(&s, "Could not parse radius", "Radius must be positive"))
                .help("Circle trap radius"),
        )
        .arg(
            Arg::with_name(GRADIENT)
                .long(GRADIENT)
                .takes_value(true)
                .validator(|s| validate_positive(&s, "Could not parse gradient", "Gradient must be positive"))
                .help("Circle trap color gradient"),
        )
        .arg(
            Arg::with_name(THICKNESS)
                .long(THICKNESS)
                .takes_value(true)
                .validator(|s| {
                    validate_positive(&s, "Could not parse thickness", "Thickness must be positive")
                })
                .help("Cross trap arm thickness"),
        )
        .get_matches()
}

fn parse_f64(matches: &ArgMatches, name: &str) -> Option<f64> {
    matches.value_of(name).and_then(|s| f64::from_str(s).ok())
}

/// Builds the escape policy from the trap name and its optional knobs.
fn policy(matches: &ArgMatches) -> EscapePolicy {
    let chosen = matches
        .value_of(TRAP)
        .and_then(|s| EscapePolicy::from_str(s).ok())
        .unwrap_or_default();
    match chosen {
        EscapePolicy::Circle { radius, gradient } => EscapePolicy::Circle {
            radius: parse_f64(matches, RADIUS).unwrap_or(radius),
            gradient: parse_f64(matches, GRADIENT).unwrap_or(gradient),
        },
        EscapePolicy::AxisCross { thickness } => EscapePolicy::AxisCross {
            thickness: parse_f64(matches, THICKNESS).unwrap_or(thickness),
        },
        EscapePolicy::DiagonalCross { thickness } => EscapePolicy::DiagonalCross {
            thickness: parse_f64(matches, THICKNESS).unwrap_or(thickness),
        },
        EscapePolicy::Default => EscapePolicy::Default,
    }
}

fn formula_text(matches: &ArgMatches) -> Result<String, RenderError> {
    let raw = match matches.value_of(FORMULA) {
        Some(raw) => raw.to_string(),
        None => {
            let name = matches.value_of(FRACTAL).unwrap_or("Mandelbrot");
            builtin(name)
                .map(|b| b.formula.to_string())
                .ok_or_else(|| RenderError::UnknownFractal(name.to_string()))?
        }
    };
    if matches.is_present(JULIA) {
        return julia_formula(&raw).ok_or(RenderError::NoJuliaSet(raw));
    }
    Ok(raw)
}

// Only for arguments with defaults, which clap has already validated.
fn parsed<T, F>(matches: &ArgMatches, name: &str, what: &'static str, parse: F) -> Result<T, RenderError>
where
    F: Fn(&str) -> Option<T>,
{
    let raw = matches.value_of(name).unwrap_or_default();
    parse(raw).ok_or_else(|| RenderError::InvalidArgument(what, raw.to_string()))
}

fn write_image(outfile: &str, image: RgbImage) -> Result<(), std::io::Error> {
    let path = Path::new(outfile);
    let output = File::create(&path)?;
    let (width, height) = image.dimensions();
    let pixels = image.into_raw();
    let mut encoder =
        PNMEncoder::new(output).with_subtype(PNMSubtype::Pixmap(SampleEncoding::Binary));
    encoder.encode(&pixels[..], width, height, ColorType::RGB(8))?;
    Ok(())
}

fn run(matches: &ArgMatches) -> Result<(), RenderError> {
    let raw = formula_text(matches)?;
    let formula = compile(&raw)?;

    let (width, height) = parsed(matches, SIZE, "image size", |s| parse_pair::<u16>(s, 'x'))?;
    let leftlower = parsed(matches, LEFTLOWER, "left lower corner", parse_complex)?;
    let rightupper = parsed(matches, RIGHTUPPER, "right upper corner", parse_complex)?;

    let mut bounds = DisplayBounds::from_corners(leftlower, rightupper);
    if matches.is_present(INVERT_REAL) {
        bounds.invert_real();
    }
    if matches.is_present(INVERT_IMAG) {
        bounds.invert_imag();
    }
    let plane = PlaneMapper::new(width as usize, height as usize, bounds)?;

    let settings = RenderSettings {
        max_iterations: matches
            .value_of(ITERATIONS)
            .and_then(|s| usize::from_str(s).ok())
            .unwrap_or(100),
        user_point: matches.value_of(POINT).and_then(parse_complex),
        policy: policy(matches),
    };
    if formula.needs_user_point() && settings.user_point.is_none() {
        info!("formula {} reads u but no --point was given; nothing will be drawn", raw);
    }

    let mut image = RgbImage::new(u32::from(width), u32::from(height));
    let never = AtomicBool::new(false);
    if let RenderOutcome::Cancelled { rows_done } = render(&formula, &settings, &plane, &mut image, &never) {
        info!(rows_done, "partial image");
    }
    if let Some(point) = settings.user_point {
        if !mark_point(&plane, &mut image, point, rgb(255, 0, 0)) {
            info!("selected point {} is off the canvas", point);
        }
    }

    let outfile = matches.value_of(OUTPUT).unwrap_or("fractal.ppm");
    write_image(outfile, image)?;
    info!("wrote {}", outfile);
    Ok(())
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "fractal_explorer=warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let matches = args();
    if let Err(e) = run(&matches) {
        match e {
            RenderError::Compile(ref c) => eprintln!("{}", c.message_for_users()),
            ref other => eprintln!("Render failure: {}", other),
        }
        error!("{}", e);
        std::process::exit(1);
    }
}
