mod error;
mod files;
mod geometry;
mod logging;
mod machine;
mod output;
mod session;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use clap::Parser;
use eframe::egui;

use error::RunResult;
use session::{FailureSlot, MarkApp};

/// Iterate a directory of images and mark square gap regions on them,
/// writing the committed rectangles to a plain-text description file.
#[derive(Parser, Debug)]
#[command(name = "gapmark", about = "Markup gaps on images")]
struct Args {
    /// A directory with all the images. This directory has to contain
    /// only images.
    #[arg(long)]
    images: PathBuf,

    /// The resulting text file with the marked rectangles.
    #[arg(long)]
    description: PathBuf,

    /// Rewrite the description file rather than append to it.
    #[arg(long, default_value_t = false)]
    rewrite: bool,

    /// An image to start after. All the images up to and including this
    /// one are skipped. Useful to continue a stopped run.
    #[arg(long)]
    start_after: Option<String>,
}

fn main() -> ExitCode {
    logging::init();
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "run failed");
            ExitCode::FAILURE
        }
    }
}

fn print_instructions() {
    println!("Starting the image editor.");
    println!();
    println!("To mark an area, press the left mouse button and drag as if selecting it.");
    println!("The selected rectangle is normalized to a square automatically.");
    println!();
    println!("To move a selection, drag it while holding the right mouse button.");
    println!();
    println!("To delete a selection, hold the right mouse button on it and hit 'd'.");
    println!();
    println!("To finish the image and dump its selections to the file, press Esc.");
    println!();
}

fn run(args: Args) -> RunResult<()> {
    let files = files::collect_images(&args.images)?;
    let files = files::skip_through(files, args.start_after.as_deref());
    if files.is_empty() {
        tracing::warn!("no images left to annotate");
        return Ok(());
    }

    print_instructions();

    let sink = output::DescriptionSink::open(&args.description, args.rewrite)?;
    let failure: FailureSlot = Arc::new(Mutex::new(None));
    let app = MarkApp::new(files, sink, failure.clone());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title("gapmark"),
        ..Default::default()
    };
    eframe::run_native("gapmark", options, Box::new(move |_cc| Ok(Box::new(app))))?;

    // The window closes on fatal errors too; the sink has flushed every
    // record written so far and is released with the app.
    let result = match failure.lock().unwrap().take() {
        Some(err) => Err(err),
        None => Ok(()),
    };
    result
}
