//! The Manifestorium - threshold intro
//!
//! Plays the once-per-session intro in the terminal with live procedural
//! ambience, or renders/analyzes the ambience offline.

use std::cell::Cell;
use std::error::Error;
use std::io::BufRead;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use manifestorium::audio::{
    analyze, render_ambience, write_wav, Ambience, AmbientEngine, CpalBackend, Silence,
};
use manifestorium::cli::Args;
use manifestorium::intro::{ExitReason, IntroSequencer};
use manifestorium::params::{
    audio_constants::DEFAULT_SAMPLE_RATE, AmbienceParams, AnalysisConfig, FadeParams,
};
use manifestorium::session::FileStore;
use manifestorium::timing::{SharedClock, SystemClock};

/// How often the intro loop polls timers and input
const TICK: Duration = Duration::from_millis(20);

enum Input {
    Enter,
    Skip,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter())),
        )
        .init();

    if let Some(seconds) = args.render {
        return render(&args, seconds);
    }
    if let Some(seconds) = args.analyze {
        return analyze_ambience(&args, seconds);
    }
    run_intro(&args)
}

fn run_intro(args: &Args) -> Result<(), Box<dyn Error>> {
    let clock: SharedClock = Rc::new(SystemClock::new());
    let audio: Box<dyn Ambience> = if args.mute {
        Box::new(Silence)
    } else {
        Box::new(AmbientEngine::new(
            AmbienceParams::default(),
            Box::new(CpalBackend::new()),
            Rc::clone(&clock),
        ))
    };

    let config = args.intro_config();
    let final_phase = config.final_content_phase();
    let mut intro = IntroSequencer::new(config, FileStore::for_login_session(), audio, clock)?;

    let entered = Rc::new(Cell::new(false));
    let on_complete = Rc::clone(&entered);
    intro.activate(move || on_complete.set(true));

    if intro.exit_reason() == Some(ExitReason::AlreadySeen) {
        if args.replay {
            intro.replay();
        } else {
            println!("(The threshold was already crossed this session; use --replay to see it again)");
        }
    }

    if !intro.is_done() {
        println!("Press Enter to enter, or type s + Enter to skip\n");
    }

    let input = spawn_input_thread();
    let mut shown = 0;
    loop {
        intro.poll();

        if intro.phase() != shown {
            shown = intro.phase();
            if let Some(caption) = caption(shown, final_phase) {
                println!("    {caption}");
            }
        }

        if intro.is_done() {
            // Let the ambience finish its fade-out before exiting
            if !intro.audio().is_running() {
                break;
            }
        } else if let Ok(input) = input.try_recv() {
            match input {
                Input::Enter => intro.enter(),
                Input::Skip => intro.skip(),
            }
        }

        thread::sleep(TICK);
    }

    if entered.get() {
        println!("\nWelcome to the Sanctum.");
    }
    Ok(())
}

fn caption(phase: u32, final_phase: u32) -> Option<&'static str> {
    match phase {
        0 => None,
        p if p > final_phase => None,
        p if p == final_phase => Some("A quiet kind of magic awaits   [ Enter ]"),
        1 => Some("Somewhere in the desert..."),
        _ => Some("T H E   M A N I F E S T O R I U M"),
    }
}

/// Forward stdin lines to the intro loop; the thread ends with stdin
fn spawn_input_thread() -> Receiver<Input> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            let input = if line.trim().eq_ignore_ascii_case("s") {
                Input::Skip
            } else {
                Input::Enter
            };
            if tx.send(input).is_err() {
                break;
            }
        }
    });
    rx
}

fn render(args: &Args, seconds: f32) -> Result<(), Box<dyn Error>> {
    let samples = render_ambience(
        &AmbienceParams::default(),
        &args.fades(),
        DEFAULT_SAMPLE_RATE,
        seconds,
    )?;
    write_wav(&args.output, &samples, DEFAULT_SAMPLE_RATE)?;
    println!(
        "Wrote {:.1}s of ambience to {}",
        seconds,
        args.output.display()
    );
    Ok(())
}

fn analyze_ambience(args: &Args, seconds: f32) -> Result<(), Box<dyn Error>> {
    let fades = FadeParams {
        fade_in_ms: 0,
        fade_out_ms: 0,
        ..args.fades()
    };
    let samples = render_ambience(
        &AmbienceParams::default(),
        &fades,
        DEFAULT_SAMPLE_RATE,
        seconds,
    )?;

    let config = AnalysisConfig {
        sample_rate_hz: DEFAULT_SAMPLE_RATE as usize,
        ..AnalysisConfig::default()
    };
    let bands = analyze(&samples, &config)?;

    println!("Ambience spectrum over {seconds:.1}s:");
    println!("  low  {:>10.6}  (drone, wind)", bands.low);
    println!("  mid  {:>10.6}", bands.mid);
    println!("  high {:>10.6}  (shimmer)", bands.high);
    Ok(())
}
