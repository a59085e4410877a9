use clap::Parser;
use compute::{Simulate, SimulateBase, SimulateCreate};
use compute_selector::Simulation;
use data::{grid, rule::Rule, text};
use eyre::Result;
use log::info;
use std::{path::PathBuf, time::Instant};

/// Perform Game of Life simulation
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the initial grid, one line of '0' (dead) and '1' (alive)
    /// characters per row
    input: PathBuf,

    /// Number of generations to be simulated
    generations: usize,

    /// Path to the final grid, in the same format as the input
    output: PathBuf,

    /// Automaton rule, in B/S notation
    #[arg(short = 'R', long, default_value_t = Rule::default())]
    rule: Rule,

    /// Backend-specific arguments
    #[command(flatten)]
    backend: <Simulation as SimulateBase>::CliArgs,
}

fn main() -> Result<()> {
    // Enable logging to stderr
    env_logger::init();

    // Parse CLI arguments
    let args = Args::parse();

    // Load the initial grid and set up the simulation
    let mut grid = text::read(&args.input)?;
    let shape = [grid.nrows(), grid.ncols()];
    let simulation = Simulation::new(args.rule, args.backend)?;

    // Run the simulation
    let start = Instant::now();
    simulation.perform_steps(&mut grid, args.generations)?;
    let elapsed = start.elapsed();

    // Save the final grid, then report what was done
    text::write(&args.output, grid.view())?;
    let [rows, cols] = shape;
    let summary = format!(
        "Simulated {} generation(s) of a {rows}x{cols} grid with rule {} on {} worker(s) in {elapsed:?}, {} live cell(s) remain",
        args.generations,
        args.rule,
        simulation.num_workers(shape),
        grid::population(grid.view()),
    );
    info!("{summary}");
    println!("{summary}");
    Ok(())
}
