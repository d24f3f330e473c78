#![allow(
    clippy::unwrap_used,
    clippy::print_stdout,
    clippy::use_debug,
    reason = "Essential for examples: unwrap for simplicity, stdout for demonstration"
)]
//! Instruction Sequence Dumper for Sample Models
//!
//! Builds a handful of simulation models, then prints the raw program, the
//! optimized program and the GPU records for each.
//!
//! Run with: cargo run --example `instruction_dump`

use mcexpr::{ExprArray, ExprFunction, ExprMatrix, Expression, Pipeline};

fn models() -> Vec<(&'static str, Expression)> {
    let spot = Expression::input(0);
    let strike = Expression::input(1);

    let growth = ExprFunction::new(
        "growth",
        2,
        Expression::input(0) * (1.0 + Expression::input(1)),
    )
    .unwrap();
    let year1 = growth
        .call(&[Expression::input(0), Expression::input(1)])
        .unwrap();
    let year2 = growth.call(&[year1, Expression::input(1)]).unwrap();

    let cov = ExprMatrix::new(vec![
        vec![Expression::constant(0.0625), Expression::constant(0.015625)],
        vec![Expression::constant(0.015625), Expression::constant(0.140625)],
    ])
    .unwrap();

    vec![
        ("Call payoff", (&spot - &strike).max(0.0)),
        (
            "Digital with identity noise",
            (spot.clone() * 1.0 + 0.0).gt(strike.clone()).select(1.0, 0.0),
        ),
        ("Folded constants", spot.clone() * (2.0 * 3.0 - 5.0) + 12.0 / 4.0),
        ("Two-year growth", year2),
        (
            "Portfolio volatility",
            cov.quadratic_form(&ExprArray::inputs(0, 2)).unwrap().sqrt(),
        ),
    ]
}

fn main() {
    let pipeline = Pipeline::new().validate_gpu(true);

    for (name, expr) in models() {
        let compiled = pipeline.build(&expr).unwrap();
        println!("=== {name} ===");
        println!("expr:     {expr}");
        println!(
            "raw:      {} instructions, optimized: {} ({:?})",
            compiled.raw_instruction_count(),
            compiled.instruction_count(),
            compiled.outcome()
        );
        println!(
            "stack:    {}  inputs: {}",
            compiled.max_stack_depth(),
            compiled.required_inputs()
        );
        for (pc, (instr, record)) in compiled
            .instructions()
            .iter()
            .zip(compiled.gpu().records())
            .enumerate()
        {
            let listing = instr.to_string();
            println!("  {pc:>3}  {listing:<12} {record}");
        }
        println!();
    }
}
