//! Generate Gaussian random walks in parallel and report their spread.
//!
//! The variance of a walk after `t` standard normal steps is `t`.

use mixfit::prelude::*;
use ndarray::Axis;

fn main() {
    let walks = random_walks(&Key::new(2024).split(2000), 100);

    for t in [1, 10, 50, 100] {
        let column = walks.index_axis(Axis(1), t);
        let mean = column.mean().unwrap_or(f64::NAN);
        let variance = column.mapv(|x| (x - mean).powi(2)).sum() / (column.len() - 1) as f64;
        println!("step {:>3}: mean {:>6.3}  variance {:>7.3}", t, mean, variance);
    }
}
