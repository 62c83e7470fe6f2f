//! Fit a line with the Adam driver, then with L-BFGS.

use eyre::Result;
use mixfit::algorithms::lbfgs;
use mixfit::prelude::*;

fn main() -> Result<()> {
    let model = sample_linear(Key::new(7), 2.5, -1.0, 0.3, 500)?;
    let driver = Driver::new(&model, Adam::new(0.05));

    let (last, history) = driver.run(driver.initialize(LineParams::new(0.0, 0.0)), 1000)?;
    let losses = history.losses(&model)?;
    for (i, loss) in losses.iter().enumerate().step_by(200) {
        println!("iteration {:>4}: loss {:.5}", i + 1, loss);
    }
    let fit = last.params();
    println!("adam:   slope {:.4}  intercept {:.4}", fit.slope, fit.intercept);

    let (fit, loss) = lbfgs::minimize(&model, &LineParams::new(0.0, 0.0), 100)?;
    println!(
        "l-bfgs: slope {:.4}  intercept {:.4}  loss {:.5}",
        fit.slope, fit.intercept, loss
    );
    Ok(())
}
