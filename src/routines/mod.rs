// Numerically stable primitives
pub mod math;
// Mixture likelihood and prior
pub mod likelihood;
// Key-driven random draws
pub mod sampling;
// Routines for logging
pub mod logger;
// Routines for output
pub mod output;
// Routines for settings
pub mod settings;
