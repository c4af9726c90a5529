// Runtime parameters
pub const DEFAULT_NUM_THREADS: usize = 4;
pub const DEFAULT_IMAGE_WIDTH: usize = 640;
pub const DEFAULT_IMAGE_HEIGHT: usize = 360;
pub const DEFAULT_OUT_FILE: &'static str = "./out.tga";

// Upper bound on pixel units queued ahead of the workers
pub const MAX_IN_FLIGHT: usize = 50;

// Rays hitting farther than this are treated as hitting the sky
pub const DEFAULT_MAX_DISTANCE: f64 = 1e6;

// Floating point comparisons
pub const FEQ_EPSILON: f64 = 0.0001;

// Shadow ray origins are pushed off the surface by this much
pub const LIGHTING_EPSILON: f64 = 1e-6;

// Default RGB sampling wavelengths (red, green, blue)
pub const DEFAULT_WAVELENGTHS: [f64; 3] = [2.0, 1.0, 0.0];
