pub mod consts;
pub mod error;

pub mod vector;
pub mod matrix;
pub mod transform;
pub mod ray;

pub mod geometry;
pub mod spectrum;
pub mod rgb;
pub mod light;
pub mod camera;
pub mod scene;

pub mod canvas;
pub mod tga;

pub mod parallel;
pub mod renderer;
pub mod description;

use consts::FEQ_EPSILON;
pub fn feq(left: f64, right: f64) -> bool {
    (left - right).abs() < FEQ_EPSILON
}
