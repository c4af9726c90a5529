use std::sync::Arc;

use log::debug;
use serde::{ Deserialize, Serialize };

use crate::camera::Camera;
use crate::consts::{ DEFAULT_IMAGE_HEIGHT, DEFAULT_IMAGE_WIDTH, DEFAULT_MAX_DISTANCE,
    DEFAULT_NUM_THREADS, LIGHTING_EPSILON, MAX_IN_FLIGHT };
use crate::error::RenderError;
use crate::light::phong;
use crate::parallel::{ self, JobLayout, JobStatus };
use crate::ray::Ray;
use crate::rgb::RgbColorProfile;
use crate::scene::Scene;
use crate::spectrum::Spectrum;

/// Settings for a render.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub image_width: usize,
    pub image_height: usize,

    /// Hits farther than this from the camera count as sky.
    pub max_distance: f64,

    pub color_profile: RgbColorProfile,

    /// Worker threads per render.
    pub threads: usize,

    /// Pixels queued ahead of the workers.
    pub max_in_flight: usize,
}

impl Default for RenderOptions {
    fn default() -> RenderOptions {
        RenderOptions {
            image_width: DEFAULT_IMAGE_WIDTH,
            image_height: DEFAULT_IMAGE_HEIGHT,
            max_distance: DEFAULT_MAX_DISTANCE,
            color_profile: RgbColorProfile::default(),
            threads: DEFAULT_NUM_THREADS,
            max_in_flight: MAX_IN_FLIGHT,
        }
    }
}

impl RenderOptions {
    pub fn validate(&self) -> Result<(), RenderError> {
        let invalid = |what: &str| Err(RenderError::InvalidOptions(what.to_string()));

        if self.image_width == 0 || self.image_height == 0 {
            return invalid("image width and height must be positive");
        }
        if !(self.max_distance > 0.0) {
            return invalid("max distance must be positive");
        }
        if !self.color_profile.is_valid() {
            return invalid("color profile needs max intensity above min on every channel");
        }
        if self.threads == 0 {
            return invalid("at least one render thread is needed");
        }
        if self.max_in_flight == 0 {
            return invalid("at least one pixel must be allowed in flight");
        }

        Ok(())
    }
}

/// Anything that can turn a scene into an image asynchronously.
pub trait Renderer {
    /// Starts rendering and returns without waiting. The scene must not change
    /// until the returned job has finished.
    fn render(&self, scene: Arc<Scene>, camera: Camera) -> JobStatus;
}

/// A Whitted-style ray tracer without recursion: one camera ray per pixel,
/// local Phong shading and hard shadows.
#[derive(Clone, Debug)]
pub struct RayTracer {
    options: RenderOptions,
}

impl RayTracer {
    pub fn new(options: RenderOptions) -> Result<RayTracer, RenderError> {
        options.validate()?;
        Ok(RayTracer { options })
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// The scene-space ray through the pixel at `(row, col)`.
    ///
    /// Columns map to screen `x` in `[-1, 1)` left to right; rows map to
    /// screen `y` in `(-1, 1]` top to bottom.
    pub fn ray_through_pixel(&self, camera: &Camera, row: usize, col: usize) -> Ray {
        let half_width = self.options.image_width as f64 / 2.0;
        let half_height = self.options.image_height as f64 / 2.0;

        let screen_x = col as f64 / half_width - 1.0;
        let screen_y = -(row as f64 / half_height - 1.0);

        camera.ray_through_screen(screen_x, screen_y)
    }

    /// The spectrum seen along a scene-space ray.
    pub fn trace(&self, scene: &Scene, ray: &Ray) -> Spectrum {
        let max_distance2 = self.options.max_distance.powi(2);

        let isec = match scene.trace_ray(ray) {
            Some(isec) if (isec.point - ray.origin).length2() <= max_distance2 => isec,
            _ => return scene.sky_spectrum.clone(),
        };

        let material = &isec.material;
        let mut diffuse = Spectrum::constant(0.0);
        let mut specular = Spectrum::constant(0.0);

        for light in scene.lights().iter() {
            let origin = isec.point + isec.normal * LIGHTING_EPSILON;
            if scene.is_shadowed(origin, light) {
                continue;
            }

            let to_light = light.position - origin;
            let (d, s) = phong(&isec.normal, &to_light, material.shininess);

            diffuse += light.spectrum.clone() * d;
            specular += light.spectrum.clone() * s;
        }

        &material.ambient * &scene.ambient_spectrum
            + &material.diffuse * &diffuse
            + &material.specular * &specular
    }

    /// The RGB bytes of one pixel.
    pub fn render_pixel(&self, scene: &Scene, camera: &Camera, row: usize, col: usize)
        -> [u8; 3] {
        let ray = self.ray_through_pixel(camera, row, col);
        let spectrum = self.trace(scene, &ray);

        self.options.color_profile.to_rgb_bytes(&spectrum)
    }
}

impl Renderer for RayTracer {
    fn render(&self, scene: Arc<Scene>, camera: Camera) -> JobStatus {
        let layout = JobLayout {
            width: self.options.image_width,
            height: self.options.image_height,
            threads: self.options.threads,
            max_in_flight: self.options.max_in_flight,
        };

        debug!("scene has {} objects and {} lights, camera at {:?}",
            scene.objects().len(), scene.lights().len(), camera.position());

        let tracer = self.clone();
        parallel::spawn_job(layout, Arc::new(move |row: usize, col: usize| {
            tracer.render_pixel(&scene, &camera, row, col)
        }))
    }
}

#[cfg(test)]
use crate::geometry::Geometry;
#[cfg(test)]
use crate::light::{ Material, PointLightSource };
#[cfg(test)]
use crate::scene::GeometryObject;
#[cfg(test)]
use crate::transform::AffineTransform;
#[cfg(test)]
use crate::vector::Vector4;

#[cfg(test)]
fn small_options() -> RenderOptions {
    RenderOptions {
        image_width: 20,
        image_height: 10,
        threads: 2,
        ..Default::default()
    }
}

#[cfg(test)]
fn sphere_scene() -> Scene {
    let mut scene = Scene::new();
    scene.ambient_spectrum = Spectrum::constant(0.2);
    scene.add(Arc::new(GeometryObject::new(
        Arc::new(Geometry::UnitSphere),
        Arc::new(Material::new(
            Spectrum::constant(1.0),
            Spectrum::constant(1.0),
            Spectrum::constant(0.0),
            1.0,
        )),
        AffineTransform::identity(),
    )));

    scene
}

#[test]
fn options_validation() {
    assert!(RenderOptions::default().validate().is_ok());

    let zero = RenderOptions { image_width: 0, ..Default::default() };
    assert!(matches!(RayTracer::new(zero), Err(RenderError::InvalidOptions(_))));

    let distance = RenderOptions { max_distance: -1.0, ..Default::default() };
    assert!(distance.validate().is_err());

    let mut profile = RenderOptions::default();
    profile.color_profile.max_intensities[0] = 0.0;
    assert!(profile.validate().is_err());

    let threads = RenderOptions { threads: 0, ..Default::default() };
    assert!(threads.validate().is_err());
}

#[test]
fn options_from_partial_json() {
    let options: RenderOptions =
        serde_json::from_str(r#"{ "image_width": 32, "threads": 1 }"#).unwrap();

    assert_eq!(options.image_width, 32);
    assert_eq!(options.image_height, DEFAULT_IMAGE_HEIGHT);
    assert_eq!(options.threads, 1);
    assert_eq!(options.max_in_flight, MAX_IN_FLIGHT);
}

#[test]
fn pixel_rays_span_screen() {
    let tracer = RayTracer::new(small_options()).unwrap();
    let camera = Camera::new(1.0, 1.0, 1.0).unwrap();

    let top_left = tracer.ray_through_pixel(&camera, 0, 0);
    assert_eq!(top_left.direction, Vector4::vector(-1.0, 1.0, 1.0));

    let center = tracer.ray_through_pixel(&camera, 5, 10);
    assert_eq!(center.direction, Vector4::vector(0.0, 0.0, 1.0));

    let lower = tracer.ray_through_pixel(&camera, 9, 19);
    assert_eq!(lower.direction, Vector4::vector(0.9, -0.8, 1.0));
}

#[test]
fn miss_sees_sky() {
    let tracer = RayTracer::new(small_options()).unwrap();
    let mut scene = sphere_scene();
    scene.sky_spectrum = Spectrum::constant(0.5);

    let ray = Ray::new(Vector4::point(0.0, 0.0, -5.0),
                       Vector4::vector(0.0, 0.0, -1.0));

    assert_eq!(tracer.trace(&scene, &ray).intensity(1.0), 0.5);
}

#[test]
fn far_hit_sees_sky() {
    let options = RenderOptions { max_distance: 3.0, ..small_options() };
    let tracer = RayTracer::new(options).unwrap();
    let mut scene = sphere_scene();
    scene.sky_spectrum = Spectrum::constant(0.5);

    let ray = Ray::new(Vector4::point(0.0, 0.0, -5.0),
                       Vector4::vector(0.0, 0.0, 1.0));

    assert_eq!(tracer.trace(&scene, &ray).intensity(1.0), 0.5);
}

#[test]
fn ambient_only_without_lights() {
    let tracer = RayTracer::new(small_options()).unwrap();
    let scene = sphere_scene();

    let ray = Ray::new(Vector4::point(0.0, 0.0, -5.0),
                       Vector4::vector(0.0, 0.0, 1.0));

    assert!(crate::feq(tracer.trace(&scene, &ray).intensity(1.0), 0.2));
}

#[test]
fn lit_and_shadowed_points() {
    let tracer = RayTracer::new(small_options()).unwrap();
    let mut scene = sphere_scene();
    scene.add(Arc::new(PointLightSource::new(
        Vector4::point(0.0, 0.0, -10.0),
        Spectrum::constant(0.5)
    )));

    // Facing the light head on: ambient plus full diffuse.
    let front = Ray::new(Vector4::point(0.0, 0.0, -5.0),
                         Vector4::vector(0.0, 0.0, 1.0));
    assert!(crate::feq(tracer.trace(&scene, &front).intensity(1.0), 0.7));

    // The far side of the sphere is in its own shadow.
    let back = Ray::new(Vector4::point(0.0, 0.0, 5.0),
                        Vector4::vector(0.0, 0.0, -1.0));
    assert!(crate::feq(tracer.trace(&scene, &back).intensity(1.0), 0.2));
}

#[test]
fn render_differs_from_sky() {
    let tracer = RayTracer::new(small_options()).unwrap();
    let mut scene = sphere_scene();
    scene.add(Arc::new(PointLightSource::new(
        Vector4::point(-3.0, 3.0, -5.0),
        Spectrum::constant(1.0)
    )));

    let camera = Camera::from_transform(
        AffineTransform::scaling(2.0, 1.0, 2.0).translate(0.0, 0.0, -5.0)
    );

    let job = tracer.render(Arc::new(scene), camera);
    let canvas = job.wait().unwrap();

    assert_eq!(canvas.width, 20);
    assert_eq!(canvas.height, 10);
    assert_eq!(canvas.as_rgb().len(), 20 * 10 * 3);

    // The sky is black; the sphere fills the middle of the frame.
    assert_eq!(canvas.read_pixel(0, 0), Some([0, 0, 0]));
    assert!(canvas.as_rgb().iter().any(|b| *b != 0));
    assert_ne!(canvas.read_pixel(10, 5), Some([0, 0, 0]));
}
