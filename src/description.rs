//! JSON scene descriptions.
//!
//! A description names its spectra and materials once and refers to them by
//! name everywhere else. Spectrum fields also accept an inline spectrum or a
//! bare number (a constant).
//!
//! ```json
//! {
//!   "options": { "image_width": 320, "image_height": 180 },
//!   "ambient": 0.2,
//!   "spectra": {
//!     "red":   { "type": "monochrome", "peak": 2, "width": 0.5, "height": 1 },
//!     "white": 1
//!   },
//!   "materials": {
//!     "red": { "ambient": "red", "diffuse": "red", "specular": "white", "shininess": 5 }
//!   },
//!   "objects": [
//!     { "geometry": { "type": "sphere" }, "material": "red",
//!       "transform": [ { "translate": [-3, 0, 0] } ] }
//!   ],
//!   "lights": [ { "position": [-5, 3, -5], "spectrum": 0.5 } ],
//!   "camera": { "width": 1.78, "height": 1, "focal_length": 2,
//!               "transform": [ { "translate": [0, 0, -10] } ] }
//! }
//! ```

use std::collections::{ HashMap, HashSet };
use std::convert::TryFrom;
use std::fs::File;
use std::io::{ BufReader, Read };
use std::path::Path;
use std::sync::Arc;

use log::debug;
use serde::{ Deserialize, Serialize };

use crate::camera::Camera;
use crate::error::DescriptionError;
use crate::geometry::{ Geometry, Triangle };
use crate::light::{ Material, PointLightSource };
use crate::matrix::Matrix4;
use crate::renderer::RenderOptions;
use crate::rgb::RgbColorProfile;
use crate::scene::{ GeometryObject, Scene };
use crate::spectrum::{ BinaryOp, Spectrum };
use crate::transform::AffineTransform;
use crate::vector::{ Vector3, Vector4 };

/// Everything needed to start a render.
#[derive(Clone, Debug)]
pub struct SceneDescription {
    pub scene: Scene,
    pub camera: Camera,
    pub options: RenderOptions,
}

impl SceneDescription {
    pub fn from_json_str(json: &str) -> Result<SceneDescription, DescriptionError> {
        let scene_json: SceneJson = serde_json::from_str(json)?;
        SceneDescription::try_from(scene_json)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<SceneDescription, DescriptionError> {
        let scene_json: SceneJson = serde_json::from_reader(reader)?;
        SceneDescription::try_from(scene_json)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<SceneDescription, DescriptionError> {
        SceneDescription::from_reader(BufReader::new(File::open(path)?))
    }

    /// The built-in scene: red, green and blue spheres in a row, a white
    /// eight-sided pyramid behind them, a white floor and two lights.
    pub fn demo() -> SceneDescription {
        let white = Spectrum::constant(1.0);
        let colored = |wavelength: f64| {
            let spectrum = Spectrum::monochrome(wavelength, 0.5, 1.0);
            Arc::new(Material::new(spectrum.clone(), spectrum, white.clone(), 5.0))
        };
        let white_material = Arc::new(Material::new(
            white.clone(), white.clone(), Spectrum::constant(0.0), 0.0
        ));

        let sphere = Arc::new(Geometry::UnitSphere);
        let pyramid = Arc::new(pyramid(8));

        let mut scene = Scene::new();
        scene.ambient_spectrum = Spectrum::constant(0.2);

        for (x, wavelength) in [(-3.0, 2.0), (0.0, 1.0), (3.0, 0.0)].iter() {
            scene.add(Arc::new(GeometryObject::new(
                Arc::clone(&sphere),
                colored(*wavelength),
                AffineTransform::translation(*x, 0.0, 0.0),
            )));
        }

        scene.add(Arc::new(GeometryObject::new(
            pyramid,
            Arc::clone(&white_material),
            AffineTransform::scaling(1.5, 4.0, 1.5).translate(-1.5, -2.0, -1.0),
        )));

        scene.add(Arc::new(GeometryObject::new(
            Arc::new(Geometry::XyPlane),
            white_material,
            AffineTransform::rotation_x(std::f64::consts::FRAC_PI_2)
                .translate(0.0, -2.0, 0.0),
        )));

        for x in [-5.0, 5.0].iter() {
            scene.add(Arc::new(PointLightSource::new(
                Vector4::point(*x, 3.0, -5.0),
                Spectrum::constant(0.5),
            )));
        }

        SceneDescription { scene, camera: default_camera(), options: RenderOptions::default() }
    }
}

/// A 16:9 screen with focal length 2, ten units back from the origin.
fn default_camera() -> Camera {
    Camera::from_transform(
        AffineTransform::scaling(16.0 / 9.0, 1.0, 2.0).translate(0.0, 0.0, -10.0)
    )
}

/// A cone of `sides` triangles: apex at `(0, 1, 0)`, base on the unit circle
/// in the `y = 0` plane. The base itself is left open.
fn pyramid(sides: usize) -> Geometry {
    let apex = Vector4::point(0.0, 1.0, 0.0);
    let corner = |i: usize| {
        let angle = std::f64::consts::PI * 2.0 * i as f64 / sides as f64;
        Vector4::point(angle.cos(), 0.0, angle.sin())
    };

    let triangles = (0..sides)
        .map(|i| Triangle::new(apex, corner(i), corner(i + 1)))
        .filter_map(Result::ok)
        .collect();

    Geometry::Triangles(triangles)
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneJson {
    options: RenderOptions,
    sky: Option<SpectrumRef>,
    ambient: Option<SpectrumRef>,

    spectra: HashMap<String, SpectrumRef>,
    materials: HashMap<String, MaterialJson>,

    objects: Vec<ObjectJson>,
    lights: Vec<LightJson>,
    camera: Option<CameraJson>,
}

/// A spectrum given by name, inline, or as a bare constant.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum SpectrumRef {
    Constant(f64),
    Named(String),
    Inline(Box<SpectrumJson>),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SpectrumJson {
    Constant { value: f64 },
    Monochrome { peak: f64, width: f64, height: f64 },
    /// Built through the render options' color profile.
    Rgb { rgb: [f64; 3] },
    Sum { of: Vec<SpectrumRef> },
    Difference { left: SpectrumRef, right: SpectrumRef },
    Product { of: Vec<SpectrumRef> },
    Scale { spectrum: SpectrumRef, factor: f64 },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct MaterialJson {
    ambient: SpectrumRef,
    diffuse: SpectrumRef,
    specular: SpectrumRef,
    shininess: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum GeometryJson {
    Plane,
    Sphere,
    Triangles { vertices: Vec<[[f64; 3]; 3]> },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum TransformStep {
    Translate([f64; 3]),
    Scale([f64; 3]),
    ScaleUniform(f64),
    RotateX(f64),
    RotateY(f64),
    RotateZ(f64),
    SetOrigin([f64; 3]),
    /// A full affine matrix, given row by row.
    Matrix([[f64; 4]; 4]),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ObjectJson {
    geometry: GeometryJson,
    material: String,
    #[serde(default)]
    transform: Vec<TransformStep>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct LightJson {
    position: [f64; 3],
    spectrum: SpectrumRef,
    #[serde(default)]
    softness: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct LookAtJson {
    from: [f64; 3],
    to: [f64; 3],
    up: [f64; 3],
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
struct CameraJson {
    width: f64,
    height: f64,
    focal_length: f64,
    look_at: Option<LookAtJson>,
    transform: Vec<TransformStep>,
}

impl Default for CameraJson {
    fn default() -> CameraJson {
        CameraJson {
            width: 16.0 / 9.0,
            height: 1.0,
            focal_length: 2.0,
            look_at: None,
            transform: Vec::new(),
        }
    }
}

fn point(p: &[f64; 3]) -> Vector4 {
    Vector4::point(p[0], p[1], p[2])
}

fn apply_steps(mut t: AffineTransform, steps: &[TransformStep])
    -> Result<AffineTransform, DescriptionError> {
    for step in steps.iter() {
        t = match step {
            TransformStep::Translate([x, y, z]) => t.translate(*x, *y, *z),
            TransformStep::Scale([x, y, z]) => t.try_scale(*x, *y, *z)?,
            TransformStep::ScaleUniform(f) => t.try_scale(*f, *f, *f)?,
            TransformStep::RotateX(a) => t.rotate_x(*a),
            TransformStep::RotateY(a) => t.rotate_y(*a),
            TransformStep::RotateZ(a) => t.rotate_z(*a),
            TransformStep::SetOrigin([x, y, z]) => t.set_origin(*x, *y, *z),
            TransformStep::Matrix(rows) => {
                t.compose(&AffineTransform::new(Matrix4::from_rows(*rows))?)
            },
        };
    }

    Ok(t)
}

/// Resolves spectrum references, sharing each named spectrum between its
/// users.
struct SpectrumTable<'a> {
    definitions: &'a HashMap<String, SpectrumRef>,
    profile: &'a RgbColorProfile,
    resolved: HashMap<String, Arc<Spectrum>>,
    resolving: HashSet<String>,
}

impl<'a> SpectrumTable<'a> {
    fn new(definitions: &'a HashMap<String, SpectrumRef>, profile: &'a RgbColorProfile)
        -> SpectrumTable<'a> {
        SpectrumTable {
            definitions,
            profile,
            resolved: HashMap::new(),
            resolving: HashSet::new(),
        }
    }

    fn named(&mut self, name: &str) -> Result<Arc<Spectrum>, DescriptionError> {
        if let Some(spectrum) = self.resolved.get(name) {
            return Ok(Arc::clone(spectrum));
        }

        let definition = self.definitions.get(name)
            .ok_or_else(|| DescriptionError::UnknownSpectrum(name.to_string()))?;

        if !self.resolving.insert(name.to_string()) {
            return Err(DescriptionError::CyclicSpectrum(name.to_string()));
        }
        let spectrum = self.get(definition)?;
        self.resolving.remove(name);

        self.resolved.insert(name.to_string(), Arc::clone(&spectrum));
        Ok(spectrum)
    }

    fn get(&mut self, r: &SpectrumRef) -> Result<Arc<Spectrum>, DescriptionError> {
        match r {
            SpectrumRef::Constant(value) => Ok(Arc::new(Spectrum::constant(*value))),
            SpectrumRef::Named(name) => self.named(name),
            SpectrumRef::Inline(json) => self.build(json).map(Arc::new),
        }
    }

    fn fold(&mut self, op: BinaryOp, of: &[SpectrumRef])
        -> Result<Spectrum, DescriptionError> {
        let mut terms = of.iter();
        let first = match terms.next() {
            Some(first) => self.get(first)?,
            None => return Err(DescriptionError::Invalid(
                "sum and product need at least one term".to_string()
            )),
        };

        let mut acc = first;
        for term in terms {
            let term = self.get(term)?;
            acc = Arc::new(Spectrum::binary(op, acc, term));
        }

        Ok((*acc).clone())
    }

    fn build(&mut self, json: &SpectrumJson) -> Result<Spectrum, DescriptionError> {
        Ok(match json {
            SpectrumJson::Constant { value } => Spectrum::constant(*value),
            SpectrumJson::Monochrome { peak, width, height } => {
                Spectrum::monochrome(*peak, *width, *height)
            },
            SpectrumJson::Rgb { rgb } => self.profile.from_rgb(&Vector3::new(*rgb)),
            SpectrumJson::Sum { of } => self.fold(BinaryOp::Sum, of)?,
            SpectrumJson::Product { of } => self.fold(BinaryOp::Product, of)?,
            SpectrumJson::Difference { left, right } => {
                Spectrum::binary(BinaryOp::Difference, self.get(left)?, self.get(right)?)
            },
            SpectrumJson::Scale { spectrum, factor } => {
                Spectrum::scaled(self.get(spectrum)?, *factor)
            },
        })
    }
}

impl TryFrom<SceneJson> for SceneDescription {
    type Error = DescriptionError;

    fn try_from(scene_json: SceneJson) -> Result<SceneDescription, DescriptionError> {
        let options = scene_json.options;
        let mut spectra = SpectrumTable::new(&scene_json.spectra, &options.color_profile);

        let mut scene = Scene::new();
        if let Some(sky) = &scene_json.sky {
            scene.sky_spectrum = (*spectra.get(sky)?).clone();
        }
        if let Some(ambient) = &scene_json.ambient {
            scene.ambient_spectrum = (*spectra.get(ambient)?).clone();
        }

        // Materials
        let mut materials = HashMap::new();
        for (name, m) in scene_json.materials.iter() {
            let material = Material::new(
                (*spectra.get(&m.ambient)?).clone(),
                (*spectra.get(&m.diffuse)?).clone(),
                (*spectra.get(&m.specular)?).clone(),
                m.shininess,
            );
            materials.insert(name.clone(), Arc::new(material));
        }

        // Objects
        let plane = Arc::new(Geometry::XyPlane);
        let sphere = Arc::new(Geometry::UnitSphere);
        for object in scene_json.objects.iter() {
            let material = materials.get(&object.material)
                .ok_or_else(|| DescriptionError::UnknownMaterial(object.material.clone()))?;

            let geometry = match &object.geometry {
                GeometryJson::Plane => Arc::clone(&plane),
                GeometryJson::Sphere => Arc::clone(&sphere),
                GeometryJson::Triangles { vertices } => {
                    let vertices: Vec<[Vector4; 3]> = vertices.iter()
                        .map(|[a, b, c]| [point(a), point(b), point(c)])
                        .collect();
                    Arc::new(Geometry::triangles(&vertices)?)
                },
            };

            let transform = apply_steps(AffineTransform::identity(), &object.transform)?;
            scene.add(Arc::new(GeometryObject::new(geometry, Arc::clone(material), transform)));
        }

        // Lights
        for light in scene_json.lights.iter() {
            let spectrum = (*spectra.get(&light.spectrum)?).clone();
            scene.add(Arc::new(
                PointLightSource::new(point(&light.position), spectrum)
                    .with_softness(light.softness)
            ));
        }

        // Camera
        let camera = match &scene_json.camera {
            Some(c) => {
                let base = match &c.look_at {
                    Some(l) => Camera::look_at(
                        point(&l.from), point(&l.to),
                        Vector4::vector(l.up[0], l.up[1], l.up[2]),
                        c.width, c.height, c.focal_length,
                    )?,
                    None => Camera::new(c.width, c.height, c.focal_length)?,
                };
                Camera::from_transform(apply_steps(base.transform, &c.transform)?)
            },
            None => default_camera(),
        };

        debug!("scene description: {} objects, {} lights, {} materials",
            scene.objects().len(), scene.lights().len(), materials.len());

        Ok(SceneDescription { scene, camera, options })
    }
}

#[cfg(test)]
use crate::error::MathError;

#[test]
fn demo_scene_contents() {
    let demo = SceneDescription::demo();

    assert_eq!(demo.scene.objects().len(), 5);
    assert_eq!(demo.scene.lights().len(), 2);
    assert_eq!(demo.options.image_width, 640);
    assert_eq!(demo.options.image_height, 360);
    assert!(crate::feq(demo.camera.width(), 16.0 / 9.0));
    assert_eq!(demo.camera.position(), Vector4::point(0.0, 0.0, -10.0));

    match &*demo.scene.objects()[3].geometry {
        Geometry::Triangles(t) => assert_eq!(t.len(), 8),
        other => panic!("expected the pyramid, got {:?}", other),
    }
}

#[test]
fn demo_floor_faces_up() {
    use crate::ray::Ray;

    let demo = SceneDescription::demo();
    let ray = Ray::new(Vector4::point(0.0, 5.0, 20.0),
                       Vector4::vector(0.0, -1.0, 0.0));
    let isec = demo.scene.trace_ray(&ray).unwrap();

    assert_eq!(isec.point, Vector4::point(0.0, -2.0, 20.0));
    assert_eq!(isec.normal, Vector4::vector(0.0, 1.0, 0.0));
}

#[test]
fn full_description() {
    let json = r#"{
        "options": { "image_width": 32, "image_height": 18, "threads": 2 },
        "sky": { "type": "rgb", "rgb": [0.0, 0.0, 0.5] },
        "ambient": 0.2,
        "spectra": {
            "red": { "type": "monochrome", "peak": 2, "width": 0.5, "height": 1 },
            "white": 1,
            "pinkish": { "type": "sum", "of": ["red", { "type": "scale", "spectrum": "white", "factor": 0.25 }] },
            "dark": { "type": "difference", "left": "pinkish", "right": 0.1 }
        },
        "materials": {
            "red": { "ambient": "red", "diffuse": "pinkish", "specular": "white", "shininess": 5 },
            "floor": { "ambient": "white", "diffuse": "dark", "specular": 0, "shininess": 0 }
        },
        "objects": [
            { "geometry": { "type": "sphere" }, "material": "red",
              "transform": [ { "scale_uniform": 2 }, { "translate": [-3, 0, 0] } ] },
            { "geometry": { "type": "plane" }, "material": "floor",
              "transform": [ { "rotate_x": 1.5707963267948966 }, { "translate": [0, -2, 0] } ] },
            { "geometry": { "type": "triangles",
                            "vertices": [ [[0, 1, 0], [-1, 0, 0], [1, 0, 0]] ] },
              "material": "red" }
        ],
        "lights": [ { "position": [-5, 3, -5], "spectrum": 0.5, "softness": 0.1 } ],
        "camera": { "width": 2, "height": 1, "focal_length": 2,
                    "transform": [ { "translate": [0, 0, -10] } ] }
    }"#;

    let d = SceneDescription::from_json_str(json).unwrap();

    assert_eq!(d.options.image_width, 32);
    assert_eq!(d.options.threads, 2);
    assert_eq!(d.scene.objects().len(), 3);
    assert_eq!(d.scene.lights().len(), 1);
    assert_eq!(d.scene.lights()[0].softness, 0.1);
    assert_eq!(d.scene.sky_spectrum.intensity(0.0), 0.5);
    assert_eq!(d.scene.ambient_spectrum.intensity(7.0), 0.2);
    assert_eq!(d.camera.position(), Vector4::point(0.0, 0.0, -10.0));

    let red = &d.scene.objects()[0].material;
    assert!(crate::feq(red.diffuse.intensity(2.0), 1.25));
    assert!(crate::feq(red.diffuse.intensity(0.0), 0.25));
    assert_eq!(d.scene.objects()[0].position(), Vector4::point(-3.0, 0.0, 0.0));

    let floor = &d.scene.objects()[1].material;
    assert!(crate::feq(floor.diffuse.intensity(0.0), 0.15));
}

#[test]
fn look_at_camera() {
    let json = r#"{
        "camera": { "width": 1, "height": 1, "focal_length": 1,
                    "look_at": { "from": [0, 0, -5], "to": [0, 0, 0], "up": [0, 1, 0] } }
    }"#;

    let d = SceneDescription::from_json_str(json).unwrap();

    assert_eq!(d.camera.position(), Vector4::point(0.0, 0.0, -5.0));
    assert_eq!(d.camera.line_of_sight(), Vector4::vector(0.0, 0.0, 1.0));
}

#[test]
fn missing_camera_uses_default() {
    let d = SceneDescription::from_json_str("{}").unwrap();

    assert_eq!(d.camera.position(), Vector4::point(0.0, 0.0, -10.0));
    assert!(d.scene.objects().is_empty());
}

#[test]
fn unknown_names() {
    let spectrum = r#"{ "ambient": "nope" }"#;
    assert!(matches!(SceneDescription::from_json_str(spectrum),
        Err(DescriptionError::UnknownSpectrum(name)) if name == "nope"));

    let material = r#"{ "objects": [ { "geometry": { "type": "sphere" }, "material": "nope" } ] }"#;
    assert!(matches!(SceneDescription::from_json_str(material),
        Err(DescriptionError::UnknownMaterial(name)) if name == "nope"));
}

#[test]
fn cyclic_spectra() {
    let json = r#"{
        "ambient": "a",
        "spectra": {
            "a": { "type": "scale", "spectrum": "b", "factor": 2 },
            "b": { "type": "sum", "of": [1, "a"] }
        }
    }"#;

    assert!(matches!(SceneDescription::from_json_str(json),
        Err(DescriptionError::CyclicSpectrum(_))));
}

#[test]
fn bad_geometry_and_transforms() {
    let flat = r#"{
        "materials": { "m": { "ambient": 1, "diffuse": 1, "specular": 1, "shininess": 1 } },
        "objects": [ { "geometry": { "type": "triangles",
                                     "vertices": [ [[0, 0, 0], [1, 1, 1], [2, 2, 2]] ] },
                       "material": "m" } ]
    }"#;
    assert!(matches!(SceneDescription::from_json_str(flat),
        Err(DescriptionError::Transform(_))));

    let zero_scale = r#"{ "camera": { "transform": [ { "scale": [1, 0, 1] } ] } }"#;
    assert!(matches!(SceneDescription::from_json_str(zero_scale),
        Err(DescriptionError::Transform(MathError::NonInvertible))));

    let zero_uniform = r#"{ "camera": { "transform": [ { "scale_uniform": 0 } ] } }"#;
    assert!(matches!(SceneDescription::from_json_str(zero_uniform),
        Err(DescriptionError::Transform(MathError::NonInvertible))));

    let zero_width = r#"{ "camera": { "width": 0 } }"#;
    assert!(matches!(SceneDescription::from_json_str(zero_width),
        Err(DescriptionError::Transform(MathError::NonInvertible))));

    let parallel_up = r#"{ "camera": { "look_at":
        { "from": [0, 0, 0], "to": [0, 5, 0], "up": [0, 1, 0] } } }"#;
    assert!(matches!(SceneDescription::from_json_str(parallel_up),
        Err(DescriptionError::Transform(MathError::NonInvertible))));

    let singular = r#"{ "camera": { "transform": [ { "matrix":
        [[1, 0, 0, 0], [0, 0, 0, 0], [0, 0, 1, 0], [0, 0, 0, 1]] } ] } }"#;
    assert!(matches!(SceneDescription::from_json_str(singular),
        Err(DescriptionError::Transform(_))));

    assert!(matches!(SceneDescription::from_json_str("{ not json"),
        Err(DescriptionError::Parse(_))));
}
