use crate::spectrum::Spectrum;
use crate::vector::Vector4;

/// A point light.
///
/// Emits `spectrum` from a single position. `softness` is carried for scene
/// descriptions that set it; the ray tracer casts hard shadows and ignores it.
#[derive(Clone, Debug, Default)]
pub struct PointLightSource {
    pub position: Vector4,
    pub spectrum: Spectrum,
    pub softness: f64,
}

impl PointLightSource {
    /// Creates a point light.
    ///
    /// If `position` isn't a point, it is converted to a point automatically.
    pub fn new(mut position: Vector4, spectrum: Spectrum) -> PointLightSource {
        if !position.is_point() {
            position[3] = 1.0;
        }

        PointLightSource { position, spectrum, softness: 0.0 }
    }

    pub fn with_softness(mut self, softness: f64) -> PointLightSource {
        self.softness = softness;
        self
    }
}

/// A material record.
///
/// Materials use the terms of the Phong reflection model, with each
/// coefficient given as a spectrum instead of a single number.
#[derive(Clone, Debug)]
pub struct Material {
    pub ambient: Spectrum,
    pub diffuse: Spectrum,
    pub specular: Spectrum,
    pub shininess: f64,
}

impl Default for Material {
    fn default() -> Material {
        Material {
            ambient: Spectrum::constant(0.1),
            diffuse: Spectrum::constant(0.9),
            specular: Spectrum::constant(0.9),
            shininess: 200.0,
        }
    }
}

impl Material {
    pub fn new(ambient: Spectrum, diffuse: Spectrum, specular: Spectrum,
        shininess: f64) -> Material {
        Material { ambient, diffuse, specular, shininess }
    }
}

/// Diffuse and specular factors for one light.
///
/// `normal` is the surface normal and `to_light` points from the surface to
/// the light; neither has to be normalized. The diffuse factor is `N . L`,
/// the specular factor is `(N . R)^shininess` with `R` the reflection of `L`
/// about `N`. A light behind the surface contributes nothing.
pub fn phong(normal: &Vector4, to_light: &Vector4, shininess: f64) -> (f64, f64) {
    let nn = normal.normalize();
    let nl = to_light.normalize();

    let light_dot_normal = nn.dot(&nl);
    if light_dot_normal <= 0.0 {
        return (0.0, 0.0);
    }

    let nr = -nl.reflect_off(&nn);
    let reflect_dot_normal = nn.dot(&nr).max(0.0);

    (light_dot_normal, reflect_dot_normal.powf(shininess))
}

#[test]
fn point_light_new() {
    let light = PointLightSource::new(
        Vector4::vector(0.0, 0.0, 0.0),
        Spectrum::constant(1.0)
    );

    assert!(light.position.is_point());
    assert_eq!(light.spectrum.intensity(3.0), 1.0);
    assert_eq!(light.softness, 0.0);
    assert_eq!(light.with_softness(0.5).softness, 0.5);
}

#[test]
fn default_material() {
    let m = Material::default();

    assert_eq!(m.ambient.intensity(0.0), 0.1);
    assert_eq!(m.diffuse.intensity(0.0), 0.9);
    assert_eq!(m.specular.intensity(0.0), 0.9);
    assert_eq!(m.shininess, 200.0);
}

#[test]
fn phong_light_overhead() {
    let normal = Vector4::vector(0.0, 0.0, 2.0);
    let to_light = Vector4::vector(0.0, 0.0, 10.0);

    let (diffuse, specular) = phong(&normal, &to_light, 5.0);

    assert!(crate::feq(diffuse, 1.0));
    assert!(crate::feq(specular, 1.0));
}

#[test]
fn phong_light_at_angle() {
    let normal = Vector4::vector(0.0, 1.0, 0.0);
    let to_light = Vector4::vector(1.0, 1.0, 0.0);

    let (diffuse, specular) = phong(&normal, &to_light, 2.0);
    let half_sqrt2 = 2.0f64.sqrt() / 2.0;

    assert!(crate::feq(diffuse, half_sqrt2));
    assert!(crate::feq(specular, 0.5));
}

#[test]
fn phong_light_behind_surface() {
    let normal = Vector4::vector(0.0, 1.0, 0.0);
    let to_light = Vector4::vector(0.0, -1.0, 0.0);

    assert_eq!(phong(&normal, &to_light, 10.0), (0.0, 0.0));
}
