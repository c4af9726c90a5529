use std::sync::Arc;

use crate::camera::Camera;
use crate::geometry::Geometry;
use crate::light::{ Material, PointLightSource };
use crate::ray::Ray;
use crate::spectrum::Spectrum;
use crate::transform::AffineTransform;
use crate::vector::Vector4;

/// The nearest surface a ray met, in scene space.
#[derive(Clone, Debug)]
pub struct RayIntersection {
    pub point: Vector4,

    /// Unit-length surface normal.
    pub normal: Vector4,

    pub material: Arc<Material>,
}

/// A placed, materialized piece of geometry.
///
/// Geometry and material are shared: many objects can point at the same mesh
/// or material.
#[derive(Clone, Debug)]
pub struct GeometryObject {
    pub geometry: Arc<Geometry>,
    pub material: Arc<Material>,

    /// Maps object space to scene space.
    pub transform: AffineTransform,
}

impl GeometryObject {
    pub fn new(geometry: Arc<Geometry>, material: Arc<Material>,
        transform: AffineTransform) -> GeometryObject {
        GeometryObject { geometry, material, transform }
    }

    pub fn position(&self) -> Vector4 {
        self.transform.origin()
    }

    /// Intersects a scene-space ray, returning the hit in scene space.
    pub fn intersect_with_ray(&self, ray: &Ray) -> Option<RayIntersection> {
        let local = ray.inverse_transform(&self.transform);
        let hit = self.geometry.intersect_with_ray(&local)?;

        Some(RayIntersection {
            point: self.transform.apply(hit.point),
            normal: self.transform.apply_to_normal(hit.normal).normalize(),
            material: Arc::clone(&self.material),
        })
    }
}

/// Anything that can be placed in a scene.
#[derive(Clone, Debug)]
pub enum SceneObject {
    Geometry(Arc<GeometryObject>),
    Light(Arc<PointLightSource>),
    Camera(Arc<Camera>),
}

impl From<Arc<GeometryObject>> for SceneObject {
    fn from(object: Arc<GeometryObject>) -> SceneObject {
        SceneObject::Geometry(object)
    }
}

impl From<Arc<PointLightSource>> for SceneObject {
    fn from(light: Arc<PointLightSource>) -> SceneObject {
        SceneObject::Light(light)
    }
}

impl From<Arc<Camera>> for SceneObject {
    fn from(camera: Arc<Camera>) -> SceneObject {
        SceneObject::Camera(camera)
    }
}

/// A scene with objects, lights and cameras.
///
/// Everything is held by `Arc`, so a render can share the scene across worker
/// threads. A scene must not change while a render of it is in flight.
#[derive(Clone, Debug)]
pub struct Scene {
    /// What rays that hit nothing see.
    pub sky_spectrum: Spectrum,

    /// Light reaching every surface regardless of shadows.
    pub ambient_spectrum: Spectrum,

    objects: Vec<Arc<GeometryObject>>,
    lights: Vec<Arc<PointLightSource>>,
    cameras: Vec<Arc<Camera>>,
}

impl Default for Scene {
    fn default() -> Scene {
        Scene {
            sky_spectrum: Spectrum::constant(0.0),
            ambient_spectrum: Spectrum::constant(1.0),
            objects: Vec::new(),
            lights: Vec::new(),
            cameras: Vec::new(),
        }
    }
}

impl Scene {
    /// Creates an empty scene with a black sky and unit ambient light.
    pub fn new() -> Scene {
        Default::default()
    }

    pub fn objects(&self) -> &[Arc<GeometryObject>] {
        &self.objects
    }

    pub fn lights(&self) -> &[Arc<PointLightSource>] {
        &self.lights
    }

    pub fn cameras(&self) -> &[Arc<Camera>] {
        &self.cameras
    }

    /// Adds an object, light or camera.
    pub fn add<T: Into<SceneObject>>(&mut self, object: T) {
        match object.into() {
            SceneObject::Geometry(o) => self.objects.push(o),
            SceneObject::Light(l) => self.lights.push(l),
            SceneObject::Camera(c) => self.cameras.push(c),
        }
    }

    /// Removes the entry sharing `object`'s allocation.
    ///
    /// Returns whether anything was removed.
    pub fn remove<T: Into<SceneObject>>(&mut self, object: T) -> bool {
        fn remove_ptr<U>(list: &mut Vec<Arc<U>>, item: &Arc<U>) -> bool {
            match list.iter().position(|x| Arc::ptr_eq(x, item)) {
                Some(i) => {
                    list.remove(i);
                    true
                },
                None => false,
            }
        }

        match object.into() {
            SceneObject::Geometry(o) => remove_ptr(&mut self.objects, &o),
            SceneObject::Light(l) => remove_ptr(&mut self.lights, &l),
            SceneObject::Camera(c) => remove_ptr(&mut self.cameras, &c),
        }
    }

    /// Finds the nearest intersection of a scene-space ray.
    ///
    /// Every object is tested; there is no spatial index. On equal distances
    /// the object added first wins. Hits at a non-finite distance, as produced
    /// by degenerate transforms, are ignored.
    pub fn trace_ray(&self, ray: &Ray) -> Option<RayIntersection> {
        let mut nearest: Option<(RayIntersection, f64)> = None;

        for object in self.objects.iter() {
            let isec = match object.intersect_with_ray(ray) {
                Some(isec) => isec,
                None => continue,
            };

            let distance2 = (isec.point - ray.origin).length2();
            if !distance2.is_finite() {
                continue;
            }

            match nearest {
                Some((_, best)) if best <= distance2 => {},
                _ => nearest = Some((isec, distance2)),
            }
        }

        nearest.map(|(isec, _)| isec)
    }

    /// Checks whether something blocks the path from `origin` to `light`.
    pub fn is_shadowed(&self, origin: Vector4, light: &PointLightSource) -> bool {
        let to_light = light.position - origin;
        let ray = Ray::new(origin, to_light);

        match self.trace_ray(&ray) {
            Some(isec) => (isec.point - origin).length2() < to_light.length2(),
            None => false,
        }
    }
}

#[cfg(test)]
fn two_sphere_scene() -> (Scene, Arc<Material>, Arc<Material>) {
    let sphere = Arc::new(Geometry::UnitSphere);
    let material1 = Arc::new(Material::default());
    let material2 = Arc::new(Material {
        shininess: 10.0,
        ..Default::default()
    });

    let mut scene = Scene::new();
    scene.add(Arc::new(GeometryObject::new(
        Arc::clone(&sphere),
        Arc::clone(&material1),
        AffineTransform::translation(0.0, 0.0, 1.0),
    )));
    scene.add(Arc::new(GeometryObject::new(
        Arc::clone(&sphere),
        Arc::clone(&material2),
        AffineTransform::translation(5.0, 0.0, 1.0),
    )));

    (scene, material1, material2)
}

#[test]
fn stores_and_removes_things() {
    let mut scene = Scene::new();

    let light = Arc::new(PointLightSource::new(
        Vector4::point(0.0, 5.0, 0.0),
        Spectrum::constant(1.0)
    ));
    let camera = Arc::new(Camera::new(1.0, 1.0, 1.0).unwrap());
    let object = Arc::new(GeometryObject::new(
        Arc::new(Geometry::XyPlane),
        Arc::new(Material::default()),
        AffineTransform::identity(),
    ));

    scene.add(Arc::clone(&light));
    scene.add(Arc::clone(&camera));
    scene.add(Arc::clone(&object));

    assert_eq!(scene.lights().len(), 1);
    assert_eq!(scene.cameras().len(), 1);
    assert_eq!(scene.objects().len(), 1);

    // An equal but distinct camera is not the one stored.
    assert!(!scene.remove(Arc::new(Camera::new(1.0, 1.0, 1.0).unwrap())));
    assert!(scene.remove(Arc::clone(&camera)));
    assert!(scene.remove(Arc::clone(&light)));
    assert!(scene.remove(Arc::clone(&object)));

    assert!(scene.lights().is_empty());
    assert!(scene.cameras().is_empty());
    assert!(scene.objects().is_empty());
}

#[test]
fn traces_ray_to_nearest_object() {
    let (scene, material1, material2) = two_sphere_scene();

    let ray = Ray::new(Vector4::point(0.0, 0.0, -5.0),
                       Vector4::vector(0.0, 0.0, 1.0));
    let isec = scene.trace_ray(&ray).unwrap();

    assert!(Arc::ptr_eq(&isec.material, &material1));
    assert!(!Arc::ptr_eq(&isec.material, &material2));
    assert_eq!(isec.point, Vector4::point(0.0, 0.0, 0.0));
    assert_eq!(isec.normal, Vector4::vector(0.0, 0.0, -1.0));

    let other = Ray::new(Vector4::point(5.0, 0.0, -5.0),
                         Vector4::vector(0.0, 0.0, 1.0));
    let isec = scene.trace_ray(&other).unwrap();
    assert!(Arc::ptr_eq(&isec.material, &material2));
}

#[test]
fn ray_away_from_objects_misses() {
    let (scene, _, _) = two_sphere_scene();

    let ray = Ray::new(Vector4::point(0.0, 0.0, -5.0),
                       Vector4::vector(0.0, 0.0, -1.0));

    assert!(scene.trace_ray(&ray).is_none());
}

#[test]
fn nearer_object_wins_regardless_of_order() {
    let (mut scene, _, _) = two_sphere_scene();
    let front = Arc::new(Material::default());

    scene.add(Arc::new(GeometryObject::new(
        Arc::new(Geometry::UnitSphere),
        Arc::clone(&front),
        AffineTransform::translation(0.0, 0.0, -2.0),
    )));

    let ray = Ray::new(Vector4::point(0.0, 0.0, -5.0),
                       Vector4::vector(0.0, 0.0, 1.0));
    let isec = scene.trace_ray(&ray).unwrap();

    assert!(Arc::ptr_eq(&isec.material, &front));
    assert_eq!(isec.point, Vector4::point(0.0, 0.0, -3.0));
}

#[test]
fn scaled_sphere_normal_is_unit() {
    let mut scene = Scene::new();
    scene.add(Arc::new(GeometryObject::new(
        Arc::new(Geometry::UnitSphere),
        Arc::new(Material::default()),
        AffineTransform::scaling(2.0, 2.0, 2.0),
    )));

    let ray = Ray::new(Vector4::point(0.0, 0.0, -5.0),
                       Vector4::vector(0.0, 0.0, 1.0));
    let isec = scene.trace_ray(&ray).unwrap();

    assert_eq!(isec.point, Vector4::point(0.0, 0.0, -2.0));
    assert_eq!(isec.normal, Vector4::vector(0.0, 0.0, -1.0));
}

#[test]
fn shadows() {
    let (scene, _, _) = two_sphere_scene();
    let light = PointLightSource::new(
        Vector4::point(0.0, 0.0, 10.0),
        Spectrum::constant(1.0)
    );

    // Sphere between point and light.
    assert!(scene.is_shadowed(Vector4::point(0.0, 0.0, -5.0), &light));

    // Nothing in the way.
    assert!(!scene.is_shadowed(Vector4::point(0.0, 5.0, 5.0), &light));

    // Sphere behind the point.
    let near = PointLightSource::new(
        Vector4::point(0.0, 0.0, -10.0),
        Spectrum::constant(1.0)
    );
    assert!(!scene.is_shadowed(Vector4::point(0.0, 0.0, -5.0), &near));
}

#[test]
fn off_axis_chord_through_moved_sphere() {
    let center = Vector4::point(0.0, 0.0, 1.0);
    let mut scene = Scene::new();
    scene.add(Arc::new(GeometryObject::new(
        Arc::new(Geometry::UnitSphere),
        Arc::new(Material::default()),
        AffineTransform::translation(0.0, 0.0, 1.0),
    )));

    let d = Vector4::vector(1.0, 2.0, 3.0);
    let unit = d.normalize();

    let inside = Ray::new(center - unit * 0.5, d);
    let outside = Ray::new(center + unit * 3.0, d * -2.0);

    let from_inside = scene.trace_ray(&inside).unwrap();
    let from_outside = scene.trace_ray(&outside).unwrap();

    assert_eq!(from_inside.point, center + unit);
    assert_eq!(from_outside.point, from_inside.point);
    assert_eq!(from_outside.normal, unit);
    assert_eq!(from_inside.normal, -unit);
}

#[test]
fn degenerate_object_does_not_hide_valid_hit() {
    let (mut scene, material1, _) = two_sphere_scene();

    // Flattened along x: every hit comes back with a NaN coordinate.
    scene.add(Arc::new(GeometryObject::new(
        Arc::new(Geometry::XyPlane),
        Arc::new(Material::default()),
        AffineTransform::scaling(f64::INFINITY, 1.0, 1.0),
    )));

    let ray = Ray::new(Vector4::point(0.0, 0.0, -5.0),
                       Vector4::vector(0.0, 0.0, 1.0));
    let isec = scene.trace_ray(&ray).unwrap();

    assert!(Arc::ptr_eq(&isec.material, &material1));
    assert_eq!(isec.point, Vector4::point(0.0, 0.0, 0.0));
}
