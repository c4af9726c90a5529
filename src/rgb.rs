use serde::{ Deserialize, Serialize };

use crate::consts::DEFAULT_WAVELENGTHS;
use crate::spectrum::Spectrum;
use crate::vector::Vector3;

/// Converts between spectra and RGB triples.
///
/// A spectrum is sampled at one wavelength per channel, clamped to the
/// channel's intensity range and rescaled to `[0, 1]`. Going the other way,
/// each channel becomes a boxcar peak around its wavelength, with the bands
/// sized to touch without overlapping. The model is lossy; it is meant for
/// demonstration, not calibrated color.
///
/// Wavelengths are expected in decreasing order (red, green, blue).
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RgbColorProfile {
    #[serde(with = "vector3_array")]
    pub wavelengths: Vector3,
    #[serde(with = "vector3_array")]
    pub min_intensities: Vector3,
    #[serde(with = "vector3_array")]
    pub max_intensities: Vector3,
}

impl Default for RgbColorProfile {
    fn default() -> RgbColorProfile {
        RgbColorProfile {
            wavelengths: Vector3::new(DEFAULT_WAVELENGTHS),
            min_intensities: Vector3::splat(0.0),
            max_intensities: Vector3::splat(1.0),
        }
    }
}

impl RgbColorProfile {
    pub fn new(wavelengths: Vector3, min_intensities: Vector3,
        max_intensities: Vector3) -> RgbColorProfile {
        RgbColorProfile { wavelengths, min_intensities, max_intensities }
    }

    /// Checks that every channel has a non-empty intensity range.
    pub fn is_valid(&self) -> bool {
        (0..3).all(|i| self.max_intensities[i] > self.min_intensities[i])
    }

    /// Samples a spectrum into RGB components in `[0, 1]`.
    pub fn to_rgb(&self, spectrum: &Spectrum) -> Vector3 {
        let range = self.max_intensities - self.min_intensities;

        (spectrum.sample(&self.wavelengths)
            .clamp(&self.min_intensities, &self.max_intensities)
            - self.min_intensities) / range
    }

    /// Truncates `[0, 1]` components to bytes.
    pub fn rgb_to_bytes(rgb: &Vector3) -> [u8; 3] {
        let byte = |c: f64| (c * 255.0) as u8;

        [byte(rgb.r()), byte(rgb.g()), byte(rgb.b())]
    }

    pub fn to_rgb_bytes(&self, spectrum: &Spectrum) -> [u8; 3] {
        RgbColorProfile::rgb_to_bytes(&self.to_rgb(spectrum))
    }

    /// Builds the sum of three monochrome peaks with the given heights.
    pub fn from_rgb(&self, rgb: &Vector3) -> Spectrum {
        let wl = &self.wavelengths;

        let g_width = (wl.r() - wl.g()).min(wl.g() - wl.b());
        let r_width = 2.0 * (wl.r() - wl.g()) - g_width;
        let b_width = 2.0 * (wl.g() - wl.b()) - g_width;

        Spectrum::monochrome(wl.r(), r_width, rgb.r())
            + Spectrum::monochrome(wl.g(), g_width, rgb.g())
            + Spectrum::monochrome(wl.b(), b_width, rgb.b())
    }

    pub fn from_rgb_bytes(&self, rgb: [u8; 3]) -> Spectrum {
        let channel = |c: u8| c as f64 / 255.0;

        self.from_rgb(&Vector3::new([channel(rgb[0]), channel(rgb[1]), channel(rgb[2])]))
    }
}

/// Stores a `Vector3` as a plain `[r, g, b]` array.
mod vector3_array {
    use serde::{ Deserialize, Deserializer, Serialize, Serializer };

    use crate::vector::Vector3;

    pub fn serialize<S: Serializer>(v: &Vector3, serializer: S)
        -> Result<S::Ok, S::Error> {
        v.as_array().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D)
        -> Result<Vector3, D::Error> {
        <[f64; 3]>::deserialize(deserializer).map(Vector3::from)
    }
}

#[test]
fn primary_colors() {
    let profile = RgbColorProfile::default();

    let red = profile.from_rgb(&Vector3::new([1.0, 0.0, 0.0]));
    assert_eq!(profile.to_rgb(&red), Vector3::new([1.0, 0.0, 0.0]));

    let yellow = profile.from_rgb(&Vector3::new([1.0, 1.0, 0.0]));
    assert_eq!(profile.to_rgb_bytes(&yellow), [255, 255, 0]);

    let white = Spectrum::constant(1.0);
    assert_eq!(profile.to_rgb_bytes(&white), [255, 255, 255]);
}

#[test]
fn clamps_to_range() {
    let profile = RgbColorProfile::default();

    assert_eq!(profile.to_rgb(&Spectrum::constant(7.0)), Vector3::splat(1.0));
    assert_eq!(profile.to_rgb(&Spectrum::constant(-2.0)), Vector3::splat(0.0));
}

#[test]
fn rescales_custom_range() {
    let profile = RgbColorProfile::new(
        Vector3::new([2.0, 1.0, 0.0]),
        Vector3::splat(1.0),
        Vector3::splat(3.0),
    );

    assert_eq!(profile.to_rgb(&Spectrum::constant(2.0)), Vector3::splat(0.5));
}

#[test]
fn byte_round_trip() {
    let profile = RgbColorProfile::default();
    let bytes = [123, 45, 67];

    assert_eq!(profile.to_rgb_bytes(&profile.from_rgb_bytes(bytes)), bytes);
}

#[test]
fn validity() {
    let mut profile = RgbColorProfile::default();
    assert!(profile.is_valid());

    profile.max_intensities[1] = 0.0;
    assert!(!profile.is_valid());
}

#[test]
fn serde_arrays() {
    let profile = RgbColorProfile::default();
    let json = serde_json::to_string(&profile).unwrap();

    assert_eq!(json,
        r#"{"wavelengths":[2.0,1.0,0.0],"min_intensities":[0.0,0.0,0.0],"max_intensities":[1.0,1.0,1.0]}"#);
    assert_eq!(serde_json::from_str::<RgbColorProfile>(&json).unwrap(), profile);
}
