use std::f32::consts::TAU;

use super::surface::{Glow, Hsla};

/// Layout of the ring field. Constant for the lifetime of a visualizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingSpec {
    pub ring_count: usize,
    pub circle_count: usize,
    pub min_radius: f32,
    /// Kept clear between the outermost resting ring and the canvas edge.
    pub safety_margin: f32,
    /// Degrees.
    pub base_hue: f32,
}

impl Default for RingSpec {
    fn default() -> Self {
        Self {
            ring_count: 4,
            circle_count: 22,
            min_radius: 55.0,
            safety_margin: 50.0,
            base_hue: 230.0,
        }
    }
}

/// Aesthetic constants of the mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingTuning {
    /// Consecutive bins averaged into one ring's magnitude.
    pub bins_per_ring: usize,
    pub magnitude_exponent: f32,
    /// How far a ring moves outward at full magnitude.
    pub pulse_scale: f32,
    /// Folded angular positions spread over this many bins.
    pub max_mapped_freqs: usize,
    /// Extra bin offset per ring, so outer rings read higher frequencies.
    pub ring_bin_offset: usize,
    pub base_dot_radius: f32,
    pub reactive_scale: f32,
    pub hue_per_circle: f32,
    pub hue_per_ring: f32,
    pub hue_drift_per_ms: f64,
    pub saturation: f32,
    pub base_lightness: f32,
    pub lightness_gain: f32,
    pub glow_blur: f32,
    pub glow_gain: f32,
}

impl Default for RingTuning {
    fn default() -> Self {
        Self {
            bins_per_ring: 4,
            magnitude_exponent: 1.4,
            pulse_scale: 25.0,
            max_mapped_freqs: 16,
            ring_bin_offset: 2,
            base_dot_radius: 2.2,
            reactive_scale: 6.0,
            hue_per_circle: 4.0,
            hue_per_ring: 20.0,
            hue_drift_per_ms: 0.01,
            saturation: 0.75,
            base_lightness: 0.5,
            lightness_gain: 0.2,
            glow_blur: 10.0,
            glow_gain: 12.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingGeometry {
    pub center: (f32, f32),
    pub max_radius: f32,
    pub ring_spacing: f32,
}

impl RingGeometry {
    pub fn new(spec: &RingSpec, width: f32, height: f32) -> Self {
        let center = (width * 0.5, height * 0.5);
        // a canvas too small for the margin collapses every ring onto min_radius
        let max_radius = (center.0.min(center.1) - spec.safety_margin).max(spec.min_radius);
        let ring_spacing = if spec.ring_count > 1 {
            (max_radius - spec.min_radius) / (spec.ring_count - 1) as f32
        } else {
            0.0
        };
        Self {
            center,
            max_radius,
            ring_spacing,
        }
    }
}

/// One dot of the field, valid for a single frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualElement {
    pub ring: usize,
    pub index: usize,
    pub radius: f32,
    pub angle: f32,
    pub position: (f32, f32),
    /// Normalized magnitude of the bin this dot reads, 0..=1.
    pub magnitude: f32,
    pub dot_radius: f32,
    pub color: Hsla,
    pub glow: Glow,
}

/// Pure mapping from `(spectrum, spec, timestamp)` to the ring field.
pub struct RingMapper {
    spec: RingSpec,
    tuning: RingTuning,
    geometry: RingGeometry,
}

impl RingMapper {
    pub fn new(spec: RingSpec, tuning: RingTuning, width: f32, height: f32) -> Self {
        Self {
            geometry: RingGeometry::new(&spec, width, height),
            spec,
            tuning,
        }
    }

    pub fn tuning(&self) -> &RingTuning {
        &self.tuning
    }

    pub fn geometry(&self) -> &RingGeometry {
        &self.geometry
    }

    pub fn resting_radius(&self, ring: usize) -> f32 {
        self.spec.min_radius + ring as f32 * self.geometry.ring_spacing
    }

    /// Average of the ring's bin slice, normalized and curved. Missing bins
    /// count as silence.
    pub fn ring_magnitude(&self, spectrum: &[u8], ring: usize) -> f32 {
        let n = self.tuning.bins_per_ring;
        if n == 0 {
            return 0.0;
        }
        let start = ring * n;
        let sum: f32 = (start..start + n)
            .map(|i| spectrum.get(i).copied().unwrap_or(0) as f32 / 255.0)
            .sum();
        (sum / n as f32).powf(self.tuning.magnitude_exponent)
    }

    pub fn ring_radius(&self, spectrum: &[u8], ring: usize) -> f32 {
        self.resting_radius(ring) + self.ring_magnitude(spectrum, ring) * self.tuning.pulse_scale
    }

    /// Spectrum bin read by angular position `index` of `ring`. Positions in
    /// the second half mirror the first, so the field is left-right
    /// symmetric. `None` when the spectrum is empty.
    pub fn mapped_bin(&self, ring: usize, index: usize, bin_count: usize) -> Option<usize> {
        if bin_count == 0 || self.spec.circle_count == 0 {
            return None;
        }
        let count = self.spec.circle_count;
        let half = count as f32 / 2.0;
        let folded = if index as f32 >= half {
            count.saturating_sub(1 + index)
        } else {
            index
        };
        let scaled = (folded as f32 / half * self.tuning.max_mapped_freqs as f32).floor() as usize;
        Some((scaled + ring * self.tuning.ring_bin_offset).min(bin_count - 1))
    }

    /// Hue in degrees; drifts with wall-clock time even on a steady tone.
    pub fn hue(&self, ring: usize, index: usize, now_ms: f64) -> f32 {
        let offset = self.spec.base_hue
            + index as f32 * self.tuning.hue_per_circle
            + ring as f32 * self.tuning.hue_per_ring;
        (offset as f64 + now_ms * self.tuning.hue_drift_per_ms).rem_euclid(360.0) as f32
    }

    /// All `ring_count × circle_count` elements, ring by ring.
    pub fn elements<'a>(
        &'a self,
        spectrum: &'a [u8],
        now_ms: f64,
    ) -> impl Iterator<Item = VisualElement> + 'a {
        let circles = self.spec.circle_count;
        (0..self.spec.ring_count).flat_map(move |ring| {
            let radius = self.ring_radius(spectrum, ring);
            (0..circles).map(move |index| self.element(spectrum, ring, index, radius, now_ms))
        })
    }

    fn element(
        &self,
        spectrum: &[u8],
        ring: usize,
        index: usize,
        radius: f32,
        now_ms: f64,
    ) -> VisualElement {
        let t = &self.tuning;
        let angle = index as f32 / self.spec.circle_count as f32 * TAU;
        let (cx, cy) = self.geometry.center;
        let magnitude = self
            .mapped_bin(ring, index, spectrum.len())
            .map_or(0.0, |bin| spectrum[bin] as f32 / 255.0);
        let hue = self.hue(ring, index, now_ms);

        VisualElement {
            ring,
            index,
            radius,
            angle,
            position: (cx + radius * angle.cos(), cy + radius * angle.sin()),
            magnitude,
            dot_radius: t.base_dot_radius + magnitude * t.reactive_scale,
            color: Hsla::new(
                hue,
                t.saturation,
                t.base_lightness + magnitude * t.lightness_gain,
                1.0,
            ),
            glow: Glow {
                blur: t.glow_blur + magnitude * t.glow_gain,
                color: Hsla::new(hue, 0.8, 0.65, 0.5),
            },
        }
    }
}
