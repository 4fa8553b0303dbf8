use nannou::color::{hsla, srgba};
use nannou::draw::Draw;
use nannou::geom::{Point2, pt2};

/// Hue in degrees, saturation/lightness/alpha in 0..=1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsla {
    pub hue: f32,
    pub saturation: f32,
    pub lightness: f32,
    pub alpha: f32,
}

impl Hsla {
    pub fn new(hue: f32, saturation: f32, lightness: f32, alpha: f32) -> Self {
        Self {
            hue,
            saturation,
            lightness,
            alpha,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub fn from_bytes(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a,
        }
    }
}

/// Glow applied to every following fill until cleared.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glow {
    pub blur: f32,
    pub color: Hsla,
}

/// A 2D drawing target. Coordinates follow canvas conventions:
/// origin at the top-left corner, y pointing down.
pub trait Surface {
    /// Paints over the whole surface; translucent colors leave trails.
    fn wash(&mut self, color: Rgba);
    fn radial_gradient(&mut self, center: (f32, f32), radius: f32, inner: Hsla);
    fn set_glow(&mut self, glow: Option<Glow>);
    fn fill_circle(&mut self, center: (f32, f32), radius: f32, color: Hsla);
}

const GRADIENT_STEPS: usize = 8;

/// Draws onto a nannou [`Draw`], translating canvas coordinates into
/// nannou's centered, y-up space. Nannou has no shadow blur, so glow is a
/// translucent halo under each fill.
pub struct NannouSurface<'a> {
    draw: &'a Draw,
    width: f32,
    height: f32,
    glow: Option<Glow>,
}

impl<'a> NannouSurface<'a> {
    pub fn new(draw: &'a Draw, width: f32, height: f32) -> Self {
        Self {
            draw,
            width,
            height,
            glow: None,
        }
    }

    fn to_world(&self, (x, y): (f32, f32)) -> Point2 {
        pt2(x - self.width * 0.5, self.height * 0.5 - y)
    }
}

fn to_nannou(c: Hsla) -> nannou::color::Hsla {
    hsla(
        c.hue.rem_euclid(360.0) / 360.0,
        c.saturation,
        c.lightness,
        c.alpha,
    )
}

impl Surface for NannouSurface<'_> {
    fn wash(&mut self, c: Rgba) {
        self.draw
            .rect()
            .x_y(0.0, 0.0)
            .w_h(self.width, self.height)
            .color(srgba(c.r, c.g, c.b, c.a));
    }

    fn radial_gradient(&mut self, center: (f32, f32), radius: f32, inner: Hsla) {
        let p = self.to_world(center);
        let step_alpha = inner.alpha / GRADIENT_STEPS as f32;
        // outermost first; overlapping discs build up toward the center
        for step in (1..=GRADIENT_STEPS).rev() {
            let r = radius * step as f32 / GRADIENT_STEPS as f32;
            self.draw
                .ellipse()
                .xy(p)
                .radius(r)
                .color(to_nannou(Hsla {
                    alpha: step_alpha,
                    ..inner
                }));
        }
    }

    fn set_glow(&mut self, glow: Option<Glow>) {
        self.glow = glow;
    }

    fn fill_circle(&mut self, center: (f32, f32), radius: f32, color: Hsla) {
        let p = self.to_world(center);
        if let Some(glow) = self.glow {
            // halo
            self.draw
                .ellipse()
                .xy(p)
                .radius(radius + glow.blur * 0.5)
                .color(to_nannou(Hsla {
                    alpha: glow.color.alpha * 0.35,
                    ..glow.color
                }));
        }
        // core
        self.draw.ellipse().xy(p).radius(radius).color(to_nannou(color));
    }
}

/// Counts and records draw calls.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingSurface {
    pub washes: usize,
    pub gradients: usize,
    pub circles: Vec<((f32, f32), f32, Hsla, Option<Glow>)>,
    pub glow: Option<Glow>,
}

#[cfg(test)]
impl RecordingSurface {
    pub fn draw_calls(&self) -> usize {
        self.washes + self.gradients + self.circles.len()
    }
}

#[cfg(test)]
impl Surface for RecordingSurface {
    fn wash(&mut self, _color: Rgba) {
        self.washes += 1;
    }

    fn radial_gradient(&mut self, _center: (f32, f32), _radius: f32, _inner: Hsla) {
        self.gradients += 1;
    }

    fn set_glow(&mut self, glow: Option<Glow>) {
        self.glow = glow;
    }

    fn fill_circle(&mut self, center: (f32, f32), radius: f32, color: Hsla) {
        self.circles.push((center, radius, color, self.glow));
    }
}
