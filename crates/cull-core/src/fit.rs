use serde::{Deserialize, Serialize};

/// Which camera parameters a bundle-adjustment pass may refine.
///
/// Engines take these as a positional flag vector; the named fields here
/// replace that call shape, and [`CameraFitMask::to_flags`] restores the
/// positional order for adapters that still need it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraFitMask {
    /// Focal length.
    pub fit_f: bool,
    /// Principal point, x.
    pub fit_cx: bool,
    /// Principal point, y.
    pub fit_cy: bool,
    /// Affinity term.
    pub fit_b1: bool,
    /// Skew term.
    pub fit_b2: bool,
    /// Radial distortion, first coefficient.
    pub fit_k1: bool,
    /// Radial distortion, second coefficient.
    pub fit_k2: bool,
    /// Radial distortion, third coefficient.
    pub fit_k3: bool,
    /// Radial distortion, fourth coefficient.
    pub fit_k4: bool,
    /// Tangential distortion, first coefficient.
    pub fit_p1: bool,
    /// Tangential distortion, second coefficient.
    pub fit_p2: bool,
    /// Tangential distortion, third coefficient.
    pub fit_p3: bool,
    /// Tangential distortion, fourth coefficient.
    pub fit_p4: bool,
    /// Rolling-shutter compensation.
    pub fit_shutter: bool,
}

impl CameraFitMask {
    /// Preset run between culling passes: the higher-order radial and
    /// tangential terms stay fixed.
    pub const PARTIAL: Self = Self {
        fit_f: true,
        fit_cx: true,
        fit_cy: true,
        fit_b1: true,
        fit_b2: true,
        fit_k1: true,
        fit_k2: true,
        fit_k3: true,
        fit_k4: false,
        fit_p1: true,
        fit_p2: true,
        fit_p3: false,
        fit_p4: false,
        fit_shutter: false,
    };

    /// Preset for the final refinement rounds: every term except the
    /// rolling-shutter compensation.
    pub const FULL: Self = Self {
        fit_f: true,
        fit_cx: true,
        fit_cy: true,
        fit_b1: true,
        fit_b2: true,
        fit_k1: true,
        fit_k2: true,
        fit_k3: true,
        fit_k4: true,
        fit_p1: true,
        fit_p2: true,
        fit_p3: true,
        fit_p4: true,
        fit_shutter: false,
    };

    /// Positional flag vector in engine argument order:
    /// `f, cx, cy, b1, b2, k1, k2, k3, k4, p1, p2, p3, p4, shutter`.
    pub fn to_flags(&self) -> [bool; 14] {
        [
            self.fit_f,
            self.fit_cx,
            self.fit_cy,
            self.fit_b1,
            self.fit_b2,
            self.fit_k1,
            self.fit_k2,
            self.fit_k3,
            self.fit_k4,
            self.fit_p1,
            self.fit_p2,
            self.fit_p3,
            self.fit_p4,
            self.fit_shutter,
        ]
    }
}
