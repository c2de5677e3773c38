//! Rigid-transform math for placement: 4x4 matrices, yaw rotation,
//! planar translation and ground-plane (XZ) projection.
//!
//! All transforms live in one fixed world frame: +Y up, device looking
//! down its local -Z axis.

// ── Vec3 ─────────────────────────────────────────────────────

/// 3D vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
    pub const UP: Self = Self {
        x: 0.0,
        y: 1.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction; the zero vector stays zero.
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len < 1e-10 {
            return Self::ZERO;
        }
        self.scale(1.0 / len)
    }
}

// ── Mat4 ─────────────────────────────────────────────────────

/// 4x4 matrix (column-major, OpenGL convention).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4 {
    pub data: [f32; 16],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4 {
    pub const IDENTITY: Self = Self {
        data: [
            1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
        ],
    };

    /// Pure translation matrix.
    pub fn translation(dx: f32, dy: f32, dz: f32) -> Self {
        let mut m = Self::IDENTITY;
        m.data[12] = dx;
        m.data[13] = dy;
        m.data[14] = dz;
        m
    }

    /// Rotation about the vertical (+Y) axis by `angle` radians, right-handed.
    ///
    /// Row-major this is `[[c,0,s,0],[0,1,0,0],[-s,0,c,0],[0,0,0,1]]`.
    pub fn yaw(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self {
            data: [
                c, 0.0, -s, 0.0, //
                0.0, 1.0, 0.0, 0.0, //
                s, 0.0, c, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ],
        }
    }

    /// Rigid pose at `eye` whose -Z axis points at `target`.
    ///
    /// Falls back to looking down world -Z when the direction is degenerate.
    pub fn look_at(eye: Vec3, target: Vec3) -> Self {
        let mut forward = target.sub(eye).normalize();
        if forward == Vec3::ZERO {
            forward = Vec3::new(0.0, 0.0, -1.0);
        }
        let z = forward.scale(-1.0);
        let mut x = Vec3::UP.cross(z).normalize();
        if x == Vec3::ZERO {
            // Looking straight up or down; pick any horizontal right vector.
            x = Vec3::new(1.0, 0.0, 0.0);
        }
        let y = z.cross(x);

        Self {
            data: [
                x.x, x.y, x.z, 0.0, //
                y.x, y.y, y.z, 0.0, //
                z.x, z.y, z.z, 0.0, //
                eye.x, eye.y, eye.z, 1.0,
            ],
        }
    }

    /// Multiply two matrices (`self * other`).
    pub fn mul(&self, other: &Self) -> Self {
        let mut out = [0.0f32; 16];
        for col in 0..4 {
            for row in 0..4 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += self.data[k * 4 + row] * other.data[col * 4 + k];
                }
                out[col * 4 + row] = sum;
            }
        }
        Self { data: out }
    }

    /// Inverse of a rigid transform (rotation + translation).
    pub fn inverse_rigid(&self) -> Self {
        let mut inv = [0.0f32; 16];

        // Transpose 3x3 rotation block
        inv[0] = self.data[0];
        inv[1] = self.data[4];
        inv[2] = self.data[8];
        inv[4] = self.data[1];
        inv[5] = self.data[5];
        inv[6] = self.data[9];
        inv[8] = self.data[2];
        inv[9] = self.data[6];
        inv[10] = self.data[10];

        let t = self.position();
        inv[12] = -(inv[0] * t.x + inv[4] * t.y + inv[8] * t.z);
        inv[13] = -(inv[1] * t.x + inv[5] * t.y + inv[9] * t.z);
        inv[14] = -(inv[2] * t.x + inv[6] * t.y + inv[10] * t.z);
        inv[15] = 1.0;

        Self { data: inv }
    }

    /// Transform a point (w = 1).
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        let d = &self.data;
        Vec3::new(
            d[0] * p.x + d[4] * p.y + d[8] * p.z + d[12],
            d[1] * p.x + d[5] * p.y + d[9] * p.z + d[13],
            d[2] * p.x + d[6] * p.y + d[10] * p.z + d[14],
        )
    }

    /// Translation component.
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.data[12], self.data[13], self.data[14])
    }

    /// Local -Z axis in world space (the viewing direction of a device pose).
    pub fn forward(&self) -> Vec3 {
        Vec3::new(-self.data[8], -self.data[9], -self.data[10]).normalize()
    }

    /// Element-wise comparison within `eps`.
    pub fn approx_eq(&self, other: &Self, eps: f32) -> bool {
        self.data
            .iter()
            .zip(other.data.iter())
            .all(|(a, b)| (a - b).abs() <= eps)
    }
}

// ── Ground-plane projection ──────────────────────────────────

/// Horizontal coordinates (x, z) of a transform's translation.
pub fn project_xz(transform: &Mat4) -> (f32, f32) {
    (transform.data[12], transform.data[14])
}

/// Euclidean distance between the horizontal projections of two transforms.
pub fn distance_xz(a: &Mat4, b: &Mat4) -> f32 {
    let (ax, az) = project_xz(a);
    let (bx, bz) = project_xz(b);
    let dx = ax - bx;
    let dz = az - bz;
    (dx * dx + dz * dz).sqrt()
}

// ── Tests ────────────────────────────────────────────────────
