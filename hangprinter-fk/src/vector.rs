/// Row-major 3x3 matrix.
pub type Mat3 = [[f64; 3]; 3];

pub(crate) const ZERO_MAT3: Mat3 = [[0.0; 3]; 3];

/// 3D vector. Positions, anchor offsets, steps and gradients all use this.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct V3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl V3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    #[inline(always)]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[inline(always)]
    pub fn magnitude(&self) -> f64 {
        libm::sqrt(self.magnitude_squared())
    }

    #[inline(always)]
    pub fn magnitude_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    #[inline(always)]
    pub fn dot(&self, rhs: &Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    #[inline(always)]
    pub fn scale(self, s: f64) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    #[inline(always)]
    pub fn euclidean_distance(self, rhs: Self) -> f64 {
        (self - rhs).magnitude()
    }

    /// Copy of `self` with one axis shifted by `delta`.
    #[inline(always)]
    pub fn nudged(self, axis: usize, delta: f64) -> Self {
        let mut out = self;
        match axis {
            0 => out.x += delta,
            1 => out.y += delta,
            _ => out.z += delta,
        }
        out
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// `m · self`.
    #[inline(always)]
    pub fn transformed_by(self, m: &Mat3) -> Self {
        Self::new(
            m[0][0] * self.x + m[0][1] * self.y + m[0][2] * self.z,
            m[1][0] * self.x + m[1][1] * self.y + m[1][2] * self.z,
            m[2][0] * self.x + m[2][1] * self.y + m[2][2] * self.z,
        )
    }
}

impl From<[f64; 3]> for V3 {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<V3> for [f64; 3] {
    fn from(V3 { x, y, z }: V3) -> Self {
        [x, y, z]
    }
}

impl std::ops::Add<Self> for V3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl std::ops::AddAssign<Self> for V3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub<Self> for V3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::assert_nearly_eq;

    #[test]
    fn basic_ops() {
        let a = V3::new(1.0, 2.0, 2.0);
        let b = V3::new(-1.0, 0.0, 4.0);
        assert_nearly_eq(a.magnitude(), 3.0);
        assert_nearly_eq(a.dot(&b), -1.0 + 8.0);
        assert_nearly_eq(a.euclidean_distance(b), (4.0f64 + 4.0 + 4.0).sqrt());
        assert_eq!(a + b, V3::new(0.0, 2.0, 6.0));
        assert_eq!(a.nudged(2, 0.5), V3::new(1.0, 2.0, 2.5));
    }

    #[test]
    fn matrix_vector_product() {
        let m = [[1.0, 0.0, 2.0], [0.0, 3.0, 0.0], [-1.0, 0.0, 1.0]];
        let v = V3::new(1.0, 1.0, 1.0).transformed_by(&m);
        assert_eq!(v, V3::new(3.0, 3.0, 0.0));
    }
}
