//! 笛卡尔位姿
//!
//! 对外边界的位姿表示：平移用毫米，姿态用 ZYX 欧拉角（角度制）。
//! 与 4×4 齐次变换矩阵互转的公式固定为：
//!
//! ```text
//! build:   T = Trans(x,y,z) · Rz(rz) · Ry(ry) · Rx(rx)
//! extract: ry = atan2(-T[2][0], √(T[0][0]² + T[1][0]²))
//!          rx = atan2(T[2][1]/cos ry, T[2][2]/cos ry)
//!          rz = atan2(T[1][0]/cos ry, T[0][0]/cos ry)
//! ```
//!
//! `ry = ±90°` 是欧拉角固有的万向锁点，此时 rx/rz 的拆分由浮点
//! 噪声决定（提取值仍然合法，只是不唯一）。

use nalgebra::Matrix4;

use crate::units::Deg;

/// 末端位姿（x/y/z 毫米，rx/ry/rz 角度）
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub rx: Deg,
    pub ry: Deg,
    pub rz: Deg,
}

impl Pose {
    pub const fn new(x: f64, y: f64, z: f64, rx: Deg, ry: Deg, rz: Deg) -> Self {
        Pose {
            x,
            y,
            z,
            rx,
            ry,
            rz,
        }
    }

    /// 由齐次变换矩阵提取位姿
    pub fn from_matrix(t: &Matrix4<f64>) -> Self {
        let ry = (-t[(2, 0)]).atan2((t[(0, 0)] * t[(0, 0)] + t[(1, 0)] * t[(1, 0)]).sqrt());
        let c = ry.cos();
        let rx = (t[(2, 1)] / c).atan2(t[(2, 2)] / c);
        let rz = (t[(1, 0)] / c).atan2(t[(0, 0)] / c);
        Pose {
            x: t[(0, 3)],
            y: t[(1, 3)],
            z: t[(2, 3)],
            rx: Deg(rx.to_degrees()),
            ry: Deg(ry.to_degrees()),
            rz: Deg(rz.to_degrees()),
        }
    }

    /// 构建齐次变换矩阵
    pub fn build(&self) -> Matrix4<f64> {
        let (sx, cx) = self.rx.to_rad().0.sin_cos();
        let (sy, cy) = self.ry.to_rad().0.sin_cos();
        let (sz, cz) = self.rz.to_rad().0.sin_cos();
        #[rustfmt::skip]
        let t = Matrix4::new(
            cz * cy, cz * sy * sx - sz * cx, cz * sy * cx + sz * sx, self.x,
            sz * cy, sz * sy * sx + cz * cx, sz * sy * cx - cz * sx, self.y,
            -sy,     cy * sx,                cy * cx,                self.z,
            0.0,     0.0,                    0.0,                    1.0,
        );
        t
    }

    /// 两个位姿之间的逐分量线性插值（`s ∈ [0, 1]`）
    ///
    /// 欧拉角按普通分量插值，不做 ±180° 回绕处理；跨缝的姿态
    /// 插值会走远路，调用方需避开。
    pub fn lerp(&self, target: &Pose, s: f64) -> Pose {
        let mix = |a: f64, b: f64| (1.0 - s) * a + s * b;
        Pose {
            x: mix(self.x, target.x),
            y: mix(self.y, target.y),
            z: mix(self.z, target.z),
            rx: Deg(mix(self.rx.0, target.rx.0)),
            ry: Deg(mix(self.ry.0, target.ry.0)),
            rz: Deg(mix(self.rz.0, target.rz.0)),
        }
    }

    /// 平移分量之间的欧氏距离（毫米）
    pub fn translation_distance(&self, other: &Pose) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl std::fmt::Display for Pose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({:.3}, {:.3}, {:.3}, rx={:.3}, ry={:.3}, rz={:.3})",
            self.x, self.y, self.z, self.rx.0, self.ry.0, self.rz.0
        )
    }
}

/// 把幅值小于 1e-10 的矩阵元素归零
///
/// 用于生成干净的测试基准和日志输出；运动学计算本身使用原始
/// 矩阵，保证与提取公式的行为一致。
pub fn clean(t: &Matrix4<f64>) -> Matrix4<f64> {
    t.map(|v| if v.abs() < 1e-10 { 0.0 } else { v })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_identity_orientation() {
        let pose = Pose::new(10.0, 20.0, 30.0, Deg(0.0), Deg(0.0), Deg(0.0));
        let t = pose.build();
        assert_eq!(t[(0, 0)], 1.0);
        assert_eq!(t[(1, 1)], 1.0);
        assert_eq!(t[(2, 2)], 1.0);
        assert_eq!(t[(0, 3)], 10.0);
        assert_eq!(t[(2, 3)], 30.0);
    }

    #[test]
    fn test_build_s4_orientation() {
        // (rx=180, ry=0, rz=180) → 末端 z 轴朝向 -z
        let pose = Pose::new(0.0, 0.0, 0.0, Deg(180.0), Deg(0.0), Deg(180.0));
        let t = clean(&pose.build());
        assert_eq!(t[(0, 0)], -1.0);
        assert_eq!(t[(1, 1)], 1.0);
        assert_eq!(t[(2, 2)], -1.0);
    }

    #[test]
    fn test_extract_build_roundtrip() {
        let pose = Pose::new(100.0, -50.0, 300.0, Deg(30.0), Deg(-40.0), Deg(120.0));
        let back = Pose::from_matrix(&pose.build());
        assert!((back.x - pose.x).abs() < 1e-9);
        assert!((back.rx.0 - 30.0).abs() < 1e-9);
        assert!((back.ry.0 + 40.0).abs() < 1e-9);
        assert!((back.rz.0 - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_lerp_endpoints_and_midpoint() {
        let a = Pose::new(0.0, 0.0, 0.0, Deg(0.0), Deg(0.0), Deg(0.0));
        let b = Pose::new(50.0, -10.0, 20.0, Deg(90.0), Deg(10.0), Deg(-30.0));
        let start = a.lerp(&b, 0.0);
        let end = a.lerp(&b, 1.0);
        let mid = a.lerp(&b, 0.5);
        assert_eq!(start, a);
        assert_eq!(end, b);
        assert!((mid.x - 25.0).abs() < 1e-12);
        assert!((mid.rx.0 - 45.0).abs() < 1e-12);
    }

    #[test]
    fn test_clean_flushes_noise() {
        let mut t = Matrix4::<f64>::identity();
        t[(0, 1)] = 1e-16;
        t[(2, 0)] = -3e-11;
        let cleaned = clean(&t);
        assert_eq!(cleaned[(0, 1)], 0.0);
        assert_eq!(cleaned[(2, 0)], 0.0);
        assert_eq!(cleaned[(0, 0)], 1.0);
    }

    #[test]
    fn test_translation_distance() {
        let a = Pose::new(0.0, 0.0, 0.0, Deg(0.0), Deg(0.0), Deg(0.0));
        let b = Pose::new(3.0, 4.0, 0.0, Deg(0.0), Deg(0.0), Deg(0.0));
        assert!((a.translation_distance(&b) - 5.0).abs() < 1e-12);
    }
}
