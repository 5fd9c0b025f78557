//! DH 链与正向运动学
//!
//! 标准 Denavit–Hartenberg 约定：每个连杆由 `(θ偏置, α, d, a)`
//! 描述，关节角叠加在 θ 偏置上：
//!
//! ```text
//! T(θ, α, d, a) = RotZ(θ) · TransZ(d) · TransX(a) · RotX(α)
//! ```
//!
//! 末端之后可以再挂一个工具坐标系（默认单位阵）。

use nalgebra::Matrix4;

use crate::joint::JointArray;
use crate::units::{Deg, Rad};

/// 单个 DH 连杆参数（长度毫米，角度弧度）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DhLink {
    /// θ 偏置：关节零位对应的 DH 角
    pub theta_offset: Rad,
    /// 连杆扭角 α
    pub alpha: Rad,
    /// 沿 z 轴的连杆偏距
    pub d: f64,
    /// 沿 x 轴的连杆长度
    pub a: f64,
}

impl DhLink {
    pub const fn new(theta_offset: Rad, alpha: Rad, d: f64, a: f64) -> Self {
        DhLink {
            theta_offset,
            alpha,
            d,
            a,
        }
    }

    /// 该连杆在关节角 `q` 下的齐次变换
    pub fn transform(&self, q: Rad) -> Matrix4<f64> {
        let theta = q.0 + self.theta_offset.0;
        let (st, ct) = theta.sin_cos();
        let (sa, ca) = self.alpha.0.sin_cos();
        #[rustfmt::skip]
        let t = Matrix4::new(
            ct, -st * ca,  st * sa, self.a * ct,
            st,  ct * ca, -ct * sa, self.a * st,
            0.0, sa,       ca,      self.d,
            0.0, 0.0,      0.0,     1.0,
        );
        t
    }
}

/// 六连杆 DH 链 + 工具坐标系
///
/// 除工具坐标系外无任何可变状态；同一个链可以被并发只读使用。
#[derive(Debug, Clone, PartialEq)]
pub struct DhChain {
    links: [DhLink; 6],
    tool: Matrix4<f64>,
}

impl DhChain {
    pub fn new(links: [DhLink; 6]) -> Self {
        DhChain {
            links,
            tool: Matrix4::identity(),
        }
    }

    /// 出厂臂的几何参数
    ///
    /// θ偏置 `[0°, −90°, 180°, 0°, 0°, 0°]`，α `[−90°, 0°, 90°, −90°, 90°, 0°]`，
    /// d `[184, 0, 0, 227.328, 0, 43]` mm，a `[65, 300, 0, 0, 0, 0]` mm。
    /// J4/J5/J6 轴线交于一点（球腕），解析逆解依赖这一点。
    pub fn hexarm() -> Self {
        let deg = |v: f64| Deg(v).to_rad();
        DhChain::new([
            DhLink::new(deg(0.0), deg(-90.0), 184.0, 65.0),
            DhLink::new(deg(-90.0), deg(0.0), 0.0, 300.0),
            DhLink::new(deg(180.0), deg(90.0), 0.0, 0.0),
            DhLink::new(deg(0.0), deg(-90.0), 227.328, 0.0),
            DhLink::new(deg(0.0), deg(90.0), 0.0, 0.0),
            DhLink::new(deg(0.0), deg(0.0), 43.0, 0.0),
        ])
    }

    /// 替换工具坐标系（追加在连杆 6 之后的齐次变换）
    pub fn set_tool_frame(&mut self, tool: Matrix4<f64>) {
        self.tool = tool;
    }

    pub fn tool_frame(&self) -> &Matrix4<f64> {
        &self.tool
    }

    pub fn links(&self) -> &[DhLink; 6] {
        &self.links
    }

    /// 正向运动学：基座 → 工具的齐次变换
    pub fn forward(&self, q: &JointArray<Deg>) -> Matrix4<f64> {
        let mut t = Matrix4::<f64>::identity();
        for (link, angle) in self.links.iter().zip(q.iter()) {
            t *= link.transform(angle.to_rad());
        }
        t * self.tool
    }

    /// 正向运动学并提取位姿
    pub fn pose(&self, q: &JointArray<Deg>) -> crate::Pose {
        crate::Pose::from_matrix(&self.forward(q))
    }

    /// 前三个连杆的正向运动学（腕心定位用，不含工具）
    pub(crate) fn forward_arm(&self, q1: Deg, q2: Deg, q3: Deg) -> Matrix4<f64> {
        let angles = [q1, q2, q3];
        let mut t = Matrix4::<f64>::identity();
        for (link, angle) in self.links.iter().zip(angles.iter()) {
            t *= link.transform(angle.to_rad());
        }
        t
    }
}

/// 齐次变换的快速逆（`Rᵀ`，`−Rᵀp`）
///
/// 只对刚体变换有效，不做通用矩阵求逆。
pub(crate) fn hom_inverse(t: &Matrix4<f64>) -> Matrix4<f64> {
    let mut out = Matrix4::identity();
    for i in 0..3 {
        for j in 0..3 {
            out[(i, j)] = t[(j, i)];
        }
    }
    for i in 0..3 {
        out[(i, 3)] = -(out[(i, 0)] * t[(0, 3)] + out[(i, 1)] * t[(1, 3)] + out[(i, 2)] * t[(2, 3)]);
    }
    out
}
