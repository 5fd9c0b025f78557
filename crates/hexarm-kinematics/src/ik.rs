//! 解析逆运动学
//!
//! 球腕 6-DOF 臂的闭式逆解：位置与姿态解耦 —— 先由目标位姿推出
//! 腕心位置解 `q1..q3`（平面三角形 + 余弦定理），再由
//! `R_3_6 = R_0_3ᵀ · R_0_6` 解腕角 `q4..q6`。
//!
//! # 腕型 F / NF
//!
//! 球腕有两组解，`q5` 符号相反、`q4`/`q6` 相差 180°。调用方指定
//! 首选腕型；若解出的腕角越界，自动翻转重算一次（仅一次，不做
//! 关节限位感知的分支搜索）。
//!
//! # 已知局限
//!
//! - `r33 ≈ ±1`（腕奇异）时 `q4` 与 `q6` 耦合，二者的拆分由浮点
//!   噪声决定；解仍通过范围校验，但具体数值不保证稳定。
//! - 肘部三角形的分支公式覆盖臂的前方工作空间；腕心落到基座柱
//!   后方或肩部下方大幅后仰区时会选到另一组肘解。

use crate::chain::{hom_inverse, DhChain};
use crate::error::KinematicsError;
use crate::joint::{Joint, JointArray};
use crate::pose::Pose;
use crate::units::{AngleRange, Deg};

/// 腕型：翻转 / 不翻转
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WristConfig {
    /// F：`q5 ≥ 0` 的一组解
    Flip,
    /// NF：`q5 ≤ 0` 的一组解
    NoFlip,
}

impl WristConfig {
    /// 另一组腕型
    pub const fn flipped(self) -> Self {
        match self {
            WristConfig::Flip => WristConfig::NoFlip,
            WristConfig::NoFlip => WristConfig::Flip,
        }
    }
}

impl std::fmt::Display for WristConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WristConfig::Flip => write!(f, "F"),
            WristConfig::NoFlip => write!(f, "NF"),
        }
    }
}

/// 基座旋转角的全象限反正切（输出角度制，范围 `(-180°, 180°]`）
///
/// 在负 x 轴上有一条刻意保留的 ±180° 接缝；`x = 0` 固定给 −90°。
pub fn j1_angle(x: f64, y: f64) -> Deg {
    if x == 0.0 {
        Deg(-90.0)
    } else if x > 0.0 {
        Deg((y / x).atan().to_degrees())
    } else if y <= 0.0 {
        Deg(-180.0 + (y / x).atan().to_degrees())
    } else {
        Deg(180.0 + (y / x).atan().to_degrees())
    }
}

/// 余弦定理参数，越界视为目标不可达
fn checked_acos(value: f64, term: &'static str) -> Result<f64, KinematicsError> {
    if value.abs() > 1.0 + 1e-9 {
        return Err(KinematicsError::Unreachable { term, value });
    }
    Ok(value.clamp(-1.0, 1.0).acos().to_degrees())
}

impl DhChain {
    /// 逆运动学
    ///
    /// 返回六个关节角（角度制）。校验顺序：先按 `wrist` 解腕角，
    /// 任一腕角越界则翻转腕型重算一次，最后统一做六关节范围校验。
    pub fn inverse(
        &self,
        target: &Pose,
        wrist: WristConfig,
        ranges: &JointArray<AngleRange>,
    ) -> Result<JointArray<Deg>, KinematicsError> {
        let links = self.links();
        let d1 = links[0].d;
        let a1 = links[0].a;
        let a2 = links[1].a;
        let a3 = links[2].a;
        let d4 = links[3].d;
        let d6 = links[5].d;

        let t_0_6 = target.build() * hom_inverse(self.tool_frame());

        // 球腕腕心：从工具法兰沿 z6 退回 d6
        let wx = t_0_6[(0, 3)] - d6 * t_0_6[(0, 2)];
        let wy = t_0_6[(1, 3)] - d6 * t_0_6[(1, 2)];
        let wz = t_0_6[(2, 3)] - d6 * t_0_6[(2, 2)];

        let q1 = j1_angle(wx, wy);

        // 旋转 -q1，把腕心转进 J1 零位平面
        let (s1, c1) = (-q1.to_rad().0).sin_cos();
        let wx1 = c1 * wx - s1 * wy;

        let l1 = wx1 - a1;
        let l4 = wz - d1;
        let l2 = l1.hypot(l4);
        let l3 = a3.hypot(d4);

        let theta_b = l1.atan2(l4).to_degrees();
        let theta_c = checked_acos((a2 * a2 + l2 * l2 - l3 * l3) / (2.0 * a2 * l2), "shoulder")?;
        let theta_d = checked_acos((l3 * l3 + a2 * a2 - l2 * l2) / (2.0 * l3 * a2), "elbow")?;
        let theta_e = a3.atan2(d4).to_degrees();

        let q2 = if wx1 > a1 && l4 > 0.0 {
            theta_b - theta_c
        } else if wx1 > a1 {
            theta_b - theta_c + 180.0
        } else {
            -(theta_b + theta_c)
        };
        let q3 = -(theta_d + theta_e) + 90.0;

        let (q2, q3) = (Deg(q2), Deg(q3));

        // 腕角：R_3_6 = R_0_3ᵀ · R_0_6
        let t_0_3 = self.forward_arm(q1, q2, q3);
        let r_3_6 = hom_inverse(&t_0_3) * t_0_6;

        let mut wrist_angles = wrist_solution(&r_3_6, wrist);
        let wrist_in_range = [Joint::J4, Joint::J5, Joint::J6]
            .iter()
            .zip(wrist_angles.iter())
            .all(|(&joint, &angle)| ranges[joint].contains(angle));
        if !wrist_in_range {
            // 单次腕型翻转重试
            wrist_angles = wrist_solution(&r_3_6, wrist.flipped());
        }

        let [q4, q5, q6] = wrist_angles;
        let solution = JointArray::new([q1, q2, q3, q4, q5, q6]);
        solution.try_map(|joint, angle| {
            if ranges[joint].contains(angle) {
                Ok(angle)
            } else {
                Err(KinematicsError::OutOfRange {
                    joint,
                    angle,
                    range: ranges[joint],
                })
            }
        })
    }
}

/// 指定腕型下的 `q4/q5/q6`
fn wrist_solution(r_3_6: &nalgebra::Matrix4<f64>, wrist: WristConfig) -> [Deg; 3] {
    let r13 = r_3_6[(0, 2)];
    let r23 = r_3_6[(1, 2)];
    let r31 = r_3_6[(2, 0)];
    let r32 = r_3_6[(2, 1)];
    let r33 = r_3_6[(2, 2)];
    let s5 = (1.0 - r33 * r33).max(0.0).sqrt();

    let (q4, q5, q6) = match wrist {
        WristConfig::Flip => (
            r23.atan2(r13),
            s5.atan2(r33),
            r32.atan2(-r31),
        ),
        WristConfig::NoFlip => (
            (-r23).atan2(-r13),
            (-s5).atan2(r33),
            (-r32).atan2(r31),
        ),
    };
    [
        Deg(q4.to_degrees()),
        Deg(q5.to_degrees()),
        Deg(q6.to_degrees()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranges() -> JointArray<AngleRange> {
        JointArray::new([
            AngleRange::new(Deg(-170.0), Deg(170.0)),
            AngleRange::new(Deg(-42.0), Deg(90.0)),
            AngleRange::new(Deg(-89.0), Deg(52.0)),
            AngleRange::new(Deg(-165.0), Deg(165.0)),
            AngleRange::new(Deg(-105.0), Deg(105.0)),
            AngleRange::new(Deg(-155.0), Deg(155.0)),
        ])
    }

    fn assert_angles(actual: &JointArray<Deg>, expected: [f64; 6], tol: f64) {
        for (joint, angle) in Joint::ALL.iter().zip(actual.iter()) {
            assert!(
                (angle.0 - expected[joint.index()]).abs() < tol,
                "{}: {} vs {}",
                joint,
                angle.0,
                expected[joint.index()]
            );
        }
    }

    #[test]
    fn test_j1_angle_quadrants() {
        // S6 / S7 基准
        assert!((j1_angle(-113.262, 196.176).0 - 120.0).abs() < 1e-3);
        assert!((j1_angle(-39.335, -223.083).0 + 100.0).abs() < 1e-3);
        // x = 0 固定 -90
        assert_eq!(j1_angle(0.0, 100.0), Deg(-90.0));
        assert_eq!(j1_angle(0.0, -100.0), Deg(-90.0));
        // 第一象限
        assert!((j1_angle(100.0, 100.0).0 - 45.0).abs() < 1e-12);
    }

    #[test]
    fn test_ik_ready_pose() {
        // S4：工具垂直向下的备战位姿
        let chain = DhChain::hexarm();
        let target = Pose::new(292.328, 0.0, 441.0, Deg(180.0), Deg(0.0), Deg(180.0));
        let q = chain.inverse(&target, WristConfig::Flip, &ranges()).unwrap();
        assert_angles(&q, [0.0, 0.0, 0.0, 0.0, 90.0, 0.0], 1e-3);
    }

    #[test]
    fn test_ik_s5_pose() {
        let chain = DhChain::hexarm();
        let target = Pose::new(
            297.448,
            48.897,
            435.504,
            Deg(149.105),
            Deg(-9.278),
            Deg(174.709),
        );
        let q = chain.inverse(&target, WristConfig::Flip, &ranges()).unwrap();
        assert_angles(&q, [5.0, 2.0, 1.0, 32.0, 90.0, 12.0], 2e-2);
    }

    #[test]
    fn test_ik_inverts_fk() {
        let chain = DhChain::hexarm();
        let q = JointArray::new([
            Deg(-150.0),
            Deg(45.0),
            Deg(20.0),
            Deg(31.0),
            Deg(22.0),
            Deg(100.0),
        ]);
        let pose = chain.pose(&q);
        let solved = chain.inverse(&pose, WristConfig::Flip, &ranges()).unwrap();
        assert_angles(&solved, [-150.0, 45.0, 20.0, 31.0, 22.0, 100.0], 1e-6);
    }

    #[test]
    fn test_ik_wrist_flip_retry() {
        // 原始姿态 q5 < 0：F 腕型给出 q4 = ±180°，越界后自动翻转到 NF
        let chain = DhChain::hexarm();
        let q = JointArray::new([
            Deg(0.0),
            Deg(10.0),
            Deg(10.0),
            Deg(0.0),
            Deg(-30.0),
            Deg(0.0),
        ]);
        let pose = chain.pose(&q);
        let solved = chain.inverse(&pose, WristConfig::Flip, &ranges()).unwrap();
        assert_angles(&solved, [0.0, 10.0, 10.0, 0.0, -30.0, 0.0], 1e-6);
    }

    #[test]
    fn test_ik_unreachable_target() {
        let chain = DhChain::hexarm();
        let target = Pose::new(900.0, 0.0, 400.0, Deg(180.0), Deg(0.0), Deg(180.0));
        let result = chain.inverse(&target, WristConfig::Flip, &ranges());
        assert!(matches!(
            result,
            Err(KinematicsError::Unreachable { .. })
        ));
    }

    #[test]
    fn test_ik_out_of_range_after_flip() {
        // |q5| = 150° 超出 ±105° 范围；翻转后 q4 落在 ±180°，
        // 范围校验按 J1→J6 顺序首先在 J4 失败
        let chain = DhChain::hexarm();
        let q = JointArray::new([
            Deg(0.0),
            Deg(10.0),
            Deg(10.0),
            Deg(0.0),
            Deg(150.0),
            Deg(0.0),
        ]);
        let pose = chain.pose(&q);
        let result = chain.inverse(&pose, WristConfig::Flip, &ranges());
        assert!(matches!(
            result,
            Err(KinematicsError::OutOfRange {
                joint: Joint::J4,
                ..
            })
        ));
    }

    #[test]
    fn test_ik_base_rotation_only() {
        let chain = DhChain::hexarm();
        let q = JointArray::new([
            Deg(120.0),
            Deg(0.0),
            Deg(0.0),
            Deg(0.0),
            Deg(90.0),
            Deg(0.0),
        ]);
        let pose = chain.pose(&q);
        let solved = chain.inverse(&pose, WristConfig::Flip, &ranges()).unwrap();
        assert_angles(&solved, [120.0, 0.0, 0.0, 0.0, 90.0, 0.0], 1e-6);
    }
}
