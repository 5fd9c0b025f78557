//! 笛卡尔直线轨迹规划
//!
//! moveL 的规划产物：在**笛卡尔空间**按归一化时间均匀插值
//! （含欧拉角分量，不做 ±180° 回绕），每个采样点解一次逆解。
//! 整条轨迹先验证后执行——任何中间位姿解不出来，一条命令都
//! 不会下发。
//!
//! 直线插值 + 50Hz 重定目标，是因为 AccelStepper 的梯形规划发生
//! 在**关节空间**：只发一条 `step_to(q_end)` 走出来的不是直线。

use hexarm_kinematics::{AngleRange, Deg, DhChain, JointArray, Pose, WristConfig};

use crate::error::{ArmError, Result};

/// 控制循环频率（Hz）
pub const CONTROL_FREQUENCY_HZ: f64 = 50.0;

/// 一次 moveL 的关节空间轨迹（瞬态，单次消费）
#[derive(Debug, Clone)]
pub struct CartesianTrajectory {
    points: Vec<JointArray<Deg>>,
    duration_s: f64,
}

impl CartesianTrajectory {
    /// 规划：`samples + 1` 个点（含起终点），全部预先过逆解
    ///
    /// 任一中间位姿逆解失败返回 [`ArmError::TrajectoryInvalid`]。
    pub fn plan(
        chain: &DhChain,
        start: &Pose,
        target: &Pose,
        samples: usize,
        duration_s: f64,
        ranges: &JointArray<AngleRange>,
    ) -> Result<Self> {
        let mut points = Vec::with_capacity(samples + 1);
        for i in 0..=samples {
            let s = i as f64 / samples as f64;
            let pose = start.lerp(target, s);
            let q = chain
                .inverse(&pose, WristConfig::Flip, ranges)
                .map_err(|source| ArmError::TrajectoryInvalid { index: i, source })?;
            points.push(q);
        }
        Ok(CartesianTrajectory { points, duration_s })
    }

    /// 采样点（含起终点）
    pub fn points(&self) -> &[JointArray<Deg>] {
        &self.points
    }

    /// 规划时长（秒，不含落停缓冲）
    pub fn duration_s(&self) -> f64 {
        self.duration_s
    }

    /// 节拍周期（毫秒）
    pub fn tick_ms(&self) -> u64 {
        (1000.0 / CONTROL_FREQUENCY_HZ) as u64
    }
}
