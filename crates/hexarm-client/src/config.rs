//! 静态关节配置
//!
//! 每个关节一张不可变参数表：引脚、传动比、动力学上限、回零
//! 方式、角度范围与备战位。配置文件加载在仓库之外（上层应用用
//! serde 反序列化出 [`ArmConfig`] 即可，`serde` 特性打开派生）。
//!
//! 所有校验在构造时完成；通过校验的配置在运行期不再检查。

use hexarm_kinematics::{AngleRange, Deg, Joint, JointArray};
use hexarm_protocol::DeviceIndex;
use thiserror::Error;

/// 配置错误（构造时检出）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// 单关节参数不合法
    #[error("Joint {joint} misconfigured: {reason}")]
    MisconfiguredJoint { joint: Joint, reason: String },

    /// 两个关节占用了同一个设备号
    #[error("Duplicate device index {device}")]
    DuplicateDevice { device: u8 },
}

/// 回零方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum HomingDirection {
    /// 朝角度增大方向寻找限位开关
    Positive,
    /// 朝角度减小方向寻找限位开关
    Negative,
}

impl HomingDirection {
    /// 方向符号（+1 / −1）
    #[inline]
    pub const fn sign(self) -> f64 {
        match self {
            HomingDirection::Positive => 1.0,
            HomingDirection::Negative => -1.0,
        }
    }
}

/// 单关节静态配置
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JointConfig {
    /// 关节名（J1-J6）
    pub name: Joint,
    /// AccelStepper 设备号（0-5）
    pub device: DeviceIndex,
    /// STEP 引脚
    pub step_pin: u8,
    /// DIR 引脚
    pub dir_pin: u8,
    /// 限位开关引脚（内部上拉，闭合时拉低）
    pub home_switch_pin: u8,
    /// 关节输出轴一圈的步数（含细分与减速比）
    pub steps_per_rev: u32,
    /// 最大速度（deg/s）
    pub max_speed: f64,
    /// 最大加速度（deg/s²）
    pub max_accel: f64,
    /// 回零寻位速度（deg/s，恒速）
    pub homing_speed: f64,
    /// 回零方向
    pub homing_direction: HomingDirection,
    /// 角度范围
    pub range: AngleRange,
    /// 备战位（范围内）
    pub ready_position: Deg,
    /// 限位开关位置到机械零位的标定补偿（小量，带符号）
    pub calibration_offset: Deg,
}

impl JointConfig {
    /// 构造时校验
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |reason: String| {
            Err(ConfigError::MisconfiguredJoint {
                joint: self.name,
                reason,
            })
        };
        if self.steps_per_rev == 0 {
            return fail("steps_per_rev must be positive".into());
        }
        if self.max_speed <= 0.0 {
            return fail(format!("max_speed must be > 0 (got {})", self.max_speed));
        }
        if self.max_accel < 0.0 {
            return fail(format!("max_accel must be >= 0 (got {})", self.max_accel));
        }
        if self.homing_speed <= 0.0 || self.homing_speed > self.max_speed {
            return fail(format!(
                "homing_speed must be in (0, max_speed] (got {})",
                self.homing_speed
            ));
        }
        if self.range.min.0 >= self.range.max.0 {
            return fail(format!("range {} is empty", self.range));
        }
        if !self.range.contains(self.ready_position) {
            return fail(format!(
                "ready_position {} outside range {}",
                self.ready_position, self.range
            ));
        }
        Ok(())
    }

    /// 角度 → 步数（浮点，不取整）
    ///
    /// `steps = deg / 360 · steps_per_rev`；速度/加速度用同一换算
    /// 系数。下发命令时才四舍五入成整数。
    #[inline]
    pub fn steps_from_deg(&self, value: f64) -> f64 {
        value / 360.0 * self.steps_per_rev as f64
    }

    /// 步数 → 角度
    ///
    /// 永远从微控制器回报的整数步数反算角度，换算可逆，杜绝
    /// 累积漂移。
    #[inline]
    pub fn deg_from_steps(&self, steps: i32) -> Deg {
        Deg(steps as f64 * 360.0 / self.steps_per_rev as f64)
    }

    /// 一步对应的角度
    #[inline]
    pub fn one_step_deg(&self) -> Deg {
        Deg(360.0 / self.steps_per_rev as f64)
    }

    /// 回零寻位行程：`±(|min| + |max| + 5°)`
    pub fn homing_travel(&self) -> Deg {
        Deg((self.range.min.0.abs() + self.range.max.0.abs() + 5.0) * self.homing_direction.sign())
    }

    /// 回零标定补偿行程（负向回零落在 min，正向回零落在 max）
    pub fn homing_offset(&self) -> Deg {
        match self.homing_direction {
            HomingDirection::Negative => Deg(-self.range.min.0) + self.calibration_offset,
            HomingDirection::Positive => Deg(-self.range.max.0) + self.calibration_offset,
        }
    }
}

/// 整臂配置：六张关节表
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArmConfig {
    joints: JointArray<JointConfig>,
}

impl ArmConfig {
    /// 校验并构造
    pub fn new(joints: JointArray<JointConfig>) -> Result<Self, ConfigError> {
        let mut seen = [false; hexarm_protocol::MAX_DEVICES as usize];
        for config in joints.iter() {
            config.validate()?;
            let device = config.device.index();
            if seen[device] {
                return Err(ConfigError::DuplicateDevice {
                    device: config.device.value(),
                });
            }
            seen[device] = true;
        }
        Ok(ArmConfig { joints })
    }

    /// 出厂臂的默认配置表
    pub fn hexarm() -> Self {
        let device = |i: u8| DeviceIndex::new(i).unwrap_or_else(|_| unreachable!());
        let joint = |name,
                     index: u8,
                     steps_per_rev,
                     max_speed,
                     max_accel,
                     homing_speed,
                     homing_direction,
                     min: f64,
                     max: f64,
                     ready: f64,
                     calibration: f64| JointConfig {
            name,
            device: device(index),
            step_pin: 2 + index * 2,
            dir_pin: 3 + index * 2,
            home_switch_pin: 22 + index,
            steps_per_rev,
            max_speed,
            max_accel,
            homing_speed,
            homing_direction,
            range: AngleRange::new(Deg(min), Deg(max)),
            ready_position: Deg(ready),
            calibration_offset: Deg(calibration),
        };
        use HomingDirection::{Negative, Positive};
        let joints = JointArray::new([
            joint(Joint::J1, 0, 15_360, 25.0, 40.0, 8.0, Negative, -170.0, 170.0, 0.0, 0.7),
            joint(Joint::J2, 1, 28_800, 20.0, 30.0, 5.0, Negative, -42.0, 90.0, 0.0, -0.4),
            joint(Joint::J3, 2, 19_200, 25.0, 40.0, 6.0, Positive, -89.0, 52.0, 0.0, 0.5),
            joint(Joint::J4, 3, 8_000, 40.0, 60.0, 10.0, Negative, -165.0, 165.0, 0.0, 0.0),
            joint(Joint::J5, 4, 6_400, 40.0, 60.0, 10.0, Positive, -105.0, 105.0, 90.0, -0.3),
            joint(Joint::J6, 5, 3_200, 60.0, 80.0, 15.0, Negative, -155.0, 155.0, 0.0, 0.0),
        ]);
        // 默认表是常量，校验失败属于编程错误
        match ArmConfig::new(joints) {
            Ok(config) => config,
            Err(e) => unreachable!("builtin config invalid: {}", e),
        }
    }

    /// 单关节配置
    pub fn joint(&self, joint: Joint) -> &JointConfig {
        &self.joints[joint]
    }

    pub fn joints(&self) -> &JointArray<JointConfig> {
        &self.joints
    }

    /// 六关节角度范围（逆解校验用）
    pub fn ranges(&self) -> JointArray<AngleRange> {
        self.joints.clone().map(|c| c.range)
    }

    /// 六关节备战位
    pub fn ready_positions(&self) -> JointArray<Deg> {
        self.joints.clone().map(|c| c.ready_position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_config_is_valid() {
        let config = ArmConfig::hexarm();
        assert_eq!(config.joint(Joint::J5).ready_position, Deg(90.0));
        assert_eq!(config.joint(Joint::J2).range.max, Deg(90.0));
        for c in config.joints().iter() {
            assert!(c.validate().is_ok());
        }
    }

    #[test]
    fn test_steps_conversion_roundtrip() {
        let config = ArmConfig::hexarm();
        let j1 = config.joint(Joint::J1);
        // 15360 步/圈：90° = 3840 步
        assert_eq!(j1.steps_from_deg(90.0), 3840.0);
        assert_eq!(j1.deg_from_steps(3840), Deg(90.0));
        // 反算永远走整数步数，和浮点命令值相差不超过一步
        let steps = j1.steps_from_deg(12.345).round() as i32;
        let angle = j1.deg_from_steps(steps);
        assert!((angle.0 - 12.345).abs() <= j1.one_step_deg().0);
    }

    #[test]
    fn test_homing_travel_and_offset() {
        let config = ArmConfig::hexarm();
        let j2 = config.joint(Joint::J2);
        // |−42| + |90| + 5 = 137，负向寻位
        assert_eq!(j2.homing_travel(), Deg(-137.0));
        // 落在 min(−42°)，补偿 −0.4°
        assert_eq!(j2.homing_offset(), Deg(42.0) + Deg(-0.4));

        let j3 = config.joint(Joint::J3);
        assert_eq!(j3.homing_travel(), Deg(146.0));
        assert_eq!(j3.homing_offset(), Deg(-52.0) + Deg(0.5));
    }

    fn sample() -> JointConfig {
        ArmConfig::hexarm().joint(Joint::J1).clone()
    }

    #[test]
    fn test_validate_rejects_zero_steps() {
        let mut config = sample();
        config.steps_per_rev = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MisconfiguredJoint { joint: Joint::J1, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_ready_outside_range() {
        let mut config = sample();
        config.ready_position = Deg(200.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_homing_faster_than_max() {
        let mut config = sample();
        config.homing_speed = config.max_speed + 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_range() {
        let mut config = sample();
        config.range = AngleRange::new(Deg(10.0), Deg(10.0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_device_rejected() {
        let config = ArmConfig::hexarm();
        let mut joints = config.joints().clone();
        let duplicated = joints[Joint::J1].clone();
        joints[Joint::J2] = JointConfig {
            name: Joint::J2,
            ..duplicated
        };
        assert!(matches!(
            ArmConfig::new(joints),
            Err(ConfigError::DuplicateDevice { device: 0 })
        ));
    }
}
