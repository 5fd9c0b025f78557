//! 控制层错误类型定义

use hexarm_gateway::GatewayError;
use hexarm_kinematics::{AngleRange, Deg, Joint, KinematicsError};
use thiserror::Error;

use crate::config::ConfigError;

/// 控制层错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArmError {
    /// 未回零的关节收到运动命令（零步栅栏除外）
    #[error("Joint {joint} is not homed")]
    NotHomed { joint: Joint },

    /// 目标角度越界
    #[error("Joint {joint} target {target} outside range {range}")]
    OutOfRange {
        joint: Joint,
        target: Deg,
        range: AngleRange,
    },

    /// 回零失败：行程走完仍未触碰限位开关，关节保持未回零
    #[error("Homing failed on {joint}: {reason}")]
    HomingFailed { joint: Joint, reason: &'static str },

    /// 逆解失败（含单次腕型翻转之后）
    #[error("Inverse kinematics failed: {0}")]
    IkFailed(#[from] KinematicsError),

    /// moveL 插值路径上某个中间位姿逆解失败；未下发任何命令
    #[error("Trajectory invalid at sample {index}: {source}")]
    TrajectoryInvalid {
        index: usize,
        source: KinematicsError,
    },

    /// 网关终态错误
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// 配置错误（构造时检出）
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// 运动被 halt() 打断
    #[error("Motion interrupted by halt")]
    Interrupted,
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, ArmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ArmError::NotHomed { joint: Joint::J3 };
        assert!(format!("{}", err).contains("J3"));

        let err = ArmError::OutOfRange {
            joint: Joint::J2,
            target: Deg(91.0),
            range: AngleRange::new(Deg(-42.0), Deg(90.0)),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("J2") && msg.contains("91.00"));

        let err = ArmError::HomingFailed {
            joint: Joint::J1,
            reason: "travel exceeded, switch not hit",
        };
        assert!(format!("{}", err).contains("travel exceeded"));
    }

    #[test]
    fn test_gateway_error_converts() {
        let err: ArmError = GatewayError::Down.into();
        assert!(matches!(err, ArmError::Gateway(GatewayError::Down)));
    }
}
