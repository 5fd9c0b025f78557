//! 运动学错误类型

use thiserror::Error;

use crate::joint::Joint;
use crate::units::{AngleRange, Deg};

/// 运动学求解错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KinematicsError {
    /// 解出的关节角越界（含单次腕型翻转重试之后）
    #[error("Joint {joint} solution {angle} outside range {range}")]
    OutOfRange {
        joint: Joint,
        angle: Deg,
        range: AngleRange,
    },

    /// 目标超出工作空间（余弦定理参数越界）
    #[error("Target unreachable: law-of-cosines argument {value:.6} at {term} triangle")]
    Unreachable { term: &'static str, value: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = KinematicsError::OutOfRange {
            joint: Joint::J2,
            angle: Deg(95.0),
            range: AngleRange::new(Deg(-42.0), Deg(90.0)),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("J2"));
        assert!(msg.contains("95.00"));

        let err = KinematicsError::Unreachable {
            term: "shoulder",
            value: 1.53,
        };
        assert!(format!("{}", err).contains("shoulder"));
    }
}
