//! # Hexarm Kinematics
//!
//! 六自由度球腕机械臂的运动学引擎：
//!
//! - `units`: 强类型角度单位（`Rad` / `Deg`）与角度范围
//! - `joint`: 关节枚举与六元关节数组
//! - `chain`: 标准 DH 链与正向运动学
//! - `pose`: 笛卡尔位姿与 ZYX 欧拉角互转
//! - `ik`: 闭式解析逆解（腕型 F/NF 选择 + 单次翻转重试）
//!
//! ## 单位约定
//!
//! 内部计算全程弧度 + 毫米；API 边界（位姿、关节角、配置）使用
//! 角度制。步数等驱动层单位不出现在本 crate。
//!
//! ## 纯函数性
//!
//! [`DhChain`] 除工具坐标系外没有状态，所有求解都是只读的，可以
//! 放在 `Arc` 里被协调器与测试并发使用。

pub mod chain;
pub mod error;
pub mod ik;
pub mod joint;
pub mod pose;
pub mod units;

// 下游 crate 与矩阵打交道时复用同一个 nalgebra
pub use nalgebra;

pub use chain::{DhChain, DhLink};
pub use error::KinematicsError;
pub use ik::{j1_angle, WristConfig};
pub use joint::{Joint, JointArray};
pub use pose::{clean, Pose};
pub use units::{AngleRange, Deg, Rad};

/// Result 类型别名
pub type Result<T> = std::result::Result<T, KinematicsError>;
