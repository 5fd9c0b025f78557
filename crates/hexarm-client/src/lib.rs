//! # Hexarm Client
//!
//! 六自由度步进机械臂的宿主侧控制核心：
//!
//! - `config`: 静态关节配置表与构造期校验
//! - `switch`: 限位开关边沿事件（外部按钮库产生，本层消费）
//! - `joint`: 关节控制器（回零状态机、限界运动、stop/栅栏）
//! - `trajectory`: 笛卡尔直线轨迹规划（moveL 的规划产物）
//! - `robot`: 协调器（home / moveJ / moveL / halt / 位姿查询）
//!
//! ## 最小使用示例
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hexarm_client::{switch_channel, ArmConfig, Robot};
//! use hexarm_gateway::Gateway;
//! use hexarm_kinematics::JointArray;
//!
//! # fn transport() -> Box<dyn hexarm_gateway::Transport> { unimplemented!() }
//! # fn main() -> hexarm_client::Result<()> {
//! let gateway = Arc::new(Gateway::connect(transport()));
//! let switches = JointArray::new(std::array::from_fn(|_| switch_channel().1));
//! let robot = Robot::new(gateway, ArmConfig::hexarm(), switches)?;
//!
//! robot.home()?;
//! let mut target = robot.pose();
//! target.x += 50.0;
//! robot.move_l(&target)?;
//! # Ok(())
//! # }
//! ```
//!
//! 进程不持久化任何状态：每次启动都必须重新回零。

pub mod config;
pub mod error;
pub mod joint;
pub mod robot;
pub mod switch;
pub mod trajectory;

pub use config::{ArmConfig, ConfigError, HomingDirection, JointConfig};
pub use error::{ArmError, Result};
pub use joint::{JointController, JointState};
pub use robot::Robot;
pub use switch::{switch_channel, SwitchEvent};
pub use trajectory::{CartesianTrajectory, CONTROL_FREQUENCY_HZ};
