//! # Hexarm Gateway
//!
//! Firmware Gateway：把 AccelStepper 线缆协议抽象成
//! "命令 + 完成句柄"接口。
//!
//! ## 模块
//!
//! - `transport`: 串行传输抽象（真实串口实现在仓库之外）
//! - `gateway`: 对上层的八个操作 + 全局事件
//! - `completion`: 一次性完成句柄（步数回报）
//! - `pipeline`: 后台 IO 线程（写序列化 + 按设备号解复用）
//! - `mock`: 模拟微控制器（`mock` 特性 / 测试）
//!
//! ## 使用场景
//!
//! 每个关节控制器持有同一个 `Arc<Gateway>` 的只读句柄，各自
//! 操作独立的设备号；网关不强制"每设备至多一条在途运动"，这由
//! 关节控制器的命令互斥保证。

pub mod completion;
pub mod error;
pub mod gateway;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod pipeline;
pub mod transport;

pub use completion::Completion;
pub use error::{GatewayError, GatewayEvent, Result};
pub use gateway::{Gateway, ReplyHook};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockFirmware, MockHandle, MockTransport};
pub use transport::Transport;

// 协议层的设备号在网关 API 中直接复用
pub use hexarm_protocol::{DeviceIndex, MAX_DEVICES};
