//! # Hexarm Protocol
//!
//! Firmata AccelStepper 子系统的报文定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `ids`: sysex 命令常量定义
//! - `codec`: 7-bit 打包、32 位有符号位置、自定义浮点数编解码
//! - `command`: 主机 → 微控制器命令帧构建
//! - `reply`: 微控制器 → 主机回复帧解析
//!
//! ## 帧格式
//!
//! 所有报文走 Firmata sysex 通道：`0xF0 0x62 <子命令> <载荷…> 0xF7`。
//! 载荷中每个字节必须 ≤ 0x7F（Firmata 的 7-bit 数据约束），
//! 多字节数值由 `codec` 模块负责拆分与重组。

pub mod codec;
pub mod command;
pub mod ids;
pub mod reply;

// 重新导出常用类型
pub use codec::{decode_i32, decode_unit_float, encode_i32, encode_unit_float};
pub use command::Command;
pub use ids::*;
pub use reply::{Reply, ReplyKind, SysexScanner};

use thiserror::Error;

/// 一台机械臂的步进设备数量上限
///
/// Firmata AccelStepper 本身允许 10 个设备，本协议栈固定服务
/// 六关节臂，设备号 0..=5。
pub const MAX_DEVICES: u8 = 6;

/// 步进设备索引（0..=5）
///
/// NewType 封装，构造时做范围检查，杜绝把关节序号和引脚号混用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceIndex(u8);

impl DeviceIndex {
    /// 创建设备索引（范围检查）
    pub fn new(index: u8) -> Result<Self, ProtocolError> {
        if index < MAX_DEVICES {
            Ok(DeviceIndex(index))
        } else {
            Err(ProtocolError::DeviceOutOfRange { index })
        }
    }

    /// 获取原始索引值
    #[inline]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// 作为数组下标使用
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for DeviceIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "device {}", self.0)
    }
}

/// 协议编解码错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Unexpected end of sysex payload: need {needed} more byte(s)")]
    UnexpectedEnd { needed: usize },

    #[error("Unknown AccelStepper subcommand: 0x{subcommand:02X}")]
    InvalidSubcommand { subcommand: u8 },

    #[error("Device index out of range: {index} (max {})", MAX_DEVICES - 1)]
    DeviceOutOfRange { index: u8 },

    #[error("Non-data byte 0x{byte:02X} inside sysex payload")]
    NonDataByte { byte: u8 },
}
