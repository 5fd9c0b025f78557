//! sysex 命令常量定义
//!
//! 对应 ConfigurableFirmata 的 AccelStepperFirmata 特性。

/// sysex 帧起始字节
pub const START_SYSEX: u8 = 0xF0;

/// sysex 帧结束字节
pub const END_SYSEX: u8 = 0xF7;

/// AccelStepper 特性的 sysex 功能号
pub const ACCELSTEPPER_DATA: u8 = 0x62;

/// 子命令：配置设备（接口类型 + 引脚）
pub const STEPPER_CONFIG: u8 = 0x00;

/// 子命令：把微控制器侧绝对计数器清零
pub const STEPPER_ZERO: u8 = 0x01;

/// 子命令：相对步进
pub const STEPPER_STEP: u8 = 0x02;

/// 子命令：绝对步进（重定目标安全）
pub const STEPPER_TO: u8 = 0x03;

/// 子命令：使能/失能驱动器
pub const STEPPER_ENABLE: u8 = 0x04;

/// 子命令：立即停止（不产生完成回报）
pub const STEPPER_STOP: u8 = 0x05;

/// 子命令：查询当前位置（回复同号）
pub const STEPPER_REPORT_POSITION: u8 = 0x06;

/// 子命令：设置加速度（steps/s²）
pub const STEPPER_SET_ACCELERATION: u8 = 0x08;

/// 子命令：设置最大速度（steps/s）
pub const STEPPER_SET_SPEED: u8 = 0x09;

/// 回复：运动完成，载荷为设备号 + 绝对步数
pub const STEPPER_MOVE_COMPLETE: u8 = 0x0A;

/// 接口类型：外部驱动器（STEP + DIR 两线）
pub const INTERFACE_DRIVER: u8 = 1;

/// 步距：整步
pub const STEP_SIZE_WHOLE: u8 = 0;
