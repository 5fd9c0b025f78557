//! 主机 → 微控制器命令帧构建
//!
//! 每个命令对应 AccelStepper 特性的一个子命令，`encode()` 产出
//! 完整 sysex 帧（含 `0xF0 … 0xF7`），可直接写入串口传输层。

use crate::codec::{encode_i32, encode_unit_float};
use crate::ids::*;
use crate::DeviceIndex;

/// AccelStepper 命令
///
/// 与网关层的八个操作一一对应；编码细节（7-bit 拆片、自定义
/// 浮点）集中在 [`crate::codec`]。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// 配置设备：外部驱动器接口（STEP + DIR），一次性
    Configure {
        device: DeviceIndex,
        step_pin: u8,
        dir_pin: u8,
    },
    /// 设置最大速度（steps/s）
    SetSpeed { device: DeviceIndex, steps_per_s: f64 },
    /// 设置加速度（steps/s²）；0 表示恒速运行
    SetAcceleration {
        device: DeviceIndex,
        steps_per_s2: f64,
    },
    /// 相对步进；0 步也会产生一次完成回报（栅栏原语）
    StepRelative { device: DeviceIndex, steps: i32 },
    /// 绝对步进；运动中重发会平滑重定目标
    StepTo { device: DeviceIndex, position: i32 },
    /// 立即停止；不产生完成回报
    Stop { device: DeviceIndex },
    /// 查询当前绝对位置
    ReportPosition { device: DeviceIndex },
    /// 把微控制器侧绝对计数器清零
    Zero { device: DeviceIndex },
}

impl Command {
    /// 编码为完整 sysex 帧
    pub fn encode(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(12);
        frame.push(START_SYSEX);
        frame.push(ACCELSTEPPER_DATA);
        match *self {
            Command::Configure {
                device,
                step_pin,
                dir_pin,
            } => {
                frame.push(STEPPER_CONFIG);
                frame.push(device.value());
                // 接口字节：[类型:3][步距:3][有使能脚:1]
                frame.push((INTERFACE_DRIVER << 4) | (STEP_SIZE_WHOLE << 1));
                frame.push(step_pin & 0x7F);
                frame.push(dir_pin & 0x7F);
            },
            Command::SetSpeed {
                device,
                steps_per_s,
            } => {
                frame.push(STEPPER_SET_SPEED);
                frame.push(device.value());
                frame.extend_from_slice(&encode_unit_float(steps_per_s));
            },
            Command::SetAcceleration {
                device,
                steps_per_s2,
            } => {
                frame.push(STEPPER_SET_ACCELERATION);
                frame.push(device.value());
                frame.extend_from_slice(&encode_unit_float(steps_per_s2));
            },
            Command::StepRelative { device, steps } => {
                frame.push(STEPPER_STEP);
                frame.push(device.value());
                frame.extend_from_slice(&encode_i32(steps));
            },
            Command::StepTo { device, position } => {
                frame.push(STEPPER_TO);
                frame.push(device.value());
                frame.extend_from_slice(&encode_i32(position));
            },
            Command::Stop { device } => {
                frame.push(STEPPER_STOP);
                frame.push(device.value());
            },
            Command::ReportPosition { device } => {
                frame.push(STEPPER_REPORT_POSITION);
                frame.push(device.value());
            },
            Command::Zero { device } => {
                frame.push(STEPPER_ZERO);
                frame.push(device.value());
            },
        }
        frame.push(END_SYSEX);
        frame
    }

    /// 该命令作用的设备
    pub fn device(&self) -> DeviceIndex {
        match *self {
            Command::Configure { device, .. }
            | Command::SetSpeed { device, .. }
            | Command::SetAcceleration { device, .. }
            | Command::StepRelative { device, .. }
            | Command::StepTo { device, .. }
            | Command::Stop { device }
            | Command::ReportPosition { device }
            | Command::Zero { device } => device,
        }
    }

    /// 是否会触发一次运动完成回报
    ///
    /// `Stop` 不回报；速度/加速度/配置/清零为即发即弃；
    /// `ReportPosition` 的回复走位置查询通道而不是完成通道。
    pub fn expects_completion(&self) -> bool {
        matches!(self, Command::StepRelative { .. } | Command::StepTo { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev(i: u8) -> DeviceIndex {
        DeviceIndex::new(i).unwrap()
    }

    #[test]
    fn test_configure_frame() {
        let frame = Command::Configure {
            device: dev(2),
            step_pin: 4,
            dir_pin: 5,
        }
        .encode();
        assert_eq!(
            frame,
            vec![0xF0, 0x62, 0x00, 2, 0x10, 4, 5, 0xF7]
        );
    }

    #[test]
    fn test_step_relative_frame() {
        let frame = Command::StepRelative {
            device: dev(0),
            steps: -200,
        }
        .encode();
        // -200 = 0b1_1001000 → [0x48, 0x01] + 符号位
        assert_eq!(
            frame,
            vec![0xF0, 0x62, 0x02, 0, 0x48, 0x01, 0, 0, 0x08, 0xF7]
        );
    }

    #[test]
    fn test_step_to_frame() {
        let frame = Command::StepTo {
            device: dev(5),
            position: 1000,
        }
        .encode();
        assert_eq!(frame[0..4], [0xF0, 0x62, 0x03, 5]);
        assert_eq!(*frame.last().unwrap(), 0xF7);
    }

    #[test]
    fn test_stop_frame() {
        let frame = Command::Stop { device: dev(1) }.encode();
        assert_eq!(frame, vec![0xF0, 0x62, 0x05, 1, 0xF7]);
    }

    #[test]
    fn test_zero_frame() {
        let frame = Command::Zero { device: dev(1) }.encode();
        assert_eq!(frame, vec![0xF0, 0x62, 0x01, 1, 0xF7]);
    }

    #[test]
    fn test_all_payload_bytes_are_7bit() {
        let commands = [
            Command::SetSpeed {
                device: dev(3),
                steps_per_s: 1365.333,
            },
            Command::SetAcceleration {
                device: dev(3),
                steps_per_s2: 0.0,
            },
            Command::StepRelative {
                device: dev(3),
                steps: i32::MAX,
            },
            Command::StepTo {
                device: dev(3),
                position: -123_456,
            },
        ];
        for cmd in commands {
            let frame = cmd.encode();
            for &b in &frame[1..frame.len() - 1] {
                assert!(b <= 0x7F, "byte 0x{:02X} in {:?}", b, cmd);
            }
        }
    }

    #[test]
    fn test_expects_completion() {
        assert!(Command::StepRelative {
            device: dev(0),
            steps: 0
        }
        .expects_completion());
        assert!(Command::StepTo {
            device: dev(0),
            position: 7
        }
        .expects_completion());
        assert!(!Command::Stop { device: dev(0) }.expects_completion());
        assert!(!Command::ReportPosition { device: dev(0) }.expects_completion());
    }
}
